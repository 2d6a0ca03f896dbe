// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use super::state::*;
use crate::renderer::api::bind_group::BindGroupLayoutId;
use crate::renderer::api::pass::RenderPassId;
use crate::renderer::api::shader::ShaderModuleId;
use std::borrow::Cow;

/// An opaque handle to a pipeline layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PipelineLayoutId(pub usize);

/// A descriptor for a [`PipelineLayoutId`].
///
/// Bind group layouts are indexed by set number.
#[derive(Debug, Clone)]
pub struct PipelineLayoutDescriptor<'a> {
    /// An optional debug label.
    pub label: Option<Cow<'a, str>>,
    /// The bind group layouts used by this pipeline, indexed by set number.
    pub bind_group_layouts: &'a [BindGroupLayoutId],
}

/// Everything the device needs to build a graphics pipeline.
#[derive(Debug, Clone)]
pub struct RenderPipelineDescriptor<'a> {
    /// An optional debug label.
    pub label: Option<Cow<'a, str>>,
    /// The compiled vertex shader module.
    pub vertex_shader_module: ShaderModuleId,
    /// The compiled geometry shader module, if any.
    pub geometry_shader_module: Option<ShaderModuleId>,
    /// The compiled fragment shader module, if any.
    pub fragment_shader_module: Option<ShaderModuleId>,
    /// The name of the entry point function shared by every stage.
    pub entry_point: Cow<'a, str>,
    /// The layout of the vertex buffers.
    pub vertex_buffers_layout: Cow<'a, [VertexBufferLayoutDescriptor<'a>]>,
    /// The pipeline layout, if any.
    pub layout: Option<PipelineLayoutId>,
    /// The render pass the pipeline is compatible with.
    pub render_pass: Option<RenderPassId>,
    /// The state for primitive assembly and rasterization.
    pub primitive_state: PrimitiveStateDescriptor,
    /// The state for depth and stencil testing. If `None`, these tests are disabled.
    pub depth_stencil_state: Option<DepthStencilStateDescriptor>,
    /// The states of all color targets this pipeline will render to.
    pub color_target_states: Cow<'a, [ColorTargetStateDescriptor]>,
    /// The multisampling state.
    pub multisample_state: MultisampleStateDescriptor,
}

/// Multisampling configuration of a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MultisampleStateDescriptor {
    /// The number of samples per pixel.
    pub count: u32,
    /// A bitmask where each bit corresponds to a sample. `!0` means all samples are affected.
    pub mask: u32,
    /// If `true`, enables alpha-to-coverage.
    pub alpha_to_coverage_enabled: bool,
}

impl Default for MultisampleStateDescriptor {
    fn default() -> Self {
        Self {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        }
    }
}

/// An opaque handle to a compiled render pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RenderPipelineId(pub usize);
