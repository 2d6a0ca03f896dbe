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

//! What a render pass draws: the flags it forces on its pipelines, its
//! attachments and the shaders of each stage.

use super::config::RenderPassConfig;
use super::pipeline_flags::PipelineFlags;
use prism_core::renderer::api::{
    CompareFunction, DepthBiasState, DepthStencilStateDescriptor, TextureFormat,
};
use prism_core::renderer::flags::{ProgramFlags, TextureChannels};
use prism_shader::{
    depth_pixel_shader, geometry_shader, pixel_shader, vertex_shader, LightingModel,
};
use std::fmt::Debug;

/// Depth offset of shadow map programs.
pub const SHADOW_MAP_BIAS: DepthBiasState = DepthBiasState {
    constant: 2,
    slope_scale: 1.75,
    clamp: 0.0,
};

/// A rendering strategy plugged into a [`super::RenderPass`].
///
/// `update_flags` is applied to every key before it is built or looked up,
/// it must therefore be idempotent.
pub trait RenderTechnique: Send + Sync + Debug + 'static {
    /// Identifier of the technique, used in labels.
    fn name(&self) -> &'static str;

    /// Adds the flags forced by the technique.
    fn update_flags(&self, flags: &mut PipelineFlags);

    /// Formats of the colour attachments, in location order.
    fn colour_formats(&self, config: &RenderPassConfig) -> Vec<TextureFormat>;

    /// Depth test of the pipelines of `flags`.
    fn depth_stencil_state(
        &self,
        config: &RenderPassConfig,
        flags: &PipelineFlags,
    ) -> Option<DepthStencilStateDescriptor>;

    /// Vertex stage source.
    fn vertex_shader_source(&self, flags: &PipelineFlags) -> String {
        vertex_shader(&flags.shader_options())
    }

    /// Geometry stage source, if the technique uses one.
    fn geometry_shader_source(&self, flags: &PipelineFlags) -> Option<String> {
        geometry_shader(&flags.shader_options())
    }

    /// Fragment stage source; `lighting` is only given to lit pipelines.
    fn pixel_shader_source(
        &self,
        flags: &PipelineFlags,
        lighting: Option<&dyn LightingModel>,
    ) -> String {
        pixel_shader(&flags.shader_options(), lighting)
    }
}

/// Lit forward shading, optionally writing picking ids to a second target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ForwardTechnique {
    /// Adds the picking attachment.
    pub picking: bool,
}

impl ForwardTechnique {
    /// A technique without picking.
    pub fn new() -> Self {
        Self::default()
    }

    /// A technique writing picking ids.
    pub fn with_picking() -> Self {
        Self { picking: true }
    }
}

impl RenderTechnique for ForwardTechnique {
    fn name(&self) -> &'static str {
        "Forward"
    }

    fn update_flags(&self, flags: &mut PipelineFlags) {
        flags.program_flags |= ProgramFlags::LIGHTING;
        if self.picking {
            flags.program_flags |= ProgramFlags::PICKING;
        }
    }

    fn colour_formats(&self, config: &RenderPassConfig) -> Vec<TextureFormat> {
        let mut formats = vec![config.colour_format];
        if self.picking {
            formats.push(TextureFormat::Rgba32Uint);
        }
        formats
    }

    fn depth_stencil_state(
        &self,
        config: &RenderPassConfig,
        _flags: &PipelineFlags,
    ) -> Option<DepthStencilStateDescriptor> {
        // Blended geometry is tested against the depth but never occludes.
        config.depth_format.map(|format| {
            DepthStencilStateDescriptor::depth(format, config.opaque, CompareFunction::LessEqual)
        })
    }
}

/// Depth-only rendering, for depth pre-passes and shadow maps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DepthTechnique {
    /// Shadow map flag of the rendered light kind, empty for a depth pre-pass.
    pub shadow_map: ProgramFlags,
}

impl DepthTechnique {
    /// A depth pre-pass.
    pub fn new() -> Self {
        Self::default()
    }

    /// A shadow map pass; `shadow_map` must be one of the shadow map flags.
    pub fn shadow_map(shadow_map: ProgramFlags) -> Self {
        assert!(
            shadow_map.is_shadow_map_program() && ProgramFlags::SHADOW_MAP_ANY.contains(shadow_map),
            "{shadow_map:?} is not a shadow map program"
        );
        Self { shadow_map }
    }
}

impl RenderTechnique for DepthTechnique {
    fn name(&self) -> &'static str {
        if self.shadow_map.is_empty() {
            "Depth"
        } else {
            "ShadowMap"
        }
    }

    fn update_flags(&self, flags: &mut PipelineFlags) {
        flags.program_flags |= ProgramFlags::DEPTH_PASS | self.shadow_map;
        flags.program_flags -= ProgramFlags::LIGHTING | ProgramFlags::PICKING;
        // Only opacity is sampled, by the alpha test.
        flags.texture_flags &= TextureChannels::OPACITY;
        let options = flags.shader_options();
        flags.texture_count = options.texture_count();
        flags.height_map_index = options.texture_index(TextureChannels::HEIGHT);
    }

    fn colour_formats(&self, _config: &RenderPassConfig) -> Vec<TextureFormat> {
        if self.shadow_map.is_empty() {
            Vec::new()
        } else {
            vec![TextureFormat::Rgba32Float]
        }
    }

    fn depth_stencil_state(
        &self,
        config: &RenderPassConfig,
        _flags: &PipelineFlags,
    ) -> Option<DepthStencilStateDescriptor> {
        let state = config
            .depth_format
            .map(|format| DepthStencilStateDescriptor::depth(format, true, CompareFunction::Less));
        if self.shadow_map.is_empty() {
            state
        } else {
            state.map(|state| state.with_bias(SHADOW_MAP_BIAS))
        }
    }

    fn pixel_shader_source(
        &self,
        flags: &PipelineFlags,
        _lighting: Option<&dyn LightingModel>,
    ) -> String {
        depth_pixel_shader(&flags.shader_options())
    }
}
