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

//! Fixed-function state of a graphics pipeline: vertex fetch, rasterisation,
//! depth test and colour blending.

use super::enums::*;
use crate::renderer::api::texture::TextureFormat;
use bitflags::bitflags;
use std::borrow::Cow;

/// One attribute read from a vertex buffer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VertexAttributeDescriptor {
    /// `layout(location = N)` of the matching vertex shader input.
    pub shader_location: u32,
    /// Element format.
    pub format: VertexFormat,
    /// Byte offset inside one buffer element.
    pub offset: u64,
}

/// A vertex buffer as the vertex stage reads it.
///
/// Instancing buffers use [`VertexStepMode::Instance`] and carry one world
/// matrix plus a material index per element.
#[derive(Debug, Clone, PartialEq)]
pub struct VertexBufferLayoutDescriptor<'a> {
    /// Bytes between two consecutive elements.
    pub array_stride: u64,
    /// Per-vertex or per-instance advance.
    pub step_mode: VertexStepMode,
    /// The attributes of one element.
    pub attributes: Cow<'a, [VertexAttributeDescriptor]>,
}

/// Primitive assembly and rasterisation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PrimitiveStateDescriptor {
    /// How vertices are assembled.
    pub topology: PrimitiveTopology,
    /// Winding of front faces.
    pub front_face: FrontFace,
    /// Culled faces, `None` to draw both.
    pub cull_mode: Option<CullMode>,
    /// Fill or wireframe.
    pub polygon_mode: PolygonMode,
    /// Disables depth clipping.
    pub unclipped_depth: bool,
}

impl PrimitiveStateDescriptor {
    /// Filled, counter-clockwise `topology` with `cull_mode` faces discarded.
    pub const fn culling(topology: PrimitiveTopology, cull_mode: CullMode) -> Self {
        Self {
            topology,
            front_face: FrontFace::Ccw,
            cull_mode: Some(cull_mode),
            polygon_mode: PolygonMode::Fill,
            unclipped_depth: false,
        }
    }
}

impl Default for PrimitiveStateDescriptor {
    fn default() -> Self {
        Self {
            cull_mode: None,
            ..Self::culling(PrimitiveTopology::TriangleList, CullMode::Back)
        }
    }
}

/// Depth offset applied while rasterising, against shadow acne.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DepthBiasState {
    /// Constant offset, in depth units.
    pub constant: i32,
    /// Offset scaled by the depth slope of the fragment.
    pub slope_scale: f32,
    /// Largest offset applied, `0.0` for no clamp.
    pub clamp: f32,
}

/// Depth test of a pipeline. Render passes never use the stencil buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct DepthStencilStateDescriptor {
    /// Format of the depth attachment.
    pub format: TextureFormat,
    /// Whether passing fragments write their depth.
    pub depth_write_enabled: bool,
    /// The depth test.
    pub depth_compare: CompareFunction,
    /// Rasterisation depth offset.
    pub bias: DepthBiasState,
}

impl DepthStencilStateDescriptor {
    /// A depth test without bias.
    pub fn depth(format: TextureFormat, write: bool, compare: CompareFunction) -> Self {
        Self {
            format,
            depth_write_enabled: write,
            depth_compare: compare,
            bias: DepthBiasState::default(),
        }
    }

    /// The same test with a depth offset.
    pub fn with_bias(mut self, bias: DepthBiasState) -> Self {
        self.bias = bias;
        self
    }
}

/// `src * src_factor (operation) dst * dst_factor` for one channel group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlendComponentDescriptor {
    /// Weight of the fragment output.
    pub src_factor: BlendFactor,
    /// Weight of the attachment content.
    pub dst_factor: BlendFactor,
    /// How both weighted terms combine.
    pub operation: BlendOperation,
}

impl BlendComponentDescriptor {
    /// An additive equation with the given factors.
    pub const fn add(src_factor: BlendFactor, dst_factor: BlendFactor) -> Self {
        Self {
            src_factor,
            dst_factor,
            operation: BlendOperation::Add,
        }
    }
}

/// Colour and alpha equations of one target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlendStateDescriptor {
    /// RGB equation.
    pub color: BlendComponentDescriptor,
    /// Alpha equation.
    pub alpha: BlendComponentDescriptor,
}

bitflags! {
    /// Channels of a colour target that are written.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ColorWrites: u8 {
        /// Red.
        const R = 1 << 0;
        /// Green.
        const G = 1 << 1;
        /// Blue.
        const B = 1 << 2;
        /// Alpha.
        const A = 1 << 3;
        /// Every channel.
        const ALL = Self::R.bits() | Self::G.bits() | Self::B.bits() | Self::A.bits();
    }
}

/// One colour attachment of a pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColorTargetStateDescriptor {
    /// Attachment format.
    pub format: TextureFormat,
    /// Blending, `None` to overwrite.
    pub blend: Option<BlendStateDescriptor>,
    /// Written channels.
    pub write_mask: ColorWrites,
}

impl ColorTargetStateDescriptor {
    /// A target writing every channel of `format`.
    pub fn new(format: TextureFormat, blend: Option<BlendStateDescriptor>) -> Self {
        Self {
            format,
            blend,
            write_mask: ColorWrites::ALL,
        }
    }
}
