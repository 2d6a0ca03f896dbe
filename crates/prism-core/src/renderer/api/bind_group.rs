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

//! Descriptor set layouts and descriptor sets.
//!
//! A [`BindGroupLayoutDescriptor`] lists the bindings a pipeline expects; a
//! [`BindGroupDescriptor`] writes one resource per binding of that layout.
//! Render passes only use buffer and combined image sampler bindings.

use super::buffer::BufferId;
use super::stage_flags::ShaderStageFlags;
use super::texture::{SamplerId, TextureViewId};
use std::num::NonZeroU64;

/// Handle to a descriptor set layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindGroupLayoutId(pub usize);

/// Handle to an allocated descriptor set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindGroupId(pub usize);

/// One binding of a descriptor set layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindGroupLayoutEntry {
    /// `layout(binding = N)` in GLSL.
    pub binding: u32,
    /// Stages reading the binding.
    pub visibility: ShaderStageFlags,
    /// Resource kind expected at the binding.
    pub ty: BindingType,
}

impl BindGroupLayoutEntry {
    fn buffer(binding: u32, visibility: ShaderStageFlags, ty: BufferBindingType) -> Self {
        Self {
            binding,
            visibility,
            ty: BindingType::Buffer(ty),
        }
    }

    /// A uniform block.
    pub fn uniform(binding: u32, visibility: ShaderStageFlags) -> Self {
        Self::buffer(binding, visibility, BufferBindingType::Uniform)
    }

    /// A shader storage block.
    pub fn storage(binding: u32, visibility: ShaderStageFlags, read_only: bool) -> Self {
        Self::buffer(binding, visibility, BufferBindingType::Storage { read_only })
    }

    /// A `samplerBuffer`, read with `texelFetch`.
    pub fn texel_buffer(binding: u32, visibility: ShaderStageFlags) -> Self {
        Self::buffer(binding, visibility, BufferBindingType::UniformTexel)
    }

    /// A `sampler2D`, `samplerCube`...
    pub fn combined_sampler(
        binding: u32,
        visibility: ShaderStageFlags,
        view_dimension: TextureViewDimension,
        sample_type: TextureSampleType,
    ) -> Self {
        Self {
            binding,
            visibility,
            ty: BindingType::CombinedTextureSampler {
                sample_type,
                view_dimension,
            },
        }
    }
}

/// How a buffer binding is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferBindingType {
    /// `uniform` block.
    Uniform,
    /// `buffer` block.
    Storage {
        /// Declared `readonly` in the shader.
        read_only: bool,
    },
    /// Texel buffer.
    UniformTexel,
}

/// Dimension of a sampled view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureViewDimension {
    /// `sampler2D`.
    D2,
    /// `samplerCube`.
    Cube,
}

/// Component type returned by sampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureSampleType {
    /// Floating-point texels.
    Float {
        /// Whether linear filtering may be used.
        filterable: bool,
    },
}

/// The resource kind expected at a binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingType {
    /// A buffer range.
    Buffer(BufferBindingType),
    /// A texture and its sampler bound together.
    CombinedTextureSampler {
        /// Sampled component type.
        sample_type: TextureSampleType,
        /// Sampled view dimension.
        view_dimension: TextureViewDimension,
    },
}

/// Describes a descriptor set layout to be created.
#[derive(Debug, Clone)]
pub struct BindGroupLayoutDescriptor<'a> {
    /// Debug label.
    pub label: Option<&'a str>,
    /// Bindings in declaration order.
    pub entries: &'a [BindGroupLayoutEntry],
}

/// A range of a buffer bound to a descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferBinding {
    /// Bound buffer.
    pub buffer: BufferId,
    /// Offset into the buffer, in bytes.
    pub offset: u64,
    /// Size of the range, `None` meaning up to the end of the buffer.
    pub size: Option<NonZeroU64>,
}

/// The resource written at one binding of a descriptor set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingResource {
    /// A buffer range.
    Buffer(BufferBinding),
    /// A sampled view.
    CombinedTextureSampler {
        /// The view read by the shader.
        view: TextureViewId,
        /// The sampler applied to it.
        sampler: SamplerId,
    },
}

/// Describes a descriptor set to be allocated and written.
#[derive(Debug, Clone)]
pub struct BindGroupDescriptor<'a> {
    /// Debug label.
    pub label: Option<&'a str>,
    /// Layout the set is allocated from.
    pub layout: BindGroupLayoutId,
    /// One write per binding, in layout order.
    pub entries: &'a [BindGroupEntry],
}

/// One write of a descriptor set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindGroupEntry {
    /// Written binding.
    pub binding: u32,
    /// Resource written to it.
    pub resource: BindingResource,
}

impl BindGroupEntry {
    /// Binds a buffer range.
    pub fn buffer(binding: u32, buffer: BufferBinding) -> Self {
        Self {
            binding,
            resource: BindingResource::Buffer(buffer),
        }
    }

    /// Binds a texture view with the sampler used to read it.
    pub fn combined_sampler(binding: u32, view: TextureViewId, sampler: SamplerId) -> Self {
        Self {
            binding,
            resource: BindingResource::CombinedTextureSampler { view, sampler },
        }
    }
}
