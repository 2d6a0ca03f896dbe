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

//! Vertex buffer layouts matching the attributes the vertex shaders declare.

use prism_core::renderer::api::{
    VertexAttributeDescriptor, VertexBufferLayoutDescriptor, VertexFormat, VertexStepMode,
};
use prism_core::renderer::flags::ProgramFlags;
use prism_shader::bindings::location;
use std::borrow::Cow;

const fn attribute(
    shader_location: u32,
    format: VertexFormat,
    offset: u64,
) -> VertexAttributeDescriptor {
    VertexAttributeDescriptor {
        shader_location,
        format,
        offset,
    }
}

const MESH_ATTRIBUTES: [VertexAttributeDescriptor; 4] = [
    attribute(location::POSITION, VertexFormat::Float32x3, 0),
    attribute(location::NORMAL, VertexFormat::Float32x3, 12),
    attribute(location::TANGENT, VertexFormat::Float32x3, 24),
    attribute(location::TEXTURE, VertexFormat::Float32x3, 36),
];

const BONE_ATTRIBUTES: [VertexAttributeDescriptor; 4] = [
    attribute(location::BONE_IDS0, VertexFormat::Sint32x4, 0),
    attribute(location::BONE_IDS1, VertexFormat::Sint32x4, 16),
    attribute(location::WEIGHTS0, VertexFormat::Float32x4, 32),
    attribute(location::WEIGHTS1, VertexFormat::Float32x4, 48),
];

const MORPH_ATTRIBUTES: [VertexAttributeDescriptor; 4] = [
    attribute(location::POSITION2, VertexFormat::Float32x3, 0),
    attribute(location::NORMAL2, VertexFormat::Float32x3, 12),
    attribute(location::TANGENT2, VertexFormat::Float32x3, 24),
    attribute(location::TEXTURE2, VertexFormat::Float32x3, 36),
];

// Matches the layout of `InstantiationData`.
const INSTANCE_ATTRIBUTES: [VertexAttributeDescriptor; 5] = [
    attribute(location::TRANSFORM, VertexFormat::Float32x4, 0),
    attribute(location::TRANSFORM + 1, VertexFormat::Float32x4, 16),
    attribute(location::TRANSFORM + 2, VertexFormat::Float32x4, 32),
    attribute(location::TRANSFORM + 3, VertexFormat::Float32x4, 48),
    attribute(location::MATERIAL, VertexFormat::Sint32, 64),
];

const BILLBOARD_ATTRIBUTES: [VertexAttributeDescriptor; 2] = [
    attribute(location::POSITION, VertexFormat::Float32x3, 0),
    attribute(location::TEXTURE, VertexFormat::Float32x3, 12),
];

const CENTER_ATTRIBUTES: [VertexAttributeDescriptor; 1] =
    [attribute(location::CENTER, VertexFormat::Float32x3, 0)];

fn layout(
    array_stride: u64,
    step_mode: VertexStepMode,
    attributes: &'static [VertexAttributeDescriptor],
) -> VertexBufferLayoutDescriptor<'static> {
    VertexBufferLayoutDescriptor {
        array_stride,
        step_mode,
        attributes: Cow::Borrowed(attributes),
    }
}

/// The vertex buffers a program reads, in binding order.
///
/// Meshes bind their base attributes, then bones, morph targets and instance
/// data as their flags require. Billboards bind a quad and one centre per
/// instance.
pub fn vertex_layouts(program_flags: ProgramFlags) -> Vec<VertexBufferLayoutDescriptor<'static>> {
    if program_flags.contains(ProgramFlags::BILLBOARDS) {
        return vec![
            layout(24, VertexStepMode::Vertex, &BILLBOARD_ATTRIBUTES),
            layout(12, VertexStepMode::Instance, &CENTER_ATTRIBUTES),
        ];
    }

    let mut layouts = vec![layout(48, VertexStepMode::Vertex, &MESH_ATTRIBUTES)];
    if program_flags.contains(ProgramFlags::SKINNING) {
        layouts.push(layout(64, VertexStepMode::Vertex, &BONE_ATTRIBUTES));
    }
    if program_flags.contains(ProgramFlags::MORPHING) {
        layouts.push(layout(48, VertexStepMode::Vertex, &MORPH_ATTRIBUTES));
    }
    if program_flags.contains(ProgramFlags::INSTANTIATION) {
        layouts.push(layout(80, VertexStepMode::Instance, &INSTANCE_ATTRIBUTES));
    }
    layouts
}

#[cfg(test)]
mod tests {
    use super::*;
    use prism_data::ubo::InstantiationData;
    use std::mem::size_of;

    fn locations(layouts: &[VertexBufferLayoutDescriptor]) -> Vec<u32> {
        layouts
            .iter()
            .flat_map(|l| l.attributes.iter().map(|a| a.shader_location))
            .collect()
    }

    #[test]
    fn test_strides_cover_attributes() {
        let all = ProgramFlags::SKINNING | ProgramFlags::MORPHING | ProgramFlags::INSTANTIATION;
        for layout in vertex_layouts(all) {
            let end = layout
                .attributes
                .iter()
                .map(|a| a.offset + a.format.size() as u64)
                .max()
                .unwrap_or(0);
            assert!(end <= layout.array_stride);
        }
    }

    #[test]
    fn test_instance_stride_matches_instantiation_data() {
        let layouts = vertex_layouts(ProgramFlags::INSTANTIATION);
        assert_eq!(layouts.len(), 2);
        assert_eq!(layouts[1].step_mode, VertexStepMode::Instance);
        assert_eq!(layouts[1].array_stride, size_of::<InstantiationData>() as u64);
        assert_eq!(locations(&layouts[1..]), vec![8, 9, 10, 11, 12]);
    }

    #[test]
    fn test_billboards_read_their_centre_per_instance() {
        let layouts = vertex_layouts(ProgramFlags::BILLBOARDS | ProgramFlags::INSTANTIATION);
        assert_eq!(locations(&layouts), vec![0, 3, location::CENTER]);
        assert_eq!(layouts[1].step_mode, VertexStepMode::Instance);
    }
}
