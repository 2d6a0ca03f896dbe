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

//! CPU mirrors of the uniform blocks declared by the generated shaders.
//!
//! Field order and padding follow std140, so each struct can be copied verbatim
//! into its slot.

use bytemuck::{Pod, Zeroable};
use prism_core::math::Mat4;
use prism_core::scene::{TextureUnitId, MAX_BONES_COUNT};

/// Maximum number of texture units a pass can bind.
pub const MAX_TEXTURE_UNITS: usize = 16;

/// Per-object material data (`ModelUbo`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct ModelUboConfiguration {
    /// 1 when shadows are cast onto the object.
    pub shadow_receiver: u32,
    /// Id of the material pass, indexes the pass buffer.
    pub material_index: u32,
    /// Index of the environment map.
    pub env_map_index: u32,
    pub _pad: u32,
}

/// Current and previous world matrices (`ModelMatrixUbo`).
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct ModelMatrixUboConfiguration {
    /// The world matrix of the previous frame, used for motion vectors.
    pub prv_model: Mat4,
    /// The world matrix of the current frame.
    pub cur_model: Mat4,
}

impl ModelMatrixUboConfiguration {
    /// Shifts the current matrix into the previous one, then stores `current`.
    pub fn advance(&mut self, current: Mat4) {
        self.prv_model = self.cur_model;
        self.cur_model = current;
    }
}

/// Billboard quad size (`BillboardUbo`).
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct BillboardUboConfiguration {
    /// Width and height of each quad.
    pub dimensions: [f32; 2],
    pub _pad: [f32; 2],
}

/// Bone matrices (`SkinningUbo`).
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct SkinningUboConfiguration {
    pub bones: [Mat4; MAX_BONES_COUNT],
}

impl SkinningUboConfiguration {
    /// Copies `bones`, truncated to [`MAX_BONES_COUNT`]; remaining bones are reset
    /// to identity.
    pub fn set_bones(&mut self, bones: &[Mat4]) {
        for (i, slot) in self.bones.iter_mut().enumerate() {
            *slot = bones.get(i).copied().unwrap_or(Mat4::IDENTITY);
        }
    }
}

/// Keyframe interpolation factor (`MorphingUbo`).
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct MorphingUboConfiguration {
    pub time: f32,
    pub _pad: [f32; 3],
}

/// Identifiers written by picking passes (`PickingUbo`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct PickingUboConfiguration {
    pub draw_index: u32,
    pub node_index: u32,
    pub _pad: [u32; 2],
}

/// Texture unit ids, packed four per `uvec4` (`TexturesUbo`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct TexturesUboConfiguration {
    pub indices: [[u32; 4]; MAX_TEXTURE_UNITS / 4],
}

impl TexturesUboConfiguration {
    /// Packs `ids` in order; extra ids beyond [`MAX_TEXTURE_UNITS`] are ignored
    /// and unused entries are zeroed.
    pub fn pack(&mut self, ids: impl IntoIterator<Item = TextureUnitId>) {
        *self = Self::zeroed();
        for (i, id) in ids.into_iter().take(MAX_TEXTURE_UNITS).enumerate() {
            self.indices[i / 4][i % 4] = id.0;
        }
    }

    /// The id stored at `unit`.
    pub fn get(&self, unit: usize) -> u32 {
        self.indices[unit / 4][unit % 4]
    }
}

/// Scene-wide parameters (`SceneUbo`).
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct SceneUboConfiguration {
    pub ambient_light: [f32; 4],
    pub background_colour: [f32; 4],
    /// Directional, point and spot light counts in x, y and z.
    pub lights_count: [i32; 4],
    pub camera_position: [f32; 4],
    pub window_size: [i32; 2],
    pub fog_type: i32,
    pub fog_density: f32,
    pub time: f32,
    pub _pad: [f32; 3],
}

/// Camera matrices (`MatrixUbo`).
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct MatrixUboConfiguration {
    pub projection: Mat4,
    pub cur_view: Mat4,
    pub prv_view: Mat4,
    pub inv_projection: Mat4,
    /// Sub-pixel jitter of the projection, in xy.
    pub jitter: [f32; 4],
}

/// One element of an instancing vertex buffer.
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct InstantiationData {
    /// World matrix of the instance.
    pub world: Mat4,
    /// Material index of the instance.
    pub material: u32,
    pub _pad: [u32; 3],
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::size_of;

    #[test]
    fn layouts_are_std140_sized() {
        assert_eq!(size_of::<ModelUboConfiguration>(), 16);
        assert_eq!(size_of::<ModelMatrixUboConfiguration>(), 128);
        assert_eq!(size_of::<BillboardUboConfiguration>(), 16);
        assert_eq!(size_of::<SkinningUboConfiguration>(), 64 * MAX_BONES_COUNT);
        assert_eq!(size_of::<PickingUboConfiguration>(), 16);
        assert_eq!(size_of::<TexturesUboConfiguration>(), 64);
        assert_eq!(size_of::<SceneUboConfiguration>(), 96);
        assert_eq!(size_of::<MatrixUboConfiguration>(), 272);
        assert_eq!(size_of::<InstantiationData>(), 80);
    }

    #[test]
    fn texture_ids_are_packed_four_per_vector() {
        let mut textures = TexturesUboConfiguration::zeroed();
        textures.pack((1..=6).map(TextureUnitId));
        assert_eq!(textures.indices[0], [1, 2, 3, 4]);
        assert_eq!(textures.indices[1], [5, 6, 0, 0]);
        assert_eq!(textures.get(5), 6);

        textures.pack([TextureUnitId(9)]);
        assert_eq!(textures.indices[1], [0; 4]);
    }

    #[test]
    fn model_matrix_keeps_previous_frame() {
        let mut matrices = ModelMatrixUboConfiguration::zeroed();
        let a = Mat4::from_rotation_y(0.5);
        let b = Mat4::from_rotation_y(1.0);
        matrices.advance(a);
        matrices.advance(b);
        assert_eq!(matrices.prv_model, a);
        assert_eq!(matrices.cur_model, b);
    }

    #[test]
    fn missing_bones_are_identity() {
        let mut skinning = SkinningUboConfiguration::zeroed();
        skinning.set_bones(&[Mat4::from_rotation_y(0.3)]);
        assert_eq!(skinning.bones[0], Mat4::from_rotation_y(0.3));
        assert_eq!(skinning.bones[1], Mat4::IDENTITY);
    }
}
