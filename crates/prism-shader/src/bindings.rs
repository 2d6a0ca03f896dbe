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

//! Binding points and vertex attribute locations shared by the generated GLSL
//! and the descriptor-set layouts built by render passes.
//!
//! Binding numbers are fixed per resource; a layout only contains the bindings
//! its flags need, in increasing binding order.

/// Descriptor set holding buffers.
pub const UBO_SET: u32 = 0;
/// Descriptor set holding the material textures then the shadow maps.
pub const TEXTURE_SET: u32 = 1;
/// First texture binding of [`TEXTURE_SET`].
pub const MIN_TEXTURE_INDEX: u32 = 0;

/// Materials storage buffer.
pub const PASS_BUFFER_BINDING: u32 = 0;
/// Texture configurations storage buffer, bound when the pass has textures.
pub const TEXTURE_BUFFER_BINDING: u32 = 1;
/// Lights texel buffer.
pub const LIGHT_BUFFER_BINDING: u32 = 2;
/// Camera matrices.
pub const MATRIX_UBO_BINDING: u32 = 3;
/// Scene-wide data.
pub const SCENE_UBO_BINDING: u32 = 4;
/// Current and previous model matrices.
pub const MODEL_MATRIX_UBO_BINDING: u32 = 5;
/// Per-object model data.
pub const MODEL_UBO_BINDING: u32 = 6;
/// Packed texture unit ids.
pub const TEXTURES_UBO_BINDING: u32 = 7;
/// Bone matrices, or the instanced bones storage buffer.
pub const SKINNING_UBO_BINDING: u32 = 8;
/// Keyframe interpolation factor.
pub const MORPHING_UBO_BINDING: u32 = 9;
/// Picking indices.
pub const PICKING_UBO_BINDING: u32 = 10;
/// Billboard dimensions.
pub const BILLBOARD_UBO_BINDING: u32 = 11;

/// Number of texels describing one light in the lights buffer.
pub const MAX_LIGHT_COMPONENTS: i32 = 14;
/// Texels shared by every light kind (colour, intensity).
pub const BASE_LIGHT_COMPONENTS: i32 = 2;

/// Maximum number of bones per skinned object.
pub const MAX_BONES_COUNT: u32 = prism_core::scene::MAX_BONES_COUNT as u32;
/// Capacity of the textures UBO, in texture units.
pub const MAX_TEXTURE_UNITS: u32 = 16;

/// Vertex attribute locations.
pub mod location {
    /// Object-space position.
    pub const POSITION: u32 = 0;
    /// Object-space normal.
    pub const NORMAL: u32 = 1;
    /// Object-space tangent.
    pub const TANGENT: u32 = 2;
    /// Texture coordinates.
    pub const TEXTURE: u32 = 3;
    /// First four bone indices.
    pub const BONE_IDS0: u32 = 4;
    /// Last four bone indices.
    pub const BONE_IDS1: u32 = 5;
    /// First four bone weights.
    pub const WEIGHTS0: u32 = 6;
    /// Last four bone weights.
    pub const WEIGHTS1: u32 = 7;
    /// Per-instance world matrix, four consecutive locations.
    pub const TRANSFORM: u32 = 8;
    /// Per-instance material index.
    pub const MATERIAL: u32 = 12;
    /// Morph target position.
    pub const POSITION2: u32 = 13;
    /// Morph target normal.
    pub const NORMAL2: u32 = 14;
    /// Morph target tangent.
    pub const TANGENT2: u32 = 15;
    /// Morph target texture coordinates.
    pub const TEXTURE2: u32 = 16;
    /// Per-instance billboard centre.
    pub const CENTER: u32 = 17;
}

/// Binding of the `index`-th material texture.
pub const fn texture_binding(index: u32) -> u32 {
    MIN_TEXTURE_INDEX + index
}

/// Bindings of the shadow maps, which follow the material textures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShadowMapBindings {
    /// Directional shadow map.
    pub directional: u32,
    /// Point shadow cube map.
    pub point: u32,
    /// Spot shadow map.
    pub spot: u32,
}

impl ShadowMapBindings {
    /// Shadow map bindings for a pass using `texture_count` textures.
    pub const fn after_textures(texture_count: u32) -> Self {
        let first = texture_binding(texture_count);
        Self {
            directional: first,
            point: first + 1,
            spot: first + 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_bindings_are_distinct_and_ordered() {
        let bindings = [
            PASS_BUFFER_BINDING,
            TEXTURE_BUFFER_BINDING,
            LIGHT_BUFFER_BINDING,
            MATRIX_UBO_BINDING,
            SCENE_UBO_BINDING,
            MODEL_MATRIX_UBO_BINDING,
            MODEL_UBO_BINDING,
            TEXTURES_UBO_BINDING,
            SKINNING_UBO_BINDING,
            MORPHING_UBO_BINDING,
            PICKING_UBO_BINDING,
            BILLBOARD_UBO_BINDING,
        ];
        assert!(bindings.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn shadow_maps_follow_textures() {
        let shadows = ShadowMapBindings::after_textures(3);
        assert_eq!(shadows.directional, 3);
        assert_eq!(shadows.spot, 5);
    }
}
