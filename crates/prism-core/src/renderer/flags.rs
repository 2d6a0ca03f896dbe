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

//! The bitsets and modes that jointly select a shader and pipeline variant.
//!
//! Every type here takes part in pipeline cache keys, so all of them are
//! totally ordered and hashable.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Vertex-stage capabilities of a program.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
    pub struct ProgramFlags: u32 {
        /// Vertices are blended by bone matrices.
        const SKINNING = 1 << 0;
        /// Vertices are interpolated between two keyframes.
        const MORPHING = 1 << 1;
        /// Per-instance transforms come from a vertex buffer.
        const INSTANTIATION = 1 << 2;
        /// Geometry is expanded into camera-facing quads.
        const BILLBOARDS = 1 << 3;
        /// Billboards face the camera on every axis (cylindrical otherwise).
        const SPHERICAL_BILLBOARDS = 1 << 4;
        /// Billboards keep a constant size on screen.
        const FIXED_SIZE = 1 << 5;
        /// The program writes object identifiers for picking.
        const PICKING = 1 << 6;
        /// The program reads the light buffer.
        const LIGHTING = 1 << 7;
        /// Normals are flipped, used when rendering back faces.
        const INVERT_NORMALS = 1 << 8;
        /// The program only writes depth.
        const DEPTH_PASS = 1 << 9;
        /// The program renders a directional light shadow map.
        const SHADOW_MAP_DIRECTIONAL = 1 << 10;
        /// The program renders a spot light shadow map.
        const SHADOW_MAP_SPOT = 1 << 11;
        /// The program renders a point light shadow map.
        const SHADOW_MAP_POINT = 1 << 12;
        /// The program samples an environment map.
        const ENVIRONMENT_MAPPING = 1 << 13;
    }
}

impl ProgramFlags {
    /// Every shadow map generation flag.
    pub const SHADOW_MAP_ANY: Self = Self::SHADOW_MAP_DIRECTIONAL
        .union(Self::SHADOW_MAP_SPOT)
        .union(Self::SHADOW_MAP_POINT);

    /// Returns `true` when the program renders any kind of shadow map.
    pub fn is_shadow_map_program(self) -> bool {
        self.intersects(Self::SHADOW_MAP_ANY)
    }
}

bitflags! {
    /// Material-pass capabilities.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
    pub struct PassFlags: u32 {
        /// The pass is rendered with alpha blending.
        const ALPHA_BLENDING = 1 << 0;
        /// Fragments are discarded by the alpha compare function.
        const ALPHA_TEST = 1 << 1;
        /// Metallic/roughness physically based shading.
        const PBR_METALLIC_ROUGHNESS = 1 << 2;
        /// Specular/glossiness physically based shading.
        const PBR_SPECULAR_GLOSSINESS = 1 << 3;
        /// The pass is lit.
        const LIGHTING = 1 << 4;
        /// The pass reflects its environment.
        const REFLECTION = 1 << 5;
        /// The pass refracts its environment.
        const REFRACTION = 1 << 6;
        /// The height map is used for parallax occlusion mapping.
        const PARALLAX_OCCLUSION_MAPPING = 1 << 7;
        /// The pass uses subsurface scattering.
        const SUBSURFACE_SCATTERING = 1 << 8;
        /// Objects drawn with this pass can be picked.
        const PICKABLE = 1 << 9;
    }
}

impl PassFlags {
    /// Returns `true` when the pass requires alpha blending.
    pub fn has_alpha_blending(self) -> bool {
        self.contains(Self::ALPHA_BLENDING)
    }
}

bitflags! {
    /// The semantic of a texture unit.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
    pub struct TextureChannels: u32 {
        /// Diffuse, or albedo for physically based passes.
        const DIFFUSE = 1 << 0;
        /// Tangent space normal map.
        const NORMAL = 1 << 1;
        /// Opacity map.
        const OPACITY = 1 << 2;
        /// Specular, or metallic for metallic/roughness passes.
        const SPECULAR = 1 << 3;
        /// Height map.
        const HEIGHT = 1 << 4;
        /// Glossiness, or roughness for metallic/roughness passes.
        const GLOSS = 1 << 5;
        /// Emissive map.
        const EMISSIVE = 1 << 6;
        /// Reflection mask.
        const REFLECTION = 1 << 7;
        /// Refraction mask.
        const REFRACTION = 1 << 8;
        /// Ambient occlusion map.
        const AMBIENT_OCCLUSION = 1 << 9;
        /// Transmittance map.
        const TRANSMITTANCE = 1 << 10;
    }
}

impl TextureChannels {
    /// Albedo is stored in the diffuse channel.
    pub const ALBEDO: Self = Self::DIFFUSE;
    /// Metalness is stored in the specular channel.
    pub const METALLIC: Self = Self::SPECULAR;
    /// Roughness is stored in the gloss channel.
    pub const ROUGHNESS: Self = Self::GLOSS;
}

bitflags! {
    /// Scene-wide toggles.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
    pub struct SceneFlags: u32 {
        /// Linear fog.
        const FOG_LINEAR = 1 << 0;
        /// Exponential fog.
        const FOG_EXPONENTIAL = 1 << 1;
        /// Squared exponential fog.
        const FOG_SQUARED_EXPONENTIAL = 1 << 2;
        /// Shadow maps are read without filtering.
        const SHADOW_FILTER_RAW = 1 << 3;
        /// Shadow maps are read with percentage closer filtering.
        const SHADOW_FILTER_PCF = 1 << 4;
        /// Shadow maps store moments for variance filtering.
        const SHADOW_FILTER_VARIANCE = 1 << 5;
        /// At least one directional light casts shadows.
        const SHADOW_DIRECTIONAL = 1 << 6;
        /// At least one point light casts shadows.
        const SHADOW_POINT = 1 << 7;
        /// At least one spot light casts shadows.
        const SHADOW_SPOT = 1 << 8;
    }
}

impl SceneFlags {
    /// Every shadow casting light type.
    pub const SHADOW_ANY: Self = Self::SHADOW_DIRECTIONAL
        .union(Self::SHADOW_POINT)
        .union(Self::SHADOW_SPOT);
    /// Every fog type.
    pub const FOG_ANY: Self = Self::FOG_LINEAR
        .union(Self::FOG_EXPONENTIAL)
        .union(Self::FOG_SQUARED_EXPONENTIAL);

    /// The shadow filtering selected by these flags.
    pub fn shadow_type(self) -> ShadowType {
        if self.contains(Self::SHADOW_FILTER_VARIANCE) {
            ShadowType::Variance
        } else if self.contains(Self::SHADOW_FILTER_PCF) {
            ShadowType::Pcf
        } else if self.contains(Self::SHADOW_FILTER_RAW) {
            ShadowType::Raw
        } else {
            ShadowType::None
        }
    }
}

/// How a colour or alpha channel is combined with what is already in the target.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum BlendMode {
    /// The source overwrites the destination.
    #[default]
    NoBlend,
    /// Source and destination are summed.
    Additive,
    /// The destination is attenuated by the source.
    Multiplicative,
    /// Source and destination are interpolated.
    Interpolative,
    /// Order independent transparency through an A-buffer.
    ABuffer,
    /// Order independent transparency through depth peeling.
    DepthPeeling,
}

/// The filtering applied when sampling shadow maps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShadowType {
    /// Shadows are disabled.
    #[default]
    None,
    /// A single depth comparison.
    Raw,
    /// Percentage closer filtering.
    Pcf,
    /// Variance shadow maps.
    Variance,
}

impl ShadowType {
    /// The scene flag selecting this filtering.
    pub fn scene_flag(self) -> SceneFlags {
        match self {
            ShadowType::None => SceneFlags::empty(),
            ShadowType::Raw => SceneFlags::SHADOW_FILTER_RAW,
            ShadowType::Pcf => SceneFlags::SHADOW_FILTER_PCF,
            ShadowType::Variance => SceneFlags::SHADOW_FILTER_VARIANCE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shadow_map_programs_are_detected() {
        assert!(!ProgramFlags::BILLBOARDS.is_shadow_map_program());
        assert!((ProgramFlags::BILLBOARDS | ProgramFlags::SHADOW_MAP_SPOT).is_shadow_map_program());
        assert!(ProgramFlags::SHADOW_MAP_ANY.contains(ProgramFlags::SHADOW_MAP_POINT));
    }

    #[test]
    fn shadow_type_round_trips_through_scene_flags() {
        for ty in [
            ShadowType::None,
            ShadowType::Raw,
            ShadowType::Pcf,
            ShadowType::Variance,
        ] {
            assert_eq!((ty.scene_flag() | SceneFlags::FOG_LINEAR).shadow_type(), ty);
        }
    }

    #[test]
    fn blend_modes_are_ordered_by_declaration() {
        assert!(BlendMode::NoBlend < BlendMode::Additive);
        assert!(BlendMode::Interpolative < BlendMode::DepthPeeling);
        assert_eq!(BlendMode::default(), BlendMode::NoBlend);
    }
}
