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

//! The cache key of render pipelines.

use prism_core::renderer::api::{CompareFunction, PrimitiveTopology};
use prism_core::renderer::flags::{
    BlendMode, PassFlags, ProgramFlags, SceneFlags, TextureChannels,
};
use prism_core::scene::MaterialPass;
use prism_shader::ShaderOptions;

/// Everything that selects one pipeline variant.
///
/// The derived ordering follows the field order, so two keys that only differ
/// in their alpha function sort far apart while keys sharing a material setup
/// stay adjacent in the caches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct PipelineFlags {
    /// Alpha test function.
    pub alpha_func: CompareFunction,
    /// Primitive assembly.
    pub topology: PrimitiveTopology,
    /// Blending of the colour channels.
    pub colour_blend_mode: BlendMode,
    /// Blending of the alpha channel.
    pub alpha_blend_mode: BlendMode,
    /// Channels with a bound texture.
    pub texture_flags: TextureChannels,
    /// Vertex-stage capabilities.
    pub program_flags: ProgramFlags,
    /// Material pass capabilities.
    pub pass_flags: PassFlags,
    /// Fog and shadow toggles.
    pub scene_flags: SceneFlags,
    /// Number of texture units of the pass.
    pub texture_count: u32,
    /// Position of the height map among the texture units.
    pub height_map_index: Option<u32>,
}

impl PipelineFlags {
    /// Builds the key of `pass` drawn with the given program.
    pub fn from_pass(
        pass: &MaterialPass,
        program_flags: ProgramFlags,
        scene_flags: SceneFlags,
        topology: PrimitiveTopology,
    ) -> Self {
        Self {
            alpha_func: pass.alpha_func,
            topology,
            colour_blend_mode: pass.colour_blend_mode,
            alpha_blend_mode: pass.alpha_blend_mode,
            texture_flags: pass.texture_flags(),
            program_flags,
            pass_flags: pass.flags,
            scene_flags,
            texture_count: pass.texture_count(),
            height_map_index: pass.height_map_index(),
        }
    }

    /// Returns the key an opaque or transparent render pass stores.
    ///
    /// Opaque passes never blend alpha.
    pub fn normalized(mut self, opaque: bool) -> Self {
        if opaque {
            self.alpha_blend_mode = BlendMode::NoBlend;
        }
        self
    }

    /// Returns `true` when a render pass drawing opaque (or transparent)
    /// geometry builds pipelines for this key.
    ///
    /// Billboards are never drawn into shadow maps.
    pub fn is_drawn_by(&self, opaque: bool) -> bool {
        self.pass_flags.has_alpha_blending() != opaque
            && !(self.program_flags.contains(ProgramFlags::BILLBOARDS)
                && self.program_flags.is_shadow_map_program())
    }

    /// The options handed to the shader generators.
    pub fn shader_options(&self) -> ShaderOptions {
        ShaderOptions {
            program_flags: self.program_flags,
            pass_flags: self.pass_flags,
            texture_flags: self.texture_flags,
            scene_flags: self.scene_flags,
            alpha_func: self.alpha_func,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prism_core::renderer::api::{SamplerId, TextureViewId};
    use prism_core::scene::{PassId, TextureUnit, TextureUnitId};

    fn unit(id: u32, channel: TextureChannels) -> TextureUnit {
        TextureUnit {
            id: TextureUnitId(id),
            channel,
            view: TextureViewId(id as usize),
            sampler: SamplerId(0),
        }
    }

    #[test]
    fn test_from_pass_reads_textures() {
        let pass = MaterialPass::new(PassId(3))
            .with_texture(unit(1, TextureChannels::DIFFUSE))
            .with_texture(unit(2, TextureChannels::HEIGHT))
            .with_blend_modes(BlendMode::Additive, BlendMode::Interpolative);
        let flags = PipelineFlags::from_pass(
            &pass,
            ProgramFlags::SKINNING,
            SceneFlags::FOG_LINEAR,
            PrimitiveTopology::TriangleList,
        );

        assert_eq!(flags.texture_count, 2);
        assert_eq!(flags.height_map_index, Some(1));
        assert_eq!(
            flags.texture_flags,
            TextureChannels::DIFFUSE | TextureChannels::HEIGHT
        );
        assert_eq!(flags.colour_blend_mode, BlendMode::Additive);
        assert_eq!(flags.alpha_blend_mode, BlendMode::Interpolative);
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let modes = [
            BlendMode::NoBlend,
            BlendMode::Additive,
            BlendMode::Multiplicative,
            BlendMode::Interpolative,
            BlendMode::ABuffer,
            BlendMode::DepthPeeling,
        ];
        for alpha in modes {
            for opaque in [true, false] {
                let flags = PipelineFlags {
                    alpha_blend_mode: alpha,
                    colour_blend_mode: BlendMode::Additive,
                    ..Default::default()
                };
                let once = flags.normalized(opaque);
                assert_eq!(once.normalized(opaque), once);
                if opaque {
                    assert_eq!(once.alpha_blend_mode, BlendMode::NoBlend);
                    assert_eq!(once.colour_blend_mode, BlendMode::Additive);
                } else {
                    assert_eq!(once, flags);
                }
            }
        }
    }

    #[test]
    fn test_billboards_skip_shadow_maps() {
        let flags = PipelineFlags {
            program_flags: ProgramFlags::BILLBOARDS | ProgramFlags::SHADOW_MAP_SPOT,
            ..Default::default()
        };
        assert!(!flags.is_drawn_by(true));

        let mesh = PipelineFlags {
            program_flags: ProgramFlags::SHADOW_MAP_SPOT,
            ..Default::default()
        };
        assert!(mesh.is_drawn_by(true));
        assert!(!mesh.is_drawn_by(false));
    }

    #[test]
    fn test_ordering_follows_alpha_func_first() {
        let a = PipelineFlags {
            alpha_func: CompareFunction::Less,
            texture_count: 9,
            ..Default::default()
        };
        let b = PipelineFlags {
            alpha_func: CompareFunction::Greater,
            ..Default::default()
        };
        assert!(a < b);
    }
}
