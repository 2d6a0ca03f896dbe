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

use crate::bindings::{texture_binding, ShadowMapBindings};
use prism_core::renderer::api::CompareFunction;
use prism_core::renderer::flags::{PassFlags, ProgramFlags, SceneFlags, TextureChannels};

/// Everything the generators need to know about one pipeline variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShaderOptions {
    /// Vertex-stage capabilities.
    pub program_flags: ProgramFlags,
    /// Material pass capabilities.
    pub pass_flags: PassFlags,
    /// Channels with a texture, one sampler per channel.
    pub texture_flags: TextureChannels,
    /// Scene toggles: fog and shadows.
    pub scene_flags: SceneFlags,
    /// Alpha test function, used with [`PassFlags::ALPHA_TEST`].
    pub alpha_func: CompareFunction,
}

impl ShaderOptions {
    /// Number of material samplers.
    pub fn texture_count(&self) -> u32 {
        self.texture_flags.bits().count_ones()
    }

    /// Sampler index of `channel`, samplers being ordered by channel bit.
    pub fn texture_index(&self, channel: TextureChannels) -> Option<u32> {
        if channel.is_empty() || !self.texture_flags.contains(channel) {
            return None;
        }
        let lower = channel.bits() - 1;
        Some((self.texture_flags.bits() & lower).count_ones())
    }

    /// Binding of the sampler of `channel` in the texture set.
    pub fn texture_binding(&self, channel: TextureChannels) -> Option<u32> {
        self.texture_index(channel).map(texture_binding)
    }

    /// Bindings of the shadow maps, after the material samplers.
    pub fn shadow_map_bindings(&self) -> ShadowMapBindings {
        ShadowMapBindings::after_textures(self.texture_count())
    }

    /// Returns `true` when the pixel shader evaluates lights.
    pub fn has_lighting(&self) -> bool {
        self.program_flags.contains(ProgramFlags::LIGHTING)
    }

    /// Returns `true` for billboard programs.
    pub fn is_billboard(&self) -> bool {
        self.program_flags.contains(ProgramFlags::BILLBOARDS)
    }

    /// Returns `true` when transforms come from the instance buffer.
    pub fn is_instanced(&self) -> bool {
        self.program_flags.contains(ProgramFlags::INSTANTIATION)
    }

    /// Returns `true` when the pass uses parallax occlusion mapping with a height map.
    pub fn has_parallax(&self) -> bool {
        self.pass_flags
            .contains(PassFlags::PARALLAX_OCCLUSION_MAPPING)
            && self.texture_flags.contains(TextureChannels::HEIGHT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn samplers_follow_channel_bits() {
        let options = ShaderOptions {
            texture_flags: TextureChannels::DIFFUSE
                | TextureChannels::OPACITY
                | TextureChannels::HEIGHT,
            ..Default::default()
        };
        assert_eq!(options.texture_count(), 3);
        assert_eq!(options.texture_index(TextureChannels::DIFFUSE), Some(0));
        assert_eq!(options.texture_index(TextureChannels::OPACITY), Some(1));
        assert_eq!(options.texture_index(TextureChannels::HEIGHT), Some(2));
        assert_eq!(options.texture_index(TextureChannels::NORMAL), None);
        assert_eq!(options.shadow_map_bindings().directional, 3);
    }

    #[test]
    fn parallax_needs_a_height_map() {
        let mut options = ShaderOptions {
            pass_flags: PassFlags::PARALLAX_OCCLUSION_MAPPING,
            ..Default::default()
        };
        assert!(!options.has_parallax());
        options.texture_flags |= TextureChannels::HEIGHT;
        assert!(options.has_parallax());
    }
}
