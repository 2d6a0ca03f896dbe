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

use crate::renderer::api::{CompareFunction, SamplerId, TextureViewId};
use crate::renderer::flags::{BlendMode, PassFlags, TextureChannels};
use std::sync::Arc;

/// The stable identifier of a material pass.
///
/// It doubles as the material index read by shaders, so it is unique across
/// every material of a scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PassId(pub u32);

/// The stable identifier of a texture unit, as stored in the textures UBO.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TextureUnitId(pub u32);

/// A texture bound to a material pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureUnit {
    /// Identifier written into the textures UBO.
    pub id: TextureUnitId,
    /// What the texture holds.
    pub channel: TextureChannels,
    /// The sampled view.
    pub view: TextureViewId,
    /// The sampler used to read the view.
    pub sampler: SamplerId,
}

/// One rendering pass of a [`Material`].
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialPass {
    /// Stable id, used as the shader-visible material index.
    pub id: PassId,
    /// Pass-level capabilities.
    pub flags: PassFlags,
    /// Texture units, in declaration order.
    pub textures: Vec<TextureUnit>,
    /// Blending of the colour channels.
    pub colour_blend_mode: BlendMode,
    /// Blending of the alpha channel.
    pub alpha_blend_mode: BlendMode,
    /// Alpha test comparison, meaningful with [`PassFlags::ALPHA_TEST`].
    pub alpha_func: CompareFunction,
    /// Whether back faces are rendered too.
    pub two_sided: bool,
}

impl MaterialPass {
    /// Creates an opaque, untextured, lit pass.
    pub fn new(id: PassId) -> Self {
        Self {
            id,
            flags: PassFlags::LIGHTING,
            textures: Vec::new(),
            colour_blend_mode: BlendMode::NoBlend,
            alpha_blend_mode: BlendMode::NoBlend,
            alpha_func: CompareFunction::Always,
            two_sided: false,
        }
    }

    /// Replaces the pass flags.
    pub fn with_flags(mut self, flags: PassFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Appends a texture unit.
    pub fn with_texture(mut self, unit: TextureUnit) -> Self {
        self.textures.push(unit);
        self
    }

    /// Sets both blend modes.
    pub fn with_blend_modes(mut self, colour: BlendMode, alpha: BlendMode) -> Self {
        self.colour_blend_mode = colour;
        self.alpha_blend_mode = alpha;
        self
    }

    /// Marks the pass as two-sided.
    pub fn with_two_sided(mut self, two_sided: bool) -> Self {
        self.two_sided = two_sided;
        self
    }

    /// Returns `true` when the pass is drawn with alpha blending.
    pub fn has_alpha_blending(&self) -> bool {
        self.flags.has_alpha_blending()
    }

    /// The units actually sampled, ordered by channel bit.
    ///
    /// A unit is sampled for the lowest bit of its channel; a later unit on an
    /// already sampled channel is left out, as are units without a channel.
    pub fn bound_textures(&self) -> Vec<(TextureChannels, &TextureUnit)> {
        let mut bound: Vec<(TextureChannels, &TextureUnit)> = Vec::new();
        for unit in &self.textures {
            let bits = unit.channel.bits();
            let channel = TextureChannels::from_bits_truncate(bits & bits.wrapping_neg());
            if channel.is_empty() || bound.iter().any(|(c, _)| *c == channel) {
                log::debug!(
                    "Texture unit {:?} of pass {:?} is not sampled ({:?}).",
                    unit.id,
                    self.id,
                    unit.channel
                );
                continue;
            }
            bound.push((channel, unit));
        }
        bound.sort_by_key(|(channel, _)| channel.bits());
        bound
    }

    /// Union of the sampled channels.
    pub fn texture_flags(&self) -> TextureChannels {
        self.bound_textures()
            .iter()
            .fold(TextureChannels::empty(), |acc, (channel, _)| acc | *channel)
    }

    /// Number of sampled texture units.
    pub fn texture_count(&self) -> u32 {
        self.bound_textures().len() as u32
    }

    /// Position of the height map among the sampled units, if any.
    pub fn height_map_index(&self) -> Option<u32> {
        self.bound_textures()
            .iter()
            .position(|(channel, _)| *channel == TextureChannels::HEIGHT)
            .map(|index| index as u32)
    }

    /// Returns `true` when one of the units holds opacity.
    pub fn has_opacity_map(&self) -> bool {
        self.texture_flags().contains(TextureChannels::OPACITY)
    }
}

/// A named, ordered collection of passes.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    /// A human readable name.
    pub name: String,
    /// The passes, in rendering order.
    pub passes: Vec<Arc<MaterialPass>>,
}

impl Material {
    /// Creates a material from its passes.
    pub fn new(name: impl Into<String>, passes: Vec<MaterialPass>) -> Self {
        Self {
            name: name.into(),
            passes: passes.into_iter().map(Arc::new).collect(),
        }
    }

    /// Looks a pass up by id.
    pub fn pass(&self, id: PassId) -> Option<&Arc<MaterialPass>> {
        self.passes.iter().find(|pass| pass.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(id: u32, channel: TextureChannels) -> TextureUnit {
        TextureUnit {
            id: TextureUnitId(id),
            channel,
            view: TextureViewId(id as usize),
            sampler: SamplerId(0),
        }
    }

    #[test]
    fn texture_queries_follow_channel_order() {
        let pass = MaterialPass::new(PassId(3))
            .with_texture(unit(10, TextureChannels::HEIGHT))
            .with_texture(unit(11, TextureChannels::DIFFUSE))
            .with_texture(unit(12, TextureChannels::OPACITY));

        assert_eq!(pass.texture_count(), 3);
        assert_eq!(pass.height_map_index(), Some(2));
        assert!(pass.has_opacity_map());
        assert_eq!(
            pass.texture_flags(),
            TextureChannels::DIFFUSE | TextureChannels::HEIGHT | TextureChannels::OPACITY
        );
    }

    #[test]
    fn shared_channels_are_sampled_once() {
        let pass = MaterialPass::new(PassId(4))
            .with_texture(unit(20, TextureChannels::NORMAL))
            .with_texture(unit(21, TextureChannels::DIFFUSE | TextureChannels::OPACITY))
            .with_texture(unit(22, TextureChannels::DIFFUSE))
            .with_texture(unit(23, TextureChannels::empty()));

        let ids: Vec<_> = pass.bound_textures().iter().map(|(_, unit)| unit.id).collect();
        assert_eq!(ids, vec![TextureUnitId(21), TextureUnitId(20)]);
        assert_eq!(pass.texture_count(), 2);
        assert_eq!(
            pass.texture_flags(),
            TextureChannels::DIFFUSE | TextureChannels::NORMAL
        );
        assert!(!pass.has_opacity_map());
    }

    #[test]
    fn material_finds_passes_by_id() {
        let material = Material::new(
            "brick",
            vec![MaterialPass::new(PassId(1)), MaterialPass::new(PassId(2))],
        );
        assert!(material.pass(PassId(2)).is_some());
        assert!(material.pass(PassId(9)).is_none());
        assert!(!material.passes[0].has_alpha_blending());
    }
}
