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

//! Colour attachment blending derived from a pass' blend modes.

use prism_core::renderer::api::{
    BlendComponentDescriptor, BlendFactor, BlendStateDescriptor, ColorTargetStateDescriptor,
    TextureFormat,
};
use prism_core::renderer::flags::BlendMode;

/// Blend factors of one colour attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColorTargetBlend {
    /// Whether blending happens at all.
    pub blend_enable: bool,
    /// Source factor of the colour channels.
    pub src_colour: BlendFactor,
    /// Destination factor of the colour channels.
    pub dst_colour: BlendFactor,
    /// Source factor of the alpha channel.
    pub src_alpha: BlendFactor,
    /// Destination factor of the alpha channel.
    pub dst_alpha: BlendFactor,
}

impl Default for ColorTargetBlend {
    fn default() -> Self {
        Self {
            blend_enable: false,
            src_colour: BlendFactor::One,
            dst_colour: BlendFactor::Zero,
            src_alpha: BlendFactor::One,
            dst_alpha: BlendFactor::Zero,
        }
    }
}

impl ColorTargetBlend {
    /// Derives the factors of `colour` and `alpha` blending.
    ///
    /// The colour mode is applied first. Multiplicative and interpolative
    /// alpha modes then overwrite the colour factors as well.
    pub fn new(colour: BlendMode, alpha: BlendMode) -> Self {
        use BlendFactor::*;

        let mut attach = Self::default();
        match colour {
            BlendMode::NoBlend => {
                attach.src_colour = One;
                attach.dst_colour = Zero;
            }
            BlendMode::Additive => {
                attach.blend_enable = true;
                attach.src_colour = One;
                attach.dst_colour = One;
            }
            BlendMode::Multiplicative => {
                attach.blend_enable = true;
                attach.src_colour = Zero;
                attach.dst_colour = OneMinusSrcColor;
            }
            _ => {
                attach.blend_enable = true;
                attach.src_colour = SrcColor;
                attach.dst_colour = OneMinusSrcColor;
            }
        }

        match alpha {
            BlendMode::NoBlend => {
                attach.src_alpha = One;
                attach.dst_alpha = Zero;
            }
            BlendMode::Additive => {
                attach.blend_enable = true;
                attach.src_alpha = One;
                attach.dst_alpha = One;
            }
            BlendMode::Multiplicative => {
                attach.blend_enable = true;
                attach.src_alpha = Zero;
                attach.dst_alpha = OneMinusSrcAlpha;
                attach.src_colour = Zero;
                attach.dst_colour = OneMinusSrcAlpha;
            }
            _ => {
                attach.blend_enable = true;
                attach.src_alpha = SrcAlpha;
                attach.dst_alpha = OneMinusSrcAlpha;
                attach.src_colour = SrcAlpha;
                attach.dst_colour = OneMinusSrcAlpha;
            }
        }
        attach
    }

    /// The device blend state, `None` when blending is disabled.
    pub fn to_descriptor(self) -> Option<BlendStateDescriptor> {
        self.blend_enable.then_some(BlendStateDescriptor {
            color: BlendComponentDescriptor::add(self.src_colour, self.dst_colour),
            alpha: BlendComponentDescriptor::add(self.src_alpha, self.dst_alpha),
        })
    }

    /// The colour target state writing `format` with these factors.
    ///
    /// Integer targets cannot be blended and always overwrite.
    pub fn color_target(self, format: TextureFormat) -> ColorTargetStateDescriptor {
        let blend = match format {
            TextureFormat::Rgba32Uint => None,
            _ => self.to_descriptor(),
        };
        ColorTargetStateDescriptor::new(format, blend)
    }
}

/// Returns one copy of the blend factors per colour attachment.
pub fn create_blend_state(
    colour: BlendMode,
    alpha: BlendMode,
    attachments: u32,
) -> Vec<ColorTargetBlend> {
    vec![ColorTargetBlend::new(colour, alpha); attachments as usize]
}

#[cfg(test)]
mod tests {
    use super::*;
    use BlendFactor::*;

    fn factors(colour: BlendMode, alpha: BlendMode) -> (bool, [BlendFactor; 4]) {
        let b = ColorTargetBlend::new(colour, alpha);
        (
            b.blend_enable,
            [b.src_colour, b.dst_colour, b.src_alpha, b.dst_alpha],
        )
    }

    #[test]
    fn test_same_mode_on_both_channels() {
        assert_eq!(
            factors(BlendMode::NoBlend, BlendMode::NoBlend),
            (false, [One, Zero, One, Zero])
        );
        assert_eq!(
            factors(BlendMode::Additive, BlendMode::Additive),
            (true, [One, One, One, One])
        );
        assert_eq!(
            factors(BlendMode::Multiplicative, BlendMode::Multiplicative),
            (true, [Zero, OneMinusSrcAlpha, Zero, OneMinusSrcAlpha])
        );
        assert_eq!(
            factors(BlendMode::Interpolative, BlendMode::Interpolative),
            (true, [SrcAlpha, OneMinusSrcAlpha, SrcAlpha, OneMinusSrcAlpha])
        );
        assert_eq!(
            factors(BlendMode::ABuffer, BlendMode::DepthPeeling),
            (true, [SrcAlpha, OneMinusSrcAlpha, SrcAlpha, OneMinusSrcAlpha])
        );
    }

    #[test]
    fn test_colour_factors_survive_opaque_alpha() {
        assert_eq!(
            factors(BlendMode::Multiplicative, BlendMode::NoBlend),
            (true, [Zero, OneMinusSrcColor, One, Zero])
        );
        assert_eq!(
            factors(BlendMode::Interpolative, BlendMode::NoBlend),
            (true, [SrcColor, OneMinusSrcColor, One, Zero])
        );
        assert_eq!(
            factors(BlendMode::NoBlend, BlendMode::Additive),
            (true, [One, Zero, One, One])
        );
    }

    #[test]
    fn test_one_state_per_attachment() {
        let states = create_blend_state(BlendMode::Additive, BlendMode::NoBlend, 3);
        assert_eq!(states.len(), 3);
        assert!(states.iter().all(|s| *s == states[0]));
        assert!(create_blend_state(BlendMode::Additive, BlendMode::NoBlend, 0).is_empty());
    }

    #[test]
    fn test_integer_targets_never_blend() {
        let blend = ColorTargetBlend::new(BlendMode::Additive, BlendMode::Additive);
        assert!(blend.color_target(TextureFormat::Rgba16Float).blend.is_some());
        assert!(blend.color_target(TextureFormat::Rgba32Uint).blend.is_none());
        assert!(ColorTargetBlend::default().to_descriptor().is_none());
    }
}
