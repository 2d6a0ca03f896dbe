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

//! Settings of a render pass, loadable from RON.

use super::error::ConfigError;
use prism_core::renderer::api::TextureFormat;
use prism_core::renderer::flags::ShadowType;
use serde::{Deserialize, Serialize};

/// How a render pass is set up.
///
/// Missing fields take their default value, so a RON file only lists what it
/// changes:
///
/// ```
/// use prism_lanes::render_lane::RenderPassConfig;
///
/// let config = RenderPassConfig::from_ron_str("(name: \"transparent\", opaque: false)")
///     .unwrap();
/// assert!(!config.opaque);
/// assert_eq!(config.lighting_model, "phong");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderPassConfig {
    /// Name, used in labels and logs.
    pub name: String,
    /// Timing category.
    pub category: String,
    /// Draws opaque passes when `true`, blended passes otherwise.
    pub opaque: bool,
    /// Transparent geometry is resolved without sorting.
    pub order_independent: bool,
    /// Lighting model of passes that are not PBR.
    pub lighting_model: String,
    /// Shadow filtering of lit pipelines.
    pub shadow_type: ShadowType,
    /// Capacity of the instancing buffers of one batch.
    pub max_instances: u32,
    /// Format of the main colour target.
    pub colour_format: TextureFormat,
    /// Format of the depth target, `None` without depth test.
    pub depth_format: Option<TextureFormat>,
}

impl Default for RenderPassConfig {
    fn default() -> Self {
        Self {
            name: "forward".to_owned(),
            category: "Opaque".to_owned(),
            opaque: true,
            order_independent: false,
            lighting_model: "phong".to_owned(),
            shadow_type: ShadowType::None,
            max_instances: 64,
            colour_format: TextureFormat::Rgba16Float,
            depth_format: Some(TextureFormat::Depth32Float),
        }
    }
}

impl RenderPassConfig {
    /// Parses and validates a configuration.
    pub fn from_ron_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = ron::de::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Writes the configuration as pretty RON.
    pub fn to_ron_string(&self) -> Result<String, ConfigError> {
        let pretty = ron::ser::PrettyConfig::default().indentor("  ".to_string());
        Ok(ron::ser::to_string_pretty(self, pretty)?)
    }

    /// Checks the fields a render pass cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "name",
                reason: "must not be empty".to_owned(),
            });
        }
        if self.max_instances == 0 {
            return Err(ConfigError::Invalid {
                field: "max_instances",
                reason: "must be at least 1".to_owned(),
            });
        }
        if self.colour_format.is_depth() {
            return Err(ConfigError::Invalid {
                field: "colour_format",
                reason: format!("{:?} is a depth format", self.colour_format),
            });
        }
        if let Some(depth) = self.depth_format.filter(|format| !format.is_depth()) {
            return Err(ConfigError::Invalid {
                field: "depth_format",
                reason: format!("{depth:?} is not a depth format"),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config = RenderPassConfig::from_ron_str("(name: \"shadows\", max_instances: 8)")
            .unwrap();
        assert_eq!(config.name, "shadows");
        assert_eq!(config.max_instances, 8);
        assert!(config.opaque);
        assert_eq!(config.depth_format, Some(TextureFormat::Depth32Float));
    }

    #[test]
    fn test_invalid_fields_are_rejected() {
        let err = RenderPassConfig::from_ron_str("(max_instances: 0)").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "max_instances", .. }));

        let err = RenderPassConfig::from_ron_str("(colour_format: Depth32Float)").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "colour_format", .. }));

        let err = RenderPassConfig::from_ron_str("(opaque: maybe)").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_pretty_output_reads_back() {
        let config = RenderPassConfig {
            name: "transparent".to_owned(),
            opaque: false,
            shadow_type: ShadowType::Pcf,
            ..Default::default()
        };
        let text = config.to_ron_string().unwrap();
        assert!(text.contains("shadow_type: Pcf"));
        assert_eq!(RenderPassConfig::from_ron_str(&text).unwrap(), config);
    }
}
