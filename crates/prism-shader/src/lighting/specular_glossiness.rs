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

use super::cook_torrance::{declare_helpers, emit_cook_torrance};
use super::{compute_light_params, ComputeLightParams, LightingConfig, LightingModel, Surface};
use super::COMPUTE_LIGHT;
use crate::writer::*;

/// Specular/glossiness physically based lighting.
///
/// The specular colour is the reflectance at normal incidence. Roughness is
/// expected as `1.0 - glossiness`.
#[derive(Debug, Clone)]
pub struct SpecularGlossinessLightingModel {
    config: LightingConfig,
}

impl SpecularGlossinessLightingModel {
    /// Registry name.
    pub const NAME: &'static str = "pbr_sg";

    /// Creates the model.
    pub fn new(config: LightingConfig) -> Self {
        Self { config }
    }
}

impl LightingModel for SpecularGlossinessLightingModel {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn config(&self) -> &LightingConfig {
        &self.config
    }

    fn surface_params(&self) -> Vec<Param> {
        vec![
            Param::new::<Vec3>("diffuse"),
            Param::new::<Vec3>("specular"),
            Param::new::<Float>("roughness"),
        ]
    }

    fn surface_args(&self, surface: &Surface) -> Vec<AnyExpr> {
        vec![
            surface.albedo.any(),
            surface.specular.any(),
            surface.roughness.any(),
        ]
    }

    fn declare_compute_light(&self, writer: &ShaderWriter) {
        declare_helpers(writer);
        let surface = self.surface_params();
        let surface_len = surface.len();
        writer.implement_function::<Void>(
            COMPUTE_LIGHT,
            &compute_light_params(&surface),
            |params| {
                let p = ComputeLightParams::read(params, surface_len);
                let diffuse = ComputeLightParams::surface::<Vec3>(params, 0);
                let specular = ComputeLightParams::surface::<Vec3>(params, 1);
                let roughness = ComputeLightParams::surface::<Float>(params, 2);
                let max_specular = writer.decl_locale(
                    "maxSpecular",
                    writer.max(
                        writer.swizzle::<Float, _>(specular, "r"),
                        writer.max(
                            writer.swizzle::<Float, _>(specular, "g"),
                            writer.swizzle::<Float, _>(specular, "b"),
                        ),
                    ),
                );
                let diffuse_weight = writer.sub(writer.float(1.0), max_specular);
                emit_cook_torrance(writer, &p, diffuse, roughness, specular, diffuse_weight);
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prism_core::renderer::api::ShaderStage;

    #[test]
    fn specular_is_the_fresnel_reflectance() {
        let writer = ShaderWriter::new(ShaderStage::Fragment);
        SpecularGlossinessLightingModel::new(LightingConfig::default()).declare_model(&writer);
        let source = writer.source();
        assert!(source.contains("vec3 F = FresnelShlick(HdotV, specular);"));
        assert!(
            source.contains("vec3 diffuse, vec3 specular, float roughness, inout vec3 outDiffuse")
        );
    }
}
