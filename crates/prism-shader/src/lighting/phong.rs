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

use super::{compute_light_params, ComputeLightParams, LightingConfig, LightingModel, Surface};
use super::COMPUTE_LIGHT;
use crate::writer::*;

/// Blinn-Phong era lighting: lambertian diffuse and a reflected specular lobe.
#[derive(Debug, Clone)]
pub struct PhongLightingModel {
    config: LightingConfig,
}

impl PhongLightingModel {
    /// Registry name.
    pub const NAME: &'static str = "phong";

    /// Creates the model.
    pub fn new(config: LightingConfig) -> Self {
        Self { config }
    }
}

impl LightingModel for PhongLightingModel {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn config(&self) -> &LightingConfig {
        &self.config
    }

    fn surface_params(&self) -> Vec<Param> {
        vec![
            Param::new::<Vec3>("albedo"),
            Param::new::<Vec3>("specular"),
            Param::new::<Float>("shininess"),
        ]
    }

    fn surface_args(&self, surface: &Surface) -> Vec<AnyExpr> {
        vec![
            surface.albedo.any(),
            surface.specular.any(),
            surface.shininess.any(),
        ]
    }

    fn declare_compute_light(&self, writer: &ShaderWriter) {
        let surface = self.surface_params();
        let surface_len = surface.len();
        writer.implement_function::<Void>(
            COMPUTE_LIGHT,
            &compute_light_params(&surface),
            |params| {
                let p = ComputeLightParams::read(params, surface_len);
                let albedo = ComputeLightParams::surface::<Vec3>(params, 0);
                let specular = ComputeLightParams::surface::<Vec3>(params, 1);
                let shininess = ComputeLightParams::surface::<Float>(params, 2);

                let colour = p.colour(writer);
                let diffuse_factor = writer.decl_locale(
                    "diffuseFactor",
                    writer.max(
                        writer.dot(p.world_normal, writer.neg(p.direction)),
                        writer.float(0.0),
                    ),
                );
                let vertex_to_eye = writer.decl_locale(
                    "vertexToEye",
                    writer.normalize(writer.sub(p.world_eye, p.world_vertex)),
                );
                let light_reflect = writer.decl_locale(
                    "lightReflect",
                    writer.normalize(writer.reflect(p.direction, p.world_normal)),
                );
                let specular_factor = writer.decl_locale(
                    "specularFactor",
                    writer.pow(
                        writer.max(writer.dot(vertex_to_eye, light_reflect), writer.float(0.0)),
                        writer.max(shininess, writer.float(0.1)),
                    ),
                );
                writer.add_assign(
                    p.out_diffuse,
                    writer.mul(
                        writer.mul(
                            writer.mul(p.shadow_factor, diffuse_factor),
                            p.diffuse_intensity(writer),
                        ),
                        writer.mul(colour, albedo),
                    ),
                );
                // No highlight on faces turned away from the light.
                writer.if_(writer.gt(diffuse_factor, writer.float(0.0)), || {
                    writer.add_assign(
                        p.out_specular,
                        writer.mul(
                            writer.mul(
                                writer.mul(p.shadow_factor, specular_factor),
                                p.specular_intensity(writer),
                            ),
                            writer.mul(colour, specular),
                        ),
                    );
                });
            },
        );
    }
}
