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

use super::cook_torrance::DIELECTRIC_F0;
use super::{compute_light_params, ComputeLightParams, LightingConfig, LightingModel, Surface};
use super::COMPUTE_LIGHT;
use crate::writer::*;
use std::f32::consts::PI;

const SCHLICK_WEIGHT: &str = "SchlickWeight";
const GTR2: &str = "GTR2";
const SMITH_G_GGX: &str = "SmithG_GGX";

/// Disney principled BRDF, without its clear coat and sheen lobes.
///
/// Diffuse uses Burley's retro-reflection, specular a GTR2 distribution with
/// a Smith GGX shadowing term.
#[derive(Debug, Clone)]
pub struct DisneyLightingModel {
    config: LightingConfig,
}

impl DisneyLightingModel {
    /// Registry name.
    pub const NAME: &'static str = "disney";

    /// Creates the model.
    pub fn new(config: LightingConfig) -> Self {
        Self { config }
    }

    fn declare_helpers(&self, writer: &ShaderWriter) {
        writer.implement_function::<Float>(SCHLICK_WEIGHT, &[Param::new::<Float>("u")], |params| {
            let u = params.get::<Float>(0);
            let m = writer.decl_locale(
                "m",
                writer.clamp(
                    writer.sub(writer.float(1.0), u),
                    writer.float(0.0),
                    writer.float(1.0),
                ),
            );
            let m2 = writer.decl_locale("m2", writer.mul(m, m));
            writer.return_(writer.mul(writer.mul(m2, m2), m));
        });

        writer.implement_function::<Float>(
            GTR2,
            &[Param::new::<Float>("NdotH"), Param::new::<Float>("a")],
            |params| {
                let n_dot_h = params.get::<Float>(0);
                let a = params.get::<Float>(1);
                let a2 = writer.decl_locale("a2", writer.mul(a, a));
                let t = writer.decl_locale(
                    "t",
                    writer.add(
                        writer.float(1.0),
                        writer.mul(
                            writer.sub(a2, writer.float(1.0)),
                            writer.mul(n_dot_h, n_dot_h),
                        ),
                    ),
                );
                writer.return_(writer.div(
                    a2,
                    writer.mul(writer.float(PI), writer.mul(t, t)),
                ));
            },
        );

        writer.implement_function::<Float>(
            SMITH_G_GGX,
            &[Param::new::<Float>("NdotV"), Param::new::<Float>("alphaG")],
            |params| {
                let n_dot_v = params.get::<Float>(0);
                let alpha = params.get::<Float>(1);
                let a = writer.decl_locale("a", writer.mul(alpha, alpha));
                let b = writer.decl_locale("b", writer.mul(n_dot_v, n_dot_v));
                writer.return_(writer.div(
                    writer.float(1.0),
                    writer.add(
                        n_dot_v,
                        writer.sqrt(writer.sub(writer.add(a, b), writer.mul(a, b))),
                    ),
                ));
            },
        );
    }
}

impl LightingModel for DisneyLightingModel {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn config(&self) -> &LightingConfig {
        &self.config
    }

    fn surface_params(&self) -> Vec<Param> {
        vec![
            Param::new::<Vec3>("albedo"),
            Param::new::<Float>("metallic"),
            Param::new::<Float>("roughness"),
        ]
    }

    fn surface_args(&self, surface: &Surface) -> Vec<AnyExpr> {
        vec![
            surface.albedo.any(),
            surface.metallic.any(),
            surface.roughness.any(),
        ]
    }

    fn declare_compute_light(&self, writer: &ShaderWriter) {
        self.declare_helpers(writer);
        let surface = self.surface_params();
        let surface_len = surface.len();
        writer.implement_function::<Void>(
            COMPUTE_LIGHT,
            &compute_light_params(&surface),
            |params| {
                let p = ComputeLightParams::read(params, surface_len);
                let albedo = ComputeLightParams::surface::<Vec3>(params, 0);
                let metallic = ComputeLightParams::surface::<Float>(params, 1);
                let roughness = ComputeLightParams::surface::<Float>(params, 2);
                let zero = writer.float(0.0);
                let one = writer.float(1.0);

                let l = writer.decl_locale("L", writer.normalize(writer.neg(p.direction)));
                let v = writer.decl_locale(
                    "V",
                    writer.normalize(writer.sub(p.world_eye, p.world_vertex)),
                );
                let h = writer.decl_locale("H", writer.normalize(writer.add(l, v)));
                let n = writer.decl_locale("N", writer.normalize(p.world_normal));
                let n_dot_l = writer.decl_locale("NdotL", writer.max(zero, writer.dot(n, l)));
                let n_dot_v = writer.decl_locale("NdotV", writer.max(zero, writer.dot(n, v)));
                let n_dot_h = writer.decl_locale("NdotH", writer.max(zero, writer.dot(n, h)));
                let l_dot_h = writer.decl_locale("LdotH", writer.max(zero, writer.dot(l, h)));
                let a = writer.decl_locale(
                    "a",
                    writer.max(writer.float(0.001), writer.mul(roughness, roughness)),
                );

                let weight = |value: Expr<Float>| -> Expr<Float> {
                    writer.call(SCHLICK_WEIGHT, &[value.any()])
                };
                let fl = writer.decl_locale("FL", weight(n_dot_l));
                let fv = writer.decl_locale("FV", weight(n_dot_v));
                let fd90 = writer.decl_locale(
                    "Fd90",
                    writer.add(
                        writer.float(0.5),
                        writer.mul(
                            writer.mul(writer.float(2.0), writer.mul(l_dot_h, l_dot_h)),
                            roughness,
                        ),
                    ),
                );
                let fd = writer.decl_locale(
                    "Fd",
                    writer.mul(writer.mix(one, fd90, fl), writer.mix(one, fd90, fv)),
                );

                let dielectric = writer.float(DIELECTRIC_F0);
                let specular_colour = writer.decl_locale(
                    "specularColour",
                    writer.mix(writer.construct::<Vec3>(&[dielectric.any()]), albedo, metallic),
                );
                let ds = writer.decl_locale(
                    "Ds",
                    writer.call::<Float>(GTR2, &[n_dot_h.any(), a.any()]),
                );
                let fh = writer.decl_locale("FH", weight(l_dot_h));
                let fs = writer.decl_locale(
                    "Fs",
                    writer.mix(specular_colour, writer.construct::<Vec3>(&[one.any()]), fh),
                );
                let gs = writer.decl_locale(
                    "Gs",
                    writer.mul(
                        writer.call::<Float>(SMITH_G_GGX, &[n_dot_l.any(), a.any()]),
                        writer.call::<Float>(SMITH_G_GGX, &[n_dot_v.any(), a.any()]),
                    ),
                );

                let incoming = writer.decl_locale(
                    "incoming",
                    writer.mul(p.colour(writer), writer.mul(p.shadow_factor, n_dot_l)),
                );
                let diffuse_weight = writer.div(
                    writer.mul(fd, writer.sub(one, metallic)),
                    writer.float(PI),
                );
                writer.add_assign(
                    p.out_diffuse,
                    writer.mul(
                        writer.mul(
                            writer.mul(p.diffuse_intensity(writer), diffuse_weight),
                            incoming,
                        ),
                        albedo,
                    ),
                );
                writer.add_assign(
                    p.out_specular,
                    writer.mul(
                        writer.mul(
                            writer.mul(p.specular_intensity(writer), writer.mul(ds, gs)),
                            incoming,
                        ),
                        fs,
                    ),
                );
            },
        );
    }
}
