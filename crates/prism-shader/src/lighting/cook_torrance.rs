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

//! Cook-Torrance microfacet BRDF, shared by the physically based models.

use super::{compute_light_params, ComputeLightParams, LightingConfig, LightingModel, Surface};
use super::COMPUTE_LIGHT;
use crate::writer::*;
use std::f32::consts::PI;

/// GGX normal distribution.
pub const DISTRIBUTION: &str = "Distribution";
/// Schlick-GGX geometry term for one direction.
pub const GEOMETRY_SCHLICK_GGX: &str = "GeometrySchlickGGX";
/// Smith combination of both geometry terms.
pub const GEOMETRY_SMITH: &str = "GeometrySmith";
/// Schlick approximation of the Fresnel term.
pub const FRESNEL_SCHLICK: &str = "FresnelShlick";

/// Dielectric reflectance at normal incidence.
pub(super) const DIELECTRIC_F0: f32 = 0.04;

/// Declares the microfacet helpers, once per writer.
pub(super) fn declare_helpers(writer: &ShaderWriter) {
    let product_roughness = [
        Param::new::<Float>("product"),
        Param::new::<Float>("roughness"),
    ];

    writer.implement_function::<Float>(DISTRIBUTION, &product_roughness, |params| {
        let product = params.get::<Float>(0);
        let roughness = params.get::<Float>(1);
        let a = writer.decl_locale("a", writer.mul(roughness, roughness));
        let a2 = writer.decl_locale("a2", writer.mul(a, a));
        let n_dot_h2 = writer.decl_locale("NdotH2", writer.mul(product, product));
        let denominator = writer.decl_locale(
            "denom",
            writer.add(
                writer.mul(n_dot_h2, writer.sub(a2, writer.float(1.0))),
                writer.float(1.0),
            ),
        );
        writer.return_(writer.div(
            a2,
            writer.mul(writer.float(PI), writer.mul(denominator, denominator)),
        ));
    });

    writer.implement_function::<Float>(GEOMETRY_SCHLICK_GGX, &product_roughness, |params| {
        let product = params.get::<Float>(0);
        let roughness = params.get::<Float>(1);
        let r = writer.decl_locale("r", writer.add(roughness, writer.float(1.0)));
        let k = writer.decl_locale("k", writer.div(writer.mul(r, r), writer.float(8.0)));
        writer.return_(writer.div(
            product,
            writer.add(writer.mul(product, writer.sub(writer.float(1.0), k)), k),
        ));
    });

    writer.implement_function::<Float>(
        GEOMETRY_SMITH,
        &[
            Param::new::<Float>("NdotV"),
            Param::new::<Float>("NdotL"),
            Param::new::<Float>("roughness"),
        ],
        |params| {
            let roughness = params.get::<Float>(2);
            let ggx2 = writer.decl_locale(
                "ggx2",
                writer.call::<Float>(GEOMETRY_SCHLICK_GGX, &[params.any(0), roughness.any()]),
            );
            let ggx1 = writer.decl_locale(
                "ggx1",
                writer.call::<Float>(GEOMETRY_SCHLICK_GGX, &[params.any(1), roughness.any()]),
            );
            writer.return_(writer.mul(ggx1, ggx2));
        },
    );

    writer.implement_function::<Vec3>(
        FRESNEL_SCHLICK,
        &[Param::new::<Float>("product"), Param::new::<Vec3>("f0")],
        |params| {
            let product = params.get::<Float>(0);
            let f0 = params.get::<Vec3>(1);
            let one = writer.float(1.0);
            writer.return_(writer.add(
                f0,
                writer.mul(
                    writer.sub(writer.construct::<Vec3>(&[one.any()]), f0),
                    writer.pow(writer.sub(one, product), writer.float(5.0)),
                ),
            ));
        },
    );
}

/// The light and view vectors of a BRDF evaluation.
#[derive(Debug, Clone, Copy)]
pub(super) struct LightVectors {
    pub n_dot_l: Expr<Float>,
    pub n_dot_v: Expr<Float>,
    pub n_dot_h: Expr<Float>,
    pub h_dot_v: Expr<Float>,
}

impl LightVectors {
    /// Declares `L`, `V`, `H`, `N` and their clamped dot products.
    pub fn declare(writer: &ShaderWriter, p: &ComputeLightParams) -> Self {
        let l = writer.decl_locale("L", writer.normalize(writer.neg(p.direction)));
        let v = writer.decl_locale(
            "V",
            writer.normalize(writer.sub(p.world_eye, p.world_vertex)),
        );
        let h = writer.decl_locale("H", writer.normalize(writer.add(l, v)));
        let n = writer.decl_locale("N", writer.normalize(p.world_normal));
        let zero = writer.float(0.0);
        Self {
            n_dot_l: writer.decl_locale("NdotL", writer.max(zero, writer.dot(n, l))),
            n_dot_v: writer.decl_locale("NdotV", writer.max(zero, writer.dot(n, v))),
            n_dot_h: writer.decl_locale("NdotH", writer.max(zero, writer.dot(n, h))),
            h_dot_v: writer.decl_locale("HdotV", writer.max(zero, writer.dot(h, v))),
        }
    }
}

/// Emits the Cook-Torrance evaluation, `diffuse_weight` scaling the
/// lambertian part left after specular reflection.
pub(super) fn emit_cook_torrance(
    writer: &ShaderWriter,
    p: &ComputeLightParams,
    albedo: Expr<Vec3>,
    roughness: Expr<Float>,
    f0: Expr<Vec3>,
    diffuse_weight: Expr<Float>,
) {
    let vectors = LightVectors::declare(writer, p);
    let radiance = writer.decl_locale("radiance", p.colour(writer));
    let fresnel = writer.decl_locale(
        "F",
        writer.call::<Vec3>(FRESNEL_SCHLICK, &[vectors.h_dot_v.any(), f0.any()]),
    );
    let ndf = writer.decl_locale(
        "NDF",
        writer.call::<Float>(DISTRIBUTION, &[vectors.n_dot_h.any(), roughness.any()]),
    );
    let geometry = writer.decl_locale(
        "G",
        writer.call::<Float>(
            GEOMETRY_SMITH,
            &[vectors.n_dot_v.any(), vectors.n_dot_l.any(), roughness.any()],
        ),
    );
    let denominator = writer.decl_locale(
        "denominator",
        writer.add(
            writer.mul(
                writer.mul(writer.float(4.0), vectors.n_dot_v),
                vectors.n_dot_l,
            ),
            writer.float(0.001),
        ),
    );
    let reflectance = writer.decl_locale(
        "reflectance",
        writer.div(writer.mul(writer.mul(fresnel, ndf), geometry), denominator),
    );
    let one = writer.float(1.0);
    let k_d = writer.decl_locale(
        "kD",
        writer.mul(
            writer.sub(writer.construct::<Vec3>(&[one.any()]), fresnel),
            diffuse_weight,
        ),
    );
    let incoming = writer.decl_locale(
        "incoming",
        writer.mul(radiance, writer.mul(p.shadow_factor, vectors.n_dot_l)),
    );
    writer.add_assign(
        p.out_diffuse,
        writer.mul(
            writer.mul(p.diffuse_intensity(writer), incoming),
            writer.div(writer.mul(k_d, albedo), writer.float(PI)),
        ),
    );
    writer.add_assign(
        p.out_specular,
        writer.mul(
            writer.mul(p.specular_intensity(writer), incoming),
            reflectance,
        ),
    );
}

/// Metallic/roughness physically based lighting.
#[derive(Debug, Clone)]
pub struct MetallicRoughnessLightingModel {
    config: LightingConfig,
}

impl MetallicRoughnessLightingModel {
    /// Registry name.
    pub const NAME: &'static str = "pbr_mr";

    /// Creates the model.
    pub fn new(config: LightingConfig) -> Self {
        Self { config }
    }
}

impl LightingModel for MetallicRoughnessLightingModel {
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
        declare_helpers(writer);
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
                let dielectric = writer.float(DIELECTRIC_F0);
                let f0 = writer.decl_locale(
                    "f0",
                    writer.mix(writer.construct::<Vec3>(&[dielectric.any()]), albedo, metallic),
                );
                let diffuse_weight = writer.sub(writer.float(1.0), metallic);
                emit_cook_torrance(writer, &p, albedo, roughness, f0, diffuse_weight);
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prism_core::renderer::api::ShaderStage;

    #[test]
    fn helpers_are_declared_before_compute_light() {
        let writer = ShaderWriter::new(ShaderStage::Fragment);
        MetallicRoughnessLightingModel::new(LightingConfig::default()).declare_model(&writer);
        let source = writer.source();
        let distribution = source.find("float Distribution(float product, float roughness)");
        let compute = source.find("void ComputeLight(");
        assert!(distribution.is_some() && distribution < compute);
        assert!(source.contains("vec3 f0 = mix(vec3(0.04), albedo, metallic);"));
        assert_eq!(source.matches("float GeometrySmith(").count(), 1);
    }
}
