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

//! Shadow map sampling helpers used by the lighting models.

use crate::bindings::{ShadowMapBindings, TEXTURE_SET};
use crate::writer::*;
use prism_core::renderer::flags::{SceneFlags, ShadowType};

/// Far plane of the point light shadow cube maps.
pub const POINT_SHADOW_FAR_PLANE: f32 = 4000.0;

const MIN_OFFSET: f32 = 0.001;
const MAX_SLOPE_OFFSET: f32 = 0.01;
const MIN_VARIANCE: f32 = 0.00002;

/// Names of the emitted helpers.
pub mod names {
    /// Directional shadow map sampler.
    pub const MAP_DIRECTIONAL: &str = "c3d_mapShadowDirectional";
    /// Point shadow cube map sampler.
    pub const MAP_POINT: &str = "c3d_mapShadowPoint";
    /// Spot shadow map sampler.
    pub const MAP_SPOT: &str = "c3d_mapShadowSpot";
    /// Slope scaled depth offset.
    pub const GET_SHADOW_OFFSET: &str = "GetShadowOffset";
    /// World to light texture space.
    pub const GET_LIGHT_SPACE_POSITION: &str = "GetLightSpacePosition";
    /// 3x3 percentage closer filter.
    pub const FILTER_PCF: &str = "FilterPCF";
    /// Variance shadow map test.
    pub const CHEBYSHEV_UPPER_BOUND: &str = "ChebyshevUpperBound";
    /// Directional light shadow factor.
    pub const COMPUTE_DIRECTIONAL_SHADOW: &str = "ComputeDirectionalShadow";
    /// Point light shadow factor.
    pub const COMPUTE_POINT_SHADOW: &str = "ComputePointShadow";
    /// Spot light shadow factor.
    pub const COMPUTE_SPOT_SHADOW: &str = "ComputeSpotShadow";
}

/// Shadow sampling for one shader, driven by the scene flags.
///
/// The shadow functions return the amount of shadow, `0.0` being fully lit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shadow {
    shadow_type: ShadowType,
    casters: SceneFlags,
    bindings: ShadowMapBindings,
}

impl Shadow {
    /// Builds the helper for `scene_flags`, with the shadow maps bound at `bindings`.
    pub fn new(scene_flags: SceneFlags, bindings: ShadowMapBindings) -> Self {
        Self {
            shadow_type: scene_flags.shadow_type(),
            casters: scene_flags & SceneFlags::SHADOW_ANY,
            bindings,
        }
    }

    /// The filtering in use.
    pub fn shadow_type(&self) -> ShadowType {
        self.shadow_type
    }

    fn enabled_for(&self, caster: SceneFlags) -> bool {
        self.shadow_type != ShadowType::None && self.casters.contains(caster)
    }

    /// Returns `true` when directional lights are shadowed.
    pub fn has_directional(&self) -> bool {
        self.enabled_for(SceneFlags::SHADOW_DIRECTIONAL)
    }

    /// Returns `true` when point lights are shadowed.
    pub fn has_point(&self) -> bool {
        self.enabled_for(SceneFlags::SHADOW_POINT)
    }

    /// Returns `true` when spot lights are shadowed.
    pub fn has_spot(&self) -> bool {
        self.enabled_for(SceneFlags::SHADOW_SPOT)
    }

    /// Declares the shadow maps and the functions sampling them.
    pub fn declare(&self, writer: &ShaderWriter) {
        if self.shadow_type == ShadowType::None {
            return;
        }
        if self.has_directional() {
            writer.decl_sampler::<Sampler2D>(
                names::MAP_DIRECTIONAL,
                TEXTURE_SET,
                self.bindings.directional,
            );
        }
        if self.has_point() {
            writer.decl_sampler::<SamplerCube>(names::MAP_POINT, TEXTURE_SET, self.bindings.point);
        }
        if self.has_spot() {
            writer.decl_sampler::<Sampler2D>(names::MAP_SPOT, TEXTURE_SET, self.bindings.spot);
        }
        writer.blank_line();

        self.declare_get_shadow_offset(writer);
        self.declare_get_light_space_position(writer);
        match self.shadow_type {
            ShadowType::Pcf => self.declare_filter_pcf(writer),
            ShadowType::Variance => self.declare_chebyshev_upper_bound(writer),
            ShadowType::Raw | ShadowType::None => {}
        }

        if self.has_directional() {
            self.declare_compute_projected_shadow(
                writer,
                names::COMPUTE_DIRECTIONAL_SHADOW,
                names::MAP_DIRECTIONAL,
            );
        }
        if self.has_spot() {
            self.declare_compute_projected_shadow(
                writer,
                names::COMPUTE_SPOT_SHADOW,
                names::MAP_SPOT,
            );
        }
        if self.has_point() {
            self.declare_compute_point_shadow(writer);
        }
    }

    /// Shadow amount of a directional light.
    pub fn compute_directional_shadow(
        &self,
        writer: &ShaderWriter,
        light_matrix: Expr<Mat4>,
        world_position: Expr<Vec3>,
        light_direction: Expr<Vec3>,
        normal: Expr<Vec3>,
    ) -> Expr<Float> {
        writer.call(
            names::COMPUTE_DIRECTIONAL_SHADOW,
            &[
                light_matrix.any(),
                world_position.any(),
                light_direction.any(),
                normal.any(),
            ],
        )
    }

    /// Shadow amount of a spot light.
    pub fn compute_spot_shadow(
        &self,
        writer: &ShaderWriter,
        light_matrix: Expr<Mat4>,
        world_position: Expr<Vec3>,
        light_direction: Expr<Vec3>,
        normal: Expr<Vec3>,
    ) -> Expr<Float> {
        writer.call(
            names::COMPUTE_SPOT_SHADOW,
            &[
                light_matrix.any(),
                world_position.any(),
                light_direction.any(),
                normal.any(),
            ],
        )
    }

    /// Shadow amount of a point light.
    pub fn compute_point_shadow(
        &self,
        writer: &ShaderWriter,
        world_position: Expr<Vec3>,
        light_position: Expr<Vec3>,
        normal: Expr<Vec3>,
    ) -> Expr<Float> {
        writer.call(
            names::COMPUTE_POINT_SHADOW,
            &[world_position.any(), light_position.any(), normal.any()],
        )
    }

    fn declare_get_shadow_offset(&self, writer: &ShaderWriter) {
        writer.implement_function::<Float>(
            names::GET_SHADOW_OFFSET,
            &[
                Param::new::<Vec3>("normal"),
                Param::new::<Vec3>("lightDirection"),
            ],
            |params| {
                let normal = params.get::<Vec3>(0);
                let light_direction = params.get::<Vec3>(1);
                let cos_alpha = writer.decl_locale(
                    "cosAlpha",
                    writer.clamp(
                        writer.dot(normal, light_direction),
                        writer.float(0.0),
                        writer.float(1.0),
                    ),
                );
                let sin_alpha = writer.decl_locale(
                    "sinAlpha",
                    writer.sqrt(writer.sub(writer.float(1.0), writer.mul(cos_alpha, cos_alpha))),
                );
                let slope = writer.decl_locale(
                    "slope",
                    writer.div(sin_alpha, writer.max(cos_alpha, writer.float(MIN_OFFSET))),
                );
                writer.return_(writer.mix(
                    writer.float(MIN_OFFSET),
                    writer.float(MAX_SLOPE_OFFSET),
                    writer.clamp(slope, writer.float(0.0), writer.float(1.0)),
                ));
            },
        );
    }

    fn declare_get_light_space_position(&self, writer: &ShaderWriter) {
        writer.implement_function::<Vec3>(
            names::GET_LIGHT_SPACE_POSITION,
            &[
                Param::new::<Mat4>("lightMatrix"),
                Param::new::<Vec3>("worldSpacePosition"),
            ],
            |params| {
                let light_matrix = params.get::<Mat4>(0);
                let world_position = params.get::<Vec3>(1);
                let homogeneous =
                    writer.construct::<Vec4>(&[world_position.any(), writer.float(1.0).any()]);
                let light_space =
                    writer.decl_locale("lightSpacePosition", writer.mul(light_matrix, homogeneous));
                let projected = writer.decl_locale(
                    "projected",
                    writer.div(
                        writer.swizzle::<Vec3, _>(light_space, "xyz"),
                        writer.swizzle::<Float, _>(light_space, "w"),
                    ),
                );
                let half = writer.float(0.5);
                let uv = writer.fma(
                    writer.swizzle::<Vec2, _>(projected, "xy"),
                    writer.construct::<Vec2>(&[half.any()]),
                    writer.construct::<Vec2>(&[half.any()]),
                );
                writer.return_(writer.construct::<Vec3>(&[
                    uv.any(),
                    writer.swizzle::<Float, _>(projected, "z").any(),
                ]));
            },
        );
    }

    fn declare_filter_pcf(&self, writer: &ShaderWriter) {
        writer.implement_function::<Float>(
            names::FILTER_PCF,
            &[
                Param::new::<Sampler2D>("shadowMap"),
                Param::new::<Vec3>("lightSpacePosition"),
                Param::new::<Float>("offset"),
            ],
            |params| {
                let shadow_map = params.get::<Sampler2D>(0);
                let position = params.get::<Vec3>(1);
                let offset = params.get::<Float>(2);
                let shadow = writer.decl_locale("shadow", writer.float(0.0));
                let texel_size = writer.decl_locale(
                    "texelSize",
                    writer.div(
                        writer.construct::<Vec2>(&[writer.float(1.0).any()]),
                        writer.cast::<Vec2, _>(writer.texture_size(shadow_map)),
                    ),
                );
                let reference = writer.decl_locale(
                    "reference",
                    writer.sub(writer.swizzle::<Float, _>(position, "z"), offset),
                );
                writer.for_range("x", writer.int(-1), writer.int(2), |x| {
                    writer.for_range("y", writer.int(-1), writer.int(2), |y| {
                        let texel = writer.construct::<Vec2>(&[x.any(), y.any()]);
                        let coords = writer.add(
                            writer.swizzle::<Vec2, _>(position, "xy"),
                            writer.mul(texel, texel_size),
                        );
                        let depth = writer.decl_locale(
                            "depth",
                            writer.swizzle::<Float, _>(writer.texture(shadow_map, coords), "r"),
                        );
                        writer.add_assign(shadow, writer.step(depth, reference));
                    });
                });
                writer.return_(writer.div(shadow, writer.float(9.0)));
            },
        );
    }

    fn declare_chebyshev_upper_bound(&self, writer: &ShaderWriter) {
        writer.implement_function::<Float>(
            names::CHEBYSHEV_UPPER_BOUND,
            &[
                Param::new::<Vec2>("moments"),
                Param::new::<Float>("distance"),
            ],
            |params| {
                let moments = params.get::<Vec2>(0);
                let distance = params.get::<Float>(1);
                let mean = writer.swizzle::<Float, _>(moments, "x");
                let lit = writer.decl_locale("lit", writer.step(distance, mean));
                let variance = writer.decl_locale(
                    "variance",
                    writer.max(
                        writer.sub(
                            writer.swizzle::<Float, _>(moments, "y"),
                            writer.mul(mean, mean),
                        ),
                        writer.float(MIN_VARIANCE),
                    ),
                );
                let d = writer.decl_locale("d", writer.sub(distance, mean));
                let p_max = writer.decl_locale(
                    "pMax",
                    writer.div(variance, writer.add(variance, writer.mul(d, d))),
                );
                writer.return_(writer.sub(writer.float(1.0), writer.max(lit, p_max)));
            },
        );
    }

    /// Shadow test for lights projecting into a 2D map.
    fn sample_projected(
        &self,
        writer: &ShaderWriter,
        map: Expr<Sampler2D>,
        position: Expr<Vec3>,
        offset: Expr<Float>,
    ) -> Expr<Float> {
        match self.shadow_type {
            ShadowType::Pcf => writer.call(
                names::FILTER_PCF,
                &[map.any(), position.any(), offset.any()],
            ),
            ShadowType::Variance => {
                let moments = writer.swizzle::<Vec2, _>(
                    writer.texture(map, writer.swizzle::<Vec2, _>(position, "xy")),
                    "rg",
                );
                writer.call(
                    names::CHEBYSHEV_UPPER_BOUND,
                    &[
                        moments.any(),
                        writer.swizzle::<Float, _>(position, "z").any(),
                    ],
                )
            }
            ShadowType::Raw | ShadowType::None => {
                let depth = writer.swizzle::<Float, _>(
                    writer.texture(map, writer.swizzle::<Vec2, _>(position, "xy")),
                    "r",
                );
                writer.step(depth, writer.sub(writer.swizzle::<Float, _>(position, "z"), offset))
            }
        }
    }

    fn declare_compute_projected_shadow(&self, writer: &ShaderWriter, name: &str, map: &str) {
        writer.implement_function::<Float>(
            name,
            &[
                Param::new::<Mat4>("lightMatrix"),
                Param::new::<Vec3>("worldSpacePosition"),
                Param::new::<Vec3>("lightDirection"),
                Param::new::<Vec3>("normal"),
            ],
            |params| {
                let map = writer.decl_builtin::<Sampler2D>(map);
                let light_matrix = params.get::<Mat4>(0);
                let world_position = params.get::<Vec3>(1);
                let light_direction = params.get::<Vec3>(2);
                let normal = params.get::<Vec3>(3);
                let position = writer.decl_locale(
                    "lightSpacePosition",
                    writer.call::<Vec3>(
                        names::GET_LIGHT_SPACE_POSITION,
                        &[light_matrix.any(), world_position.any()],
                    ),
                );
                let offset = writer.decl_locale(
                    "offset",
                    writer.call::<Float>(
                        names::GET_SHADOW_OFFSET,
                        &[normal.any(), writer.neg(light_direction).any()],
                    ),
                );
                writer.return_(self.sample_projected(writer, map, position, offset));
            },
        );
    }

    fn declare_compute_point_shadow(&self, writer: &ShaderWriter) {
        writer.implement_function::<Float>(
            names::COMPUTE_POINT_SHADOW,
            &[
                Param::new::<Vec3>("worldSpacePosition"),
                Param::new::<Vec3>("lightPosition"),
                Param::new::<Vec3>("normal"),
            ],
            |params| {
                let map = writer.decl_builtin::<SamplerCube>(names::MAP_POINT);
                let world_position = params.get::<Vec3>(0);
                let light_position = params.get::<Vec3>(1);
                let normal = params.get::<Vec3>(2);
                let light_to_vertex = writer.decl_locale(
                    "lightToVertex",
                    writer.sub(world_position, light_position),
                );
                let depth = writer.decl_locale(
                    "depth",
                    writer.div(
                        writer.length(light_to_vertex),
                        writer.float(POINT_SHADOW_FAR_PLANE),
                    ),
                );
                let sample = writer.texture(map, light_to_vertex);
                if self.shadow_type == ShadowType::Variance {
                    writer.return_(writer.call::<Float>(
                        names::CHEBYSHEV_UPPER_BOUND,
                        &[writer.swizzle::<Vec2, _>(sample, "rg").any(), depth.any()],
                    ));
                } else {
                    let offset = writer.decl_locale(
                        "offset",
                        writer.call::<Float>(
                            names::GET_SHADOW_OFFSET,
                            &[
                                normal.any(),
                                writer.neg(writer.normalize(light_to_vertex)).any(),
                            ],
                        ),
                    );
                    writer.return_(writer.step(
                        writer.swizzle::<Float, _>(sample, "r"),
                        writer.sub(depth, offset),
                    ));
                }
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prism_core::renderer::api::ShaderStage;

    fn declared(flags: SceneFlags) -> String {
        let writer = ShaderWriter::new(ShaderStage::Fragment);
        Shadow::new(flags, ShadowMapBindings::after_textures(2)).declare(&writer);
        writer.source()
    }

    #[test]
    fn no_filter_declares_nothing() {
        assert!(declared(SceneFlags::SHADOW_DIRECTIONAL).is_empty());
    }

    #[test]
    fn pcf_nests_two_loops() {
        let source = declared(SceneFlags::SHADOW_FILTER_PCF | SceneFlags::SHADOW_SPOT);
        assert!(
            source.contains("layout(set = 1, binding = 4) uniform sampler2D c3d_mapShadowSpot;")
        );
        assert!(source.contains(concat!(
            "    for (int x = -1; x < 2; ++x)\n",
            "    {\n",
            "        for (int y = -1; y < 2; ++y)\n",
            "        {\n",
        )));
        assert!(source.contains("float ComputeSpotShadow(mat4 lightMatrix"));
        assert!(!source.contains("ComputeDirectionalShadow"));
    }

    #[test]
    fn variance_uses_chebyshev_for_every_caster() {
        let source = declared(SceneFlags::SHADOW_FILTER_VARIANCE | SceneFlags::SHADOW_ANY);
        assert_eq!(source.matches("float ChebyshevUpperBound(").count(), 1);
        assert!(source.contains("uniform samplerCube c3d_mapShadowPoint;"));
        assert!(!source.contains("FilterPCF"));
    }
}
