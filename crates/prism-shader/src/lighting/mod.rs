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

//! Lighting models and the registry used to pick one by name.
//!
//! Every model shares the light layout, the light getters and the per light
//! type wrappers declared by [`LightingModel::declare_model`]. A model only
//! brings its own `ComputeLight` BRDF and the surface parameters it reads.

mod cook_torrance;
mod disney;
mod factory;
mod phong;
mod specular_glossiness;

pub use self::cook_torrance::MetallicRoughnessLightingModel;
pub use self::disney::DisneyLightingModel;
pub use self::factory::{LightingModelConstructor, LightingModelFactory};
pub use self::phong::PhongLightingModel;
pub use self::specular_glossiness::SpecularGlossinessLightingModel;

use crate::bindings::{ShadowMapBindings, BASE_LIGHT_COMPONENTS, MAX_LIGHT_COMPONENTS};
use crate::shadow::Shadow;
use crate::ubos::LightBuffer;
use crate::writer::*;
use prism_core::renderer::flags::SceneFlags;
use std::fmt::Debug;

/// Name of the shared BRDF entry point every model implements.
pub const COMPUTE_LIGHT: &str = "ComputeLight";

/// Names of the shared light functions.
pub mod names {
    /// Reads the common part of a light.
    pub const GET_BASE_LIGHT: &str = "GetBaseLight";
    /// Reads a directional light.
    pub const GET_DIRECTIONAL_LIGHT: &str = "GetDirectionalLight";
    /// Reads a point light.
    pub const GET_POINT_LIGHT: &str = "GetPointLight";
    /// Reads a spot light.
    pub const GET_SPOT_LIGHT: &str = "GetSpotLight";
    /// Accumulates one directional light.
    pub const COMPUTE_DIRECTIONAL_LIGHT: &str = "ComputeDirectionalLight";
    /// Accumulates one point light.
    pub const COMPUTE_POINT_LIGHT: &str = "ComputePointLight";
    /// Accumulates one spot light.
    pub const COMPUTE_SPOT_LIGHT: &str = "ComputeSpotLight";
}

/// Common light data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Light;

impl GlslType for Light {
    const NAME: &'static str = "Light";
}

/// A light at infinity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectionalLight;

impl GlslType for DirectionalLight {
    const NAME: &'static str = "DirectionalLight";
}

/// An omnidirectional light.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointLight;

impl GlslType for PointLight {
    const NAME: &'static str = "PointLight";
}

/// A cone light.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpotLight;

impl GlslType for SpotLight {
    const NAME: &'static str = "SpotLight";
}

/// What a lighting model is created for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LightingConfig {
    /// Scene flags, of which the shadow filter and the shadow casters are used.
    pub scene_flags: SceneFlags,
    /// Number of material textures bound before the shadow maps.
    pub texture_count: u32,
}

impl LightingConfig {
    /// The shadow sampling matching this configuration.
    pub fn shadow(&self) -> Shadow {
        Shadow::new(
            self.scene_flags,
            ShadowMapBindings::after_textures(self.texture_count),
        )
    }
}

/// The surface being lit, as read from the material and its textures.
///
/// Models read the subset they need.
#[derive(Debug, Clone, Copy)]
pub struct Surface {
    /// Diffuse colour.
    pub albedo: Expr<Vec3>,
    /// Specular colour.
    pub specular: Expr<Vec3>,
    /// Metalness, in `[0, 1]`.
    pub metallic: Expr<Float>,
    /// Roughness, in `[0, 1]`.
    pub roughness: Expr<Float>,
    /// Phong exponent.
    pub shininess: Expr<Float>,
}

/// Fragment data shared by every light evaluation.
#[derive(Debug, Clone, Copy)]
pub struct FragmentInput {
    /// Camera position, world space.
    pub world_eye: Expr<Vec3>,
    /// Fragment position, world space.
    pub world_vertex: Expr<Vec3>,
    /// Fragment normal, world space.
    pub world_normal: Expr<Vec3>,
    /// Non zero when the object receives shadows.
    pub receives_shadows: Expr<Int>,
}

/// Accumulators the light functions add to.
#[derive(Debug, Clone, Copy)]
pub struct OutputComponents {
    /// Diffuse contribution.
    pub diffuse: Expr<Vec3>,
    /// Specular contribution.
    pub specular: Expr<Vec3>,
}

impl OutputComponents {
    /// Declares `lightDiffuse` and `lightSpecular`, both zero.
    pub fn declare(writer: &ShaderWriter) -> Self {
        let zero = writer.float(0.0);
        Self {
            diffuse: writer.decl_locale("lightDiffuse", writer.construct(&[zero.any()])),
            specular: writer.decl_locale("lightSpecular", writer.construct(&[zero.any()])),
        }
    }
}

/// Indices of the parameters shared by the light wrappers.
const WRAPPER_FIXED_PARAMS: usize = 5;
/// Indices of the parameters `ComputeLight` receives before the surface.
const COMPUTE_LIGHT_FIXED_PARAMS: usize = 6;

/// A GLSL lighting model.
pub trait LightingModel: Send + Sync + Debug {
    /// The name the model is registered under.
    fn name(&self) -> &str;

    /// The configuration the model was created with.
    fn config(&self) -> &LightingConfig;

    /// The surface parameters `ComputeLight` takes, in order.
    fn surface_params(&self) -> Vec<Param>;

    /// The arguments matching [`Self::surface_params`].
    fn surface_args(&self, surface: &Surface) -> Vec<AnyExpr>;

    /// Declares the model BRDF:
    /// `void ComputeLight(Light light, vec3 worldEye, vec3 direction,
    /// float shadowFactor, vec3 worldVertex, vec3 worldNormal, <surface>,
    /// inout vec3 outDiffuse, inout vec3 outSpecular)`.
    ///
    /// `direction` points from the light towards the fragment.
    fn declare_compute_light(&self, writer: &ShaderWriter);

    /// Declares everything the model needs: shadows, light structures, light
    /// getters, the BRDF and the per light type functions.
    fn declare_model(&self, writer: &ShaderWriter) {
        let shadow = self.config().shadow();
        shadow.declare(writer);
        let buffer = LightBuffer::declare(writer);
        declare_light_structs(writer);
        declare_light_getters(writer, buffer);
        self.declare_compute_light(writer);
        declare_light_wrappers(writer, &shadow, &self.surface_params());
    }

    /// Loops over every light of the scene, in the order directional, point,
    /// spot, each range starting where the previous one ended.
    fn compute_combined_lighting(
        &self,
        writer: &ShaderWriter,
        fragment: &FragmentInput,
        surface: &Surface,
        lights_count: Expr<IVec4>,
        output: &OutputComponents,
    ) {
        let begin = writer.decl_locale("begin", writer.int(0));
        let end = writer.decl_locale("end", writer.swizzle::<Int, _>(lights_count, "x"));
        writer.for_range("i", begin, end, |i| {
            let light = writer.call(names::GET_DIRECTIONAL_LIGHT, &[i.any()]);
            self.compute_directional_light(writer, light, fragment, surface, output);
        });

        writer.assign(begin, end);
        writer.add_assign(end, writer.swizzle::<Int, _>(lights_count, "y"));
        writer.for_range("i", begin, end, |i| {
            let light = writer.call(names::GET_POINT_LIGHT, &[i.any()]);
            self.compute_point_light(writer, light, fragment, surface, output);
        });

        writer.assign(begin, end);
        writer.add_assign(end, writer.swizzle::<Int, _>(lights_count, "z"));
        writer.for_range("i", begin, end, |i| {
            let light = writer.call(names::GET_SPOT_LIGHT, &[i.any()]);
            self.compute_spot_light(writer, light, fragment, surface, output);
        });
    }

    /// Adds one directional light to `output`.
    fn compute_directional_light(
        &self,
        writer: &ShaderWriter,
        light: Expr<DirectionalLight>,
        fragment: &FragmentInput,
        surface: &Surface,
        output: &OutputComponents,
    ) {
        let args = wrapper_args(light.any(), fragment, self.surface_args(surface), output);
        writer.emit(writer.call::<Void>(names::COMPUTE_DIRECTIONAL_LIGHT, &args));
    }

    /// Adds one point light to `output`.
    fn compute_point_light(
        &self,
        writer: &ShaderWriter,
        light: Expr<PointLight>,
        fragment: &FragmentInput,
        surface: &Surface,
        output: &OutputComponents,
    ) {
        let args = wrapper_args(light.any(), fragment, self.surface_args(surface), output);
        writer.emit(writer.call::<Void>(names::COMPUTE_POINT_LIGHT, &args));
    }

    /// Adds one spot light to `output`.
    fn compute_spot_light(
        &self,
        writer: &ShaderWriter,
        light: Expr<SpotLight>,
        fragment: &FragmentInput,
        surface: &Surface,
        output: &OutputComponents,
    ) {
        let args = wrapper_args(light.any(), fragment, self.surface_args(surface), output);
        writer.emit(writer.call::<Void>(names::COMPUTE_SPOT_LIGHT, &args));
    }
}

fn wrapper_args(
    light: AnyExpr,
    fragment: &FragmentInput,
    surface: Vec<AnyExpr>,
    output: &OutputComponents,
) -> Vec<AnyExpr> {
    let mut args = vec![
        light,
        fragment.world_eye.any(),
        fragment.receives_shadows.any(),
        fragment.world_vertex.any(),
        fragment.world_normal.any(),
    ];
    args.extend(surface);
    args.push(output.diffuse.any());
    args.push(output.specular.any());
    args
}

/// The parameters `ComputeLight` is declared with, surface included.
pub fn compute_light_params(surface: &[Param]) -> Vec<Param> {
    let mut params = vec![
        Param::new::<Light>("light"),
        Param::new::<Vec3>("worldEye"),
        Param::new::<Vec3>("direction"),
        Param::new::<Float>("shadowFactor"),
        Param::new::<Vec3>("worldVertex"),
        Param::new::<Vec3>("worldNormal"),
    ];
    params.extend_from_slice(surface);
    params.push(Param::inout::<Vec3>("outDiffuse"));
    params.push(Param::inout::<Vec3>("outSpecular"));
    params
}

/// Typed view over the parameters of a `ComputeLight` implementation.
#[derive(Debug, Clone, Copy)]
pub struct ComputeLightParams {
    /// The light.
    pub light: Expr<Light>,
    /// Camera position.
    pub world_eye: Expr<Vec3>,
    /// Light to fragment direction.
    pub direction: Expr<Vec3>,
    /// 1.0 when fully lit.
    pub shadow_factor: Expr<Float>,
    /// Fragment position.
    pub world_vertex: Expr<Vec3>,
    /// Fragment normal.
    pub world_normal: Expr<Vec3>,
    /// Diffuse accumulator.
    pub out_diffuse: Expr<Vec3>,
    /// Specular accumulator.
    pub out_specular: Expr<Vec3>,
}

impl ComputeLightParams {
    /// Reads the fixed parameters, `surface_len` being the number of surface ones.
    pub fn read(params: &Params<'_>, surface_len: usize) -> Self {
        let outputs = COMPUTE_LIGHT_FIXED_PARAMS + surface_len;
        Self {
            light: params.get(0),
            world_eye: params.get(1),
            direction: params.get(2),
            shadow_factor: params.get(3),
            world_vertex: params.get(4),
            world_normal: params.get(5),
            out_diffuse: params.get(outputs),
            out_specular: params.get(outputs + 1),
        }
    }

    /// The surface parameter at `index`, counted from the first surface parameter.
    pub fn surface<T: GlslType>(params: &Params<'_>, index: usize) -> Expr<T> {
        params.get(COMPUTE_LIGHT_FIXED_PARAMS + index)
    }

    /// `light.m_colour`
    pub fn colour(&self, writer: &ShaderWriter) -> Expr<Vec3> {
        writer.member(self.light, "m_colour")
    }

    /// `light.m_intensity.x`, the diffuse intensity.
    pub fn diffuse_intensity(&self, writer: &ShaderWriter) -> Expr<Float> {
        writer.swizzle(writer.member::<Vec2, _>(self.light, "m_intensity"), "x")
    }

    /// `light.m_intensity.y`, the specular intensity.
    pub fn specular_intensity(&self, writer: &ShaderWriter) -> Expr<Float> {
        writer.swizzle(writer.member::<Vec2, _>(self.light, "m_intensity"), "y")
    }
}

fn declare_light_structs(writer: &ShaderWriter) {
    writer
        .decl_struct(Light::NAME)
        .member::<Vec3>("m_colour")
        .member::<Vec2>("m_intensity")
        .member::<Float>("m_farPlane")
        .member::<Int>("m_index")
        .end();
    writer
        .decl_struct(DirectionalLight::NAME)
        .member::<Light>("m_lightBase")
        .member::<Vec3>("m_direction")
        .member::<Mat4>("m_transform")
        .end();
    writer
        .decl_struct(PointLight::NAME)
        .member::<Light>("m_lightBase")
        .member::<Vec3>("m_position")
        .member::<Vec3>("m_attenuation")
        .end();
    writer
        .decl_struct(SpotLight::NAME)
        .member::<Light>("m_lightBase")
        .member::<Vec3>("m_position")
        .member::<Vec3>("m_attenuation")
        .member::<Vec3>("m_direction")
        .member::<Float>("m_exponent")
        .member::<Float>("m_cutOff")
        .member::<Mat4>("m_transform")
        .end();
}

/// `texelFetch(c3d_sLights, offset + component)`
fn fetch(
    writer: &ShaderWriter,
    buffer: LightBuffer,
    offset: Expr<Int>,
    component: i32,
) -> Expr<Vec4> {
    let index = if component == 0 {
        offset
    } else {
        writer.add(offset, writer.int(component))
    };
    writer.texel_fetch(buffer.lights, index)
}

fn fetch_matrix(
    writer: &ShaderWriter,
    buffer: LightBuffer,
    offset: Expr<Int>,
    first: i32,
) -> Expr<Mat4> {
    let columns = (first..first + 4)
        .map(|component| fetch(writer, buffer, offset, component).any())
        .collect::<Vec<_>>();
    writer.construct(&columns)
}

/// Light buffer layout, one `vec4` per component:
/// * base: `colour.rgb, shadow map index`, `intensity.xy, far plane, unused`;
/// * directional: `direction`, then the 4 columns of the light matrix;
/// * point: `position`, `attenuation`;
/// * spot: `position`, `attenuation`, `direction`, `exponent, cut off`, then
///   the 4 columns of the light matrix.
fn declare_light_getters(writer: &ShaderWriter, buffer: LightBuffer) {
    let base_params = [Param::new::<Int>("offset")];
    writer.implement_function::<Light>(names::GET_BASE_LIGHT, &base_params, |params| {
        let offset = params.get::<Int>(0);
        let result = writer.decl_locale_uninit::<Light>("result");
        let colour_index = writer.decl_locale("colourIndex", fetch(writer, buffer, offset, 0));
        let intensity_far_plane =
            writer.decl_locale("intensityFarPlane", fetch(writer, buffer, offset, 1));
        writer.assign(
            writer.member(result, "m_colour"),
            writer.swizzle::<Vec3, _>(colour_index, "rgb"),
        );
        writer.assign(
            writer.member(result, "m_index"),
            writer.cast::<Int, _>(writer.swizzle::<Float, _>(colour_index, "a")),
        );
        writer.assign(
            writer.member(result, "m_intensity"),
            writer.swizzle::<Vec2, _>(intensity_far_plane, "xy"),
        );
        writer.assign(
            writer.member(result, "m_farPlane"),
            writer.swizzle::<Float, _>(intensity_far_plane, "z"),
        );
        writer.return_(result);
    });

    let light_offset = |params: &Params<'_>| {
        let index = params.get::<Int>(0);
        writer.decl_locale(
            "offset",
            writer.mul(index, writer.int(MAX_LIGHT_COMPONENTS)),
        )
    };
    let base = |offset: Expr<Int>| -> Expr<Light> {
        writer.call(names::GET_BASE_LIGHT, &[offset.any()])
    };

    writer.implement_function::<DirectionalLight>(
        names::GET_DIRECTIONAL_LIGHT,
        &[Param::new::<Int>("index")],
        |params| {
            let offset = light_offset(params);
            let result = writer.decl_locale_uninit::<DirectionalLight>("result");
            writer.assign(writer.member(result, "m_lightBase"), base(offset));
            writer.add_assign(offset, writer.int(BASE_LIGHT_COMPONENTS));
            writer.assign(
                writer.member(result, "m_direction"),
                writer.swizzle::<Vec3, _>(fetch(writer, buffer, offset, 0), "xyz"),
            );
            writer.assign(
                writer.member(result, "m_transform"),
                fetch_matrix(writer, buffer, offset, 1),
            );
            writer.return_(result);
        },
    );

    writer.implement_function::<PointLight>(
        names::GET_POINT_LIGHT,
        &[Param::new::<Int>("index")],
        |params| {
            let offset = light_offset(params);
            let result = writer.decl_locale_uninit::<PointLight>("result");
            writer.assign(writer.member(result, "m_lightBase"), base(offset));
            writer.add_assign(offset, writer.int(BASE_LIGHT_COMPONENTS));
            writer.assign(
                writer.member(result, "m_position"),
                writer.swizzle::<Vec3, _>(fetch(writer, buffer, offset, 0), "xyz"),
            );
            writer.assign(
                writer.member(result, "m_attenuation"),
                writer.swizzle::<Vec3, _>(fetch(writer, buffer, offset, 1), "xyz"),
            );
            writer.return_(result);
        },
    );

    writer.implement_function::<SpotLight>(
        names::GET_SPOT_LIGHT,
        &[Param::new::<Int>("index")],
        |params| {
            let offset = light_offset(params);
            let result = writer.decl_locale_uninit::<SpotLight>("result");
            writer.assign(writer.member(result, "m_lightBase"), base(offset));
            writer.add_assign(offset, writer.int(BASE_LIGHT_COMPONENTS));
            writer.assign(
                writer.member(result, "m_position"),
                writer.swizzle::<Vec3, _>(fetch(writer, buffer, offset, 0), "xyz"),
            );
            writer.assign(
                writer.member(result, "m_attenuation"),
                writer.swizzle::<Vec3, _>(fetch(writer, buffer, offset, 1), "xyz"),
            );
            writer.assign(
                writer.member(result, "m_direction"),
                writer.swizzle::<Vec3, _>(fetch(writer, buffer, offset, 2), "xyz"),
            );
            let exponent_cut_off =
                writer.decl_locale("exponentCutOff", fetch(writer, buffer, offset, 3));
            writer.assign(
                writer.member(result, "m_exponent"),
                writer.swizzle::<Float, _>(exponent_cut_off, "x"),
            );
            writer.assign(
                writer.member(result, "m_cutOff"),
                writer.swizzle::<Float, _>(exponent_cut_off, "y"),
            );
            writer.assign(
                writer.member(result, "m_transform"),
                fetch_matrix(writer, buffer, offset, 4),
            );
            writer.return_(result);
        },
    );
}

fn wrapper_params<L: GlslType>(surface: &[Param]) -> Vec<Param> {
    let mut params = vec![
        Param::new::<L>("light"),
        Param::new::<Vec3>("worldEye"),
        Param::new::<Int>("receivesShadows"),
        Param::new::<Vec3>("worldVertex"),
        Param::new::<Vec3>("worldNormal"),
    ];
    params.extend_from_slice(surface);
    params.push(Param::inout::<Vec3>("outDiffuse"));
    params.push(Param::inout::<Vec3>("outSpecular"));
    params
}

struct WrapperParams {
    world_eye: Expr<Vec3>,
    receives_shadows: Expr<Int>,
    world_vertex: Expr<Vec3>,
    world_normal: Expr<Vec3>,
    surface: Vec<AnyExpr>,
    out_diffuse: Expr<Vec3>,
    out_specular: Expr<Vec3>,
}

impl WrapperParams {
    fn read(params: &Params<'_>, surface_len: usize) -> Self {
        let outputs = WRAPPER_FIXED_PARAMS + surface_len;
        Self {
            world_eye: params.get(1),
            receives_shadows: params.get(2),
            world_vertex: params.get(3),
            world_normal: params.get(4),
            surface: (WRAPPER_FIXED_PARAMS..outputs).map(|i| params.any(i)).collect(),
            out_diffuse: params.get(outputs),
            out_specular: params.get(outputs + 1),
        }
    }

    /// `shadowFactor = 1.0 - min(float(receivesShadows), shadow)`
    fn apply_shadow(&self, writer: &ShaderWriter, factor: Expr<Float>, shadow: Expr<Float>) {
        writer.assign(
            factor,
            writer.sub(
                writer.float(1.0),
                writer.min(writer.cast::<Float, _>(self.receives_shadows), shadow),
            ),
        );
    }

    /// Calls `ComputeLight` for `base`, accumulating into `output`.
    fn compute_light(
        &self,
        writer: &ShaderWriter,
        base: Expr<Light>,
        direction: Expr<Vec3>,
        shadow_factor: Expr<Float>,
        output: &OutputComponents,
    ) {
        let mut args = vec![
            base.any(),
            self.world_eye.any(),
            direction.any(),
            shadow_factor.any(),
            self.world_vertex.any(),
            self.world_normal.any(),
        ];
        args.extend(self.surface.iter().copied());
        args.push(output.diffuse.any());
        args.push(output.specular.any());
        writer.emit(writer.call::<Void>(COMPUTE_LIGHT, &args));
    }

    /// `attenuation = fma(att.z, d * d, fma(att.y, d, att.x))`
    fn attenuation(
        &self,
        writer: &ShaderWriter,
        attenuation: Expr<Vec3>,
        distance: Expr<Float>,
    ) -> Expr<Float> {
        writer.decl_locale(
            "attenuation",
            writer.fma(
                writer.swizzle(attenuation, "z"),
                writer.mul(distance, distance),
                writer.fma(
                    writer.swizzle(attenuation, "y"),
                    distance,
                    writer.swizzle(attenuation, "x"),
                ),
            ),
        )
    }
}

fn declare_light_wrappers(writer: &ShaderWriter, shadow: &Shadow, surface: &[Param]) {
    let surface_len = surface.len();

    writer.implement_function::<Void>(
        names::COMPUTE_DIRECTIONAL_LIGHT,
        &wrapper_params::<DirectionalLight>(surface),
        |params| {
            let p = WrapperParams::read(params, surface_len);
            let light = params.get::<DirectionalLight>(0);
            let output = OutputComponents::declare(writer);
            let direction = writer.decl_locale(
                "lightDirection",
                writer.normalize(writer.member::<Vec3, _>(light, "m_direction")),
            );
            let shadow_factor = writer.decl_locale("shadowFactor", writer.float(1.0));
            if shadow.has_directional() {
                let amount = shadow.compute_directional_shadow(
                    writer,
                    writer.member(light, "m_transform"),
                    p.world_vertex,
                    direction,
                    p.world_normal,
                );
                p.apply_shadow(writer, shadow_factor, amount);
            }
            p.compute_light(
                writer,
                writer.member(light, "m_lightBase"),
                direction,
                shadow_factor,
                &output,
            );
            writer.add_assign(p.out_diffuse, output.diffuse);
            writer.add_assign(p.out_specular, output.specular);
        },
    );

    writer.implement_function::<Void>(
        names::COMPUTE_POINT_LIGHT,
        &wrapper_params::<PointLight>(surface),
        |params| {
            let p = WrapperParams::read(params, surface_len);
            let light = params.get::<PointLight>(0);
            let position = writer.member::<Vec3, _>(light, "m_position");
            let output = OutputComponents::declare(writer);
            let light_to_vertex =
                writer.decl_locale("lightToVertex", writer.sub(p.world_vertex, position));
            let distance = writer.decl_locale("distance", writer.length(light_to_vertex));
            let direction =
                writer.decl_locale("lightDirection", writer.normalize(light_to_vertex));
            let shadow_factor = writer.decl_locale("shadowFactor", writer.float(1.0));
            if shadow.has_point() {
                let amount =
                    shadow.compute_point_shadow(writer, p.world_vertex, position, p.world_normal);
                p.apply_shadow(writer, shadow_factor, amount);
            }
            p.compute_light(
                writer,
                writer.member(light, "m_lightBase"),
                direction,
                shadow_factor,
                &output,
            );
            let attenuation =
                p.attenuation(writer, writer.member(light, "m_attenuation"), distance);
            writer.add_assign(p.out_diffuse, writer.div(output.diffuse, attenuation));
            writer.add_assign(p.out_specular, writer.div(output.specular, attenuation));
        },
    );

    writer.implement_function::<Void>(
        names::COMPUTE_SPOT_LIGHT,
        &wrapper_params::<SpotLight>(surface),
        |params| {
            let p = WrapperParams::read(params, surface_len);
            let light = params.get::<SpotLight>(0);
            let position = writer.member::<Vec3, _>(light, "m_position");
            let cut_off = writer.member::<Float, _>(light, "m_cutOff");
            let light_to_vertex =
                writer.decl_locale("lightToVertex", writer.sub(p.world_vertex, position));
            let distance = writer.decl_locale("distance", writer.length(light_to_vertex));
            let direction =
                writer.decl_locale("lightDirection", writer.normalize(light_to_vertex));
            let spot_factor = writer.decl_locale(
                "spotFactor",
                writer.dot(direction, writer.member(light, "m_direction")),
            );
            writer.if_(writer.gt(spot_factor, cut_off), || {
                let output = OutputComponents::declare(writer);
                let shadow_factor = writer.decl_locale("shadowFactor", writer.float(1.0));
                if shadow.has_spot() {
                    let amount = shadow.compute_spot_shadow(
                        writer,
                        writer.member(light, "m_transform"),
                        p.world_vertex,
                        direction,
                        p.world_normal,
                    );
                    p.apply_shadow(writer, shadow_factor, amount);
                }
                p.compute_light(
                    writer,
                    writer.member(light, "m_lightBase"),
                    direction,
                    shadow_factor,
                    &output,
                );
                let attenuation =
                    p.attenuation(writer, writer.member(light, "m_attenuation"), distance);
                let one = writer.float(1.0);
                writer.assign(
                    spot_factor,
                    writer.sub(
                        one,
                        writer.div(writer.sub(one, spot_factor), writer.sub(one, cut_off)),
                    ),
                );
                let weight = writer.decl_locale("weight", writer.div(spot_factor, attenuation));
                writer.add_assign(p.out_diffuse, writer.mul(weight, output.diffuse));
                writer.add_assign(p.out_specular, writer.mul(weight, output.specular));
            });
        },
    );
}
