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

//! Pixel shader generation.

use crate::bindings::TEXTURE_SET;
use crate::lighting::{FragmentInput, LightingModel, OutputComponents, Surface};
use crate::options::ShaderOptions;
use crate::ubos::{
    ModelUbo, PassBuffer, PickingUbo, SceneUbo, TextureConfigBuffer, TexturesUbo,
};
use crate::vertex::Varyings;
use crate::writer::*;
use prism_core::renderer::api::{CompareFunction, ShaderStage};
use prism_core::renderer::flags::{PassFlags, ProgramFlags, SceneFlags, TextureChannels};

/// Name of the parallax occlusion mapping helper.
pub const PARALLAX_MAPPING: &str = "ParallaxMapping";

const PARALLAX_SCALE: f32 = 0.1;
const PARALLAX_MIN_LAYERS: f32 = 8.0;
const PARALLAX_MAX_LAYERS: f32 = 32.0;

/// The material samplers of a pass, one per textured channel.
///
/// Each map is sampled through the configuration of its texture unit.
#[derive(Debug, Clone)]
pub struct MaterialTextures {
    maps: Vec<(TextureChannels, u32, Expr<Sampler2D>)>,
    configs: Option<(TexturesUbo, TextureConfigBuffer)>,
}

impl MaterialTextures {
    /// Declares `c3d_map{i}` for every channel of `options`, in channel bit order,
    /// along with the unit ids and texture configurations when there is any map.
    pub fn declare(writer: &ShaderWriter, options: &ShaderOptions) -> Self {
        let configs = (options.texture_count() > 0)
            .then(|| (TexturesUbo::declare(writer), TextureConfigBuffer::declare(writer)));
        let maps = options
            .texture_flags
            .iter()
            .filter_map(|channel| {
                let binding = options.texture_binding(channel)?;
                let index = options.texture_index(channel)?;
                let name = format!("c3d_map{index}");
                let sampler = writer.decl_sampler::<Sampler2D>(&name, TEXTURE_SET, binding);
                Some((channel, index, sampler))
            })
            .collect();
        Self { maps, configs }
    }

    /// The sampler of `channel`, if the pass has one.
    pub fn get(&self, channel: TextureChannels) -> Option<Expr<Sampler2D>> {
        self.maps
            .iter()
            .find(|(c, _, _)| *c == channel)
            .map(|(_, _, sampler)| *sampler)
    }

    /// `texture(map, coords)` for `channel`, if the pass has a map for it.
    ///
    /// `coords` are first transformed by the map configuration, read into a
    /// `transform{i}` local. Must be called inside a function body.
    pub fn sample(
        &self,
        writer: &ShaderWriter,
        channel: TextureChannels,
        coords: Expr<Vec2>,
    ) -> Option<Expr<Vec4>> {
        let (_, index, map) = self.maps.iter().find(|(c, _, _)| *c == channel)?;
        let coords = match self.configs {
            Some((units, configs)) => {
                let transform = writer.decl_locale(
                    &format!("transform{index}"),
                    configs.transform(writer, units.unit(writer, *index)),
                );
                writer.fma(
                    coords,
                    writer.swizzle(transform, "xy"),
                    writer.swizzle(transform, "zw"),
                )
            }
            None => coords,
        };
        Some(writer.texture(*map, coords))
    }
}

/// The comparison passing when `alpha func reference` holds, `None` for
/// [`CompareFunction::Always`] and [`CompareFunction::Never`].
fn alpha_comparison(
    writer: &ShaderWriter,
    func: CompareFunction,
    alpha: Expr<Float>,
    reference: Expr<Float>,
) -> Option<Expr<Bool>> {
    match func {
        CompareFunction::Less => Some(writer.lt(alpha, reference)),
        CompareFunction::LessEqual => Some(writer.le(alpha, reference)),
        CompareFunction::Equal => Some(writer.eq(alpha, reference)),
        CompareFunction::NotEqual => Some(writer.ne(alpha, reference)),
        CompareFunction::Greater => Some(writer.gt(alpha, reference)),
        CompareFunction::GreaterEqual => Some(writer.ge(alpha, reference)),
        CompareFunction::Always | CompareFunction::Never => None,
    }
}

/// Discards the fragment when the alpha test fails.
fn emit_alpha_test(
    writer: &ShaderWriter,
    options: &ShaderOptions,
    alpha: Expr<Float>,
    reference: Expr<Float>,
) {
    if !options.pass_flags.contains(PassFlags::ALPHA_TEST) {
        return;
    }
    match options.alpha_func {
        CompareFunction::Always => {}
        CompareFunction::Never => writer.discard(),
        func => {
            if let Some(pass) = alpha_comparison(writer, func, alpha, reference) {
                writer.if_(writer.not(pass), || writer.discard());
            }
        }
    }
}

/// `vec2 ParallaxMapping(vec2 texCoords, vec3 viewDir)`, steep parallax
/// with a final interpolation between the two closest layers.
fn declare_parallax_mapping(writer: &ShaderWriter, height_map: Expr<Sampler2D>) {
    writer.implement_function::<Vec2>(
        PARALLAX_MAPPING,
        &[
            Param::new::<Vec2>("texCoords"),
            Param::new::<Vec3>("viewDir"),
        ],
        |params| {
            let tex_coords = params.get::<Vec2>(0);
            let view_dir = params.get::<Vec3>(1);
            let one = writer.float(1.0);
            let zero = writer.float(0.0);
            let depth_at = |coords: Expr<Vec2>| {
                writer.swizzle::<Float, _>(writer.texture(height_map, coords), "r")
            };

            let num_layers = writer.decl_locale(
                "numLayers",
                writer.mix(
                    writer.float(PARALLAX_MAX_LAYERS),
                    writer.float(PARALLAX_MIN_LAYERS),
                    writer.abs(writer.dot(
                        writer.construct::<Vec3>(&[zero.any(), zero.any(), one.any()]),
                        view_dir,
                    )),
                ),
            );
            let layer_depth = writer.decl_locale("layerDepth", writer.div(one, num_layers));
            let current_layer_depth = writer.decl_locale("currentLayerDepth", zero);
            let p = writer.decl_locale(
                "p",
                writer.mul(
                    writer.swizzle::<Vec2, _>(view_dir, "xy"),
                    writer.float(PARALLAX_SCALE),
                ),
            );
            let delta = writer.decl_locale("deltaTexCoords", writer.div(p, num_layers));
            let current = writer.decl_locale("currentTexCoords", tex_coords);
            let current_depth = writer.decl_locale("currentDepthMapValue", depth_at(current));

            writer.while_(writer.lt(current_layer_depth, current_depth), || {
                writer.sub_assign(current, delta);
                writer.assign(current_depth, depth_at(current));
                writer.add_assign(current_layer_depth, layer_depth);
            });

            let previous = writer.decl_locale("prevTexCoords", writer.add(current, delta));
            let after_depth = writer.decl_locale(
                "afterDepth",
                writer.sub(current_depth, current_layer_depth),
            );
            let before_depth = writer.decl_locale(
                "beforeDepth",
                writer.add(
                    writer.sub(depth_at(previous), current_layer_depth),
                    layer_depth,
                ),
            );
            let weight = writer.decl_locale(
                "weight",
                writer.div(after_depth, writer.sub(after_depth, before_depth)),
            );
            writer.return_(writer.add(
                writer.mul(previous, weight),
                writer.mul(current, writer.sub(one, weight)),
            ));
        },
    );
}

/// Fog amount for the first fog type of `scene_flags`, `None` without fog.
fn fog_factor(
    writer: &ShaderWriter,
    scene_flags: SceneFlags,
    distance: Expr<Float>,
    density: Expr<Float>,
) -> Option<Expr<Float>> {
    let scaled = writer.mul(distance, density);
    let one = writer.float(1.0);
    if scene_flags.contains(SceneFlags::FOG_LINEAR) {
        Some(writer.clamp(scaled, writer.float(0.0), one))
    } else if scene_flags.contains(SceneFlags::FOG_EXPONENTIAL) {
        Some(writer.sub(one, writer.exp(writer.neg(scaled))))
    } else if scene_flags.contains(SceneFlags::FOG_SQUARED_EXPONENTIAL) {
        Some(writer.sub(one, writer.exp(writer.neg(writer.mul(scaled, scaled)))))
    } else {
        None
    }
}

/// Generates the colour pixel shader of a pipeline variant.
///
/// `lighting` is only used when the program has [`ProgramFlags::LIGHTING`].
pub fn pixel_shader(options: &ShaderOptions, lighting: Option<&dyn LightingModel>) -> String {
    let writer = ShaderWriter::new(ShaderStage::Fragment);
    write_pixel_shader(&writer, options, lighting);
    writer.finalise()
}

fn write_pixel_shader(
    writer: &ShaderWriter,
    options: &ShaderOptions,
    lighting: Option<&dyn LightingModel>,
) {
    let lighting = lighting.filter(|_| options.has_lighting());

    let pass_buffer = PassBuffer::declare(writer);
    let scene = SceneUbo::declare(writer);
    let model = ModelUbo::declare(writer);
    let picking = options
        .program_flags
        .contains(ProgramFlags::PICKING)
        .then(|| PickingUbo::declare(writer));
    let input = Varyings::declare_inputs(writer);
    let textures = MaterialTextures::declare(writer, options);
    let frag_colour = writer.decl_output::<Vec4>("pxl_fragColor", 0);
    let picking_output = picking.map(|_| writer.decl_output_flat::<UVec4>("pxl_picking", 1));
    writer.blank_line();

    if let Some(lighting_model) = lighting {
        lighting_model.declare_model(writer);
    }
    let height_map = textures
        .get(TextureChannels::HEIGHT)
        .filter(|_| options.has_parallax());
    if let Some(height_map) = height_map {
        declare_parallax_mapping(writer, height_map);
    }

    writer.implement_function::<Void>("main", &[], |_| {
        let one = writer.float(1.0);
        let material =
            writer.decl_locale("material", pass_buffer.material(writer, input.material));
        let diffuse = writer.member::<Vec4, _>(material, "m_diffuse");
        let specular = writer.member::<Vec4, _>(material, "m_specular");
        let emissive = writer.member::<Vec4, _>(material, "m_emissive");
        let common = writer.member::<Vec4, _>(material, "m_common");

        let tex_coord =
            writer.decl_locale("texCoord", writer.swizzle::<Vec2, _>(input.texture, "xy"));
        if height_map.is_some() {
            let view_dir = writer.decl_locale(
                "viewDir",
                writer.normalize(writer.sub(
                    input.tangent_space_view_position,
                    input.tangent_space_frag_position,
                )),
            );
            writer.assign(
                tex_coord,
                writer.call(PARALLAX_MAPPING, &[tex_coord.any(), view_dir.any()]),
            );
        }
        let sample = |channel| textures.sample(writer, channel, tex_coord);

        let alpha = writer.decl_locale("alpha", writer.swizzle::<Float, _>(diffuse, "a"));
        if let Some(opacity) = sample(TextureChannels::OPACITY) {
            writer.mul_assign(alpha, writer.swizzle::<Float, _>(opacity, "r"));
        }
        emit_alpha_test(writer, options, alpha, writer.swizzle(common, "x"));

        let normal = writer.decl_locale("normal", writer.normalize(input.normal));
        if let Some(normal_map) = sample(TextureChannels::NORMAL) {
            let tangent_normal = writer.decl_locale(
                "tangentNormal",
                writer.sub(
                    writer.mul(writer.swizzle::<Vec3, _>(normal_map, "xyz"), writer.float(2.0)),
                    writer.construct::<Vec3>(&[one.any()]),
                ),
            );
            let tbn = writer.construct::<Mat3>(&[
                writer.normalize(input.tangent).any(),
                writer.normalize(input.bitangent).any(),
                normal.any(),
            ]);
            writer.assign(normal, writer.normalize(writer.mul(tbn, tangent_normal)));
        }

        let albedo = writer.decl_locale("albedo", writer.swizzle::<Vec3, _>(diffuse, "rgb"));
        if let Some(map) = sample(TextureChannels::DIFFUSE) {
            writer.mul_assign(albedo, writer.swizzle::<Vec3, _>(map, "rgb"));
        }
        let specular_colour =
            writer.decl_locale("specular", writer.swizzle::<Vec3, _>(specular, "rgb"));
        let exponent = writer.decl_locale("exponent", writer.swizzle::<Float, _>(specular, "a"));
        let metallic = writer.decl_locale("metallic", writer.swizzle::<Float, _>(emissive, "a"));
        let metallic_roughness = options.pass_flags.contains(PassFlags::PBR_METALLIC_ROUGHNESS);
        if let Some(map) = sample(TextureChannels::SPECULAR) {
            if metallic_roughness {
                writer.mul_assign(metallic, writer.swizzle::<Float, _>(map, "r"));
            } else {
                writer.mul_assign(specular_colour, writer.swizzle::<Vec3, _>(map, "rgb"));
            }
        }
        if let Some(map) = sample(TextureChannels::GLOSS) {
            writer.mul_assign(exponent, writer.swizzle::<Float, _>(map, "r"));
        }
        let emissive_colour =
            writer.decl_locale("emissive", writer.swizzle::<Vec3, _>(emissive, "rgb"));
        if let Some(map) = sample(TextureChannels::EMISSIVE) {
            writer.mul_assign(emissive_colour, writer.swizzle::<Vec3, _>(map, "rgb"));
        }
        let occlusion = writer.decl_locale("occlusion", one);
        if let Some(map) = sample(TextureChannels::AMBIENT_OCCLUSION) {
            writer.assign(occlusion, writer.swizzle::<Float, _>(map, "r"));
        }

        // The specular exponent slot holds roughness for metallic/roughness,
        // glossiness for specular/glossiness and shininess otherwise.
        let roughness = if metallic_roughness {
            writer.decl_locale("roughness", exponent)
        } else {
            writer.decl_locale("roughness", writer.sub(one, exponent))
        };
        let surface = Surface {
            albedo,
            specular: specular_colour,
            metallic,
            roughness,
            shininess: exponent,
        };

        let colour = match lighting {
            Some(lighting_model) => {
                let output = OutputComponents::declare(writer);
                let fragment = FragmentInput {
                    world_eye: writer.swizzle(scene.camera_position, "xyz"),
                    world_vertex: input.world_position,
                    world_normal: normal,
                    receives_shadows: model.shadow_receiver,
                };
                lighting_model.compute_combined_lighting(
                    writer,
                    &fragment,
                    &surface,
                    scene.lights_count,
                    &output,
                );
                let ambient = writer.mul(
                    writer.mul(writer.swizzle::<Vec3, _>(scene.ambient_light, "rgb"), albedo),
                    occlusion,
                );
                writer.decl_locale(
                    "colour",
                    writer.add(
                        writer.add(output.diffuse, output.specular),
                        writer.add(ambient, emissive_colour),
                    ),
                )
            }
            None => writer.decl_locale("colour", writer.add(albedo, emissive_colour)),
        };

        let distance = writer.length(writer.sub(
            input.world_position,
            writer.swizzle::<Vec3, _>(scene.camera_position, "xyz"),
        ));
        if let Some(factor) = fog_factor(writer, options.scene_flags, distance, scene.fog_density) {
            let fog = writer.decl_locale("fogFactor", factor);
            writer.assign(
                colour,
                writer.mix(
                    colour,
                    writer.swizzle::<Vec3, _>(scene.background_colour, "rgb"),
                    fog,
                ),
            );
        }

        writer.assign(
            frag_colour,
            writer.construct::<Vec4>(&[colour.any(), alpha.any()]),
        );
        if let (Some(picking), Some(output)) = (picking, picking_output) {
            writer.assign(
                output,
                writer.construct::<UVec4>(&[
                    picking.draw_index.any(),
                    picking.node_index.any(),
                    writer.cast::<UInt, _>(input.instance).any(),
                    writer.uint(0).any(),
                ]),
            );
        }
    });
}

/// Generates the pixel shader of depth-only programs.
///
/// Fragments are still alpha tested. Shadow map programs also write the depth
/// moments read by variance shadow filtering.
pub fn depth_pixel_shader(options: &ShaderOptions) -> String {
    let writer = ShaderWriter::new(ShaderStage::Fragment);
    write_depth_pixel_shader(&writer, options);
    writer.finalise()
}

fn write_depth_pixel_shader(writer: &ShaderWriter, options: &ShaderOptions) {
    let alpha_test = options.pass_flags.contains(PassFlags::ALPHA_TEST);
    let pass_buffer = alpha_test.then(|| PassBuffer::declare(writer));
    let input = Varyings::declare_inputs(writer);
    let textures = alpha_test.then(|| MaterialTextures::declare(writer, options));
    let moments = options
        .program_flags
        .is_shadow_map_program()
        .then(|| writer.decl_output::<Vec2>("pxl_moments", 0));
    let gl_frag_coord = writer.decl_builtin::<Vec4>("gl_FragCoord");
    writer.blank_line();

    writer.implement_function::<Void>("main", &[], |_| {
        if let Some(pass_buffer) = pass_buffer {
            let material =
                writer.decl_locale("material", pass_buffer.material(writer, input.material));
            let diffuse = writer.member::<Vec4, _>(material, "m_diffuse");
            let common = writer.member::<Vec4, _>(material, "m_common");
            let alpha = writer.decl_locale("alpha", writer.swizzle::<Float, _>(diffuse, "a"));
            let coords = writer.swizzle::<Vec2, _>(input.texture, "xy");
            if let Some(opacity) = textures
                .as_ref()
                .and_then(|textures| textures.sample(writer, TextureChannels::OPACITY, coords))
            {
                writer.mul_assign(alpha, writer.swizzle::<Float, _>(opacity, "r"));
            }
            emit_alpha_test(writer, options, alpha, writer.swizzle(common, "x"));
        }
        if let Some(moments) = moments {
            let depth =
                writer.decl_locale("depth", writer.swizzle::<Float, _>(gl_frag_coord, "z"));
            writer.assign(
                moments,
                writer.construct::<Vec2>(&[depth.any(), writer.mul(depth, depth).any()]),
            );
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lighting::{LightingConfig, PhongLightingModel};

    fn options(pass_flags: PassFlags, texture_flags: TextureChannels) -> ShaderOptions {
        ShaderOptions {
            pass_flags,
            texture_flags,
            ..Default::default()
        }
    }

    #[test]
    fn samplers_are_numbered_by_channel_order() {
        let source = pixel_shader(
            &options(
                PassFlags::empty(),
                TextureChannels::EMISSIVE | TextureChannels::DIFFUSE,
            ),
            None,
        );
        assert!(source.contains("layout(set = 1, binding = 0) uniform sampler2D c3d_map0;"));
        assert!(source.contains("layout(set = 1, binding = 1) uniform sampler2D c3d_map1;"));
        assert!(source.contains(
            "vec4 transform0 = c3d_textureConfigs[int(c3d_textures[0].x)].m_transform;"
        ));
        assert!(source.contains(
            "albedo *= texture(c3d_map0, fma(texCoord, transform0.xy, transform0.zw)).rgb;"
        ));
        assert!(source.contains(
            "vec4 transform1 = c3d_textureConfigs[int(c3d_textures[0].y)].m_transform;"
        ));
        assert!(source.contains(
            "emissive *= texture(c3d_map1, fma(texCoord, transform1.xy, transform1.zw)).rgb;"
        ));
    }

    #[test]
    fn alpha_test_discards_failing_fragments() {
        let mut opts = options(PassFlags::ALPHA_TEST, TextureChannels::OPACITY);
        opts.alpha_func = CompareFunction::Greater;
        let source = pixel_shader(&opts, None);
        assert!(source.contains(
            "alpha *= texture(c3d_map0, fma(texCoord, transform0.xy, transform0.zw)).r;"
        ));
        assert!(source.contains(concat!(
            "    if ((!(alpha > material.m_common.x)))\n",
            "    {\n",
            "        discard;\n",
            "    }\n",
        )));

        opts.alpha_func = CompareFunction::Always;
        assert!(!pixel_shader(&opts, None).contains("discard;"));
    }

    #[test]
    fn parallax_walks_layers_in_a_loop() {
        let source = pixel_shader(
            &options(
                PassFlags::PARALLAX_OCCLUSION_MAPPING,
                TextureChannels::NORMAL | TextureChannels::HEIGHT,
            ),
            None,
        );
        assert!(source.contains("vec2 ParallaxMapping(vec2 texCoords, vec3 viewDir)"));
        assert!(source.contains("    while ((currentLayerDepth < currentDepthMapValue))\n"));
        assert!(source.contains("texCoord = ParallaxMapping(texCoord, viewDir);"));
    }

    #[test]
    fn lighting_is_skipped_without_the_program_flag() {
        let model = PhongLightingModel::new(LightingConfig::default());
        let unlit = pixel_shader(&ShaderOptions::default(), Some(&model));
        assert!(!unlit.contains("ComputeLight"));
        assert!(unlit.contains("vec3 colour = (albedo + emissive);"));

        let lit = pixel_shader(
            &ShaderOptions {
                program_flags: ProgramFlags::LIGHTING,
                ..Default::default()
            },
            Some(&model),
        );
        assert!(lit.contains("int end = c3d_lightsCount.x;"));
        assert!(lit.contains("pxl_fragColor = vec4(colour, alpha);"));
    }

    #[test]
    fn fog_mixes_towards_the_background() {
        let source = pixel_shader(
            &ShaderOptions {
                scene_flags: SceneFlags::FOG_EXPONENTIAL,
                ..Default::default()
            },
            None,
        );
        assert!(source.contains("float fogFactor = (1.0 - exp((-(length((vtx_worldPosition - "));
        assert!(source.contains("colour = mix(colour, c3d_backgroundColour.rgb, fogFactor);"));
    }

    #[test]
    fn depth_shader_writes_moments_for_shadow_maps() {
        let shadow = depth_pixel_shader(&ShaderOptions {
            program_flags: ProgramFlags::SHADOW_MAP_SPOT,
            ..Default::default()
        });
        assert!(shadow.contains("layout(location = 0) out vec2 pxl_moments;"));
        assert!(shadow.contains("pxl_moments = vec2(depth, (depth * depth));"));

        let depth = depth_pixel_shader(&ShaderOptions::default());
        assert!(!depth.contains("pxl_"));
        assert!(!depth.contains("Materials"));
    }

    #[test]
    fn texture_configurations_are_declared_only_with_maps() {
        let untextured = pixel_shader(&ShaderOptions::default(), None);
        assert!(!untextured.contains("TextureConfigurations"));
        assert!(!untextured.contains("uniform Textures"));

        let textured = pixel_shader(&options(PassFlags::empty(), TextureChannels::DIFFUSE), None);
        assert!(textured.contains("uniform Textures"));
        assert!(textured.contains("readonly buffer TextureConfigurations"));

        let mut opts = options(PassFlags::ALPHA_TEST, TextureChannels::OPACITY);
        opts.alpha_func = CompareFunction::Greater;
        let depth = depth_pixel_shader(&opts);
        assert!(depth.contains(
            "alpha *= texture(c3d_map0, fma(vtx_texture.xy, transform0.xy, transform0.zw)).r;"
        ));
    }
}
