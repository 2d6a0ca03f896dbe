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

//! Vertex and geometry shader generation.

use crate::bindings::{location, MAX_BONES_COUNT};
use crate::options::ShaderOptions;
use crate::ubos::{
    BillboardUbo, MatrixUbo, ModelMatrixUbo, ModelUbo, MorphingUbo, SceneUbo, SkinningUbo,
};
use crate::writer::*;
use prism_core::renderer::api::ShaderStage;
use prism_core::renderer::flags::ProgramFlags;

/// Name of the skinning helper.
pub const COMPUTE_SKINNING_TRANSFORM: &str = "ComputeSkinningTransform";

/// The values passed from the vertex stage to the pixel stage.
#[derive(Debug, Clone, Copy)]
pub struct Varyings {
    /// World space position.
    pub world_position: Expr<Vec3>,
    /// Fragment position in tangent space.
    pub tangent_space_frag_position: Expr<Vec3>,
    /// Camera position in tangent space.
    pub tangent_space_view_position: Expr<Vec3>,
    /// World space normal.
    pub normal: Expr<Vec3>,
    /// World space tangent.
    pub tangent: Expr<Vec3>,
    /// World space bitangent.
    pub bitangent: Expr<Vec3>,
    /// Texture coordinates.
    pub texture: Expr<Vec3>,
    /// Instance index.
    pub instance: Expr<Int>,
    /// Material index in the pass buffer.
    pub material: Expr<Int>,
    /// Clip space position of this frame.
    pub cur_position: Expr<Vec4>,
    /// Clip space position of the previous frame.
    pub prv_position: Expr<Vec4>,
}

impl Varyings {
    /// Declares the varyings as vertex stage outputs.
    pub fn declare_outputs(writer: &ShaderWriter) -> Self {
        Self {
            world_position: writer.decl_output("vtx_worldPosition", 0),
            tangent_space_frag_position: writer.decl_output("vtx_tangentSpaceFragPosition", 1),
            tangent_space_view_position: writer.decl_output("vtx_tangentSpaceViewPosition", 2),
            normal: writer.decl_output("vtx_normal", 3),
            tangent: writer.decl_output("vtx_tangent", 4),
            bitangent: writer.decl_output("vtx_bitangent", 5),
            texture: writer.decl_output("vtx_texture", 6),
            instance: writer.decl_output_flat("vtx_instance", 7),
            material: writer.decl_output_flat("vtx_material", 8),
            cur_position: writer.decl_output("vtx_curPosition", 9),
            prv_position: writer.decl_output("vtx_prvPosition", 10),
        }
    }

    /// Declares the varyings as pixel stage inputs.
    pub fn declare_inputs(writer: &ShaderWriter) -> Self {
        Self {
            world_position: writer.decl_input("vtx_worldPosition", 0),
            tangent_space_frag_position: writer.decl_input("vtx_tangentSpaceFragPosition", 1),
            tangent_space_view_position: writer.decl_input("vtx_tangentSpaceViewPosition", 2),
            normal: writer.decl_input("vtx_normal", 3),
            tangent: writer.decl_input("vtx_tangent", 4),
            bitangent: writer.decl_input("vtx_bitangent", 5),
            texture: writer.decl_input("vtx_texture", 6),
            instance: writer.decl_input_flat("vtx_instance", 7),
            material: writer.decl_input_flat("vtx_material", 8),
            cur_position: writer.decl_input("vtx_curPosition", 9),
            prv_position: writer.decl_input("vtx_prvPosition", 10),
        }
    }
}

/// Generates the vertex shader of a pipeline variant.
pub fn vertex_shader(options: &ShaderOptions) -> String {
    let writer = ShaderWriter::new(ShaderStage::Vertex);
    if options.is_billboard() {
        billboard_vertex_shader(&writer, options);
    } else {
        mesh_vertex_shader(&writer, options);
    }
    writer.finalise()
}

/// Generates the geometry shader of a pipeline variant.
///
/// The built-in programs have none.
pub fn geometry_shader(_options: &ShaderOptions) -> Option<String> {
    None
}

struct MeshAttributes {
    position: Expr<Vec4>,
    normal: Expr<Vec3>,
    tangent: Expr<Vec3>,
    texture: Expr<Vec3>,
    bone_ids0: Option<Expr<IVec4>>,
    bone_ids1: Option<Expr<IVec4>>,
    weights0: Option<Expr<Vec4>>,
    weights1: Option<Expr<Vec4>>,
    transform: Option<Expr<Mat4>>,
    material: Option<Expr<Int>>,
    position2: Option<Expr<Vec4>>,
    normal2: Option<Expr<Vec3>>,
    tangent2: Option<Expr<Vec3>>,
    texture2: Option<Expr<Vec3>>,
}

impl MeshAttributes {
    fn declare(writer: &ShaderWriter, flags: ProgramFlags) -> Self {
        let skinning = flags.contains(ProgramFlags::SKINNING);
        let instancing = flags.contains(ProgramFlags::INSTANTIATION);
        let morphing = flags.contains(ProgramFlags::MORPHING);
        Self {
            position: writer.decl_input("position", location::POSITION),
            normal: writer.decl_input("normal", location::NORMAL),
            tangent: writer.decl_input("tangent", location::TANGENT),
            texture: writer.decl_input("texcoord", location::TEXTURE),
            bone_ids0: writer.decl_attribute("bone_ids0", location::BONE_IDS0, skinning),
            bone_ids1: writer.decl_attribute("bone_ids1", location::BONE_IDS1, skinning),
            weights0: writer.decl_attribute("weights0", location::WEIGHTS0, skinning),
            weights1: writer.decl_attribute("weights1", location::WEIGHTS1, skinning),
            transform: writer.decl_attribute("transform", location::TRANSFORM, instancing),
            material: writer.decl_attribute("material", location::MATERIAL, instancing),
            position2: writer.decl_attribute("position2", location::POSITION2, morphing),
            normal2: writer.decl_attribute("normal2", location::NORMAL2, morphing),
            tangent2: writer.decl_attribute("tangent2", location::TANGENT2, morphing),
            texture2: writer.decl_attribute("texcoord2", location::TEXTURE2, morphing),
        }
    }
}

/// `mat4 ComputeSkinningTransform(...)`, summing the eight weighted bones.
fn declare_skinning_transform(writer: &ShaderWriter, skinning: &SkinningUbo) {
    let mut params = vec![
        Param::new::<IVec4>("boneIds0"),
        Param::new::<IVec4>("boneIds1"),
        Param::new::<Vec4>("weights0"),
        Param::new::<Vec4>("weights1"),
    ];
    if skinning.instanced {
        params.push(Param::new::<Int>("instance"));
    }
    writer.implement_function::<Mat4>(COMPUTE_SKINNING_TRANSFORM, &params, |params| {
        let first_bone = skinning.instanced.then(|| {
            writer.decl_locale(
                "firstBone",
                writer.mul(params.get::<Int>(4), writer.int(MAX_BONES_COUNT as i32)),
            )
        });
        let bone = |ids: Expr<IVec4>, component: &str| {
            let id = writer.swizzle::<Int, _>(ids, component);
            let id = match first_bone {
                Some(first) => writer.add(first, id),
                None => id,
            };
            writer.index(skinning.bones, id)
        };
        let weighted = |ids: usize, weights: usize, component: &str| {
            writer.mul(
                bone(params.get::<IVec4>(ids), component),
                writer.swizzle::<Float, _>(params.get::<Vec4>(weights), component),
            )
        };
        let transform = writer.decl_locale("boneTransform", weighted(0, 2, "x"));
        for component in ["y", "z", "w"] {
            writer.add_assign(transform, weighted(0, 2, component));
        }
        for component in ["x", "y", "z", "w"] {
            writer.add_assign(transform, weighted(1, 3, component));
        }
        writer.return_(transform);
    });
}

/// Where the model matrices of a mesh come from, skinning aside.
enum ModelSource {
    /// The per-instance transform attribute.
    Instance(Expr<Mat4>),
    /// The model matrices uniform block.
    Uniform(ModelMatrixUbo),
}

fn mesh_vertex_shader(writer: &ShaderWriter, options: &ShaderOptions) {
    let flags = options.program_flags;
    let attributes = MeshAttributes::declare(writer, flags);
    let matrices = MatrixUbo::declare(writer);
    let scene = SceneUbo::declare(writer);
    let model_matrices = match attributes.transform {
        Some(transform) => ModelSource::Instance(transform),
        None => ModelSource::Uniform(ModelMatrixUbo::declare(writer)),
    };
    let model = ModelUbo::declare(writer);
    let skinning = flags
        .contains(ProgramFlags::SKINNING)
        .then(|| SkinningUbo::declare(writer, options.is_instanced()));
    let morphing = flags
        .contains(ProgramFlags::MORPHING)
        .then(|| MorphingUbo::declare(writer));
    let out = Varyings::declare_outputs(writer);
    let gl_position = writer.decl_builtin::<Vec4>("gl_Position");
    let gl_instance_index = writer.decl_builtin::<Int>("gl_InstanceIndex");
    writer.blank_line();

    if let Some(skinning) = &skinning {
        declare_skinning_transform(writer, skinning);
    }

    writer.implement_function::<Void>("main", &[], |_| {
        let one = writer.float(1.0);
        let position = writer.decl_locale(
            "curPosition",
            writer.construct::<Vec4>(&[
                writer.swizzle::<Vec3, _>(attributes.position, "xyz").any(),
                one.any(),
            ]),
        );
        let normal = writer.decl_locale("curNormal", attributes.normal);
        let tangent = writer.decl_locale("curTangent", attributes.tangent);
        let texture = writer.decl_locale("curTexture", attributes.texture);

        if let (Some(morphing), Some(position2), Some(normal2), Some(tangent2), Some(texture2)) = (
            morphing,
            attributes.position2,
            attributes.normal2,
            attributes.tangent2,
            attributes.texture2,
        ) {
            let time = writer.construct::<Vec3>(&[morphing.time.any()]);
            let morph = |from: Expr<Vec3>, to: Expr<Vec3>| {
                writer.fma(writer.sub(to, from), time, from)
            };
            writer.assign(
                writer.swizzle::<Vec3, _>(position, "xyz"),
                morph(
                    writer.swizzle(position, "xyz"),
                    writer.swizzle(position2, "xyz"),
                ),
            );
            writer.assign(normal, morph(normal, normal2));
            writer.assign(tangent, morph(tangent, tangent2));
            writer.assign(texture, morph(texture, texture2));
        }

        let (cur_model, prv_model) = match (&skinning, &model_matrices) {
            (Some(_), _) => {
                let mut args = vec![
                    attributes.bone_ids0.map(AnyExpr::from),
                    attributes.bone_ids1.map(AnyExpr::from),
                    attributes.weights0.map(AnyExpr::from),
                    attributes.weights1.map(AnyExpr::from),
                ]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>();
                if options.is_instanced() {
                    args.push(gl_instance_index.any());
                }
                let skinned = writer.decl_locale(
                    "curMtxModel",
                    writer.call::<Mat4>(COMPUTE_SKINNING_TRANSFORM, &args),
                );
                (skinned, writer.decl_locale("prvMtxModel", skinned))
            }
            (None, ModelSource::Instance(transform)) => (
                writer.decl_locale("curMtxModel", *transform),
                writer.decl_locale("prvMtxModel", *transform),
            ),
            (None, ModelSource::Uniform(model_matrices)) => (
                writer.decl_locale("curMtxModel", model_matrices.cur_model),
                writer.decl_locale("prvMtxModel", model_matrices.prv_model),
            ),
        };

        writer.assign(
            out.material,
            attributes.material.unwrap_or(model.material_index),
        );
        writer.assign(out.instance, gl_instance_index);

        let normal_matrix = writer.decl_locale(
            "normalMatrix",
            writer.transpose(writer.inverse(writer.cast::<Mat3, _>(cur_model))),
        );
        if flags.contains(ProgramFlags::INVERT_NORMALS) {
            writer.assign(normal, writer.neg(normal));
        }
        writer.assign(out.normal, writer.normalize(writer.mul(normal_matrix, normal)));
        writer.assign(out.tangent, writer.normalize(writer.mul(normal_matrix, tangent)));
        // Gram-Schmidt
        writer.assign(
            out.tangent,
            writer.normalize(writer.sub(
                out.tangent,
                writer.mul(writer.dot(out.tangent, out.normal), out.normal),
            )),
        );
        writer.assign(out.bitangent, writer.cross(out.normal, out.tangent));
        writer.assign(out.texture, texture);

        let prv_position = writer.decl_locale("prvPosition", writer.mul(prv_model, position));
        writer.assign(position, writer.mul(cur_model, position));
        emit_positions(
            writer,
            &matrices,
            &scene,
            &out,
            gl_position,
            position,
            prv_position,
        );
    });
}

fn billboard_vertex_shader(writer: &ShaderWriter, options: &ShaderOptions) {
    let flags = options.program_flags;
    let position = writer.decl_input::<Vec4>("position", location::POSITION);
    let texture = writer.decl_input::<Vec3>("texcoord", location::TEXTURE);
    let center = writer.decl_input::<Vec3>("center", location::CENTER);
    let matrices = MatrixUbo::declare(writer);
    let scene = SceneUbo::declare(writer);
    let model_matrices = ModelMatrixUbo::declare(writer);
    let model = ModelUbo::declare(writer);
    let billboard = BillboardUbo::declare(writer);
    let out = Varyings::declare_outputs(writer);
    let gl_position = writer.decl_builtin::<Vec4>("gl_Position");
    let gl_instance_index = writer.decl_builtin::<Int>("gl_InstanceIndex");
    writer.blank_line();

    writer.implement_function::<Void>("main", &[], |_| {
        let one = writer.float(1.0);
        let zero = writer.float(0.0);
        let world_center = |model: Expr<Mat4>| {
            writer.swizzle::<Vec3, _>(
                writer.mul(model, writer.construct::<Vec4>(&[center.any(), one.any()])),
                "xyz",
            )
        };
        let cur_center =
            writer.decl_locale("curBbcenter", world_center(model_matrices.cur_model));
        let prv_center =
            writer.decl_locale("prvBbcenter", world_center(model_matrices.prv_model));
        let to_camera = writer.decl_locale(
            "toCamera",
            writer.sub(
                writer.swizzle::<Vec3, _>(scene.camera_position, "xyz"),
                cur_center,
            ),
        );

        // The view matrix rows are the camera axes in world space.
        let view_row = |row: &str| {
            writer.construct::<Vec3>(&[
                writer
                    .swizzle::<Float, _>(writer.column(matrices.cur_view, 0), row)
                    .any(),
                writer
                    .swizzle::<Float, _>(writer.column(matrices.cur_view, 1), row)
                    .any(),
                writer
                    .swizzle::<Float, _>(writer.column(matrices.cur_view, 2), row)
                    .any(),
            ])
        };
        let (right, up) = if flags.contains(ProgramFlags::SPHERICAL_BILLBOARDS) {
            (
                writer.decl_locale("right", view_row("x")),
                writer.decl_locale("up", view_row("y")),
            )
        } else {
            let right = writer.decl_locale("right", view_row("x"));
            writer.assign(
                right,
                writer.normalize(writer.construct::<Vec3>(&[
                    writer.swizzle::<Float, _>(right, "x").any(),
                    zero.any(),
                    writer.swizzle::<Float, _>(right, "z").any(),
                ])),
            );
            let up = writer.decl_locale(
                "up",
                writer.construct::<Vec3>(&[zero.any(), one.any(), zero.any()]),
            );
            (right, up)
        };

        let width =
            writer.decl_locale("width", writer.swizzle::<Float, _>(billboard.dimensions, "x"));
        let height =
            writer.decl_locale("height", writer.swizzle::<Float, _>(billboard.dimensions, "y"));
        if flags.contains(ProgramFlags::FIXED_SIZE) {
            // Dimensions are in pixels.
            let distance = writer.decl_locale("distance", writer.length(to_camera));
            let window = writer.cast::<Vec2, _>(scene.window_size);
            writer.assign(
                width,
                writer.div(
                    writer.mul(width, distance),
                    writer.swizzle::<Float, _>(window, "x"),
                ),
            );
            writer.assign(
                height,
                writer.div(
                    writer.mul(height, distance),
                    writer.swizzle::<Float, _>(window, "y"),
                ),
            );
        }

        let offset = writer.decl_locale(
            "offset",
            writer.add(
                writer.mul(
                    right,
                    writer.mul(writer.swizzle::<Float, _>(position, "x"), width),
                ),
                writer.mul(
                    up,
                    writer.mul(writer.swizzle::<Float, _>(position, "y"), height),
                ),
            ),
        );

        writer.assign(out.material, model.material_index);
        writer.assign(out.instance, gl_instance_index);
        writer.assign(out.normal, writer.normalize(to_camera));
        writer.assign(out.tangent, right);
        writer.assign(out.bitangent, up);
        writer.assign(out.texture, texture);

        let cur_position = writer.decl_locale(
            "curPosition",
            writer.construct::<Vec4>(&[writer.add(cur_center, offset).any(), one.any()]),
        );
        let prv_position = writer.decl_locale(
            "prvPosition",
            writer.construct::<Vec4>(&[writer.add(prv_center, offset).any(), one.any()]),
        );
        emit_positions(
            writer,
            &matrices,
            &scene,
            &out,
            gl_position,
            cur_position,
            prv_position,
        );
    });
}

/// Projects the world positions, fills the tangent space outputs, applies
/// the jitter and writes `gl_Position`.
fn emit_positions(
    writer: &ShaderWriter,
    matrices: &MatrixUbo,
    scene: &SceneUbo,
    out: &Varyings,
    gl_position: Expr<Vec4>,
    cur_position: Expr<Vec4>,
    prv_position: Expr<Vec4>,
) {
    writer.assign(
        out.world_position,
        writer.swizzle::<Vec3, _>(cur_position, "xyz"),
    );
    let tbn = writer.decl_locale(
        "tbn",
        writer.transpose(writer.construct::<Mat3>(&[
            out.tangent.any(),
            out.bitangent.any(),
            out.normal.any(),
        ])),
    );
    writer.assign(
        out.tangent_space_frag_position,
        writer.mul(tbn, out.world_position),
    );
    writer.assign(
        out.tangent_space_view_position,
        writer.mul(tbn, writer.swizzle::<Vec3, _>(scene.camera_position, "xyz")),
    );

    writer.assign(
        prv_position,
        writer.mul(
            matrices.projection,
            writer.mul(matrices.prv_view, prv_position),
        ),
    );
    writer.assign(
        cur_position,
        writer.mul(
            matrices.projection,
            writer.mul(matrices.cur_view, cur_position),
        ),
    );
    // Sub-pixel jitter: current frame in xy, previous frame in zw.
    writer.add_assign(
        writer.swizzle::<Vec2, _>(cur_position, "xy"),
        writer.mul(
            writer.swizzle::<Vec2, _>(matrices.jitter, "xy"),
            writer.swizzle::<Float, _>(cur_position, "w"),
        ),
    );
    writer.add_assign(
        writer.swizzle::<Vec2, _>(prv_position, "xy"),
        writer.mul(
            writer.swizzle::<Vec2, _>(matrices.jitter, "zw"),
            writer.swizzle::<Float, _>(prv_position, "w"),
        ),
    );
    writer.assign(out.cur_position, cur_position);
    writer.assign(out.prv_position, prv_position);
    writer.assign(gl_position, cur_position);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(flags: ProgramFlags) -> String {
        vertex_shader(&ShaderOptions {
            program_flags: flags,
            ..Default::default()
        })
    }

    #[test]
    fn static_mesh_reads_model_matrices() {
        let source = source(ProgramFlags::empty());
        assert!(source.starts_with("#version 450\n"));
        assert!(source.contains("uniform ModelMatrices"));
        assert!(source.contains("mat4 curMtxModel = c3d_curModel;"));
        assert!(!source.contains("bone_ids0"));
        assert!(source.contains("gl_Position = curPosition;"));
    }

    #[test]
    fn instancing_replaces_model_matrices_by_attributes() {
        let source = source(ProgramFlags::INSTANTIATION);
        assert!(source.contains("layout(location = 8) in mat4 transform;"));
        assert!(source.contains("layout(location = 12) in int material;"));
        assert!(!source.contains("ModelMatrices"));
        assert!(source.contains("vtx_material = material;"));
    }

    #[test]
    fn instanced_skinning_offsets_bones_by_instance() {
        let source = source(ProgramFlags::SKINNING | ProgramFlags::INSTANTIATION);
        assert!(source.contains("readonly buffer InstancedBones"));
        assert!(source.contains("int firstBone = (instance * 400);"));
        assert!(source.contains(concat!(
            "mat4 curMtxModel = ComputeSkinningTransform(",
            "bone_ids0, bone_ids1, weights0, weights1, gl_InstanceIndex);",
        )));
        assert_eq!(source.matches("boneTransform += ").count(), 7);
    }

    #[test]
    fn cylindrical_billboards_keep_up_vertical() {
        let cylindrical = source(ProgramFlags::BILLBOARDS);
        assert!(cylindrical.contains("vec3 up = vec3(0.0, 1.0, 0.0);"));
        assert!(cylindrical.contains("layout(location = 17) in vec3 center;"));
        let spherical = source(ProgramFlags::BILLBOARDS | ProgramFlags::SPHERICAL_BILLBOARDS);
        assert!(spherical
            .contains("vec3 up = vec3(c3d_curView[0].y, c3d_curView[1].y, c3d_curView[2].y);"));
        assert!(!spherical.contains("float distance"));
    }

    #[test]
    fn no_geometry_stage() {
        assert!(geometry_shader(&ShaderOptions::default()).is_none());
    }
}
