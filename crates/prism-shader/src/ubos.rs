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

//! GLSL declarations of the buffers bound in [`crate::bindings::UBO_SET`].
//!
//! Member order and types mirror the std140 layouts written by the UBO pools.

use crate::bindings::*;
use crate::writer::*;

/// Per-material data read from the materials storage buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaterialData;

impl GlslType for MaterialData {
    const NAME: &'static str = "MaterialData";
}

/// Per-texture sampling data read from the texture configurations buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureConfigData;

impl GlslType for TextureConfigData {
    const NAME: &'static str = "TextureConfigData";
}

/// Camera matrices.
#[derive(Debug, Clone, Copy)]
pub struct MatrixUbo {
    /// Projection matrix.
    pub projection: Expr<Mat4>,
    /// View matrix of this frame.
    pub cur_view: Expr<Mat4>,
    /// View matrix of the previous frame.
    pub prv_view: Expr<Mat4>,
    /// Inverse projection matrix.
    pub inv_projection: Expr<Mat4>,
    /// Sub-pixel jitter in `xy`.
    pub jitter: Expr<Vec4>,
}

impl MatrixUbo {
    /// Block name.
    pub const BLOCK: &'static str = "Matrices";

    /// Declares the block, once per writer.
    pub fn declare(writer: &ShaderWriter) -> Self {
        let mut block = writer.decl_ubo(Self::BLOCK, UBO_SET, MATRIX_UBO_BINDING);
        let ubo = Self {
            projection: block.member("c3d_projection"),
            cur_view: block.member("c3d_curView"),
            prv_view: block.member("c3d_prvView"),
            inv_projection: block.member("c3d_invProjection"),
            jitter: block.member("c3d_jitter"),
        };
        block.end();
        ubo
    }
}

/// Scene-wide data.
#[derive(Debug, Clone, Copy)]
pub struct SceneUbo {
    /// Ambient light colour.
    pub ambient_light: Expr<Vec4>,
    /// Background colour, used by fog.
    pub background_colour: Expr<Vec4>,
    /// Directional, point and spot light counts in `x`, `y`, `z`.
    pub lights_count: Expr<IVec4>,
    /// World-space camera position.
    pub camera_position: Expr<Vec4>,
    /// Render target size in pixels.
    pub window_size: Expr<IVec2>,
    /// Fog equation selector.
    pub fog_type: Expr<Int>,
    /// Fog density.
    pub fog_density: Expr<Float>,
    /// Elapsed time in seconds.
    pub time: Expr<Float>,
}

impl SceneUbo {
    /// Block name.
    pub const BLOCK: &'static str = "Scene";

    /// Declares the block, once per writer.
    pub fn declare(writer: &ShaderWriter) -> Self {
        let mut block = writer.decl_ubo(Self::BLOCK, UBO_SET, SCENE_UBO_BINDING);
        let ubo = Self {
            ambient_light: block.member("c3d_ambientLight"),
            background_colour: block.member("c3d_backgroundColour"),
            lights_count: block.member("c3d_lightsCount"),
            camera_position: block.member("c3d_cameraPosition"),
            window_size: block.member("c3d_windowSize"),
            fog_type: block.member("c3d_fogType"),
            fog_density: block.member("c3d_fogDensity"),
            time: block.member("c3d_time"),
        };
        block.end();
        ubo
    }
}

/// Current and previous model matrices.
#[derive(Debug, Clone, Copy)]
pub struct ModelMatrixUbo {
    /// Model matrix of the previous frame.
    pub prv_model: Expr<Mat4>,
    /// Model matrix of this frame.
    pub cur_model: Expr<Mat4>,
}

impl ModelMatrixUbo {
    /// Block name.
    pub const BLOCK: &'static str = "ModelMatrices";

    /// Declares the block, once per writer.
    pub fn declare(writer: &ShaderWriter) -> Self {
        let mut block = writer.decl_ubo(Self::BLOCK, UBO_SET, MODEL_MATRIX_UBO_BINDING);
        let ubo = Self {
            prv_model: block.member("c3d_prvModel"),
            cur_model: block.member("c3d_curModel"),
        };
        block.end();
        ubo
    }
}

/// Per-object model data.
#[derive(Debug, Clone, Copy)]
pub struct ModelUbo {
    /// Non-zero when the object receives shadows.
    pub shadow_receiver: Expr<Int>,
    /// Index of the material in the materials buffer.
    pub material_index: Expr<Int>,
    /// Environment map index.
    pub env_map_index: Expr<Int>,
}

impl ModelUbo {
    /// Block name.
    pub const BLOCK: &'static str = "Model";

    /// Declares the block, once per writer.
    pub fn declare(writer: &ShaderWriter) -> Self {
        let mut block = writer.decl_ubo(Self::BLOCK, UBO_SET, MODEL_UBO_BINDING);
        let ubo = Self {
            shadow_receiver: block.member("c3d_shadowReceiver"),
            material_index: block.member("c3d_materialIndex"),
            env_map_index: block.member("c3d_envMapIndex"),
        };
        block.end();
        ubo
    }
}

/// Billboard dimensions.
#[derive(Debug, Clone, Copy)]
pub struct BillboardUbo {
    /// Width and height, in world units or pixels for fixed-size billboards.
    pub dimensions: Expr<Vec2>,
}

impl BillboardUbo {
    /// Block name.
    pub const BLOCK: &'static str = "Billboard";

    /// Declares the block, once per writer.
    pub fn declare(writer: &ShaderWriter) -> Self {
        let mut block = writer.decl_ubo(Self::BLOCK, UBO_SET, BILLBOARD_UBO_BINDING);
        let ubo = Self {
            dimensions: block.member("c3d_dimensions"),
        };
        block.end();
        ubo
    }
}

/// Bone matrices, either per object or for every instance of a batch.
#[derive(Debug, Clone, Copy)]
pub struct SkinningUbo {
    /// The bone array.
    pub bones: Expr<Array<Mat4>>,
    /// `true` when `bones` holds [`MAX_BONES_COUNT`] matrices per instance.
    pub instanced: bool,
}

impl SkinningUbo {
    /// Uniform block name.
    pub const BLOCK: &'static str = "Skinning";
    /// Storage block name used with instancing.
    pub const INSTANCED_BLOCK: &'static str = "InstancedBones";

    /// Declares the uniform block, or the storage block when `instanced`.
    pub fn declare(writer: &ShaderWriter, instanced: bool) -> Self {
        let bones = if instanced {
            let mut block = writer.decl_ssbo(
                Self::INSTANCED_BLOCK,
                UBO_SET,
                SKINNING_UBO_BINDING,
                true,
            );
            let bones = block.member_runtime_array::<Mat4>("c3d_instancedBones");
            block.end();
            bones
        } else {
            let mut block = writer.decl_ubo(Self::BLOCK, UBO_SET, SKINNING_UBO_BINDING);
            let bones = block.member_array::<Mat4>("c3d_bones", MAX_BONES_COUNT);
            block.end();
            bones
        };
        Self { bones, instanced }
    }
}

/// Keyframe interpolation factor.
#[derive(Debug, Clone, Copy)]
pub struct MorphingUbo {
    /// Interpolation factor between the two keyframes.
    pub time: Expr<Float>,
}

impl MorphingUbo {
    /// Block name.
    pub const BLOCK: &'static str = "Morphing";

    /// Declares the block, once per writer.
    pub fn declare(writer: &ShaderWriter) -> Self {
        let mut block = writer.decl_ubo(Self::BLOCK, UBO_SET, MORPHING_UBO_BINDING);
        let ubo = Self {
            time: block.member("c3d_morphTime"),
        };
        block.end();
        ubo
    }
}

/// Picking indices.
#[derive(Debug, Clone, Copy)]
pub struct PickingUbo {
    /// Index of the draw in the frame.
    pub draw_index: Expr<UInt>,
    /// Index of the scene node.
    pub node_index: Expr<UInt>,
}

impl PickingUbo {
    /// Block name.
    pub const BLOCK: &'static str = "Picking";

    /// Declares the block, once per writer.
    pub fn declare(writer: &ShaderWriter) -> Self {
        let mut block = writer.decl_ubo(Self::BLOCK, UBO_SET, PICKING_UBO_BINDING);
        let ubo = Self {
            draw_index: block.member("c3d_drawIndex"),
            node_index: block.member("c3d_nodeIndex"),
        };
        block.end();
        ubo
    }
}

/// Texture unit ids, four per `uvec4`.
#[derive(Debug, Clone, Copy)]
pub struct TexturesUbo {
    /// The packed ids.
    pub indices: Expr<Array<UVec4>>,
}

impl TexturesUbo {
    /// Block name.
    pub const BLOCK: &'static str = "Textures";

    /// Declares the block, once per writer.
    pub fn declare(writer: &ShaderWriter) -> Self {
        let mut block = writer.decl_ubo(Self::BLOCK, UBO_SET, TEXTURES_UBO_BINDING);
        let ubo = Self {
            indices: block.member_array("c3d_textures", MAX_TEXTURE_UNITS / 4),
        };
        block.end();
        ubo
    }

    /// The unit id of the `index`th material map, as an `int`.
    pub fn unit(&self, writer: &ShaderWriter, index: u32) -> Expr<Int> {
        let packed = writer.index(self.indices, writer.int((index / 4) as i32));
        let component = ["x", "y", "z", "w"][(index % 4) as usize];
        writer.cast(writer.swizzle::<UInt, _>(packed, component))
    }
}

/// The texture configurations storage buffer, indexed by texture unit id.
#[derive(Debug, Clone, Copy)]
pub struct TextureConfigBuffer {
    /// Every texture configuration of the scene.
    pub configs: Expr<Array<TextureConfigData>>,
}

impl TextureConfigBuffer {
    /// Block name.
    pub const BLOCK: &'static str = "TextureConfigurations";

    /// Declares the `TextureConfigData` struct and the buffer, once per writer.
    ///
    /// `m_transform` scales texture coordinates by `xy` then offsets them by `zw`.
    pub fn declare(writer: &ShaderWriter) -> Self {
        writer
            .decl_struct(TextureConfigData::NAME)
            .member::<Vec4>("m_transform")
            .end();
        let mut block = writer.decl_ssbo(Self::BLOCK, UBO_SET, TEXTURE_BUFFER_BINDING, true);
        let configs = block.member_runtime_array("c3d_textureConfigs");
        block.end();
        Self { configs }
    }

    /// `c3d_textureConfigs[unit].m_transform`
    pub fn transform(&self, writer: &ShaderWriter, unit: Expr<Int>) -> Expr<Vec4> {
        writer.member(writer.index(self.configs, unit), "m_transform")
    }
}

/// The materials storage buffer.
#[derive(Debug, Clone, Copy)]
pub struct PassBuffer {
    /// Every material of the scene, indexed by pass id.
    pub materials: Expr<Array<MaterialData>>,
}

impl PassBuffer {
    /// Block name.
    pub const BLOCK: &'static str = "Materials";

    /// Declares the `MaterialData` struct and the buffer, once per writer.
    ///
    /// Member meaning depends on the lighting model:
    /// * `m_diffuse`: albedo in `rgb`, opacity in `a`;
    /// * `m_specular`: specular colour in `rgb`, shininess, glossiness or roughness in `a`;
    /// * `m_emissive`: emissive colour in `rgb`, metallic or ambient factor in `a`;
    /// * `m_common`: alpha reference, gamma, exposure, unused.
    pub fn declare(writer: &ShaderWriter) -> Self {
        writer
            .decl_struct(MaterialData::NAME)
            .member::<Vec4>("m_diffuse")
            .member::<Vec4>("m_specular")
            .member::<Vec4>("m_emissive")
            .member::<Vec4>("m_common")
            .end();
        let mut block = writer.decl_ssbo(Self::BLOCK, UBO_SET, PASS_BUFFER_BINDING, true);
        let materials = block.member_runtime_array("c3d_materials");
        block.end();
        Self { materials }
    }

    /// `c3d_materials[index]`
    pub fn material(&self, writer: &ShaderWriter, index: Expr<Int>) -> Expr<MaterialData> {
        writer.index(self.materials, index)
    }
}

/// The lights texel buffer.
#[derive(Debug, Clone, Copy)]
pub struct LightBuffer {
    /// The buffer, [`MAX_LIGHT_COMPONENTS`] texels per light.
    pub lights: Expr<SamplerBuffer>,
}

impl LightBuffer {
    /// Sampler name.
    pub const NAME: &'static str = "c3d_sLights";

    /// Declares the buffer, once per writer.
    pub fn declare(writer: &ShaderWriter) -> Self {
        Self {
            lights: writer.decl_sampler(Self::NAME, UBO_SET, LIGHT_BUFFER_BINDING),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prism_core::renderer::api::ShaderStage;

    #[test]
    fn scene_block_matches_its_binding() {
        let writer = ShaderWriter::new(ShaderStage::Fragment);
        let scene = SceneUbo::declare(&writer);
        assert_eq!(writer.text(scene.lights_count), "c3d_lightsCount");
        let source = writer.source();
        assert!(source.starts_with("layout(std140, set = 0, binding = 4) uniform Scene\n{\n"));
        let members: Vec<_> = source
            .lines()
            .filter(|line| line.starts_with("    "))
            .map(str::trim)
            .collect();
        assert_eq!(
            members,
            [
                "vec4 c3d_ambientLight;",
                "vec4 c3d_backgroundColour;",
                "ivec4 c3d_lightsCount;",
                "vec4 c3d_cameraPosition;",
                "ivec2 c3d_windowSize;",
                "int c3d_fogType;",
                "float c3d_fogDensity;",
                "float c3d_time;",
            ]
        );
    }

    #[test]
    fn blocks_are_declared_once() {
        let writer = ShaderWriter::new(ShaderStage::Vertex);
        MatrixUbo::declare(&writer);
        let again = MatrixUbo::declare(&writer);
        assert_eq!(writer.source().matches("uniform Matrices").count(), 1);
        assert_eq!(writer.text(again.cur_view), "c3d_curView");
    }

    #[test]
    fn instanced_skinning_uses_a_storage_buffer() {
        let writer = ShaderWriter::new(ShaderStage::Vertex);
        let skinning = SkinningUbo::declare(&writer, true);
        assert!(skinning.instanced);
        let source = writer.source();
        assert!(
            source.contains("layout(std430, set = 0, binding = 8) readonly buffer InstancedBones")
        );
        assert!(source.contains("mat4 c3d_instancedBones[];"));
    }

    #[test]
    fn texture_configs_are_looked_up_through_unit_ids() {
        let writer = ShaderWriter::new(ShaderStage::Fragment);
        let units = TexturesUbo::declare(&writer);
        let configs = TextureConfigBuffer::declare(&writer);
        let transform = configs.transform(&writer, units.unit(&writer, 5));
        assert_eq!(
            writer.text(transform),
            "c3d_textureConfigs[int(c3d_textures[1].y)].m_transform"
        );
        let source = writer.source();
        assert!(source.contains(
            "layout(std430, set = 0, binding = 1) readonly buffer TextureConfigurations"
        ));
        assert!(source.contains("TextureConfigData c3d_textureConfigs[];"));
    }
}
