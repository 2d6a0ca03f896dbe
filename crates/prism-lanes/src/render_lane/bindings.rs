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

//! Descriptor-set layouts of render pipelines and the texture entries of
//! render nodes.
//!
//! Set 0 holds buffers, set 1 the material textures followed by the shadow
//! maps. Both lists are in increasing binding order and the descriptors of
//! render nodes are written in that same order.

use super::pipeline_flags::PipelineFlags;
use prism_core::renderer::api::{
    BindGroupEntry, BindGroupLayoutEntry, SamplerId, ShaderStageFlags, TextureSampleType,
    TextureViewDimension, TextureViewId,
};
use prism_core::renderer::flags::{PassFlags, ProgramFlags};
use prism_core::scene::MaterialPass;
use prism_shader::bindings::*;
use prism_shader::shadow::Shadow;

/// One buffer binding of the UBO set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UboSlot {
    /// Materials storage buffer.
    PassBuffer,
    /// Texture configurations storage buffer.
    TextureBuffer,
    /// Lights texel buffer.
    LightBuffer,
    /// Camera matrices.
    Matrix,
    /// Scene-wide data.
    Scene,
    /// Current and previous model matrices.
    ModelMatrix,
    /// Per-object model data.
    Model,
    /// Packed texture unit ids.
    Textures,
    /// Bone matrices.
    Skinning,
    /// Keyframe interpolation factor.
    Morphing,
    /// Picking indices.
    Picking,
    /// Billboard dimensions.
    Billboard,
}

impl UboSlot {
    /// Binding point of the slot in the UBO set.
    pub const fn binding(self) -> u32 {
        match self {
            UboSlot::PassBuffer => PASS_BUFFER_BINDING,
            UboSlot::TextureBuffer => TEXTURE_BUFFER_BINDING,
            UboSlot::LightBuffer => LIGHT_BUFFER_BINDING,
            UboSlot::Matrix => MATRIX_UBO_BINDING,
            UboSlot::Scene => SCENE_UBO_BINDING,
            UboSlot::ModelMatrix => MODEL_MATRIX_UBO_BINDING,
            UboSlot::Model => MODEL_UBO_BINDING,
            UboSlot::Textures => TEXTURES_UBO_BINDING,
            UboSlot::Skinning => SKINNING_UBO_BINDING,
            UboSlot::Morphing => MORPHING_UBO_BINDING,
            UboSlot::Picking => PICKING_UBO_BINDING,
            UboSlot::Billboard => BILLBOARD_UBO_BINDING,
        }
    }

    fn layout_entry(self, program_flags: ProgramFlags) -> BindGroupLayoutEntry {
        let vertex = ShaderStageFlags::VERTEX;
        let fragment = ShaderStageFlags::FRAGMENT;
        let both = ShaderStageFlags::VERTEX_FRAGMENT;
        let binding = self.binding();
        match self {
            UboSlot::PassBuffer | UboSlot::TextureBuffer => {
                BindGroupLayoutEntry::storage(binding, fragment, true)
            }
            UboSlot::LightBuffer => BindGroupLayoutEntry::texel_buffer(binding, fragment),
            UboSlot::Matrix | UboSlot::ModelMatrix | UboSlot::Morphing | UboSlot::Billboard => {
                BindGroupLayoutEntry::uniform(binding, vertex)
            }
            UboSlot::Scene | UboSlot::Model => BindGroupLayoutEntry::uniform(binding, both),
            UboSlot::Textures | UboSlot::Picking => {
                BindGroupLayoutEntry::uniform(binding, fragment)
            }
            UboSlot::Skinning if program_flags.contains(ProgramFlags::INSTANTIATION) => {
                BindGroupLayoutEntry::storage(binding, vertex, true)
            }
            UboSlot::Skinning => BindGroupLayoutEntry::uniform(binding, vertex),
        }
    }
}

/// The buffer slots a pipeline variant binds, in binding order.
pub fn ubo_slots(flags: &PipelineFlags) -> Vec<UboSlot> {
    let program = flags.program_flags;
    let mut slots = Vec::with_capacity(12);

    // Depth passes only read materials to alpha test.
    if !program.contains(ProgramFlags::DEPTH_PASS)
        || flags.pass_flags.contains(PassFlags::ALPHA_TEST)
    {
        slots.push(UboSlot::PassBuffer);
    }
    if flags.shader_options().texture_count() > 0 {
        slots.push(UboSlot::TextureBuffer);
    }
    if program.contains(ProgramFlags::LIGHTING) {
        slots.push(UboSlot::LightBuffer);
    }
    slots.extend([
        UboSlot::Matrix,
        UboSlot::Scene,
        UboSlot::ModelMatrix,
        UboSlot::Model,
        UboSlot::Textures,
    ]);
    if program.contains(ProgramFlags::SKINNING) {
        slots.push(UboSlot::Skinning);
    }
    if program.contains(ProgramFlags::MORPHING) {
        slots.push(UboSlot::Morphing);
    }
    if program.contains(ProgramFlags::PICKING) {
        slots.push(UboSlot::Picking);
    }
    if program.contains(ProgramFlags::BILLBOARDS) {
        slots.push(UboSlot::Billboard);
    }
    slots
}

/// The slots written into the UBO descriptor of a node.
///
/// Instanced programs read their model matrices from the instance buffer.
pub fn descriptor_slots(flags: &PipelineFlags) -> Vec<UboSlot> {
    let instanced = flags.program_flags.contains(ProgramFlags::INSTANTIATION);
    ubo_slots(flags)
        .into_iter()
        .filter(|slot| !(instanced && *slot == UboSlot::ModelMatrix))
        .collect()
}

/// Layout entries of the UBO set.
pub fn create_ubo_bindings(flags: &PipelineFlags) -> Vec<BindGroupLayoutEntry> {
    ubo_slots(flags)
        .into_iter()
        .map(|slot| slot.layout_entry(flags.program_flags))
        .collect()
}

fn shadow(flags: &PipelineFlags) -> Option<Shadow> {
    let options = flags.shader_options();
    options
        .has_lighting()
        .then(|| Shadow::new(options.scene_flags, options.shadow_map_bindings()))
}

/// Layout entries of the texture set: one sampler per texture channel, then
/// the shadow maps of the lit programs.
pub fn create_texture_bindings(flags: &PipelineFlags) -> Vec<BindGroupLayoutEntry> {
    let fragment = ShaderStageFlags::FRAGMENT;
    let float = TextureSampleType::Float { filterable: true };
    let count = flags.shader_options().texture_count();

    let mut entries: Vec<_> = (0..count)
        .map(|index| {
            BindGroupLayoutEntry::combined_sampler(
                texture_binding(index),
                fragment,
                TextureViewDimension::D2,
                float,
            )
        })
        .collect();

    if let Some(shadow) = shadow(flags) {
        let bindings = ShadowMapBindings::after_textures(count);
        if shadow.has_directional() {
            entries.push(BindGroupLayoutEntry::combined_sampler(
                bindings.directional,
                fragment,
                TextureViewDimension::D2,
                float,
            ));
        }
        if shadow.has_point() {
            entries.push(BindGroupLayoutEntry::combined_sampler(
                bindings.point,
                fragment,
                TextureViewDimension::Cube,
                float,
            ));
        }
        if shadow.has_spot() {
            entries.push(BindGroupLayoutEntry::combined_sampler(
                bindings.spot,
                fragment,
                TextureViewDimension::D2,
                float,
            ));
        }
    }
    entries
}

/// A sampled texture view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampledView {
    /// The view.
    pub view: TextureViewId,
    /// Its sampler.
    pub sampler: SamplerId,
}

/// The shadow maps produced by the shadow passes of the frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShadowMaps {
    /// Directional light shadow map.
    pub directional: Option<SampledView>,
    /// Point light cube map.
    pub point: Option<SampledView>,
    /// Spot light shadow map.
    pub spot: Option<SampledView>,
}

/// A shadow map a pipeline samples but the frame did not provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MissingShadowMap(pub &'static str);

/// Bind group entries of the texture set of `pass` drawn with `flags`.
///
/// Units are written in the order of [`MaterialPass::bound_textures`], which
/// is the order the texture layout declares them in.
pub fn texture_entries(
    flags: &PipelineFlags,
    pass: &MaterialPass,
    shadow_maps: &ShadowMaps,
) -> Result<Vec<BindGroupEntry>, MissingShadowMap> {
    let options = flags.shader_options();
    let mut entries = Vec::with_capacity(pass.textures.len() + 3);

    for (channel, unit) in pass.bound_textures() {
        if let Some(binding) = options.texture_binding(channel) {
            entries.push(BindGroupEntry::combined_sampler(binding, unit.view, unit.sampler));
        }
    }
    entries.sort_by_key(|entry| entry.binding);

    if let Some(shadow) = shadow(flags) {
        let bindings = options.shadow_map_bindings();
        let wanted = [
            (shadow.has_directional(), bindings.directional, shadow_maps.directional),
            (shadow.has_point(), bindings.point, shadow_maps.point),
            (shadow.has_spot(), bindings.spot, shadow_maps.spot),
        ];
        let names = ["directional", "point", "spot"];
        for ((enabled, binding, map), name) in wanted.into_iter().zip(names) {
            if !enabled {
                continue;
            }
            let map = map.ok_or(MissingShadowMap(name))?;
            entries.push(BindGroupEntry::combined_sampler(binding, map.view, map.sampler));
        }
    }
    Ok(entries)
}
