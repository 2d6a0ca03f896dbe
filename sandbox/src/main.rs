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

// Prism Sandbox
// Builds the pipelines of a small scene and dumps their shaders.

use std::borrow::Cow;
use std::sync::Arc;

use anyhow::Result;
use prism_core::event::{EventType, GpuEventQueue};
use prism_core::math::{Extent2D, Mat4, Vec3};
use prism_core::renderer::api::{
    BufferBinding, BufferDescriptor, BufferUsage, SamplerId, TextureViewId,
};
use prism_core::renderer::flags::{PassFlags, SceneFlags, TextureChannels};
use prism_core::renderer::traits::GraphicsDevice;
use prism_core::scene::{
    Material, MaterialPass, ObjectId, ObjectKind, PassId, RenderableObject, TextureUnit,
    TextureUnitId,
};
use prism_core::testing::{MockGraphicsDevice, MockRenderable};
use prism_data::ubo::SceneUboConfiguration;
use prism_data::ObjectUboPools;
use prism_lanes::render_lane::{
    ForwardTechnique, PipelineFlags, RenderPass, RenderPassConfig, RenderQueues, SceneBuffers,
    ShadowMaps,
};

const CONFIG: &str = r#"(
    name: "sandbox",
    category: "Opaque",
    lighting_model: "phong",
    max_instances: 16,
)"#;

fn scene_buffer(
    device: &dyn GraphicsDevice,
    label: &str,
    usage: BufferUsage,
) -> Result<BufferBinding> {
    let buffer = device.create_buffer(&BufferDescriptor {
        label: Some(Cow::Borrowed(label)),
        size: 4096,
        usage,
        mapped_at_creation: false,
    })?;
    Ok(BufferBinding {
        buffer,
        offset: 0,
        size: None,
    })
}

fn crate_mesh() -> MockRenderable {
    let pass = MaterialPass::new(PassId(1))
        .with_flags(PassFlags::LIGHTING)
        .with_texture(TextureUnit {
            id: TextureUnitId(1),
            channel: TextureChannels::DIFFUSE,
            view: TextureViewId(1),
            sampler: SamplerId(1),
        })
        .with_texture(TextureUnit {
            id: TextureUnitId(2),
            channel: TextureChannels::NORMAL,
            view: TextureViewId(2),
            sampler: SamplerId(1),
        });
    let object = MockRenderable::new(
        ObjectId::new(1, 0),
        ObjectKind::Static,
        Material::new("Crate", vec![pass]),
    );
    object.set_transform(Mat4::from_translation(Vec3::new(0.0, 0.0, -5.0)));
    object
}

fn smoke_billboard() -> MockRenderable {
    let pass = MaterialPass::new(PassId(2)).with_two_sided(true);
    let mut object = MockRenderable::new(
        ObjectId::new(2, 0),
        ObjectKind::Billboard,
        Material::new("Smoke", vec![pass]),
    );
    object.billboard_dimensions = [2.0, 3.0];
    object
}

fn main() -> Result<()> {
    use env_logger::{Builder, Env};

    Builder::from_env(Env::default().default_filter_or("info")).init();

    let device = Arc::new(MockGraphicsDevice::new());
    let events = Arc::new(GpuEventQueue::new());
    let config = RenderPassConfig::from_ron_str(CONFIG)?;
    let mut pass = RenderPass::new(device.clone(), events, ForwardTechnique::new(), config)?;
    pass.initialise(Extent2D::new(1280, 720))?;
    pass.set_scene_buffers(SceneBuffers {
        pass_buffer: scene_buffer(device.as_ref(), "Materials", BufferUsage::STORAGE)?,
        light_buffer: scene_buffer(device.as_ref(), "Lights", BufferUsage::UNIFORM_TEXEL)?,
        texture_buffer: scene_buffer(
            device.as_ref(),
            "TextureConfigurations",
            BufferUsage::STORAGE,
        )?,
    });

    let mut objects = ObjectUboPools::new(device.clone(), "Objects");
    let mesh: Arc<dyn RenderableObject> = Arc::new(crate_mesh());
    let billboard: Arc<dyn RenderableObject> = Arc::new(smoke_billboard());
    objects.register_element(mesh.clone())?;
    objects.register_element(billboard.clone())?;

    // Prepare every pipeline first, then let the pre-render events create them.
    let mut keys = Vec::new();
    for object in [&mesh, &billboard] {
        let material = object.material();
        for material_pass in &material.passes {
            let flags = PipelineFlags::from_pass(
                material_pass,
                object.program_flags(),
                SceneFlags::empty(),
                object.geometry_buffers().topology,
            );
            if let Some(key) = pass.prepare_pipeline(flags, material_pass.two_sided)? {
                keys.push((object.clone(), material_pass.id, key));
            }
        }
    }
    let created = pass.process_gpu_events(EventType::PreRender)?;
    log::info!("{created} pipeline event(s) processed.");

    let shadow_maps = ShadowMaps::default();
    let mut queues = RenderQueues::default();
    for (object, pass_id, key) in &keys {
        let Some(pipeline) = pass.get_pipeline_back(*key) else {
            log::warn!("Pipeline of {:?} is not ready.", object.id());
            continue;
        };
        println!("// ---- {} ----", pipeline.label());
        println!("{}", pipeline.sources().pixel);

        if object.kind() == ObjectKind::Billboard {
            let mut node = pass.create_billboard_node(&objects, pipeline, object.id(), *pass_id);
            pass.initialise_ubo_descriptor(&mut node)?;
            pass.initialise_texture_descriptor(&mut node, &shadow_maps)?;
            queues.billboard_nodes.push(node);
        } else {
            let mut node = pass.create_static_node(&objects, pipeline, object.id(), *pass_id);
            pass.initialise_ubo_descriptor(&mut node)?;
            pass.initialise_texture_descriptor(&mut node, &shadow_maps)?;
            queues.static_nodes.push(node);
        }
    }

    let projection = Mat4::from_scale(Vec3::new(0.75, 1.0, -1.0));
    pass.update_matrices(projection, Mat4::IDENTITY, [0.0, 0.0])?;
    pass.update_scene(SceneUboConfiguration {
        ambient_light: [0.1, 0.1, 0.1, 1.0],
        ..bytemuck::Zeroable::zeroed()
    })?;
    pass.upload_ubos()?;
    objects.update()?;
    objects.upload()?;

    let info = pass.update(&mut queues)?;
    log::info!(
        "Frame: {} object(s), {} face(s), {} draw call(s).",
        info.visible_objects_count,
        info.visible_face_count,
        info.draw_calls
    );

    queues.cleanup(device.as_ref());
    pass.cleanup();
    objects.cleanup();
    log::info!("Device activity: {:?}", device.stats());
    Ok(())
}
