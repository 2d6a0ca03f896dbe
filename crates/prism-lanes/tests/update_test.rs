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

use approx::assert_relative_eq;
use prism_core::event::{EventType, GpuEventQueue};
use prism_core::math::{Extent2D, Mat4, Vec3};
use prism_core::renderer::api::PrimitiveTopology;
use prism_core::renderer::flags::{ProgramFlags, SceneFlags};
use prism_core::scene::{
    Material, MaterialPass, ObjectId, ObjectKind, PassId, RenderableObject, MAX_BONES_COUNT,
};
use prism_core::testing::{FixedSkeleton, MockGraphicsDevice, MockRenderable};
use prism_data::ubo::{InstantiationData, SceneUboConfiguration};
use prism_data::ObjectUboPools;
use prism_lanes::render_lane::{
    ForwardTechnique, PipelineFlags, RenderInfo, RenderPass, RenderPassConfig, RenderPassError,
    RenderPipeline, RenderQueues,
};
use std::sync::Arc;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

struct Scene {
    device: Arc<MockGraphicsDevice>,
    events: Arc<GpuEventQueue>,
    pass: RenderPass<ForwardTechnique>,
    objects: ObjectUboPools,
}

fn scene(max_instances: u32) -> Scene {
    init_logger();
    let device = Arc::new(MockGraphicsDevice::new());
    let events = Arc::new(GpuEventQueue::new());
    let config = RenderPassConfig {
        max_instances,
        ..Default::default()
    };
    let technique = ForwardTechnique::new();
    let mut pass = RenderPass::new(device.clone(), events.clone(), technique, config)
        .expect("default lighting model");
    pass.initialise(Extent2D::new(640, 480))
        .expect("render pass initialisation");
    let objects = ObjectUboPools::new(device.clone(), "Objects");
    Scene {
        device,
        events,
        pass,
        objects,
    }
}

fn translation(x: f32) -> Mat4 {
    Mat4::from_translation(Vec3::new(x, 0.0, 0.0))
}

/// Registers a mesh at `x` whose only pass is `PassId(7)`.
fn mesh(scene: &mut Scene, index: u32, kind: ObjectKind) -> anyhow::Result<Arc<MockRenderable>> {
    let mut object = MockRenderable::new(
        ObjectId::new(index, 0),
        kind,
        Material::new("shared", vec![MaterialPass::new(PassId(7))]),
    );
    if kind == ObjectKind::Skinned {
        let bones = vec![translation(index as f32), translation(-(index as f32))];
        object.skeleton = Some(Arc::new(FixedSkeleton(bones)));
    }
    object.set_transform(translation(index as f32));
    let object = Arc::new(object);
    scene.objects.register_element(object.clone())?;
    Ok(object)
}

fn instanced_pipeline(
    scene: &mut Scene,
    object: &MockRenderable,
) -> anyhow::Result<Arc<RenderPipeline>> {
    let material = object.material();
    let flags = PipelineFlags::from_pass(
        &material.passes[0],
        object.kind().program_flags() | ProgramFlags::INSTANTIATION,
        SceneFlags::empty(),
        PrimitiveTopology::TriangleList,
    );
    let key = scene.pass.prepare_back_pipeline(flags)?;
    scene.pass.process_gpu_events(EventType::PreRender)?;
    Ok(scene.pass.get_pipeline_back(key).expect("ready pipeline"))
}

#[test]
fn test_update_requires_initialise() {
    init_logger();
    let mut pass = RenderPass::new(
        Arc::new(MockGraphicsDevice::new()),
        Arc::new(GpuEventQueue::new()),
        ForwardTechnique::new(),
        RenderPassConfig::default(),
    )
    .expect("default lighting model");
    let result = pass.update(&mut RenderQueues::default());
    assert!(matches!(result, Err(RenderPassError::NotInitialised(_))));
}

#[test]
fn test_instances_are_capped_by_max_instances() -> anyhow::Result<()> {
    let mut scene = scene(3);
    let mut objects = Vec::new();
    for index in 0..5 {
        objects.push(mesh(&mut scene, index, ObjectKind::Static)?);
    }
    let pipeline = instanced_pipeline(&mut scene, &objects[0])?;
    let nodes = objects
        .iter()
        .map(|object| {
            scene
                .pass
                .create_static_node(&scene.objects, pipeline.clone(), object.id(), PassId(7))
        })
        .collect();
    let mut queues = RenderQueues::default();
    queues.instanced_static.push(scene.pass.create_static_batch(nodes));

    let info = scene.pass.update(&mut queues)?;
    assert_eq!(
        info,
        RenderInfo {
            visible_face_count: 6,
            visible_vertex_count: 18,
            visible_objects_count: 3,
            draw_calls: 1,
        }
    );

    let batch = &queues.instanced_static[0];
    assert_eq!(batch.instances.len(), 3);
    for (index, instance) in batch.instances.data().iter().enumerate() {
        assert_eq!(instance.world, translation(index as f32));
        assert_eq!(instance.material, 7);
    }
    let uploaded = scene
        .device
        .buffer(batch.instances.buffer().expect("instances uploaded"))
        .expect("buffer recorded");
    assert_eq!(
        uploaded.contents.len(),
        3 * std::mem::size_of::<InstantiationData>()
    );
    let expected: &[u8] = bytemuck::cast_slice(batch.instances.data());
    assert_eq!(uploaded.contents, expected);
    assert_eq!(scene.pass.timer().map(|t| t.samples()), Some(1));
    Ok(())
}

#[test]
fn test_second_frame_rewrites_the_instance_buffer() -> anyhow::Result<()> {
    let mut scene = scene(4);
    let first = mesh(&mut scene, 1, ObjectKind::Static)?;
    let second = mesh(&mut scene, 2, ObjectKind::Static)?;
    let pipeline = instanced_pipeline(&mut scene, &first)?;
    let nodes = [&first, &second]
        .iter()
        .map(|object| {
            scene
                .pass
                .create_static_node(&scene.objects, pipeline.clone(), object.id(), PassId(7))
        })
        .collect();
    let mut queues = RenderQueues::default();
    queues.instanced_static.push(scene.pass.create_static_batch(nodes));
    scene.pass.update(&mut queues)?;
    let created = scene.device.stats().buffers_created;
    let writes = scene.device.stats().buffer_writes;

    second.set_transform(translation(10.0));
    let info = scene.pass.update(&mut queues)?;
    assert_eq!(info.visible_objects_count, 2);
    assert_eq!(scene.device.stats().buffers_created, created);
    assert_eq!(scene.device.stats().buffer_writes, writes + 1);

    let batch = &queues.instanced_static[0];
    assert_eq!(batch.instances.data()[1].world, translation(10.0));
    let uploaded = scene
        .device
        .buffer(batch.instances.buffer().expect("instances uploaded"))
        .expect("buffer recorded");
    let size = std::mem::size_of::<InstantiationData>();
    let expected: &[u8] = bytemuck::cast_slice(&batch.instances.data()[..2]);
    assert_eq!(&uploaded.contents[..2 * size], expected);
    Ok(())
}

#[test]
fn test_skinned_instances_copy_one_bone_block_each() -> anyhow::Result<()> {
    let mut scene = scene(2);
    let first = mesh(&mut scene, 1, ObjectKind::Skinned)?;
    let second = mesh(&mut scene, 2, ObjectKind::Skinned)?;
    let pipeline = instanced_pipeline(&mut scene, &first)?;
    let nodes = [&first, &second]
        .iter()
        .map(|object| {
            scene
                .pass
                .create_skinning_node(&scene.objects, pipeline.clone(), object.id(), PassId(7))
        })
        .collect();
    let mut queues = RenderQueues::default();
    queues
        .instanced_skinned
        .push(scene.pass.create_skinned_batch(nodes)?);

    let info = scene.pass.update(&mut queues)?;
    assert_eq!(info.visible_objects_count, 2);
    assert_eq!(info.draw_calls, 1);

    let bones = queues.instanced_skinned[0].bones.data();
    let stride = 16 * MAX_BONES_COUNT;
    assert_eq!(bones.len(), 2 * stride);
    assert_eq!(bones[..16], translation(1.0).to_cols_array());
    assert_eq!(bones[16..32], translation(-1.0).to_cols_array());
    assert!(bones[32..stride].iter().all(|value| *value == 0.0));
    assert_eq!(bones[stride..stride + 16], translation(2.0).to_cols_array());
    Ok(())
}

#[test]
fn test_single_nodes_are_one_draw_each() -> anyhow::Result<()> {
    let mut scene = scene(8);
    let mesh_object = mesh(&mut scene, 1, ObjectKind::Static)?;
    let billboard = mesh(&mut scene, 2, ObjectKind::Billboard)?;

    let mut queues = RenderQueues::default();
    for object in [&mesh_object, &billboard] {
        let material = object.material();
        let flags = PipelineFlags::from_pass(
            &material.passes[0],
            object.kind().program_flags(),
            SceneFlags::empty(),
            PrimitiveTopology::TriangleList,
        );
        let key = scene.pass.prepare_back_pipeline(flags)?;
        scene.pass.process_gpu_events(EventType::PreRender)?;
        let pipeline = scene.pass.get_pipeline_back(key).expect("ready pipeline");
        if object.kind() == ObjectKind::Billboard {
            let node =
                scene
                    .pass
                    .create_billboard_node(&scene.objects, pipeline, object.id(), PassId(7));
            queues.billboard_nodes.push(node);
        } else {
            let node =
                scene
                    .pass
                    .create_static_node(&scene.objects, pipeline, object.id(), PassId(7));
            queues.static_nodes.push(node);
        }
    }

    let info = scene.pass.update(&mut queues)?;
    assert_eq!(info.draw_calls, 2);
    assert_eq!(info.visible_objects_count, 2);
    assert_eq!(info.visible_face_count, 4);
    Ok(())
}

#[test]
fn test_matrices_keep_the_previous_view() -> anyhow::Result<()> {
    let mut scene = scene(8);
    let projection = Mat4::from_scale(Vec3::new(2.0, 4.0, 0.5));
    scene
        .pass
        .update_matrices(projection, translation(1.0), [0.25, -0.25])?;
    scene
        .pass
        .update_matrices(projection, translation(2.0), [0.0, 0.0])?;

    let matrices = *scene.pass.matrices().expect("initialised pass");
    assert_eq!(matrices.prv_view, translation(1.0));
    assert_eq!(matrices.cur_view, translation(2.0));
    assert_eq!(matrices.jitter, [0.0; 4]);
    let product = (matrices.inv_projection * projection).to_cols_array();
    for (value, expected) in product.iter().zip(Mat4::IDENTITY.to_cols_array()) {
        assert_relative_eq!(*value, expected, epsilon = 1e-6);
    }

    scene
        .pass
        .update_matrices(Mat4::ZERO, translation(3.0), [0.0, 0.0])?;
    let matrices = scene.pass.matrices().expect("initialised pass");
    assert_eq!(matrices.inv_projection, Mat4::IDENTITY);
    Ok(())
}

#[test]
fn test_scene_block_uses_the_pass_size() -> anyhow::Result<()> {
    let mut scene = scene(8);
    let block = SceneUboConfiguration {
        window_size: [1, 1],
        time: 2.5,
        ..bytemuck::Zeroable::zeroed()
    };
    scene.pass.update_scene(block)?;
    scene.pass.upload_ubos()?;

    let stored = scene.pass.scene().expect("initialised pass");
    assert_eq!(stored.window_size, [640, 480]);
    assert_eq!(stored.time, 2.5);
    assert_eq!(scene.events.pending(EventType::PreRender), 0);
    Ok(())
}
