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

use prism_core::event::{EventType, GpuEventQueue};
use prism_core::math::{Extent2D, Mat4};
use prism_core::renderer::api::{
    BindGroupEntry, BindGroupId, BindingResource, BufferBinding, BufferId, PrimitiveTopology,
    SamplerId, TextureViewId,
};
use prism_core::renderer::flags::{ProgramFlags, SceneFlags, ShadowType, TextureChannels};
use prism_core::scene::{
    Material, MaterialPass, ObjectId, ObjectKind, PassId, RenderableObject, TextureUnit,
    TextureUnitId,
};
use prism_core::testing::{FixedAnimation, FixedSkeleton, MockGraphicsDevice, MockRenderable};
use prism_data::ObjectUboPools;
use prism_lanes::render_lane::{
    create_ubo_bindings, descriptor_slots, ForwardTechnique, PipelineFlags, RenderNode,
    RenderPass, RenderPassConfig, RenderPassError, RenderPipeline, SampledView, SceneBuffers,
    ShadowMaps, UboSlot,
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

fn scene(config: RenderPassConfig) -> Scene {
    init_logger();
    let device = Arc::new(MockGraphicsDevice::new());
    let events = Arc::new(GpuEventQueue::new());
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

fn buffer(id: usize) -> BufferBinding {
    BufferBinding {
        buffer: BufferId(id),
        offset: 0,
        size: None,
    }
}

fn scene_buffers() -> SceneBuffers {
    SceneBuffers {
        pass_buffer: buffer(9000),
        light_buffer: buffer(9001),
        texture_buffer: buffer(9002),
    }
}

fn register(scene: &mut Scene, object: MockRenderable) -> anyhow::Result<Arc<MockRenderable>> {
    let object = Arc::new(object);
    scene.objects.register_element(object.clone())?;
    Ok(object)
}

fn object(index: u32, kind: ObjectKind, pass: MaterialPass) -> MockRenderable {
    let mut object = MockRenderable::new(
        ObjectId::new(index, 0),
        kind,
        Material::new("material", vec![pass]),
    );
    match kind {
        ObjectKind::Skinned => {
            object.skeleton = Some(Arc::new(FixedSkeleton(vec![Mat4::IDENTITY; 2])));
        }
        ObjectKind::Morphed => object.animation = Some(Arc::new(FixedAnimation(0.5))),
        ObjectKind::Static | ObjectKind::Billboard => {}
    }
    object
}

/// Prepares the back face pipeline of `object` and runs its creation event.
fn ready_pipeline(
    scene: &mut Scene,
    object: &MockRenderable,
    extra: ProgramFlags,
    scene_flags: SceneFlags,
) -> anyhow::Result<Arc<RenderPipeline>> {
    let material = object.material();
    let flags = PipelineFlags::from_pass(
        &material.passes[0],
        object.kind().program_flags() | extra,
        scene_flags,
        PrimitiveTopology::TriangleList,
    );
    let key = scene.pass.prepare_back_pipeline(flags)?;
    scene.events.process(EventType::PreRender, scene.device.as_ref())?;
    Ok(scene
        .pass
        .get_pipeline_back(key)
        .expect("pipeline is ready after its event"))
}

fn written_entries(device: &MockGraphicsDevice, id: Option<BindGroupId>) -> Vec<BindGroupEntry> {
    let id = id.expect("descriptor was written");
    device.bind_group(id).expect("bind group exists").1
}

fn buffer_of(entry: &BindGroupEntry) -> BufferId {
    match entry.resource {
        BindingResource::Buffer(binding) => binding.buffer,
        other => panic!("binding {} is not a buffer: {other:?}", entry.binding),
    }
}

/// The written bindings follow the descriptor slots, which are the layout
/// bindings minus the per-instance model matrix.
fn assert_follows_layout(scene: &Scene, node: &dyn RenderNode) {
    let pipeline = &node.base().pipeline;
    let flags = pipeline.flags();
    let written: Vec<u32> = written_entries(&scene.device, node.base().ubo_descriptor)
        .iter()
        .map(|entry| entry.binding)
        .collect();
    let slots: Vec<u32> = descriptor_slots(flags).iter().map(|s| s.binding()).collect();
    assert_eq!(written, slots);

    let layout = scene
        .device
        .bind_group_layout(pipeline.ubo_layout().expect("ubo layout"))
        .expect("layout exists");
    let declared: Vec<u32> = layout.iter().map(|entry| entry.binding).collect();
    let expected: Vec<u32> = create_ubo_bindings(flags).iter().map(|e| e.binding).collect();
    assert_eq!(declared, expected);
    let instanced = flags.program_flags.contains(ProgramFlags::INSTANTIATION);
    let skipped: Vec<u32> = declared
        .iter()
        .copied()
        .filter(|binding| !(instanced && *binding == UboSlot::ModelMatrix.binding()))
        .collect();
    assert_eq!(written, skipped);
}

#[test]
fn test_ubo_descriptors_follow_the_layout_order() -> anyhow::Result<()> {
    let mut scene = scene(RenderPassConfig::default());
    scene.pass.set_scene_buffers(scene_buffers());

    let kinds = [
        ObjectKind::Static,
        ObjectKind::Skinned,
        ObjectKind::Morphed,
        ObjectKind::Billboard,
    ];
    for (index, kind) in kinds.into_iter().enumerate() {
        let index = index as u32;
        let pass = MaterialPass::new(PassId(index));
        let object = register(&mut scene, object(index, kind, pass))?;
        let pipeline = ready_pipeline(
            &mut scene,
            &object,
            ProgramFlags::empty(),
            SceneFlags::empty(),
        )?;
        let (pools, id, pass) = (&scene.objects, object.id(), PassId(index));
        let mut node: Box<dyn RenderNode> = match kind {
            ObjectKind::Static => {
                Box::new(scene.pass.create_static_node(pools, pipeline, id, pass))
            }
            ObjectKind::Skinned => {
                Box::new(scene.pass.create_skinning_node(pools, pipeline, id, pass))
            }
            ObjectKind::Morphed => {
                Box::new(scene.pass.create_morphing_node(pools, pipeline, id, pass))
            }
            ObjectKind::Billboard => {
                Box::new(scene.pass.create_billboard_node(pools, pipeline, id, pass))
            }
        };
        scene.pass.initialise_ubo_descriptor(node.as_mut())?;
        assert_follows_layout(&scene, node.as_ref());
    }
    Ok(())
}

#[test]
fn test_static_descriptor_binds_scene_and_node_buffers() -> anyhow::Result<()> {
    let mut scene = scene(RenderPassConfig::default());
    scene.pass.set_scene_buffers(scene_buffers());
    let object = register(
        &mut scene,
        object(1, ObjectKind::Static, MaterialPass::new(PassId(3))),
    )?;
    let pipeline = ready_pipeline(
        &mut scene,
        &object,
        ProgramFlags::empty(),
        SceneFlags::empty(),
    )?;
    let mut node = scene
        .pass
        .create_static_node(&scene.objects, pipeline, object.id(), PassId(3));
    scene.pass.initialise_ubo_descriptor(&mut node)?;

    let entries = written_entries(&scene.device, node.base.ubo_descriptor);
    let bindings: Vec<u32> = entries.iter().map(|entry| entry.binding).collect();
    assert_eq!(bindings, vec![0, 2, 3, 4, 5, 6, 7]);
    assert_eq!(buffer_of(&entries[0]), BufferId(9000));
    assert_eq!(buffer_of(&entries[1]), BufferId(9001));
    assert_eq!(buffer_of(&entries[4]), node.base.model_matrix.buffer);
    assert_eq!(buffer_of(&entries[5]), node.base.model.buffer);
    assert_eq!(buffer_of(&entries[6]), node.base.textures.buffer);
    Ok(())
}

#[test]
fn test_textured_descriptor_binds_the_texture_configurations() -> anyhow::Result<()> {
    let mut scene = scene(RenderPassConfig::default());
    scene.pass.set_scene_buffers(scene_buffers());
    let material_pass = MaterialPass::new(PassId(5)).with_texture(TextureUnit {
        id: TextureUnitId(1),
        channel: TextureChannels::DIFFUSE,
        view: TextureViewId(101),
        sampler: SamplerId(5),
    });
    let object = register(&mut scene, object(1, ObjectKind::Static, material_pass))?;
    let pipeline = ready_pipeline(
        &mut scene,
        &object,
        ProgramFlags::empty(),
        SceneFlags::empty(),
    )?;
    let mut node = scene
        .pass
        .create_static_node(&scene.objects, pipeline, object.id(), PassId(5));
    scene.pass.initialise_ubo_descriptor(&mut node)?;
    assert_follows_layout(&scene, &node);

    let entries = written_entries(&scene.device, node.base.ubo_descriptor);
    let bindings: Vec<u32> = entries.iter().map(|entry| entry.binding).collect();
    assert_eq!(bindings, vec![0, 1, 2, 3, 4, 5, 6, 7]);
    assert_eq!(buffer_of(&entries[1]), BufferId(9002));
    assert_eq!(buffer_of(&entries[2]), BufferId(9001));
    Ok(())
}

#[test]
fn test_rewriting_a_descriptor_releases_the_previous_one() -> anyhow::Result<()> {
    let mut scene = scene(RenderPassConfig::default());
    scene.pass.set_scene_buffers(scene_buffers());
    let object = register(
        &mut scene,
        object(1, ObjectKind::Static, MaterialPass::new(PassId(3))),
    )?;
    let pipeline = ready_pipeline(
        &mut scene,
        &object,
        ProgramFlags::empty(),
        SceneFlags::empty(),
    )?;
    let mut node = scene
        .pass
        .create_static_node(&scene.objects, pipeline, object.id(), PassId(3));

    scene.pass.initialise_ubo_descriptor(&mut node)?;
    let first = node.base.ubo_descriptor;
    scene.pass.initialise_ubo_descriptor(&mut node)?;
    assert_ne!(node.base.ubo_descriptor, first);
    assert!(scene.device.bind_group(first.expect("first descriptor")).is_none());
    Ok(())
}

#[test]
fn test_instanced_skinning_binds_the_batch_bones() -> anyhow::Result<()> {
    let mut scene = scene(RenderPassConfig::default());
    scene.pass.set_scene_buffers(scene_buffers());
    let object = register(
        &mut scene,
        object(1, ObjectKind::Skinned, MaterialPass::new(PassId(2))),
    )?;
    let pipeline = ready_pipeline(
        &mut scene,
        &object,
        ProgramFlags::INSTANTIATION,
        SceneFlags::empty(),
    )?;
    let node = scene
        .pass
        .create_skinning_node(&scene.objects, pipeline, object.id(), PassId(2));
    let mut batch = scene.pass.create_skinned_batch(vec![node])?;
    let bones = batch.bones.buffer().expect("bones buffer created with the batch");

    let node = &mut batch.nodes[0];
    assert_eq!(node.instanced_bones.map(|b| b.buffer), Some(bones));
    scene.pass.initialise_ubo_descriptor(node)?;
    assert_follows_layout(&scene, &*node);

    let entries = written_entries(&scene.device, node.base.ubo_descriptor);
    assert!(entries
        .iter()
        .all(|entry| entry.binding != UboSlot::ModelMatrix.binding()));
    let skinning = entries
        .iter()
        .find(|entry| entry.binding == UboSlot::Skinning.binding())
        .expect("skinning is bound");
    assert_eq!(buffer_of(skinning), bones);
    Ok(())
}

#[test]
fn test_lit_descriptor_requires_scene_buffers() -> anyhow::Result<()> {
    let mut scene = scene(RenderPassConfig::default());
    let object = register(
        &mut scene,
        object(1, ObjectKind::Static, MaterialPass::new(PassId(1))),
    )?;
    let pipeline = ready_pipeline(
        &mut scene,
        &object,
        ProgramFlags::empty(),
        SceneFlags::empty(),
    )?;
    let mut node = scene
        .pass
        .create_static_node(&scene.objects, pipeline, object.id(), PassId(1));

    let result = scene.pass.initialise_ubo_descriptor(&mut node);
    assert!(matches!(
        result,
        Err(RenderPassError::MissingSceneBuffers(name)) if name == "forward"
    ));
    assert!(node.base.ubo_descriptor.is_none());
    Ok(())
}

#[test]
fn test_texture_descriptor_binds_units_then_shadow_maps() -> anyhow::Result<()> {
    let config = RenderPassConfig {
        shadow_type: ShadowType::Pcf,
        ..Default::default()
    };
    let mut scene = scene(config);
    let material_pass = MaterialPass::new(PassId(4)).with_texture(TextureUnit {
        id: TextureUnitId(1),
        channel: TextureChannels::DIFFUSE,
        view: TextureViewId(101),
        sampler: SamplerId(5),
    });
    let object = register(&mut scene, object(1, ObjectKind::Static, material_pass))?;
    let pipeline = ready_pipeline(
        &mut scene,
        &object,
        ProgramFlags::empty(),
        SceneFlags::SHADOW_DIRECTIONAL,
    )?;
    assert!(pipeline
        .flags()
        .scene_flags
        .contains(SceneFlags::SHADOW_FILTER_PCF));
    let mut node = scene
        .pass
        .create_static_node(&scene.objects, pipeline, object.id(), PassId(4));

    let missing = scene
        .pass
        .initialise_texture_descriptor(&mut node, &ShadowMaps::default());
    assert!(matches!(
        missing,
        Err(RenderPassError::MissingShadowMap("directional"))
    ));

    let shadow_maps = ShadowMaps {
        directional: Some(SampledView {
            view: TextureViewId(200),
            sampler: SamplerId(6),
        }),
        ..Default::default()
    };
    scene
        .pass
        .initialise_texture_descriptor(&mut node, &shadow_maps)?;
    let entries = written_entries(&scene.device, node.base.texture_descriptor);
    assert_eq!(
        entries,
        vec![
            BindGroupEntry::combined_sampler(0, TextureViewId(101), SamplerId(5)),
            BindGroupEntry::combined_sampler(1, TextureViewId(200), SamplerId(6)),
        ]
    );
    Ok(())
}
