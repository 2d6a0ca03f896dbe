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

use prism_core::math::{Mat4, Vec3};
use prism_core::renderer::api::{MemoryVisibility, SamplerId, TextureViewId};
use prism_core::renderer::flags::TextureChannels;
use prism_core::scene::{
    Material, MaterialPass, ObjectId, ObjectKind, PassId, RenderableObject, TextureUnit,
    TextureUnitId,
};
use prism_core::testing::{FixedAnimation, FixedSkeleton, MockGraphicsDevice, MockRenderable};
use prism_data::ubo::{UboPoolConfig, MIN_UNIFORM_ALIGNMENT};
use prism_data::{ObjectUbo, ObjectUboPools, PoolStats};
use std::collections::HashSet;
use std::sync::Arc;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn registry() -> (Arc<MockGraphicsDevice>, ObjectUboPools) {
    init_logger();
    let device = Arc::new(MockGraphicsDevice::new());
    let registry = ObjectUboPools::new(device.clone(), "Billboards");
    (device, registry)
}

fn material(name: &str, passes: &[u32]) -> Material {
    Material::new(
        name,
        passes.iter().map(|id| MaterialPass::new(PassId(*id))).collect(),
    )
}

fn object(index: u32, kind: ObjectKind, material: Material) -> Arc<MockRenderable> {
    Arc::new(MockRenderable::new(ObjectId::new(index, 0), kind, material))
}

#[test]
fn registering_a_billboard_allocates_one_slot_per_pool() -> anyhow::Result<()> {
    let (_, mut registry) = registry();
    let billboard = object(1, ObjectKind::Billboard, material("leaves", &[7]));

    registry.register_element(billboard.clone())?;

    assert_eq!(
        registry.pools().stats(),
        PoolStats {
            model: 1,
            model_matrix: 1,
            billboard: 1,
            picking: 1,
            textures: 1,
            ..Default::default()
        }
    );

    let entry = registry.get_ubos(billboard.id(), PassId(7));
    assert_eq!(entry.pass.id, PassId(7));
    assert_eq!(entry.object.id(), billboard.id());
    assert!(matches!(entry.object_ubo, ObjectUbo::Billboard(_)));

    registry.update()?;
    let entry = registry.get_ubos(billboard.id(), PassId(7));
    assert_eq!(registry.pools().model.data(&entry.model).material_index, 7);
    Ok(())
}

#[test]
fn every_object_pass_pair_gets_its_own_entry() -> anyhow::Result<()> {
    let (_, mut registry) = registry();
    let a = object(1, ObjectKind::Static, material("a", &[1, 2, 3]));
    let b = object(2, ObjectKind::Static, material("b", &[1, 2]));
    registry.register_element(a.clone())?;
    registry.register_element(b.clone())?;

    assert_eq!(registry.len(), 5);
    let mut offsets = HashSet::new();
    for entry in registry.entries() {
        let binding = registry.pools().model.binding(&entry.model);
        assert!(offsets.insert((binding.buffer, binding.offset)));
        let key = entry.key();
        let found = registry.get_ubos(key.object, key.pass);
        assert_eq!(found.key(), key);
    }
    Ok(())
}

#[test]
fn registering_twice_is_a_no_op() -> anyhow::Result<()> {
    let (_, mut registry) = registry();
    let mesh = object(1, ObjectKind::Static, material("m", &[1]));
    registry.register_element(mesh.clone())?;
    registry.register_element(mesh.clone())?;
    assert_eq!(registry.len(), 1);
    assert_eq!(mesh.material_signal().connection_count(), 1);
    Ok(())
}

#[test]
fn material_change_moves_entries_to_the_new_passes() -> anyhow::Result<()> {
    let (_, mut registry) = registry();
    let mesh = object(4, ObjectKind::Static, material("old", &[1, 2]));
    registry.register_element(mesh.clone())?;
    assert_eq!(registry.pools().stats().model, 2);

    mesh.set_material(material("new", &[10, 11, 12]));
    registry.update()?;

    assert!(registry.try_get_ubos(mesh.id(), PassId(1)).is_none());
    assert!(registry.try_get_ubos(mesh.id(), PassId(2)).is_none());
    for pass in [10, 11, 12] {
        assert!(registry.try_get_ubos(mesh.id(), PassId(pass)).is_some());
    }
    let stats = registry.pools().stats();
    assert_eq!(stats.model, 3);
    assert_eq!(stats.textures, 3);
    Ok(())
}

#[test]
fn a_failed_material_change_keeps_later_changes_pending() -> anyhow::Result<()> {
    init_logger();
    let device = Arc::new(MockGraphicsDevice::new());
    let config = UboPoolConfig {
        chunk_elements: 1,
        alignment: MIN_UNIFORM_ALIGNMENT,
    };
    let mut registry = ObjectUboPools::with_config(
        device.clone(),
        "Meshes",
        MemoryVisibility::HostVisible,
        config,
    );
    let first = object(1, ObjectKind::Static, material("first", &[1]));
    let second = object(2, ObjectKind::Static, material("second", &[2]));
    registry.register_element(first.clone())?;
    registry.register_element(second.clone())?;

    // Three slots per pool, two used: the third new pass needs a new chunk.
    first.set_material(material("bigger", &[10, 11, 12]));
    second.set_material(material("other", &[20]));
    device.fail_buffer_creation(true);
    assert!(registry.update().is_err());
    assert!(registry.try_get_ubos(second.id(), PassId(2)).is_some());
    assert!(registry.try_get_ubos(second.id(), PassId(20)).is_none());

    device.fail_buffer_creation(false);
    registry.update()?;
    assert!(registry.try_get_ubos(first.id(), PassId(1)).is_none());
    for pass in [10, 11, 12] {
        assert!(registry.try_get_ubos(first.id(), PassId(pass)).is_some());
    }
    assert!(registry.try_get_ubos(second.id(), PassId(2)).is_none());
    assert!(registry.try_get_ubos(second.id(), PassId(20)).is_some());
    assert_eq!(registry.pools().stats().model, 4);
    Ok(())
}

#[test]
fn unregistering_an_unknown_object_does_nothing() -> anyhow::Result<()> {
    let (_, mut registry) = registry();
    let known = object(1, ObjectKind::Billboard, material("m", &[1]));
    let stranger = object(2, ObjectKind::Billboard, material("m", &[1]));
    registry.register_element(known)?;

    registry.unregister_element(stranger.as_ref());

    assert_eq!(registry.len(), 1);
    assert_eq!(registry.pools().stats().billboard, 1);
    Ok(())
}

#[test]
fn unregistering_releases_slots_and_stops_listening() -> anyhow::Result<()> {
    let (_, mut registry) = registry();
    let mesh = object(1, ObjectKind::Morphed, material("m", &[1, 2]));
    registry.register_element(mesh.clone())?;
    registry.unregister_element(mesh.as_ref());

    assert!(registry.is_empty());
    assert!(!registry.is_registered(mesh.id()));
    assert_eq!(registry.pools().stats(), PoolStats::default());
    assert_eq!(mesh.material_signal().connection_count(), 0);

    mesh.set_material(material("other", &[3]));
    registry.update()?;
    assert!(registry.is_empty());
    Ok(())
}

#[test]
#[should_panic(expected = "no UBO entry")]
fn looking_up_an_unregistered_object_panics() {
    let (_, registry) = registry();
    registry.get_ubos(ObjectId::new(3, 0), PassId(1));
}

#[test]
fn update_refreshes_every_kind_of_data() -> anyhow::Result<()> {
    let (_, mut registry) = registry();
    let unit = TextureUnit {
        id: TextureUnitId(42),
        channel: TextureChannels::DIFFUSE,
        view: TextureViewId(1),
        sampler: SamplerId(1),
    };
    let pass = MaterialPass::new(PassId(5)).with_texture(unit);

    let mut skinned = MockRenderable::new(
        ObjectId::new(1, 0),
        ObjectKind::Skinned,
        Material::new("skin", vec![pass.clone()]),
    );
    let bone = Mat4::from_translation(Vec3::new(0.0, 1.0, 0.0));
    skinned.skeleton = Some(Arc::new(FixedSkeleton(vec![bone])));
    skinned.receives_shadows = false;
    let skinned = Arc::new(skinned);

    let mut morphed = MockRenderable::new(
        ObjectId::new(2, 0),
        ObjectKind::Morphed,
        Material::new("morph", vec![pass]),
    );
    morphed.animation = Some(Arc::new(FixedAnimation(0.25)));
    let morphed = Arc::new(morphed);

    registry.register_element(skinned.clone())?;
    registry.register_element(morphed.clone())?;

    let first = Mat4::from_translation(Vec3::new(1.0, 0.0, 0.0));
    let second = Mat4::from_translation(Vec3::new(2.0, 0.0, 0.0));
    skinned.set_transform(first);
    registry.update()?;
    skinned.set_transform(second);
    registry.update()?;

    let pools = registry.pools();
    let entry = registry.get_ubos(skinned.id(), PassId(5));
    let matrices = pools.model_matrix.data(&entry.model_matrix);
    assert_eq!(matrices.prv_model, first);
    assert_eq!(matrices.cur_model, second);
    assert_eq!(pools.model.data(&entry.model).shadow_receiver, 0);
    assert_eq!(pools.textures.data(&entry.textures).get(0), 42);
    let ObjectUbo::Skinning(bones) = entry.object_ubo else {
        panic!("skinned objects get a skinning slot");
    };
    assert_eq!(pools.skinning.data(&bones).bones[0], bone);

    let entry = registry.get_ubos(morphed.id(), PassId(5));
    let ObjectUbo::Morphing(morphing) = entry.object_ubo else {
        panic!("morphed objects get a morphing slot");
    };
    approx::assert_relative_eq!(pools.morphing.data(&morphing).time, 0.25);
    assert_eq!(pools.picking.data(&entry.picking).draw_index, 1);
    Ok(())
}

#[test]
fn cleanup_destroys_pool_buffers() -> anyhow::Result<()> {
    let (device, mut registry) = registry();
    let billboard = object(1, ObjectKind::Billboard, material("m", &[1]));
    registry.register_element(billboard.clone())?;
    registry.update()?;
    registry.upload()?;
    assert!(device.stats().buffer_writes >= 5);

    registry.cleanup();
    assert!(registry.is_empty());
    assert_eq!(device.stats().buffers_destroyed, device.stats().buffers_created);
    assert_eq!(billboard.material_signal().connection_count(), 0);
    Ok(())
}

#[test]
fn failed_registration_rolls_back() {
    let (device, mut registry) = registry();
    let mesh = object(1, ObjectKind::Static, material("m", &[1, 2]));
    device.fail_buffer_creation(true);
    assert!(registry.register_element(mesh.clone()).is_err());
    assert!(registry.is_empty());
    assert!(!registry.is_registered(mesh.id()));
    assert_eq!(registry.pools().stats(), PoolStats::default());
}
