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

//! The per-object UBO registry.
//!
//! [`ObjectUboPools`] gives every `(object, material pass)` pair in use its own
//! bundle of uniform buffer slots, a [`PoolsEntry`], and keeps the bundles in sync
//! with material swaps. Billboards and meshes use two separate instances.

use crate::ubo::*;
use ahash::AHashMap;
use prism_core::event::EventBus;
use prism_core::renderer::api::MemoryVisibility;
use prism_core::renderer::error::ResourceError;
use prism_core::renderer::GraphicsDevice;
use prism_core::scene::{
    ConnectionId, MaterialChanged, MaterialPass, ObjectId, ObjectKind, PassId, RenderableObject,
};
use std::sync::Arc;

/// Identifies one entry of the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntryKey {
    /// The registered object.
    pub object: ObjectId,
    /// One pass of its material.
    pub pass: PassId,
}

/// The slot holding data specific to the kind of object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectUbo {
    /// Static meshes have no extra data.
    None,
    /// Billboard dimensions.
    Billboard(UboHandle<BillboardUboConfiguration>),
    /// Bone matrices.
    Skinning(UboHandle<SkinningUboConfiguration>),
    /// Keyframe interpolation factor.
    Morphing(UboHandle<MorphingUboConfiguration>),
}

/// The UBO slots of one `(object, pass)` pair.
#[derive(Debug, Clone)]
pub struct PoolsEntry {
    /// The object the slots describe.
    pub object: Arc<dyn RenderableObject>,
    /// The material pass the slots describe.
    pub pass: Arc<MaterialPass>,
    /// Material index, shadow receiving and environment map.
    pub model: UboHandle<ModelUboConfiguration>,
    /// Current and previous world matrices.
    pub model_matrix: UboHandle<ModelMatrixUboConfiguration>,
    /// Kind-specific data.
    pub object_ubo: ObjectUbo,
    /// Picking identifiers.
    pub picking: UboHandle<PickingUboConfiguration>,
    /// Packed texture unit ids.
    pub textures: UboHandle<TexturesUboConfiguration>,
}

impl PoolsEntry {
    /// The key of this entry.
    pub fn key(&self) -> EntryKey {
        EntryKey {
            object: self.object.id(),
            pass: self.pass.id,
        }
    }
}

/// The pools backing one registry.
#[derive(Debug)]
pub struct UboPools {
    pub model: UboPool<ModelUboConfiguration>,
    pub model_matrix: UboPool<ModelMatrixUboConfiguration>,
    pub billboard: UboPool<BillboardUboConfiguration>,
    pub skinning: UboPool<SkinningUboConfiguration>,
    pub morphing: UboPool<MorphingUboConfiguration>,
    pub picking: UboPool<PickingUboConfiguration>,
    pub textures: UboPool<TexturesUboConfiguration>,
}

impl UboPools {
    fn new(device: &Arc<dyn GraphicsDevice>, name: &str, config: UboPoolConfig) -> Self {
        Self {
            model: UboPool::with_config(device.clone(), format!("{name}/Model"), config),
            model_matrix: UboPool::with_config(
                device.clone(),
                format!("{name}/ModelMatrix"),
                config,
            ),
            billboard: UboPool::with_config(device.clone(), format!("{name}/Billboard"), config),
            skinning: UboPool::with_config(device.clone(), format!("{name}/Skinning"), config),
            morphing: UboPool::with_config(device.clone(), format!("{name}/Morphing"), config),
            picking: UboPool::with_config(device.clone(), format!("{name}/Picking"), config),
            textures: UboPool::with_config(device.clone(), format!("{name}/Textures"), config),
        }
    }

    /// Allocated slot count of every pool.
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            model: self.model.allocated_count(),
            model_matrix: self.model_matrix.allocated_count(),
            billboard: self.billboard.allocated_count(),
            skinning: self.skinning.allocated_count(),
            morphing: self.morphing.allocated_count(),
            picking: self.picking.allocated_count(),
            textures: self.textures.allocated_count(),
        }
    }

    fn upload(&mut self) -> Result<(), ResourceError> {
        self.model.upload()?;
        self.model_matrix.upload()?;
        self.billboard.upload()?;
        self.skinning.upload()?;
        self.morphing.upload()?;
        self.picking.upload()?;
        self.textures.upload()
    }

    fn cleanup(&mut self) {
        self.model.cleanup();
        self.model_matrix.cleanup();
        self.billboard.cleanup();
        self.skinning.cleanup();
        self.morphing.cleanup();
        self.picking.cleanup();
        self.textures.cleanup();
    }
}

/// Allocated slot count per pool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub model: usize,
    pub model_matrix: usize,
    pub billboard: usize,
    pub skinning: usize,
    pub morphing: usize,
    pub picking: usize,
    pub textures: usize,
}

#[derive(Debug)]
struct Registration {
    connection: ConnectionId,
    object: Arc<dyn RenderableObject>,
}

/// Maps `(object, pass)` pairs to their UBO slots.
#[derive(Debug)]
pub struct ObjectUboPools {
    name: String,
    visibility: MemoryVisibility,
    pools: UboPools,
    entries: AHashMap<EntryKey, PoolsEntry>,
    registrations: AHashMap<ObjectId, Registration>,
    material_changes: EventBus<MaterialChanged>,
    /// A change whose application failed, retried before the queued ones.
    failed_change: Option<MaterialChanged>,
}

impl ObjectUboPools {
    /// Creates an empty registry whose pools allocate host-visible memory.
    pub fn new(device: Arc<dyn GraphicsDevice>, name: impl Into<String>) -> Self {
        Self::with_config(
            device,
            name,
            MemoryVisibility::HostVisible,
            UboPoolConfig::default(),
        )
    }

    /// Creates an empty registry with explicit pool parameters.
    pub fn with_config(
        device: Arc<dyn GraphicsDevice>,
        name: impl Into<String>,
        visibility: MemoryVisibility,
        config: UboPoolConfig,
    ) -> Self {
        let name = name.into();
        log::info!("Creating UBO registry '{name}'.");
        Self {
            pools: UboPools::new(&device, &name, config),
            name,
            visibility,
            entries: AHashMap::new(),
            registrations: AHashMap::new(),
            material_changes: EventBus::new(),
            failed_change: None,
        }
    }

    /// Creates one entry per pass of the object's current material and subscribes
    /// to its material changes.
    ///
    /// Registering an object twice is a no-op.
    ///
    /// # Errors
    /// The device error when a pool cannot grow. Entries created by this call are
    /// released before returning.
    pub fn register_element(
        &mut self,
        object: Arc<dyn RenderableObject>,
    ) -> Result<(), ResourceError> {
        let id = object.id();
        if self.registrations.contains_key(&id) {
            log::debug!("{}: {id:?} is already registered.", self.name);
            return Ok(());
        }

        let material = object.material();
        let mut created = Vec::with_capacity(material.passes.len());
        for pass in &material.passes {
            match self.create_entry(&object, pass) {
                Ok(Some(key)) => created.push(key),
                Ok(None) => {}
                Err(e) => {
                    for key in created {
                        self.remove_entry(key);
                    }
                    return Err(e);
                }
            }
        }

        let connection = object
            .material_signal()
            .connect(self.material_changes.sender());
        log::debug!(
            "{}: registered {id:?} with {} pass(es).",
            self.name,
            material.passes.len()
        );
        self.registrations
            .insert(id, Registration { connection, object });
        Ok(())
    }

    /// Unsubscribes from the object's material changes and releases all its entries.
    ///
    /// Unregistering an object that is not registered does nothing.
    pub fn unregister_element(&mut self, object: &dyn RenderableObject) {
        let id = object.id();
        let Some(registration) = self.registrations.remove(&id) else {
            log::debug!("{}: {id:?} is not registered, nothing to remove.", self.name);
            return;
        };
        registration
            .object
            .material_signal()
            .disconnect(registration.connection);

        let keys: Vec<EntryKey> = self
            .entries
            .keys()
            .filter(|key| key.object == id)
            .copied()
            .collect();
        for key in keys {
            self.remove_entry(key);
        }
        log::debug!("{}: unregistered {id:?}.", self.name);
    }

    /// The entry of `(object, pass)`.
    ///
    /// # Panics
    /// If the object is not registered or `pass` is not a pass of its material.
    pub fn get_ubos(&self, object: ObjectId, pass: PassId) -> &PoolsEntry {
        self.try_get_ubos(object, pass).unwrap_or_else(|| {
            panic!(
                "{}: no UBO entry for {object:?} / {pass:?}, object not registered \
                 or pass not in its material",
                self.name
            )
        })
    }

    /// The entry of `(object, pass)`, if any.
    pub fn try_get_ubos(&self, object: ObjectId, pass: PassId) -> Option<&PoolsEntry> {
        self.entries.get(&EntryKey { object, pass })
    }

    /// Applies pending material changes: entries of the old material's passes are
    /// released and entries for the new material's passes are created.
    ///
    /// Changes of objects unregistered since they were emitted are dropped.
    /// Changes are applied in emission order. When one fails, it and every
    /// later change stay pending for the next call.
    pub fn process_material_changes(&mut self) -> Result<(), ResourceError> {
        while let Some(change) = self
            .failed_change
            .take()
            .or_else(|| self.material_changes.receiver().try_recv().ok())
        {
            if let Err(e) = self.apply_material_change(&change) {
                log::warn!(
                    "{}: material change of {:?} failed: {e}",
                    self.name,
                    change.object
                );
                self.failed_change = Some(change);
                return Err(e);
            }
        }
        Ok(())
    }

    /// Removing and creating entries are both idempotent, so a partially
    /// applied change can be applied again.
    fn apply_material_change(&mut self, change: &MaterialChanged) -> Result<(), ResourceError> {
        let Some(object) = self
            .registrations
            .get(&change.object)
            .map(|registration| registration.object.clone())
        else {
            log::trace!("{}: ignoring change of {:?}.", self.name, change.object);
            return Ok(());
        };

        for pass in &change.old.passes {
            self.remove_entry(EntryKey {
                object: change.object,
                pass: pass.id,
            });
        }
        for pass in &change.new.passes {
            self.create_entry(&object, pass)?;
        }
        log::debug!(
            "{}: {:?} switched from '{}' to '{}'.",
            self.name,
            change.object,
            change.old.name,
            change.new.name
        );
        Ok(())
    }

    /// Refreshes the staged data of every entry from its object and pass.
    ///
    /// Pending material changes are applied first.
    pub fn update(&mut self) -> Result<(), ResourceError> {
        self.process_material_changes()?;

        let mut keys: Vec<EntryKey> = self.entries.keys().copied().collect();
        keys.sort_unstable();

        for (draw_index, key) in keys.iter().enumerate() {
            let entry = &self.entries[key];
            let object = &entry.object;

            let model = self.pools.model.data_mut(&entry.model);
            model.shadow_receiver = u32::from(object.receives_shadows());
            model.material_index = entry.pass.id.0;
            model.env_map_index = object.environment_map_index();

            self.pools
                .model_matrix
                .data_mut(&entry.model_matrix)
                .advance(object.world_transform());

            match entry.object_ubo {
                ObjectUbo::None => {}
                ObjectUbo::Billboard(handle) => {
                    self.pools.billboard.data_mut(&handle).dimensions =
                        object.billboard_dimensions();
                }
                ObjectUbo::Skinning(handle) => {
                    if let Some(skeleton) = object.skeleton() {
                        self.pools
                            .skinning
                            .data_mut(&handle)
                            .set_bones(&skeleton.bone_matrices());
                    }
                }
                ObjectUbo::Morphing(handle) => {
                    if let Some(animation) = object.mesh_animation() {
                        self.pools.morphing.data_mut(&handle).time = animation.morph_time();
                    }
                }
            }

            let picking = self.pools.picking.data_mut(&entry.picking);
            picking.draw_index = draw_index as u32;
            picking.node_index = object.picking_index();

            self.pools
                .textures
                .data_mut(&entry.textures)
                .pack(entry.pass.bound_textures().iter().map(|(_, unit)| unit.id));
        }
        Ok(())
    }

    /// Writes every modified slot to the GPU.
    pub fn upload(&mut self) -> Result<(), ResourceError> {
        self.pools.upload()
    }

    /// Releases every entry. Registrations stay, so later material changes still
    /// create entries.
    pub fn clear(&mut self) {
        let keys: Vec<EntryKey> = self.entries.keys().copied().collect();
        for key in keys {
            self.remove_entry(key);
        }
    }

    /// Releases every entry, drops every registration and destroys the pools.
    pub fn cleanup(&mut self) {
        self.clear();
        for (_, registration) in self.registrations.drain() {
            registration
                .object
                .material_signal()
                .disconnect(registration.connection);
        }
        self.material_changes.drain();
        self.failed_change = None;
        self.pools.cleanup();
        log::debug!("{}: cleaned up.", self.name);
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when no entry is live.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns `true` when the object is registered.
    pub fn is_registered(&self, object: ObjectId) -> bool {
        self.registrations.contains_key(&object)
    }

    /// Iterates over the live entries, in no particular order.
    pub fn entries(&self) -> impl Iterator<Item = &PoolsEntry> {
        self.entries.values()
    }

    /// The pools, for reading staged data and descriptor bindings.
    pub fn pools(&self) -> &UboPools {
        &self.pools
    }

    /// The registry name.
    pub fn name(&self) -> &str {
        &self.name
    }

    fn create_entry(
        &mut self,
        object: &Arc<dyn RenderableObject>,
        pass: &Arc<MaterialPass>,
    ) -> Result<Option<EntryKey>, ResourceError> {
        let key = EntryKey {
            object: object.id(),
            pass: pass.id,
        };
        if self.entries.contains_key(&key) {
            return Ok(None);
        }

        let visibility = self.visibility;
        let pools = &mut self.pools;
        let model = pools.model.get_buffer(visibility)?;
        let model_matrix = match pools.model_matrix.get_buffer(visibility) {
            Ok(handle) => handle,
            Err(e) => {
                pools.model.put_buffer(model);
                return Err(e);
            }
        };
        let object_ubo = match Self::acquire_object_ubo(pools, object.kind(), visibility) {
            Ok(ubo) => ubo,
            Err(e) => {
                pools.model.put_buffer(model);
                pools.model_matrix.put_buffer(model_matrix);
                return Err(e);
            }
        };
        let picking = match pools.picking.get_buffer(visibility) {
            Ok(handle) => handle,
            Err(e) => {
                pools.model.put_buffer(model);
                pools.model_matrix.put_buffer(model_matrix);
                Self::release_object_ubo(pools, object_ubo);
                return Err(e);
            }
        };
        let textures = match pools.textures.get_buffer(visibility) {
            Ok(handle) => handle,
            Err(e) => {
                pools.model.put_buffer(model);
                pools.model_matrix.put_buffer(model_matrix);
                Self::release_object_ubo(pools, object_ubo);
                pools.picking.put_buffer(picking);
                return Err(e);
            }
        };

        let transform = object.world_transform();
        let matrices = pools.model_matrix.data_mut(&model_matrix);
        matrices.prv_model = transform;
        matrices.cur_model = transform;

        self.entries.insert(
            key,
            PoolsEntry {
                object: object.clone(),
                pass: pass.clone(),
                model,
                model_matrix,
                object_ubo,
                picking,
                textures,
            },
        );
        Ok(Some(key))
    }

    fn remove_entry(&mut self, key: EntryKey) {
        let Some(entry) = self.entries.remove(&key) else {
            return;
        };
        let pools = &mut self.pools;
        pools.model.put_buffer(entry.model);
        pools.model_matrix.put_buffer(entry.model_matrix);
        Self::release_object_ubo(pools, entry.object_ubo);
        pools.picking.put_buffer(entry.picking);
        pools.textures.put_buffer(entry.textures);
    }

    fn acquire_object_ubo(
        pools: &mut UboPools,
        kind: ObjectKind,
        visibility: MemoryVisibility,
    ) -> Result<ObjectUbo, ResourceError> {
        Ok(match kind {
            ObjectKind::Static => ObjectUbo::None,
            ObjectKind::Billboard => ObjectUbo::Billboard(pools.billboard.get_buffer(visibility)?),
            ObjectKind::Skinned => ObjectUbo::Skinning(pools.skinning.get_buffer(visibility)?),
            ObjectKind::Morphed => ObjectUbo::Morphing(pools.morphing.get_buffer(visibility)?),
        })
    }

    fn release_object_ubo(pools: &mut UboPools, ubo: ObjectUbo) {
        match ubo {
            ObjectUbo::None => {}
            ObjectUbo::Billboard(handle) => pools.billboard.put_buffer(handle),
            ObjectUbo::Skinning(handle) => pools.skinning.put_buffer(handle),
            ObjectUbo::Morphing(handle) => pools.morphing.put_buffer(handle),
        }
    }
}
