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

//! A typed free-list allocator of uniform buffer slots.
//!
//! A [`UboPool`] owns a growing list of GPU buffers ("chunks"), each split into
//! fixed-stride slots holding one `T`. Callers receive [`UboHandle`]s, write the
//! staged CPU copy through the pool, and make every change visible to the GPU with
//! a single [`UboPool::upload`] per frame.

use bytemuck::Pod;
use prism_core::renderer::api::{BufferBinding, BufferDescriptor, BufferId, MemoryVisibility};
use prism_core::renderer::error::ResourceError;
use prism_core::renderer::GraphicsDevice;
use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::num::NonZeroU64;
use std::sync::Arc;

/// Minimum offset alignment of a uniform buffer binding on every supported device.
pub const MIN_UNIFORM_ALIGNMENT: u64 = 256;

/// Number of slots of the first chunk of a pool.
pub const DEFAULT_CHUNK_ELEMENTS: u32 = 64;

/// Sizing parameters of a [`UboPool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UboPoolConfig {
    /// Slots in the first chunk. Each following chunk doubles the previous one.
    pub chunk_elements: u32,
    /// Byte alignment of every slot. Must be a power of two.
    pub alignment: u64,
}

impl Default for UboPoolConfig {
    fn default() -> Self {
        Self {
            chunk_elements: DEFAULT_CHUNK_ELEMENTS,
            alignment: MIN_UNIFORM_ALIGNMENT,
        }
    }
}

/// A generation-checked reference to one slot of a [`UboPool<T>`].
///
/// Handles are plain values; the pool alone owns the memory. A handle becomes
/// stale as soon as it is given back with [`UboPool::put_buffer`], or when the
/// pool is cleaned up.
pub struct UboHandle<T> {
    epoch: u32,
    chunk: u32,
    index: u32,
    generation: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> UboHandle<T> {
    /// The chunk holding the slot.
    pub fn chunk(&self) -> u32 {
        self.chunk
    }

    /// The slot index within its chunk.
    pub fn index(&self) -> u32 {
        self.index
    }
}

impl<T> Clone for UboHandle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for UboHandle<T> {}

impl<T> PartialEq for UboHandle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.epoch == other.epoch
            && self.chunk == other.chunk
            && self.index == other.index
            && self.generation == other.generation
    }
}

impl<T> Eq for UboHandle<T> {}

impl<T> Hash for UboHandle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.epoch.hash(state);
        self.chunk.hash(state);
        self.index.hash(state);
        self.generation.hash(state);
    }
}

impl<T> fmt::Debug for UboHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UboHandle")
            .field("epoch", &self.epoch)
            .field("chunk", &self.chunk)
            .field("index", &self.index)
            .field("generation", &self.generation)
            .finish()
    }
}

struct Slot<T> {
    data: T,
    generation: u32,
    occupied: bool,
}

struct Chunk<T> {
    buffer: BufferId,
    visibility: MemoryVisibility,
    slots: Vec<Slot<T>>,
    /// Free slot indices, the most recently freed on top.
    free: Vec<u32>,
    dirty: bool,
}

/// A pool of uniform buffer slots for one configuration type.
pub struct UboPool<T: Pod> {
    device: Arc<dyn GraphicsDevice>,
    label: String,
    config: UboPoolConfig,
    stride: u64,
    chunks: Vec<Chunk<T>>,
    allocated: usize,
    /// Bumped by every cleanup, so handles never outlive the chunks they
    /// were taken from.
    epoch: u32,
}

impl<T: Pod> fmt::Debug for UboPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UboPool")
            .field("label", &self.label)
            .field("stride", &self.stride)
            .field("chunks", &self.chunks.len())
            .field("allocated", &self.allocated)
            .finish()
    }
}

impl<T: Pod> UboPool<T> {
    /// Creates an empty pool. No GPU memory is allocated until the first
    /// [`UboPool::get_buffer`].
    pub fn new(device: Arc<dyn GraphicsDevice>, label: impl Into<String>) -> Self {
        Self::with_config(device, label, UboPoolConfig::default())
    }

    /// Creates an empty pool with explicit sizing.
    ///
    /// # Panics
    /// If `config.alignment` is not a power of two or `config.chunk_elements` is 0.
    pub fn with_config(
        device: Arc<dyn GraphicsDevice>,
        label: impl Into<String>,
        config: UboPoolConfig,
    ) -> Self {
        assert!(
            config.alignment.is_power_of_two(),
            "UBO alignment must be a power of two, got {}",
            config.alignment
        );
        assert!(config.chunk_elements > 0, "UBO chunks cannot be empty");

        let size = std::mem::size_of::<T>() as u64;
        let stride = (size + config.alignment - 1) & !(config.alignment - 1);
        Self {
            device,
            label: label.into(),
            config,
            stride,
            chunks: Vec::new(),
            allocated: 0,
            epoch: 0,
        }
    }

    /// Acquires a zeroed slot backed by memory of the requested visibility.
    ///
    /// The most recently freed slot of a matching chunk is reused first. When none
    /// is free, a new chunk twice as large as the last one is created.
    ///
    /// # Errors
    /// The device error when a new chunk cannot be allocated.
    pub fn get_buffer(
        &mut self,
        visibility: MemoryVisibility,
    ) -> Result<UboHandle<T>, ResourceError> {
        let chunk_index = match self
            .chunks
            .iter()
            .position(|chunk| chunk.visibility == visibility && !chunk.free.is_empty())
        {
            Some(index) => index,
            None => self.grow(visibility)?,
        };

        let chunk = &mut self.chunks[chunk_index];
        let Some(index) = chunk.free.pop() else {
            return Err(ResourceError::OutOfBounds);
        };
        let slot = &mut chunk.slots[index as usize];
        slot.occupied = true;
        slot.data = T::zeroed();
        chunk.dirty = true;
        self.allocated += 1;

        Ok(UboHandle {
            epoch: self.epoch,
            chunk: chunk_index as u32,
            index,
            generation: slot.generation,
            _marker: PhantomData,
        })
    }

    /// Returns a slot to the pool. `handle` and every copy of it become stale.
    ///
    /// # Panics
    /// If `handle` is already stale.
    pub fn put_buffer(&mut self, handle: UboHandle<T>) {
        if !self.is_valid(&handle) {
            panic!("{}: stale UBO handle {handle:?} given back", self.label);
        }
        let chunk = &mut self.chunks[handle.chunk as usize];
        let slot = &mut chunk.slots[handle.index as usize];
        slot.occupied = false;
        slot.generation = slot.generation.wrapping_add(1);
        chunk.free.push(handle.index);
        self.allocated -= 1;
    }

    /// The staged value of a slot.
    ///
    /// # Panics
    /// If `handle` is stale.
    pub fn data(&self, handle: &UboHandle<T>) -> &T {
        &self.live_slot(handle).data
    }

    /// Mutable access to the staged value of a slot. The slot is uploaded on the
    /// next [`UboPool::upload`].
    ///
    /// # Panics
    /// If `handle` is stale.
    pub fn data_mut(&mut self, handle: &UboHandle<T>) -> &mut T {
        self.check(handle);
        let chunk = &mut self.chunks[handle.chunk as usize];
        chunk.dirty = true;
        &mut chunk.slots[handle.index as usize].data
    }

    /// The buffer range a descriptor must bind to read the slot.
    ///
    /// # Panics
    /// If `handle` is stale.
    pub fn binding(&self, handle: &UboHandle<T>) -> BufferBinding {
        self.check(handle);
        BufferBinding {
            buffer: self.chunks[handle.chunk as usize].buffer,
            offset: u64::from(handle.index) * self.stride,
            size: NonZeroU64::new(std::mem::size_of::<T>() as u64),
        }
    }

    /// Returns `true` when `handle` still designates a live slot.
    pub fn is_valid(&self, handle: &UboHandle<T>) -> bool {
        handle.epoch == self.epoch
            && self
                .chunks
                .get(handle.chunk as usize)
                .and_then(|chunk| chunk.slots.get(handle.index as usize))
                .is_some_and(|slot| slot.occupied && slot.generation == handle.generation)
    }

    /// Writes every modified chunk to the GPU.
    ///
    /// # Errors
    /// The first device write failure. Chunks after it stay dirty.
    pub fn upload(&mut self) -> Result<(), ResourceError> {
        let stride = self.stride as usize;
        let size = std::mem::size_of::<T>();
        for chunk in self.chunks.iter_mut().filter(|chunk| chunk.dirty) {
            let mut bytes = vec![0u8; stride * chunk.slots.len()];
            for (i, slot) in chunk.slots.iter().enumerate() {
                let start = i * stride;
                bytes[start..start + size].copy_from_slice(bytemuck::bytes_of(&slot.data));
            }
            self.device.write_buffer(chunk.buffer, 0, &bytes)?;
            chunk.dirty = false;
            log::trace!("{}: uploaded {} bytes.", self.label, bytes.len());
        }
        Ok(())
    }

    /// Destroys every chunk. Every handle becomes stale.
    pub fn cleanup(&mut self) {
        for chunk in self.chunks.drain(..) {
            if let Err(e) = self.device.destroy_buffer(chunk.buffer) {
                log::warn!("{}: failed to destroy buffer {:?}: {e}", self.label, chunk.buffer);
            }
        }
        self.allocated = 0;
        self.epoch = self.epoch.wrapping_add(1);
    }

    /// Number of slots currently handed out.
    pub fn allocated_count(&self) -> usize {
        self.allocated
    }

    /// Total number of slots across all chunks.
    pub fn capacity(&self) -> usize {
        self.chunks.iter().map(|chunk| chunk.slots.len()).sum()
    }

    /// Number of GPU buffers backing the pool.
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Distance in bytes between two consecutive slots.
    pub fn stride(&self) -> u64 {
        self.stride
    }

    /// The label used for buffers and logs.
    pub fn label(&self) -> &str {
        &self.label
    }

    fn grow(&mut self, visibility: MemoryVisibility) -> Result<usize, ResourceError> {
        let elements = self
            .chunks
            .last()
            .map_or(self.config.chunk_elements, |chunk| chunk.slots.len() as u32 * 2);
        let size = self.stride * u64::from(elements);
        let buffer = self.device.create_buffer(&BufferDescriptor {
            label: Some(Cow::Owned(format!("{} #{}", self.label, self.chunks.len()))),
            size,
            usage: visibility.uniform_usage(),
            mapped_at_creation: false,
        })?;
        log::debug!(
            "{}: new chunk of {elements} slots ({size} bytes, {visibility:?}).",
            self.label
        );

        self.chunks.push(Chunk {
            buffer,
            visibility,
            slots: (0..elements)
                .map(|_| Slot {
                    data: T::zeroed(),
                    generation: 0,
                    occupied: false,
                })
                .collect(),
            free: (0..elements).rev().collect(),
            dirty: false,
        });
        Ok(self.chunks.len() - 1)
    }

    fn live_slot(&self, handle: &UboHandle<T>) -> &Slot<T> {
        self.check(handle);
        &self.chunks[handle.chunk as usize].slots[handle.index as usize]
    }

    fn check(&self, handle: &UboHandle<T>) {
        assert!(
            self.is_valid(handle),
            "{}: stale UBO handle {handle:?}",
            self.label
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytemuck::Zeroable;
    use prism_core::testing::MockGraphicsDevice;

    #[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
    #[repr(C)]
    struct Small {
        value: [f32; 4],
    }

    fn pool(chunk_elements: u32) -> (Arc<MockGraphicsDevice>, UboPool<Small>) {
        let device = Arc::new(MockGraphicsDevice::new());
        let pool = UboPool::with_config(
            device.clone(),
            "small",
            UboPoolConfig {
                chunk_elements,
                alignment: MIN_UNIFORM_ALIGNMENT,
            },
        );
        (device, pool)
    }

    #[test]
    fn stride_is_aligned() {
        let (_, pool) = pool(4);
        assert_eq!(pool.stride(), 256);
    }

    #[test]
    fn chunks_double_when_full() {
        let (device, mut pool) = pool(2);
        let handles: Vec<_> = (0..7)
            .map(|_| pool.get_buffer(MemoryVisibility::HostVisible).unwrap())
            .collect();
        assert_eq!(pool.chunk_count(), 3);
        assert_eq!(pool.capacity(), 2 + 4 + 8);
        assert_eq!(pool.allocated_count(), 7);
        assert_eq!(device.stats().buffers_created, 3);
        assert_eq!(handles[6].chunk(), 2);
    }

    #[test]
    fn freed_slots_are_reused_last_in_first_out() {
        let (_, mut pool) = pool(4);
        let a = pool.get_buffer(MemoryVisibility::HostVisible).unwrap();
        let b = pool.get_buffer(MemoryVisibility::HostVisible).unwrap();
        pool.put_buffer(a);
        pool.put_buffer(b);
        let c = pool.get_buffer(MemoryVisibility::HostVisible).unwrap();
        assert_eq!(c.index(), b.index());
        assert_ne!(c, b);
        assert!(!pool.is_valid(&b));
        assert!(pool.is_valid(&c));
    }

    #[test]
    fn visibilities_do_not_share_chunks() {
        let (_, mut pool) = pool(4);
        let host = pool.get_buffer(MemoryVisibility::HostVisible).unwrap();
        let local = pool.get_buffer(MemoryVisibility::DeviceLocal).unwrap();
        assert_ne!(host.chunk(), local.chunk());
        assert_ne!(pool.binding(&host).buffer, pool.binding(&local).buffer);
    }

    #[test]
    fn upload_writes_staged_values_at_slot_offsets() {
        let (device, mut pool) = pool(4);
        let _first = pool.get_buffer(MemoryVisibility::HostVisible).unwrap();
        let second = pool.get_buffer(MemoryVisibility::HostVisible).unwrap();
        pool.data_mut(&second).value = [1.0, 2.0, 3.0, 4.0];
        pool.upload().unwrap();

        let binding = pool.binding(&second);
        assert_eq!(binding.offset, 256);
        let buffer = device.buffer(binding.buffer).unwrap();
        let start = binding.offset as usize;
        let written: &[f32] = bytemuck::cast_slice(&buffer.contents[start..start + 16]);
        assert_eq!(written, &[1.0, 2.0, 3.0, 4.0]);

        let writes = device.stats().buffer_writes;
        pool.upload().unwrap();
        assert_eq!(device.stats().buffer_writes, writes);
    }

    #[test]
    fn allocation_failure_is_reported() {
        let (device, mut pool) = pool(4);
        device.fail_buffer_creation(true);
        let err = pool.get_buffer(MemoryVisibility::HostVisible).unwrap_err();
        assert!(matches!(err, ResourceError::OutOfMemory { requested: 1024 }));
        assert_eq!(pool.allocated_count(), 0);
    }

    #[test]
    #[should_panic(expected = "stale UBO handle")]
    fn double_put_panics() {
        let (_, mut pool) = pool(4);
        let handle = pool.get_buffer(MemoryVisibility::HostVisible).unwrap();
        pool.put_buffer(handle);
        pool.put_buffer(handle);
    }

    #[test]
    fn cleanup_releases_every_buffer() {
        let (device, mut pool) = pool(1);
        let handle = pool.get_buffer(MemoryVisibility::HostVisible).unwrap();
        pool.get_buffer(MemoryVisibility::HostVisible).unwrap();
        pool.cleanup();
        assert_eq!(device.stats().buffers_destroyed, 2);
        assert_eq!(pool.capacity(), 0);
        assert!(!pool.is_valid(&handle));
    }

    #[test]
    fn handles_do_not_survive_cleanup_and_regrow() {
        let (_, mut pool) = pool(4);
        let old = pool.get_buffer(MemoryVisibility::HostVisible).unwrap();
        pool.cleanup();
        let new = pool.get_buffer(MemoryVisibility::HostVisible).unwrap();
        assert_eq!((new.chunk(), new.index()), (old.chunk(), old.index()));
        assert_ne!(new, old);
        assert!(!pool.is_valid(&old));
        assert!(pool.is_valid(&new));
    }

    #[test]
    #[should_panic(expected = "stale UBO handle")]
    fn reading_through_a_handle_from_before_cleanup_panics() {
        let (_, mut pool) = pool(4);
        let old = pool.get_buffer(MemoryVisibility::HostVisible).unwrap();
        pool.cleanup();
        pool.get_buffer(MemoryVisibility::HostVisible).unwrap();
        let _ = pool.data(&old);
    }
}
