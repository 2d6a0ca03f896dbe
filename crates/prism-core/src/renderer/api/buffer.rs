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

//! Buffer descriptors and handles.

use bitflags::bitflags;
use std::borrow::Cow;

bitflags! {
    /// A set of flags describing the allowed usages of a GPU buffer.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsage: u32 {
        /// The buffer can be mapped for reading.
        const MAP_READ = 1 << 0;
        /// The buffer can be mapped for writing.
        const MAP_WRITE = 1 << 1;
        /// The buffer can be the source of a copy operation.
        const COPY_SRC = 1 << 2;
        /// The buffer can be the destination of a copy operation.
        const COPY_DST = 1 << 3;
        /// The buffer can be bound as an index buffer.
        const INDEX = 1 << 4;
        /// The buffer can be bound as a vertex buffer.
        const VERTEX = 1 << 5;
        /// The buffer can be bound as a uniform buffer.
        const UNIFORM = 1 << 6;
        /// The buffer can be bound as a storage buffer.
        const STORAGE = 1 << 7;
        /// The buffer can be bound as a uniform texel buffer (`samplerBuffer`).
        const UNIFORM_TEXEL = 1 << 8;
    }
}

/// Where the memory backing a buffer should live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MemoryVisibility {
    /// Mappable by the CPU, written every frame.
    #[default]
    HostVisible,
    /// GPU-only memory, written through staging copies.
    DeviceLocal,
}

impl MemoryVisibility {
    /// The usage flags a uniform buffer with this visibility needs.
    pub fn uniform_usage(self) -> BufferUsage {
        match self {
            MemoryVisibility::HostVisible => {
                BufferUsage::UNIFORM | BufferUsage::COPY_DST | BufferUsage::MAP_WRITE
            }
            MemoryVisibility::DeviceLocal => BufferUsage::UNIFORM | BufferUsage::COPY_DST,
        }
    }
}

/// A descriptor used to create a [`BufferId`].
#[derive(Debug, Clone)]
pub struct BufferDescriptor<'a> {
    /// An optional debug label.
    pub label: Option<Cow<'a, str>>,
    /// The total size of the buffer in bytes.
    pub size: u64,
    /// A bitmask of `BufferUsage` flags.
    pub usage: BufferUsage,
    /// If true, the buffer is created in a mapped state.
    pub mapped_at_creation: bool,
}

/// An opaque handle to a GPU buffer resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub usize);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_visible_uniforms_are_mappable() {
        let usage = MemoryVisibility::HostVisible.uniform_usage();
        assert!(usage.contains(BufferUsage::UNIFORM | BufferUsage::MAP_WRITE));
        assert!(!MemoryVisibility::DeviceLocal
            .uniform_usage()
            .contains(BufferUsage::MAP_WRITE));
    }
}
