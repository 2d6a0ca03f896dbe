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

use super::material::Material;
use super::signal::MaterialSignal;
use crate::math::Mat4;
use crate::renderer::api::{BufferId, PrimitiveTopology};
use crate::renderer::flags::ProgramFlags;
use std::fmt::Debug;
use std::sync::Arc;

/// The maximum number of bones a skeleton may drive.
pub const MAX_BONES_COUNT: usize = 400;

/// A unique identifier for a renderable object.
///
/// It combines an index with a generation count: when the scene recycles an
/// index, the generation is incremented so stale ids never alias the new object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId {
    /// The slot of the object in the scene's storage.
    pub index: u32,
    /// Incremented each time the slot is recycled.
    pub generation: u32,
}

impl ObjectId {
    /// Creates an id.
    pub const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }
}

/// The kind of geometry an object renders, which selects its render node variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    /// A rigid mesh.
    Static,
    /// A mesh deformed by a skeleton.
    Skinned,
    /// A mesh interpolated between keyframes.
    Morphed,
    /// Camera-facing quads.
    Billboard,
}

impl ObjectKind {
    /// The program flags implied by this kind of geometry.
    pub fn program_flags(self) -> ProgramFlags {
        match self {
            ObjectKind::Static => ProgramFlags::empty(),
            ObjectKind::Skinned => ProgramFlags::SKINNING,
            ObjectKind::Morphed => ProgramFlags::MORPHING,
            ObjectKind::Billboard => ProgramFlags::BILLBOARDS,
        }
    }
}

/// The buffers holding an object's geometry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeometryBuffers {
    /// Vertex buffers, bound in order.
    pub vertex_buffers: Vec<BufferId>,
    /// Index buffer, if the geometry is indexed.
    pub index_buffer: Option<BufferId>,
    /// Number of vertices.
    pub vertex_count: u32,
    /// Number of indices, 0 when not indexed.
    pub index_count: u32,
    /// How vertices are assembled.
    pub topology: PrimitiveTopology,
}

impl Default for GeometryBuffers {
    fn default() -> Self {
        Self {
            vertex_buffers: Vec::new(),
            index_buffer: None,
            vertex_count: 0,
            index_count: 0,
            topology: PrimitiveTopology::TriangleList,
        }
    }
}

impl GeometryBuffers {
    /// Number of primitives drawn by one instance.
    pub fn primitive_count(&self) -> u32 {
        let elements = if self.index_buffer.is_some() {
            self.index_count
        } else {
            self.vertex_count
        };
        match self.topology {
            PrimitiveTopology::PointList => elements,
            PrimitiveTopology::LineList => elements / 2,
            PrimitiveTopology::LineStrip => elements.saturating_sub(1),
            PrimitiveTopology::TriangleList => elements / 3,
            PrimitiveTopology::TriangleStrip => elements.saturating_sub(2),
        }
    }
}

/// Current pose of a skeleton.
pub trait Skeleton: Send + Sync + Debug {
    /// Final bone matrices, at most [`MAX_BONES_COUNT`] are used.
    fn bone_matrices(&self) -> Vec<Mat4>;
}

/// Current state of a keyframe animation.
pub trait MeshAnimation: Send + Sync + Debug {
    /// Interpolation factor between the two bound keyframes, in `[0, 1]`.
    fn morph_time(&self) -> f32;
}

/// A scene entity the renderer can draw.
pub trait RenderableObject: Send + Sync + Debug {
    /// The identity token of the object.
    fn id(&self) -> ObjectId;

    /// The kind of geometry.
    fn kind(&self) -> ObjectKind;

    /// The material currently applied.
    fn material(&self) -> Arc<Material>;

    /// Notifies subscribers when [`RenderableObject::material`] changes.
    fn material_signal(&self) -> &MaterialSignal;

    /// World transform of the parent scene node, as of the current frame.
    fn world_transform(&self) -> Mat4;

    /// Program flags implied by the object, on top of the pass and technique flags.
    fn program_flags(&self) -> ProgramFlags {
        self.kind().program_flags()
    }

    /// Whether shadows are cast onto the object.
    fn receives_shadows(&self) -> bool {
        true
    }

    /// Index of the environment map reflected by the object.
    fn environment_map_index(&self) -> u32 {
        0
    }

    /// Index written by picking passes.
    fn picking_index(&self) -> u32 {
        self.id().index
    }

    /// Width and height of billboards.
    fn billboard_dimensions(&self) -> [f32; 2] {
        [1.0, 1.0]
    }

    /// Skeleton of skinned meshes.
    fn skeleton(&self) -> Option<Arc<dyn Skeleton>> {
        None
    }

    /// Animation of morphed meshes.
    fn mesh_animation(&self) -> Option<Arc<dyn MeshAnimation>> {
        None
    }

    /// The geometry to draw.
    fn geometry_buffers(&self) -> GeometryBuffers {
        GeometryBuffers::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitive_count_depends_on_topology() {
        let mut geometry = GeometryBuffers {
            vertex_count: 12,
            ..Default::default()
        };
        assert_eq!(geometry.primitive_count(), 4);

        geometry.index_buffer = Some(BufferId(1));
        geometry.index_count = 36;
        assert_eq!(geometry.primitive_count(), 12);

        geometry.topology = PrimitiveTopology::TriangleStrip;
        assert_eq!(geometry.primitive_count(), 34);
    }

    #[test]
    fn kinds_map_to_program_flags() {
        assert!(ObjectKind::Static.program_flags().is_empty());
        assert_eq!(ObjectKind::Billboard.program_flags(), ProgramFlags::BILLBOARDS);
    }
}
