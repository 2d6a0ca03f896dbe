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

//! Render nodes, the per-frame queues holding them and the helpers filling
//! instancing buffers.

use super::bindings::UboSlot;
use super::pipeline::RenderPipeline;
use bytemuck::Pod;
use prism_core::renderer::api::{
    BindGroupId, BufferBinding, BufferDescriptor, BufferId, BufferUsage,
};
use prism_core::renderer::error::ResourceError;
use prism_core::renderer::flags::ProgramFlags;
use prism_core::renderer::traits::GraphicsDevice;
use prism_core::scene::{
    GeometryBuffers, MaterialPass, MeshAnimation, RenderableObject, Skeleton, MAX_BONES_COUNT,
};
use prism_data::ubo::InstantiationData;
use std::borrow::Cow;
use std::fmt::Debug;
use std::sync::Arc;

/// Floats per bone matrix.
const MATRIX_FLOATS: usize = 16;
/// Floats reserved per skinned instance in an instanced bones buffer.
pub const BONES_STRIDE: usize = MATRIX_FLOATS * MAX_BONES_COUNT;

/// What every render node binds.
#[derive(Debug, Clone)]
pub struct RenderNodeBase {
    /// The pipeline drawing the node.
    pub pipeline: Arc<RenderPipeline>,
    /// The material pass drawn.
    pub pass: Arc<MaterialPass>,
    /// The drawn object.
    pub object: Arc<dyn RenderableObject>,
    /// Model matrices slot.
    pub model_matrix: BufferBinding,
    /// Model data slot.
    pub model: BufferBinding,
    /// Picking slot.
    pub picking: BufferBinding,
    /// Texture ids slot.
    pub textures: BufferBinding,
    /// Geometry of the object.
    pub buffers: GeometryBuffers,
    /// Set 0, once initialised.
    pub ubo_descriptor: Option<BindGroupId>,
    /// Set 1, once initialised.
    pub texture_descriptor: Option<BindGroupId>,
}

impl RenderNodeBase {
    fn binding(&self, slot: UboSlot) -> Option<BufferBinding> {
        match slot {
            UboSlot::ModelMatrix => Some(self.model_matrix),
            UboSlot::Model => Some(self.model),
            UboSlot::Picking => Some(self.picking),
            UboSlot::Textures => Some(self.textures),
            _ => None,
        }
    }
}

/// A drawable bundling a pipeline, its UBO slots and its geometry.
pub trait RenderNode: Send + Sync + Debug {
    /// The bindings shared by every kind of node.
    fn base(&self) -> &RenderNodeBase;

    /// Mutable access to the shared bindings.
    fn base_mut(&mut self) -> &mut RenderNodeBase;

    /// The buffer specific to this kind of node bound at `slot`, if any.
    fn kind_binding(&self, _slot: UboSlot) -> Option<BufferBinding> {
        None
    }

    /// The object buffer bound at `slot`; scene-wide slots are `None`.
    fn binding(&self, slot: UboSlot) -> Option<BufferBinding> {
        self.base()
            .binding(slot)
            .or_else(|| self.kind_binding(slot))
    }
}

/// A rigid mesh.
#[derive(Debug, Clone)]
pub struct StaticRenderNode {
    /// Shared bindings.
    pub base: RenderNodeBase,
}

/// A skinned mesh.
#[derive(Debug, Clone)]
pub struct SkinningRenderNode {
    /// Shared bindings.
    pub base: RenderNodeBase,
    /// The animated skeleton.
    pub skeleton: Arc<dyn Skeleton>,
    /// Bone matrices slot.
    pub skinning: BufferBinding,
    /// Bones storage buffer of the instanced batch the node belongs to.
    pub instanced_bones: Option<BufferBinding>,
}

/// A morphed mesh.
#[derive(Debug, Clone)]
pub struct MorphingRenderNode {
    /// Shared bindings.
    pub base: RenderNodeBase,
    /// The running animation.
    pub animation: Arc<dyn MeshAnimation>,
    /// Interpolation factor slot.
    pub morphing: BufferBinding,
}

/// A set of camera-facing quads.
#[derive(Debug, Clone)]
pub struct BillboardRenderNode {
    /// Shared bindings.
    pub base: RenderNodeBase,
    /// Dimensions slot.
    pub billboard: BufferBinding,
}

impl RenderNode for StaticRenderNode {
    fn base(&self) -> &RenderNodeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut RenderNodeBase {
        &mut self.base
    }
}

impl RenderNode for SkinningRenderNode {
    fn base(&self) -> &RenderNodeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut RenderNodeBase {
        &mut self.base
    }

    fn kind_binding(&self, slot: UboSlot) -> Option<BufferBinding> {
        if slot != UboSlot::Skinning {
            return None;
        }
        let instanced = self
            .base
            .pipeline
            .flags()
            .program_flags
            .contains(ProgramFlags::INSTANTIATION);
        if instanced {
            self.instanced_bones
        } else {
            Some(self.skinning)
        }
    }
}

impl RenderNode for MorphingRenderNode {
    fn base(&self) -> &RenderNodeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut RenderNodeBase {
        &mut self.base
    }

    fn kind_binding(&self, slot: UboSlot) -> Option<BufferBinding> {
        (slot == UboSlot::Morphing).then_some(self.morphing)
    }
}

impl RenderNode for BillboardRenderNode {
    fn base(&self) -> &RenderNodeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut RenderNodeBase {
        &mut self.base
    }

    fn kind_binding(&self, slot: UboSlot) -> Option<BufferBinding> {
        (slot == UboSlot::Billboard).then_some(self.billboard)
    }
}

/// Copies the world matrix and material index of each node into `buffer`.
///
/// Returns the number of copied nodes, bounded by both lengths.
pub fn copy_nodes_matrices<N: RenderNode>(nodes: &[N], buffer: &mut [InstantiationData]) -> u32 {
    let count = nodes.len().min(buffer.len());
    for (node, instance) in nodes.iter().zip(buffer.iter_mut()) {
        let base = node.base();
        instance.world = base.object.world_transform();
        instance.material = base.pass.id.0;
    }
    count as u32
}

/// Copies the bone matrices of each node into `buffer`, one block of
/// [`BONES_STRIDE`] floats per node.
///
/// Returns the number of copied nodes, bounded by the number of whole blocks.
pub fn copy_nodes_bones(nodes: &[SkinningRenderNode], buffer: &mut [f32]) -> u32 {
    let count = nodes.len().min(buffer.len() / BONES_STRIDE);
    for (node, block) in nodes.iter().zip(buffer.chunks_exact_mut(BONES_STRIDE)) {
        let bones = node.skeleton.bone_matrices();
        if bones.len() > MAX_BONES_COUNT {
            log::warn!(
                "Skeleton of {:?} has {} bones, only {MAX_BONES_COUNT} are uploaded.",
                node.base.object.id(),
                bones.len()
            );
        }
        block.fill(0.0);
        for (bone, dst) in bones.iter().zip(block.chunks_exact_mut(MATRIX_FLOATS)) {
            dst.copy_from_slice(&bone.to_cols_array());
        }
    }
    count as u32
}

/// CPU data mirrored into a GPU buffer created on first upload.
#[derive(Debug, Clone)]
pub struct GpuArray<T: Pod> {
    data: Vec<T>,
    usage: BufferUsage,
    buffer: Option<BufferId>,
}

impl<T: Pod> GpuArray<T> {
    /// A zeroed array of `len` elements.
    pub fn new(len: usize, usage: BufferUsage) -> Self {
        Self {
            data: vec![T::zeroed(); len],
            usage: usage | BufferUsage::COPY_DST,
            buffer: None,
        }
    }

    /// The CPU copy.
    pub fn data(&self) -> &[T] {
        &self.data
    }

    /// The CPU copy, to be filled before [`Self::upload`].
    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` when the array holds no element.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The GPU buffer, once uploaded.
    pub fn buffer(&self) -> Option<BufferId> {
        self.buffer
    }

    /// The whole buffer as a binding, once uploaded.
    pub fn binding(&self) -> Option<BufferBinding> {
        self.buffer.map(|buffer| BufferBinding {
            buffer,
            offset: 0,
            size: None,
        })
    }

    /// Writes the first `count` elements, creating the buffer if needed.
    pub fn upload(
        &mut self,
        device: &dyn GraphicsDevice,
        label: &str,
        count: usize,
    ) -> Result<(), ResourceError> {
        let bytes: &[u8] = bytemuck::cast_slice(self.data.as_slice());
        match self.buffer {
            Some(buffer) => {
                let used = count.min(self.data.len()) * std::mem::size_of::<T>();
                device.write_buffer(buffer, 0, &bytes[..used])
            }
            None => {
                let buffer = device.create_buffer_with_data(
                    &BufferDescriptor {
                        label: Some(Cow::Borrowed(label)),
                        size: bytes.len() as u64,
                        usage: self.usage,
                        mapped_at_creation: false,
                    },
                    bytes,
                )?;
                self.buffer = Some(buffer);
                Ok(())
            }
        }
    }

    /// Destroys the GPU buffer.
    pub fn cleanup(&mut self, device: &dyn GraphicsDevice) {
        if let Some(buffer) = self.buffer.take() {
            if let Err(e) = device.destroy_buffer(buffer) {
                log::warn!("Failed to destroy instancing buffer: {e}");
            }
        }
    }
}

/// Instances of one submesh drawn in a single call.
#[derive(Debug, Clone)]
pub struct StaticBatch {
    /// The instances; the first one provides the geometry.
    pub nodes: Vec<StaticRenderNode>,
    /// Per-instance vertex data.
    pub instances: GpuArray<InstantiationData>,
}

impl StaticBatch {
    /// A batch whose instancing buffer holds `capacity` instances.
    pub fn new(nodes: Vec<StaticRenderNode>, capacity: usize) -> Self {
        Self {
            nodes,
            instances: GpuArray::new(capacity, BufferUsage::VERTEX),
        }
    }
}

/// Instances of one skinned submesh drawn in a single call.
#[derive(Debug, Clone)]
pub struct SkinnedBatch {
    /// The instances; the first one provides the geometry.
    pub nodes: Vec<SkinningRenderNode>,
    /// Per-instance vertex data.
    pub instances: GpuArray<InstantiationData>,
    /// Bone matrices of every instance, read as a storage buffer.
    pub bones: GpuArray<f32>,
}

impl SkinnedBatch {
    /// A batch whose buffers hold `capacity` instances.
    pub fn new(nodes: Vec<SkinningRenderNode>, capacity: usize) -> Self {
        Self {
            nodes,
            instances: GpuArray::new(capacity, BufferUsage::VERTEX),
            bones: GpuArray::new(capacity * BONES_STRIDE, BufferUsage::STORAGE),
        }
    }
}

/// Everything a render pass draws in one frame, sorted by kind.
#[derive(Debug, Clone, Default)]
pub struct RenderQueues {
    /// Rigid meshes drawn one by one.
    pub static_nodes: Vec<StaticRenderNode>,
    /// Instanced rigid meshes.
    pub instanced_static: Vec<StaticBatch>,
    /// Skinned meshes drawn one by one.
    pub skinned_nodes: Vec<SkinningRenderNode>,
    /// Instanced skinned meshes.
    pub instanced_skinned: Vec<SkinnedBatch>,
    /// Morphed meshes.
    pub morphing_nodes: Vec<MorphingRenderNode>,
    /// Billboards.
    pub billboard_nodes: Vec<BillboardRenderNode>,
}

impl RenderQueues {
    /// Destroys the instancing buffers of every batch.
    pub fn cleanup(&mut self, device: &dyn GraphicsDevice) {
        for batch in &mut self.instanced_static {
            batch.instances.cleanup(device);
        }
        for batch in &mut self.instanced_skinned {
            batch.instances.cleanup(device);
            batch.bones.cleanup(device);
        }
    }
}

/// Counters of one frame of a render pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderInfo {
    /// Primitives submitted.
    pub visible_face_count: u32,
    /// Vertices submitted.
    pub visible_vertex_count: u32,
    /// Objects drawn, instances included.
    pub visible_objects_count: u32,
    /// Draw calls recorded.
    pub draw_calls: u32,
}

impl RenderInfo {
    /// Accounts for `instances` copies of `buffers` drawn in one call.
    pub fn add_draw(&mut self, buffers: &GeometryBuffers, instances: u32) {
        self.visible_face_count += buffers.primitive_count() * instances;
        self.visible_vertex_count += buffers.vertex_count * instances;
        self.visible_objects_count += instances;
        self.draw_calls += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render_lane::pipeline::{PipelineStates, ShaderSources};
    use crate::render_lane::pipeline_flags::PipelineFlags;
    use bytemuck::Zeroable;
    use prism_core::math::{Extent2D, Mat4, Vec3};
    use prism_core::renderer::api::PrimitiveStateDescriptor;
    use prism_core::scene::{Material, ObjectId, ObjectKind, PassId};
    use prism_core::testing::{FixedSkeleton, MockGraphicsDevice, MockRenderable};

    fn binding(buffer: usize) -> BufferBinding {
        BufferBinding {
            buffer: BufferId(buffer),
            offset: 0,
            size: None,
        }
    }

    fn base(index: u32, flags: PipelineFlags, object: Arc<dyn RenderableObject>) -> RenderNodeBase {
        let pipeline = RenderPipeline::new(
            flags,
            "node",
            ShaderSources {
                vertex: String::new(),
                geometry: None,
                pixel: String::new(),
            },
            PipelineStates {
                primitive: PrimitiveStateDescriptor::default(),
                depth_stencil: None,
                color_targets: Vec::new(),
            },
            Extent2D::new(1, 1),
        );
        RenderNodeBase {
            pipeline: Arc::new(pipeline),
            pass: Arc::new(MaterialPass::new(PassId(10 + index))),
            object,
            model_matrix: binding(1),
            model: binding(2),
            picking: binding(3),
            textures: binding(4),
            buffers: object_geometry(),
            ubo_descriptor: None,
            texture_descriptor: None,
        }
    }

    fn object_geometry() -> GeometryBuffers {
        GeometryBuffers {
            vertex_count: 6,
            ..Default::default()
        }
    }

    fn mesh(index: u32) -> Arc<MockRenderable> {
        let object = MockRenderable::new(
            ObjectId::new(index, 0),
            ObjectKind::Static,
            Material::new("m", vec![MaterialPass::new(PassId(10 + index))]),
        );
        object.set_transform(Mat4::from_translation(Vec3::new(index as f32, 0.0, 0.0)));
        Arc::new(object)
    }

    fn static_node(index: u32) -> StaticRenderNode {
        StaticRenderNode {
            base: base(index, PipelineFlags::default(), mesh(index)),
        }
    }

    #[test]
    fn test_matrices_are_bounded_by_the_buffer() {
        let nodes: Vec<_> = (0..5).map(static_node).collect();
        let mut buffer = vec![InstantiationData::zeroed(); 3];
        assert_eq!(copy_nodes_matrices(&nodes, &mut buffer), 3);
        assert_eq!(buffer[2].material, 12);
        assert_eq!(buffer[2].world.translation(), Vec3::new(2.0, 0.0, 0.0));

        let mut large = vec![InstantiationData::zeroed(); 8];
        assert_eq!(copy_nodes_matrices(&nodes[..2], &mut large), 2);
        assert_eq!(large[2], InstantiationData::zeroed());
    }

    #[test]
    fn test_bones_are_copied_per_block() {
        let flags = PipelineFlags {
            program_flags: ProgramFlags::SKINNING | ProgramFlags::INSTANTIATION,
            ..Default::default()
        };
        let nodes: Vec<_> = (0..3)
            .map(|i| {
                let bones = vec![Mat4::from_translation(Vec3::new(i as f32, 1.0, 2.0)); 2];
                SkinningRenderNode {
                    base: base(i, flags, mesh(i)),
                    skeleton: Arc::new(FixedSkeleton(bones)),
                    skinning: binding(5),
                    instanced_bones: None,
                }
            })
            .collect();

        let mut buffer = vec![0.0; BONES_STRIDE * 2 + 7];
        assert_eq!(copy_nodes_bones(&nodes, &mut buffer), 2);
        assert_eq!(buffer[BONES_STRIDE + 12], 1.0);
        assert_eq!(buffer[BONES_STRIDE + 16 + 13], 1.0);
        assert_eq!(buffer[BONES_STRIDE * 2], 0.0);

        // Instanced pipelines read the batch buffer, not the node UBO.
        assert_eq!(nodes[0].binding(UboSlot::Skinning), None);
        assert_eq!(nodes[0].binding(UboSlot::Model), Some(binding(2)));
        assert_eq!(nodes[0].binding(UboSlot::Scene), None);
    }

    #[test]
    fn test_gpu_array_creates_then_writes() {
        let device = MockGraphicsDevice::new();
        let mut array = GpuArray::<InstantiationData>::new(4, BufferUsage::VERTEX);
        assert!(array.binding().is_none());

        array.upload(&device, "instances", 4).unwrap();
        let buffer = array.buffer().unwrap();
        assert_eq!(device.buffer(buffer).unwrap().size, 4 * 80);

        array.data_mut()[0].material = 9;
        array.upload(&device, "instances", 1).unwrap();
        assert_eq!(device.stats().buffers_created, 1);
        assert_eq!(&device.buffer(buffer).unwrap().contents[64..68], &9u32.to_le_bytes());

        array.cleanup(&device);
        assert!(array.buffer().is_none());
    }

    #[test]
    fn test_render_info_counts_instances() {
        let mut info = RenderInfo::default();
        info.add_draw(&object_geometry(), 3);
        info.add_draw(&object_geometry(), 1);
        assert_eq!(
            info,
            RenderInfo {
                visible_face_count: 8,
                visible_vertex_count: 24,
                visible_objects_count: 4,
                draw_calls: 2,
            }
        );
    }
}
