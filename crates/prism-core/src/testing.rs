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

//! In-memory doubles for the GPU device and scene objects.
//!
//! Available to this crate's unit tests and, through the `testing` feature, to
//! the test suites of the other crates.

#![allow(missing_docs)]

use crate::math::Mat4;
use crate::renderer::api::*;
use crate::renderer::error::{PipelineError, ResourceError, ShaderError};
use crate::renderer::traits::GraphicsDevice;
use crate::scene::{
    GeometryBuffers, Material, MaterialChanged, MaterialSignal, MeshAnimation, ObjectId,
    ObjectKind, RenderableObject, Skeleton,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Counters of the calls a [`MockGraphicsDevice`] received.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MockStats {
    pub buffers_created: usize,
    pub buffers_destroyed: usize,
    pub buffer_writes: usize,
    pub shader_modules_created: usize,
    pub pipelines_created: usize,
    pub pipelines_destroyed: usize,
    pub pipeline_layouts_created: usize,
    pub bind_group_layouts_created: usize,
    pub bind_groups_created: usize,
    pub render_passes_created: usize,
    pub render_passes_destroyed: usize,
}

/// A shader module as it was submitted.
#[derive(Debug, Clone)]
pub struct RecordedShader {
    pub label: Option<String>,
    pub stage: ShaderStage,
    pub source: String,
}

/// A buffer and the bytes written into it.
#[derive(Debug, Clone)]
pub struct RecordedBuffer {
    pub size: u64,
    pub usage: BufferUsage,
    pub contents: Vec<u8>,
    pub alive: bool,
}

/// A pipeline as it was submitted.
#[derive(Debug, Clone)]
pub struct RecordedPipeline {
    pub label: Option<String>,
    pub layout: Option<PipelineLayoutId>,
    pub primitive_state: PrimitiveStateDescriptor,
    pub color_target_states: Vec<ColorTargetStateDescriptor>,
    pub depth_stencil_state: Option<DepthStencilStateDescriptor>,
    pub has_geometry_stage: bool,
}

#[derive(Debug, Default)]
struct MockState {
    stats: MockStats,
    shaders: HashMap<ShaderModuleId, RecordedShader>,
    buffers: HashMap<BufferId, RecordedBuffer>,
    bind_group_layouts: HashMap<BindGroupLayoutId, Vec<BindGroupLayoutEntry>>,
    bind_groups: HashMap<BindGroupId, (BindGroupLayoutId, Vec<BindGroupEntry>)>,
    pipeline_layouts: HashMap<PipelineLayoutId, Vec<BindGroupLayoutId>>,
    pipelines: HashMap<RenderPipelineId, RecordedPipeline>,
}

/// A `GraphicsDevice` that hands out unique ids and records every call.
#[derive(Debug)]
pub struct MockGraphicsDevice {
    next_id: AtomicUsize,
    fail_shader_compilation: AtomicBool,
    fail_buffer_creation: AtomicBool,
    fail_pipeline_creation: AtomicBool,
    state: Mutex<MockState>,
}

impl Default for MockGraphicsDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl MockGraphicsDevice {
    pub fn new() -> Self {
        Self {
            next_id: AtomicUsize::new(1),
            fail_shader_compilation: AtomicBool::new(false),
            fail_buffer_creation: AtomicBool::new(false),
            fail_pipeline_creation: AtomicBool::new(false),
            state: Mutex::new(MockState::default()),
        }
    }

    /// Makes every following shader module creation fail.
    pub fn fail_shader_compilation(&self, fail: bool) {
        self.fail_shader_compilation.store(fail, Ordering::SeqCst);
    }

    /// Makes every following buffer creation fail with `OutOfMemory`.
    pub fn fail_buffer_creation(&self, fail: bool) {
        self.fail_buffer_creation.store(fail, Ordering::SeqCst);
    }

    /// Makes every following render pipeline creation fail.
    pub fn fail_pipeline_creation(&self, fail: bool) {
        self.fail_pipeline_creation.store(fail, Ordering::SeqCst);
    }

    pub fn stats(&self) -> MockStats {
        self.lock().stats
    }

    pub fn shader_sources(&self) -> Vec<RecordedShader> {
        let state = self.lock();
        let mut ids: Vec<_> = state.shaders.keys().copied().collect();
        ids.sort();
        ids.into_iter().map(|id| state.shaders[&id].clone()).collect()
    }

    pub fn buffer(&self, id: BufferId) -> Option<RecordedBuffer> {
        self.lock().buffers.get(&id).cloned()
    }

    pub fn bind_group_layout(&self, id: BindGroupLayoutId) -> Option<Vec<BindGroupLayoutEntry>> {
        self.lock().bind_group_layouts.get(&id).cloned()
    }

    pub fn bind_group(&self, id: BindGroupId) -> Option<(BindGroupLayoutId, Vec<BindGroupEntry>)> {
        self.lock().bind_groups.get(&id).cloned()
    }

    pub fn pipeline_layout(&self, id: PipelineLayoutId) -> Option<Vec<BindGroupLayoutId>> {
        self.lock().pipeline_layouts.get(&id).cloned()
    }

    pub fn pipeline(&self, id: RenderPipelineId) -> Option<RecordedPipeline> {
        self.lock().pipelines.get(&id).cloned()
    }

    fn next(&self) -> usize {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn record_buffer(
        &self,
        descriptor: &BufferDescriptor,
        data: Option<&[u8]>,
    ) -> Result<BufferId, ResourceError> {
        if self.fail_buffer_creation.load(Ordering::SeqCst) {
            return Err(ResourceError::OutOfMemory {
                requested: descriptor.size,
            });
        }
        let id = BufferId(self.next());
        let mut contents = vec![0u8; descriptor.size as usize];
        if let Some(data) = data {
            let len = data.len().min(contents.len());
            contents[..len].copy_from_slice(&data[..len]);
        }
        let mut state = self.lock();
        state.stats.buffers_created += 1;
        state.buffers.insert(
            id,
            RecordedBuffer {
                size: descriptor.size,
                usage: descriptor.usage,
                contents,
                alive: true,
            },
        );
        Ok(id)
    }
}

impl GraphicsDevice for MockGraphicsDevice {
    fn create_shader_module(
        &self,
        descriptor: &ShaderModuleDescriptor,
    ) -> Result<ShaderModuleId, ResourceError> {
        let ShaderSourceData::Glsl(source) = &descriptor.source;
        if self.fail_shader_compilation.load(Ordering::SeqCst) {
            return Err(ShaderError::CompilationError {
                label: descriptor.label.unwrap_or("unnamed").to_string(),
                stage: descriptor.stage,
                details: "compilation disabled by test".to_string(),
            }
            .into());
        }
        let id = ShaderModuleId(self.next());
        let mut state = self.lock();
        state.stats.shader_modules_created += 1;
        state.shaders.insert(
            id,
            RecordedShader {
                label: descriptor.label.map(str::to_string),
                stage: descriptor.stage,
                source: source.to_string(),
            },
        );
        Ok(id)
    }

    fn destroy_shader_module(&self, id: ShaderModuleId) -> Result<(), ResourceError> {
        self.lock()
            .shaders
            .remove(&id)
            .map(|_| ())
            .ok_or(ResourceError::InvalidHandle)
    }

    fn create_render_pipeline(
        &self,
        descriptor: &RenderPipelineDescriptor,
    ) -> Result<RenderPipelineId, ResourceError> {
        if self.fail_pipeline_creation.load(Ordering::SeqCst) {
            return Err(PipelineError::CompilationFailed {
                label: descriptor.label.as_ref().map(|l| l.to_string()),
                details: "pipeline creation disabled by test".to_string(),
            }
            .into());
        }
        let id = RenderPipelineId(self.next());
        let mut state = self.lock();
        state.stats.pipelines_created += 1;
        state.pipelines.insert(
            id,
            RecordedPipeline {
                label: descriptor.label.as_ref().map(|l| l.to_string()),
                layout: descriptor.layout,
                primitive_state: descriptor.primitive_state,
                color_target_states: descriptor.color_target_states.to_vec(),
                depth_stencil_state: descriptor.depth_stencil_state.clone(),
                has_geometry_stage: descriptor.geometry_shader_module.is_some(),
            },
        );
        Ok(id)
    }

    fn destroy_render_pipeline(&self, id: RenderPipelineId) -> Result<(), ResourceError> {
        let mut state = self.lock();
        state
            .pipelines
            .remove(&id)
            .ok_or(ResourceError::InvalidHandle)?;
        state.stats.pipelines_destroyed += 1;
        Ok(())
    }

    fn create_pipeline_layout(
        &self,
        descriptor: &PipelineLayoutDescriptor,
    ) -> Result<PipelineLayoutId, ResourceError> {
        let id = PipelineLayoutId(self.next());
        let mut state = self.lock();
        state.stats.pipeline_layouts_created += 1;
        state
            .pipeline_layouts
            .insert(id, descriptor.bind_group_layouts.to_vec());
        Ok(id)
    }

    fn destroy_pipeline_layout(&self, id: PipelineLayoutId) -> Result<(), ResourceError> {
        self.lock()
            .pipeline_layouts
            .remove(&id)
            .map(|_| ())
            .ok_or(ResourceError::InvalidHandle)
    }

    fn create_bind_group_layout(
        &self,
        descriptor: &BindGroupLayoutDescriptor,
    ) -> Result<BindGroupLayoutId, ResourceError> {
        let mut seen = std::collections::HashSet::new();
        if let Some(entry) = descriptor.entries.iter().find(|e| !seen.insert(e.binding)) {
            return Err(PipelineError::LayoutCreationFailed(format!(
                "binding {} declared twice",
                entry.binding
            ))
            .into());
        }
        let id = BindGroupLayoutId(self.next());
        let mut state = self.lock();
        state.stats.bind_group_layouts_created += 1;
        state
            .bind_group_layouts
            .insert(id, descriptor.entries.to_vec());
        Ok(id)
    }

    fn destroy_bind_group_layout(&self, id: BindGroupLayoutId) -> Result<(), ResourceError> {
        self.lock()
            .bind_group_layouts
            .remove(&id)
            .map(|_| ())
            .ok_or(ResourceError::InvalidHandle)
    }

    fn create_bind_group(
        &self,
        descriptor: &BindGroupDescriptor,
    ) -> Result<BindGroupId, ResourceError> {
        let id = BindGroupId(self.next());
        let mut state = self.lock();
        if !state.bind_group_layouts.contains_key(&descriptor.layout) {
            return Err(ResourceError::InvalidHandle);
        }
        state.stats.bind_groups_created += 1;
        state
            .bind_groups
            .insert(id, (descriptor.layout, descriptor.entries.to_vec()));
        Ok(id)
    }

    fn destroy_bind_group(&self, id: BindGroupId) -> Result<(), ResourceError> {
        self.lock()
            .bind_groups
            .remove(&id)
            .map(|_| ())
            .ok_or(ResourceError::InvalidHandle)
    }

    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<BufferId, ResourceError> {
        self.record_buffer(descriptor, None)
    }

    fn create_buffer_with_data(
        &self,
        descriptor: &BufferDescriptor,
        data: &[u8],
    ) -> Result<BufferId, ResourceError> {
        self.record_buffer(descriptor, Some(data))
    }

    fn destroy_buffer(&self, id: BufferId) -> Result<(), ResourceError> {
        let mut state = self.lock();
        match state.buffers.get_mut(&id) {
            Some(buffer) if buffer.alive => {
                buffer.alive = false;
                state.stats.buffers_destroyed += 1;
                Ok(())
            }
            _ => Err(ResourceError::InvalidHandle),
        }
    }

    fn write_buffer(&self, id: BufferId, offset: u64, data: &[u8]) -> Result<(), ResourceError> {
        let mut state = self.lock();
        let buffer = state
            .buffers
            .get_mut(&id)
            .filter(|b| b.alive)
            .ok_or(ResourceError::InvalidHandle)?;
        let start = offset as usize;
        let end = start + data.len();
        if end > buffer.contents.len() {
            return Err(ResourceError::OutOfBounds);
        }
        buffer.contents[start..end].copy_from_slice(data);
        state.stats.buffer_writes += 1;
        Ok(())
    }

    fn create_render_pass(
        &self,
        _descriptor: &RenderPassDescriptor,
    ) -> Result<RenderPassId, ResourceError> {
        self.lock().stats.render_passes_created += 1;
        Ok(RenderPassId(self.next()))
    }

    fn destroy_render_pass(&self, _id: RenderPassId) -> Result<(), ResourceError> {
        self.lock().stats.render_passes_destroyed += 1;
        Ok(())
    }

    fn supports_feature(&self, _feature_name: &str) -> bool {
        true
    }
}

/// A skeleton frozen in one pose.
#[derive(Debug, Clone, Default)]
pub struct FixedSkeleton(pub Vec<Mat4>);

impl Skeleton for FixedSkeleton {
    fn bone_matrices(&self) -> Vec<Mat4> {
        self.0.clone()
    }
}

/// An animation frozen at one interpolation factor.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedAnimation(pub f32);

impl MeshAnimation for FixedAnimation {
    fn morph_time(&self) -> f32 {
        self.0
    }
}

/// A scene object whose state tests drive directly.
#[derive(Debug)]
pub struct MockRenderable {
    id: ObjectId,
    kind: ObjectKind,
    material: Mutex<Arc<Material>>,
    transform: Mutex<Mat4>,
    signal: MaterialSignal,
    pub billboard_dimensions: [f32; 2],
    pub skeleton: Option<Arc<dyn Skeleton>>,
    pub animation: Option<Arc<dyn MeshAnimation>>,
    pub geometry: GeometryBuffers,
    pub receives_shadows: bool,
}

impl MockRenderable {
    pub fn new(id: ObjectId, kind: ObjectKind, material: Material) -> Self {
        Self {
            id,
            kind,
            material: Mutex::new(Arc::new(material)),
            transform: Mutex::new(Mat4::IDENTITY),
            signal: MaterialSignal::new(),
            billboard_dimensions: [1.0, 1.0],
            skeleton: None,
            animation: None,
            geometry: GeometryBuffers {
                vertex_buffers: vec![BufferId(0)],
                index_buffer: None,
                vertex_count: 6,
                index_count: 0,
                topology: PrimitiveTopology::TriangleList,
            },
            receives_shadows: true,
        }
    }

    /// Replaces the material and emits the change.
    pub fn set_material(&self, material: Material) {
        let new = Arc::new(material);
        let old = {
            let mut current = self
                .material
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            std::mem::replace(&mut *current, new.clone())
        };
        self.signal.emit(MaterialChanged {
            object: self.id,
            old,
            new,
        });
    }

    pub fn set_transform(&self, transform: Mat4) {
        *self
            .transform
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = transform;
    }
}

impl RenderableObject for MockRenderable {
    fn id(&self) -> ObjectId {
        self.id
    }

    fn kind(&self) -> ObjectKind {
        self.kind
    }

    fn material(&self) -> Arc<Material> {
        self.material
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn material_signal(&self) -> &MaterialSignal {
        &self.signal
    }

    fn world_transform(&self) -> Mat4 {
        *self
            .transform
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn receives_shadows(&self) -> bool {
        self.receives_shadows
    }

    fn billboard_dimensions(&self) -> [f32; 2] {
        self.billboard_dimensions
    }

    fn skeleton(&self) -> Option<Arc<dyn Skeleton>> {
        self.skeleton.clone()
    }

    fn mesh_animation(&self) -> Option<Arc<dyn MeshAnimation>> {
        self.animation.clone()
    }

    fn geometry_buffers(&self) -> GeometryBuffers {
        self.geometry.clone()
    }
}
