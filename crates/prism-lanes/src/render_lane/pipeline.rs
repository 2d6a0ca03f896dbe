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

//! A render pipeline owned by a render pass cache.
//!
//! The CPU side (shader text, fixed-function states, layouts) is built when the
//! pipeline is prepared. The GPU objects are created later by a deferred event,
//! so the pipeline goes through `Pending` before being `Ready` or `Failed`.

use super::bindings::{create_texture_bindings, create_ubo_bindings};
use super::pipeline_flags::PipelineFlags;
use super::vertex_layouts::vertex_layouts;
use prism_core::math::Extent2D;
use prism_core::renderer::api::*;
use prism_core::renderer::error::ResourceError;
use prism_core::renderer::traits::GraphicsDevice;
use std::borrow::Cow;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// GLSL sources of every stage of a program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSources {
    /// Vertex stage.
    pub vertex: String,
    /// Optional geometry stage.
    pub geometry: Option<String>,
    /// Fragment stage.
    pub pixel: String,
}

/// The fixed-function states of a pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineStates {
    /// Rasterisation, including the culled face.
    pub primitive: PrimitiveStateDescriptor,
    /// Depth test, `None` when the pass has no depth attachment.
    pub depth_stencil: Option<DepthStencilStateDescriptor>,
    /// One state per colour attachment.
    pub color_targets: Vec<ColorTargetStateDescriptor>,
}

/// Where a pipeline stands in its deferred creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineStatus {
    /// The creation event has not run yet.
    Pending,
    /// GPU objects exist.
    Ready,
    /// Creation failed and is not retried.
    Failed,
}

/// GPU objects of a ready pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineObjects {
    /// Vertex shader module.
    pub vertex_module: ShaderModuleId,
    /// Geometry shader module, if the program has one.
    pub geometry_module: Option<ShaderModuleId>,
    /// Fragment shader module.
    pub pixel_module: ShaderModuleId,
    /// Layout of set 0.
    pub ubo_layout: BindGroupLayoutId,
    /// Layout of set 1.
    pub texture_layout: BindGroupLayoutId,
    /// Layout of both sets.
    pub pipeline_layout: PipelineLayoutId,
    /// The pipeline.
    pub pipeline: RenderPipelineId,
}

#[derive(Debug)]
enum PipelineState {
    Pending,
    Ready(PipelineObjects),
    Failed(String),
}

/// Objects created so far by an initialisation, released if a later step fails.
#[derive(Debug, Default)]
struct Created {
    modules: Vec<ShaderModuleId>,
    layouts: Vec<BindGroupLayoutId>,
    pipeline_layout: Option<PipelineLayoutId>,
}

impl Created {
    fn release(self, device: &dyn GraphicsDevice) {
        if let Some(layout) = self.pipeline_layout {
            warn_on_error("pipeline layout", device.destroy_pipeline_layout(layout));
        }
        for layout in self.layouts {
            warn_on_error("bind group layout", device.destroy_bind_group_layout(layout));
        }
        for module in self.modules {
            warn_on_error("shader module", device.destroy_shader_module(module));
        }
    }
}

fn warn_on_error(what: &str, result: Result<(), ResourceError>) {
    if let Err(e) = result {
        log::warn!("Failed to destroy {what}: {e}");
    }
}

/// A pipeline variant, keyed by its [`PipelineFlags`].
#[derive(Debug)]
pub struct RenderPipeline {
    flags: PipelineFlags,
    label: String,
    sources: ShaderSources,
    states: PipelineStates,
    vertex_layouts: Vec<VertexBufferLayoutDescriptor<'static>>,
    ubo_bindings: Vec<BindGroupLayoutEntry>,
    texture_bindings: Vec<BindGroupLayoutEntry>,
    viewport: Extent2D,
    state: RwLock<PipelineState>,
}

impl RenderPipeline {
    /// Creates a pending pipeline; layouts and vertex inputs derive from `flags`.
    pub fn new(
        flags: PipelineFlags,
        label: impl Into<String>,
        sources: ShaderSources,
        states: PipelineStates,
        viewport: Extent2D,
    ) -> Self {
        Self {
            label: label.into(),
            sources,
            states,
            vertex_layouts: vertex_layouts(flags.program_flags),
            ubo_bindings: create_ubo_bindings(&flags),
            texture_bindings: create_texture_bindings(&flags),
            viewport,
            state: RwLock::new(PipelineState::Pending),
            flags,
        }
    }

    /// The key the pipeline is cached under.
    pub fn flags(&self) -> &PipelineFlags {
        &self.flags
    }

    /// Debug label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The generated GLSL.
    pub fn sources(&self) -> &ShaderSources {
        &self.sources
    }

    /// The fixed-function states.
    pub fn states(&self) -> &PipelineStates {
        &self.states
    }

    /// Vertex buffers read by the program.
    pub fn vertex_layouts(&self) -> &[VertexBufferLayoutDescriptor<'static>] {
        &self.vertex_layouts
    }

    /// Layout entries of set 0.
    pub fn ubo_bindings(&self) -> &[BindGroupLayoutEntry] {
        &self.ubo_bindings
    }

    /// Layout entries of set 1.
    pub fn texture_bindings(&self) -> &[BindGroupLayoutEntry] {
        &self.texture_bindings
    }

    /// Returns `true` when set 1 has at least one binding.
    pub fn has_texture_set(&self) -> bool {
        !self.texture_bindings.is_empty()
    }

    /// Viewport and scissor size.
    pub fn viewport(&self) -> Extent2D {
        self.viewport
    }

    /// Current creation status.
    pub fn status(&self) -> PipelineStatus {
        match &*self.read_state() {
            PipelineState::Pending => PipelineStatus::Pending,
            PipelineState::Ready(_) => PipelineStatus::Ready,
            PipelineState::Failed(_) => PipelineStatus::Failed,
        }
    }

    /// The reason creation failed, if it did.
    pub fn failure(&self) -> Option<String> {
        match &*self.read_state() {
            PipelineState::Failed(reason) => Some(reason.clone()),
            _ => None,
        }
    }

    /// GPU objects, once ready.
    pub fn objects(&self) -> Option<PipelineObjects> {
        match &*self.read_state() {
            PipelineState::Ready(objects) => Some(*objects),
            _ => None,
        }
    }

    /// Layout of set 0, once ready.
    pub fn ubo_layout(&self) -> Option<BindGroupLayoutId> {
        self.objects().map(|o| o.ubo_layout)
    }

    /// Layout of set 1, once ready.
    pub fn texture_layout(&self) -> Option<BindGroupLayoutId> {
        self.objects().map(|o| o.texture_layout)
    }

    /// The device pipeline, once ready.
    pub fn pipeline_id(&self) -> Option<RenderPipelineId> {
        self.objects().map(|o| o.pipeline)
    }

    /// Creates the shader modules, both set layouts, the pipeline layout and
    /// the pipeline itself.
    ///
    /// Runs once: a ready or failed pipeline is left untouched. On failure the
    /// objects created so far are destroyed and the pipeline is marked failed.
    pub fn initialise(
        &self,
        device: &dyn GraphicsDevice,
        render_pass: Option<RenderPassId>,
    ) -> Result<(), ResourceError> {
        let mut state = self.write_state();
        if !matches!(*state, PipelineState::Pending) {
            log::debug!("Pipeline '{}' already initialised, skipped.", self.label);
            return Ok(());
        }

        let mut created = Created::default();
        match self.create_objects(device, render_pass, &mut created) {
            Ok(objects) => {
                log::debug!("Pipeline '{}' created as {:?}.", self.label, objects.pipeline);
                *state = PipelineState::Ready(objects);
                Ok(())
            }
            Err(e) => {
                created.release(device);
                *state = PipelineState::Failed(e.to_string());
                Err(e)
            }
        }
    }

    fn create_objects(
        &self,
        device: &dyn GraphicsDevice,
        render_pass: Option<RenderPassId>,
        created: &mut Created,
    ) -> Result<PipelineObjects, ResourceError> {
        let module = |stage: ShaderStage, suffix: &str, source: &str| {
            let label = format!("{}/{suffix}", self.label);
            device.create_shader_module(&ShaderModuleDescriptor {
                label: Some(&label),
                source: ShaderSourceData::Glsl(Cow::Borrowed(source)),
                stage,
                entry_point: "main",
            })
        };

        let vertex_module = module(ShaderStage::Vertex, "vtx", &self.sources.vertex)?;
        created.modules.push(vertex_module);
        let geometry_module = match &self.sources.geometry {
            Some(source) => {
                let id = module(ShaderStage::Geometry, "geo", source)?;
                created.modules.push(id);
                Some(id)
            }
            None => None,
        };
        let pixel_module = module(ShaderStage::Fragment, "pxl", &self.sources.pixel)?;
        created.modules.push(pixel_module);

        let ubo_label = format!("{}/ubo", self.label);
        let ubo_layout = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some(&ubo_label),
            entries: &self.ubo_bindings,
        })?;
        created.layouts.push(ubo_layout);
        let tex_label = format!("{}/tex", self.label);
        let texture_layout = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some(&tex_label),
            entries: &self.texture_bindings,
        })?;
        created.layouts.push(texture_layout);

        let pipeline_layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: Some(Cow::Borrowed(self.label.as_str())),
            bind_group_layouts: &[ubo_layout, texture_layout],
        })?;
        created.pipeline_layout = Some(pipeline_layout);

        let pipeline = device.create_render_pipeline(&RenderPipelineDescriptor {
            label: Some(Cow::Borrowed(self.label.as_str())),
            vertex_shader_module: vertex_module,
            geometry_shader_module: geometry_module,
            fragment_shader_module: Some(pixel_module),
            entry_point: Cow::Borrowed("main"),
            vertex_buffers_layout: Cow::Borrowed(self.vertex_layouts.as_slice()),
            layout: Some(pipeline_layout),
            render_pass,
            primitive_state: self.states.primitive,
            depth_stencil_state: self.states.depth_stencil.clone(),
            color_target_states: Cow::Borrowed(self.states.color_targets.as_slice()),
            multisample_state: MultisampleStateDescriptor::default(),
        })?;

        Ok(PipelineObjects {
            vertex_module,
            geometry_module,
            pixel_module,
            ubo_layout,
            texture_layout,
            pipeline_layout,
            pipeline,
        })
    }

    /// Destroys the GPU objects of a ready pipeline.
    pub fn cleanup(&self, device: &dyn GraphicsDevice) {
        let mut state = self.write_state();
        if let PipelineState::Ready(objects) = *state {
            warn_on_error("render pipeline", device.destroy_render_pipeline(objects.pipeline));
            Created {
                modules: [
                    Some(objects.vertex_module),
                    objects.geometry_module,
                    Some(objects.pixel_module),
                ]
                .into_iter()
                .flatten()
                .collect(),
                layouts: vec![objects.ubo_layout, objects.texture_layout],
                pipeline_layout: Some(objects.pipeline_layout),
            }
            .release(device);
        }
        *state = PipelineState::Pending;
    }

    fn read_state(&self) -> RwLockReadGuard<'_, PipelineState> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, PipelineState> {
        self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prism_core::renderer::flags::ProgramFlags;
    use prism_core::testing::MockGraphicsDevice;

    fn pipeline(flags: PipelineFlags) -> RenderPipeline {
        RenderPipeline::new(
            flags,
            "test",
            ShaderSources {
                vertex: "#version 450\nvoid main()\n{\n}\n".to_string(),
                geometry: None,
                pixel: "#version 450\nvoid main()\n{\n}\n".to_string(),
            },
            PipelineStates {
                primitive: PrimitiveStateDescriptor {
                    cull_mode: Some(CullMode::Back),
                    ..Default::default()
                },
                depth_stencil: None,
                color_targets: Vec::new(),
            },
            Extent2D::new(64, 64),
        )
    }

    #[test]
    fn test_initialise_creates_two_sets() {
        let device = MockGraphicsDevice::new();
        let pipeline = pipeline(PipelineFlags {
            program_flags: ProgramFlags::LIGHTING,
            ..Default::default()
        });
        assert_eq!(pipeline.status(), PipelineStatus::Pending);
        assert!(pipeline.pipeline_id().is_none());

        pipeline.initialise(&device, None).unwrap();
        assert_eq!(pipeline.status(), PipelineStatus::Ready);
        let objects = pipeline.objects().unwrap();
        assert_eq!(
            device.pipeline_layout(objects.pipeline_layout),
            Some(vec![objects.ubo_layout, objects.texture_layout])
        );
        let recorded = device.pipeline(objects.pipeline).unwrap();
        assert_eq!(recorded.primitive_state.cull_mode, Some(CullMode::Back));
        assert!(!recorded.has_geometry_stage);

        // A second run is a no-op.
        pipeline.initialise(&device, None).unwrap();
        assert_eq!(device.stats().pipelines_created, 1);
    }

    #[test]
    fn test_failure_releases_partial_objects() {
        let device = MockGraphicsDevice::new();
        device.fail_pipeline_creation(true);
        let pipeline = pipeline(PipelineFlags::default());

        assert!(pipeline.initialise(&device, None).is_err());
        assert_eq!(pipeline.status(), PipelineStatus::Failed);
        assert!(pipeline.failure().is_some());
        assert!(device.shader_sources().is_empty());

        device.fail_pipeline_creation(false);
        pipeline.initialise(&device, None).unwrap();
        assert_eq!(pipeline.status(), PipelineStatus::Failed);
    }

    #[test]
    fn test_cleanup_destroys_the_pipeline() {
        let device = MockGraphicsDevice::new();
        let pipeline = pipeline(PipelineFlags::default());
        pipeline.initialise(&device, None).unwrap();
        pipeline.cleanup(&device);
        assert_eq!(device.stats().pipelines_destroyed, 1);
        assert_eq!(pipeline.status(), PipelineStatus::Pending);
    }
}
