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

//! The render pass orchestrator.
//!
//! A [`RenderPass`] owns the pipelines drawing one kind of geometry (opaque or
//! blended) with one [`RenderTechnique`]. Pipelines live in two caches keyed by
//! normalised [`PipelineFlags`]: the front cache culls front faces and the back
//! cache culls back faces, which together draw two-sided materials.
//!
//! Building a pipeline is split in two. `prepare_*` generates the shaders and
//! fixed-function states right away and schedules the creation of the GPU
//! objects on the [`GpuEventQueue`]; the pipeline becomes available to
//! `get_pipeline_*` once the render thread has processed the
//! [`EventType::PreRender`] events.

use super::bindings::{descriptor_slots, texture_entries, MissingShadowMap, ShadowMaps, UboSlot};
use super::blend::create_blend_state;
use super::config::RenderPassConfig;
use super::error::RenderPassError;
use super::nodes::{
    copy_nodes_bones, copy_nodes_matrices, BillboardRenderNode, MorphingRenderNode, RenderInfo,
    RenderNode, RenderNodeBase, RenderQueues, SkinnedBatch, SkinningRenderNode, StaticBatch,
    StaticRenderNode,
};
use super::pipeline::{PipelineStates, PipelineStatus, RenderPipeline, ShaderSources};
use super::pipeline_flags::PipelineFlags;
use super::technique::RenderTechnique;
use super::timer::RenderPassTimer;
use prism_core::event::{EventType, GpuEventQueue};
use prism_core::math::{Extent2D, Mat4};
use prism_core::renderer::api::*;
use prism_core::renderer::flags::{PassFlags, ProgramFlags, TextureChannels};
use prism_core::renderer::traits::GraphicsDevice;
use prism_core::scene::{ObjectId, PassId};
use prism_data::ubo::{MatrixUboConfiguration, SceneUboConfiguration, UboHandle, UboPool};
use prism_data::{ObjectUbo, ObjectUboPools, PoolsEntry};
use prism_shader::{LightingConfig, LightingModel, LightingModelFactory};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

/// Lifecycle of a [`RenderPass`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderPassState {
    /// Created, `initialise` not called yet.
    Uninitialised,
    /// Ready to prepare pipelines and draw.
    Initialised,
    /// Released by `cleanup`; `initialise` must be called again.
    Cleaned,
}

/// The face a pipeline cache culls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Face {
    Front,
    Back,
}

impl Face {
    fn cull_mode(self) -> CullMode {
        match self {
            Face::Front => CullMode::Front,
            Face::Back => CullMode::Back,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Face::Front => "front",
            Face::Back => "back",
        }
    }
}

/// Scene-wide buffers shared by the pipelines of a pass, owned by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SceneBuffers {
    /// Materials storage buffer.
    pub pass_buffer: BufferBinding,
    /// Lights texel buffer.
    pub light_buffer: BufferBinding,
    /// Texture configurations storage buffer, bound by textured pipelines.
    pub texture_buffer: BufferBinding,
}

/// Camera and scene uniform blocks of an initialised pass.
#[derive(Debug)]
struct FrameUbos {
    scene_pool: UboPool<SceneUboConfiguration>,
    scene: UboHandle<SceneUboConfiguration>,
    matrix_pool: UboPool<MatrixUboConfiguration>,
    matrix: UboHandle<MatrixUboConfiguration>,
}

impl FrameUbos {
    fn new(device: &Arc<dyn GraphicsDevice>, name: &str) -> Result<Self, RenderPassError> {
        let mut scene_pool = UboPool::new(device.clone(), format!("{name}/Scene"));
        let mut matrix_pool = UboPool::new(device.clone(), format!("{name}/Matrix"));
        let scene = scene_pool.get_buffer(MemoryVisibility::HostVisible)?;
        let matrix = matrix_pool.get_buffer(MemoryVisibility::HostVisible)?;
        *matrix_pool.data_mut(&matrix) = MatrixUboConfiguration {
            projection: Mat4::IDENTITY,
            cur_view: Mat4::IDENTITY,
            prv_view: Mat4::IDENTITY,
            inv_projection: Mat4::IDENTITY,
            jitter: [0.0; 4],
        };
        Ok(Self {
            scene_pool,
            scene,
            matrix_pool,
            matrix,
        })
    }
}

/// Draws the material passes of one blending mode with one technique.
#[derive(Debug)]
pub struct RenderPass<T: RenderTechnique> {
    config: RenderPassConfig,
    technique: T,
    device: Arc<dyn GraphicsDevice>,
    events: Arc<GpuEventQueue>,
    lighting_models: LightingModelFactory,
    state: RenderPassState,
    size: Extent2D,
    timer: Option<RenderPassTimer>,
    ubos: Option<FrameUbos>,
    render_pass: Arc<RwLock<Option<RenderPassId>>>,
    scene_buffers: Option<SceneBuffers>,
    front_pipelines: BTreeMap<PipelineFlags, Arc<RenderPipeline>>,
    back_pipelines: BTreeMap<PipelineFlags, Arc<RenderPipeline>>,
}

impl<T: RenderTechnique> RenderPass<T> {
    /// Creates an uninitialised pass with the default lighting models.
    ///
    /// ## Errors
    /// * `RenderPassError::UnknownLightingModel` - If `config.lighting_model`
    ///   is not one of them.
    pub fn new(
        device: Arc<dyn GraphicsDevice>,
        events: Arc<GpuEventQueue>,
        technique: T,
        config: RenderPassConfig,
    ) -> Result<Self, RenderPassError> {
        Self::with_lighting_models(
            device,
            events,
            technique,
            config,
            LightingModelFactory::with_defaults(),
        )
    }

    /// Creates an uninitialised pass choosing its lighting models in `lighting_models`.
    pub fn with_lighting_models(
        device: Arc<dyn GraphicsDevice>,
        events: Arc<GpuEventQueue>,
        technique: T,
        config: RenderPassConfig,
        lighting_models: LightingModelFactory,
    ) -> Result<Self, RenderPassError> {
        if !lighting_models.contains(&config.lighting_model) {
            return Err(RenderPassError::UnknownLightingModel(config.lighting_model));
        }
        Ok(Self {
            config,
            technique,
            device,
            events,
            lighting_models,
            state: RenderPassState::Uninitialised,
            size: Extent2D::default(),
            timer: None,
            ubos: None,
            render_pass: Arc::new(RwLock::new(None)),
            scene_buffers: None,
            front_pipelines: BTreeMap::new(),
            back_pipelines: BTreeMap::new(),
        })
    }

    /// Creates the GPU render pass, the timer and the scene uniform blocks.
    ///
    /// # Panics
    /// If the pass is already initialised.
    pub fn initialise(&mut self, size: Extent2D) -> Result<(), RenderPassError> {
        assert!(
            self.state != RenderPassState::Initialised,
            "render pass '{}' is already initialised",
            self.config.name
        );

        let ubos = FrameUbos::new(&self.device, &self.config.name)?;
        let colour_formats = self.technique.colour_formats(&self.config);
        let id = self.device.create_render_pass(&RenderPassDescriptor {
            label: Some(Cow::Borrowed(self.config.name.as_str())),
            color_formats: Cow::Owned(colour_formats),
            depth_format: self.config.depth_format,
        })?;

        *self
            .render_pass
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(id);
        self.ubos = Some(ubos);
        self.timer = Some(RenderPassTimer::new(
            self.config.name.clone(),
            self.config.category.clone(),
        ));
        self.size = size;
        self.state = RenderPassState::Initialised;
        log::info!(
            "Render pass '{}' ({}) initialised at {}x{}.",
            self.config.name,
            self.technique.name(),
            size.width,
            size.height
        );
        Ok(())
    }

    /// Releases the pipelines of both caches, the render pass, the scene
    /// uniform blocks and the timer.
    pub fn cleanup(&mut self) {
        if self.state != RenderPassState::Initialised {
            log::debug!("Render pass '{}' is not initialised, nothing to clean.", self.config.name);
            return;
        }
        let device = self.device.as_ref();
        for pipeline in self
            .front_pipelines
            .values()
            .chain(self.back_pipelines.values())
        {
            pipeline.cleanup(device);
        }
        self.front_pipelines.clear();
        self.back_pipelines.clear();

        let id = self
            .render_pass
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(id) = id {
            if let Err(e) = device.destroy_render_pass(id) {
                log::warn!("Failed to destroy render pass '{}': {e}", self.config.name);
            }
        }
        if let Some(mut ubos) = self.ubos.take() {
            ubos.scene_pool.cleanup();
            ubos.matrix_pool.cleanup();
        }
        self.timer = None;
        self.state = RenderPassState::Cleaned;
        log::info!("Render pass '{}' cleaned up.", self.config.name);
    }

    /// Current lifecycle state.
    pub fn state(&self) -> RenderPassState {
        self.state
    }

    /// The settings of the pass.
    pub fn config(&self) -> &RenderPassConfig {
        &self.config
    }

    /// The technique drawing the pass.
    pub fn technique(&self) -> &T {
        &self.technique
    }

    /// Returns `true` when the pass draws passes without alpha blending.
    pub fn is_opaque(&self) -> bool {
        self.config.opaque
    }

    /// Size given to `initialise`, used as the pipelines viewport.
    pub fn size(&self) -> Extent2D {
        self.size
    }

    /// The GPU render pass, once initialised.
    pub fn render_pass_id(&self) -> Option<RenderPassId> {
        *self
            .render_pass
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// CPU timing of the updates.
    pub fn timer(&self) -> Option<&RenderPassTimer> {
        self.timer.as_ref()
    }

    /// Sets the materials and lights buffers bound by the UBO descriptors.
    pub fn set_scene_buffers(&mut self, buffers: SceneBuffers) {
        self.scene_buffers = Some(buffers);
    }

    fn ensure_initialised(&self) -> Result<&FrameUbos, RenderPassError> {
        match (&self.ubos, self.state) {
            (Some(ubos), RenderPassState::Initialised) => Ok(ubos),
            _ => Err(RenderPassError::NotInitialised(self.config.name.clone())),
        }
    }

    fn frame_ubos_mut(&mut self) -> Result<&mut FrameUbos, RenderPassError> {
        match self.ubos.as_mut() {
            Some(ubos) => Ok(ubos),
            None => Err(RenderPassError::NotInitialised(self.config.name.clone())),
        }
    }

    // Key normalisation

    /// Applies the technique flags, the face and the blending mode of the pass.
    fn normalise(&self, mut flags: PipelineFlags, face: Face) -> PipelineFlags {
        self.technique.update_flags(&mut flags);
        if flags.program_flags.contains(ProgramFlags::LIGHTING) {
            flags.scene_flags |= self.config.shadow_type.scene_flag();
        }
        match face {
            Face::Front => flags.program_flags |= ProgramFlags::INVERT_NORMALS,
            Face::Back => flags.program_flags -= ProgramFlags::INVERT_NORMALS,
        }
        flags.normalized(self.config.opaque)
    }

    fn cache(&self, face: Face) -> &BTreeMap<PipelineFlags, Arc<RenderPipeline>> {
        match face {
            Face::Front => &self.front_pipelines,
            Face::Back => &self.back_pipelines,
        }
    }

    // Pipeline preparation

    /// Builds, if needed, the pipeline drawing the back faces of `flags`
    /// with front faces culled, and returns its normalised key.
    ///
    /// Unlike [`RenderPass::prepare_pipeline`], the key is not checked against
    /// the opacity of the pass: an opaque pass builds a blended pass under its
    /// `NoBlend` key.
    pub fn prepare_front_pipeline(
        &mut self,
        flags: PipelineFlags,
    ) -> Result<PipelineFlags, RenderPassError> {
        self.prepare(flags, Face::Front)
    }

    /// Builds, if needed, the pipeline drawing the front faces of `flags`
    /// with back faces culled.
    pub fn prepare_back_pipeline(
        &mut self,
        flags: PipelineFlags,
    ) -> Result<PipelineFlags, RenderPassError> {
        self.prepare(flags, Face::Back)
    }

    /// Prepares every pipeline a material pass needs.
    ///
    /// Blended passes draw both faces. Opaque passes draw back faces only
    /// when two-sided or alpha tested through an opacity map. Returns `None`
    /// when the pass is not drawn by this render pass.
    pub fn prepare_pipeline(
        &mut self,
        flags: PipelineFlags,
        two_sided: bool,
    ) -> Result<Option<PipelineFlags>, RenderPassError> {
        self.ensure_initialised()?;
        if !self.normalise(flags, Face::Back).is_drawn_by(self.config.opaque) {
            log::trace!(
                "Pass {:?} skipped by render pass '{}'.",
                flags.pass_flags,
                self.config.name
            );
            return Ok(None);
        }
        let both_faces = !self.config.opaque
            || two_sided
            || flags.texture_flags.contains(TextureChannels::OPACITY);
        if both_faces {
            self.prepare(flags, Face::Front)?;
        }
        self.prepare(flags, Face::Back).map(Some)
    }

    fn prepare(
        &mut self,
        flags: PipelineFlags,
        face: Face,
    ) -> Result<PipelineFlags, RenderPassError> {
        self.ensure_initialised()?;
        let key = self.normalise(flags, face);
        if self.cache(face).contains_key(&key) {
            return Ok(key);
        }

        let pipeline = Arc::new(self.create_pipeline(key, face)?);
        log::debug!(
            "Render pass '{}': new {} pipeline '{}' ({} cached).",
            self.config.name,
            face.name(),
            pipeline.label(),
            self.cache(face).len() + 1
        );
        match face {
            Face::Front => self.front_pipelines.insert(key, pipeline.clone()),
            Face::Back => self.back_pipelines.insert(key, pipeline.clone()),
        };

        // The pipeline is only built for the render pass it was prepared for.
        let render_pass = self.render_pass.clone();
        let expected = self.render_pass_id();
        let label = format!("{}/initialise", pipeline.label());
        self.events.send_event(EventType::PreRender, label, move |device| {
            let current = *render_pass
                .read()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if current.is_some() && current == expected {
                pipeline.initialise(device, current)
            } else {
                let label = pipeline.label();
                log::debug!("Pipeline '{label}' skipped, its render pass is gone.");
                Ok(())
            }
        });
        Ok(key)
    }

    fn create_pipeline(
        &self,
        key: PipelineFlags,
        face: Face,
    ) -> Result<RenderPipeline, RenderPassError> {
        let sources = ShaderSources {
            vertex: self.get_vertex_shader_source(&key),
            geometry: self.get_geometry_shader_source(&key),
            pixel: self.get_pixel_shader_source(&key)?,
        };

        let formats = self.technique.colour_formats(&self.config);
        let blends = create_blend_state(
            key.colour_blend_mode,
            key.alpha_blend_mode,
            formats.len() as u32,
        );
        let states = PipelineStates {
            primitive: PrimitiveStateDescriptor::culling(key.topology, face.cull_mode()),
            depth_stencil: self.technique.depth_stencil_state(&self.config, &key),
            color_targets: blends
                .into_iter()
                .zip(formats)
                .map(|(blend, format)| blend.color_target(format))
                .collect(),
        };

        let label = format!(
            "{}/{}/{}#{}",
            self.config.name,
            self.technique.name(),
            face.name(),
            self.cache(face).len()
        );
        Ok(RenderPipeline::new(key, label, sources, states, self.size))
    }

    // Pipeline lookup

    /// The ready front pipeline of `flags`.
    ///
    /// `None` when the key was never prepared or its pipeline is not created yet.
    pub fn get_pipeline_front(&self, flags: PipelineFlags) -> Option<Arc<RenderPipeline>> {
        self.get_ready(flags, Face::Front)
    }

    /// The ready back pipeline of `flags`.
    pub fn get_pipeline_back(&self, flags: PipelineFlags) -> Option<Arc<RenderPipeline>> {
        self.get_ready(flags, Face::Back)
    }

    /// Creation status of the front pipeline of `flags`, `None` if never prepared.
    pub fn pipeline_status_front(&self, flags: PipelineFlags) -> Option<PipelineStatus> {
        self.lookup(flags, Face::Front).map(|pipeline| pipeline.status())
    }

    /// Creation status of the back pipeline of `flags`, `None` if never prepared.
    pub fn pipeline_status_back(&self, flags: PipelineFlags) -> Option<PipelineStatus> {
        self.lookup(flags, Face::Back).map(|pipeline| pipeline.status())
    }

    /// Number of pipelines in the front cache.
    pub fn front_pipeline_count(&self) -> usize {
        self.front_pipelines.len()
    }

    /// Number of pipelines in the back cache.
    pub fn back_pipeline_count(&self) -> usize {
        self.back_pipelines.len()
    }

    fn lookup(&self, flags: PipelineFlags, face: Face) -> Option<&Arc<RenderPipeline>> {
        self.cache(face).get(&self.normalise(flags, face))
    }

    fn get_ready(&self, flags: PipelineFlags, face: Face) -> Option<Arc<RenderPipeline>> {
        self.lookup(flags, face)
            .filter(|pipeline| pipeline.status() == PipelineStatus::Ready)
            .cloned()
    }

    /// Runs the deferred GPU work queued for `event_type`.
    pub fn process_gpu_events(&self, event_type: EventType) -> Result<usize, RenderPassError> {
        Ok(self.events.process(event_type, self.device.as_ref())?)
    }

    // Shader sources

    /// Vertex shader of the pipelines of `flags`.
    pub fn get_vertex_shader_source(&self, flags: &PipelineFlags) -> String {
        self.technique.vertex_shader_source(flags)
    }

    /// Geometry shader of the pipelines of `flags`, if any.
    pub fn get_geometry_shader_source(&self, flags: &PipelineFlags) -> Option<String> {
        self.technique.geometry_shader_source(flags)
    }

    /// Pixel shader of the pipelines of `flags`, lit with the model matching
    /// the pass flags.
    pub fn get_pixel_shader_source(
        &self,
        flags: &PipelineFlags,
    ) -> Result<String, RenderPassError> {
        let lighting = if flags.program_flags.contains(ProgramFlags::LIGHTING) {
            Some(self.lighting_model(flags)?)
        } else {
            None
        };
        Ok(self.technique.pixel_shader_source(flags, lighting.as_deref()))
    }

    /// Name of the lighting model shading `flags`.
    pub fn lighting_model_name(&self, flags: &PipelineFlags) -> &str {
        if flags.pass_flags.contains(PassFlags::PBR_METALLIC_ROUGHNESS) {
            "pbr_mr"
        } else if flags.pass_flags.contains(PassFlags::PBR_SPECULAR_GLOSSINESS) {
            "pbr_sg"
        } else {
            self.config.lighting_model.as_str()
        }
    }

    fn lighting_model(
        &self,
        flags: &PipelineFlags,
    ) -> Result<Box<dyn LightingModel>, RenderPassError> {
        let name = self.lighting_model_name(flags);
        let config = LightingConfig {
            scene_flags: flags.scene_flags,
            texture_count: flags.shader_options().texture_count(),
        };
        self.lighting_models
            .create(name, &config)
            .ok_or_else(|| RenderPassError::UnknownLightingModel(name.to_owned()))
    }

    // Frame data

    /// Writes the camera matrices, keeping the previous view for motion vectors.
    pub fn update_matrices(
        &mut self,
        projection: Mat4,
        view: Mat4,
        jitter: [f32; 2],
    ) -> Result<(), RenderPassError> {
        let name = self.config.name.clone();
        let ubos = self.frame_ubos_mut()?;
        let data = ubos.matrix_pool.data_mut(&ubos.matrix);
        data.prv_view = data.cur_view;
        data.cur_view = view;
        data.projection = projection;
        data.inv_projection = projection.inverse().unwrap_or_else(|| {
            log::warn!("Render pass '{name}': singular projection matrix.");
            Mat4::IDENTITY
        });
        data.jitter = [jitter[0], jitter[1], 0.0, 0.0];
        Ok(())
    }

    /// Writes the scene block; the window size is the size of the pass.
    pub fn update_scene(
        &mut self,
        mut scene: SceneUboConfiguration,
    ) -> Result<(), RenderPassError> {
        scene.window_size = [self.size.width as i32, self.size.height as i32];
        let ubos = self.frame_ubos_mut()?;
        *ubos.scene_pool.data_mut(&ubos.scene) = scene;
        Ok(())
    }

    /// Current camera block.
    pub fn matrices(&self) -> Option<&MatrixUboConfiguration> {
        self.ubos
            .as_ref()
            .map(|ubos| ubos.matrix_pool.data(&ubos.matrix))
    }

    /// Current scene block.
    pub fn scene(&self) -> Option<&SceneUboConfiguration> {
        self.ubos.as_ref().map(|ubos| ubos.scene_pool.data(&ubos.scene))
    }

    /// Pushes the camera and scene blocks to the GPU.
    pub fn upload_ubos(&mut self) -> Result<(), RenderPassError> {
        let ubos = self.frame_ubos_mut()?;
        ubos.scene_pool.upload()?;
        ubos.matrix_pool.upload()?;
        Ok(())
    }

    /// Fills the instancing buffers of the queued batches and counts what is drawn.
    ///
    /// # Panics
    /// If a skinned batch copies a different number of matrices and bones.
    pub fn update(&mut self, queues: &mut RenderQueues) -> Result<RenderInfo, RenderPassError> {
        self.ensure_initialised()?;
        let device = self.device.as_ref();
        let name = self.config.name.as_str();
        let _timing = self.timer.as_mut().map(RenderPassTimer::start);
        let mut info = RenderInfo::default();

        for node in &queues.static_nodes {
            info.add_draw(&node.base.buffers, 1);
        }
        for batch in &mut queues.instanced_static {
            let count = copy_nodes_matrices(&batch.nodes, batch.instances.data_mut());
            if let Some(first) = batch.nodes.first().filter(|_| count > 0) {
                batch
                    .instances
                    .upload(device, &format!("{name}/Instances"), count as usize)?;
                info.add_draw(&first.base.buffers, count);
            }
        }
        for node in &queues.skinned_nodes {
            info.add_draw(&node.base.buffers, 1);
        }
        for batch in &mut queues.instanced_skinned {
            let count = copy_nodes_matrices(&batch.nodes, batch.instances.data_mut());
            let bones = copy_nodes_bones(&batch.nodes, batch.bones.data_mut());
            assert_eq!(count, bones, "instanced matrices and bones counts differ");
            if let Some(first) = batch.nodes.first().filter(|_| count > 0) {
                batch
                    .instances
                    .upload(device, &format!("{name}/Instances"), count as usize)?;
                batch.bones.upload(
                    device,
                    &format!("{name}/Bones"),
                    count as usize * super::nodes::BONES_STRIDE,
                )?;
                info.add_draw(&first.base.buffers, count);
            }
        }
        for node in &queues.morphing_nodes {
            info.add_draw(&node.base.buffers, 1);
        }
        for node in &queues.billboard_nodes {
            info.add_draw(&node.base.buffers, 1);
        }

        log::trace!(
            "Render pass '{name}': {} objects, {} faces, {} draw calls.",
            info.visible_objects_count,
            info.visible_face_count,
            info.draw_calls
        );
        Ok(info)
    }

    // Node assembly

    fn node_base(
        pools: &ObjectUboPools,
        pipeline: Arc<RenderPipeline>,
        entry: &PoolsEntry,
    ) -> RenderNodeBase {
        let ubo = pools.pools();
        RenderNodeBase {
            pipeline,
            pass: entry.pass.clone(),
            object: entry.object.clone(),
            model_matrix: ubo.model_matrix.binding(&entry.model_matrix),
            model: ubo.model.binding(&entry.model),
            picking: ubo.picking.binding(&entry.picking),
            textures: ubo.textures.binding(&entry.textures),
            buffers: entry.object.geometry_buffers(),
            ubo_descriptor: None,
            texture_descriptor: None,
        }
    }

    /// Bundles the UBO slots of `(object, pass)` with `pipeline`.
    ///
    /// # Panics
    /// If the pair is not registered in `pools`.
    pub fn create_static_node(
        &self,
        pools: &ObjectUboPools,
        pipeline: Arc<RenderPipeline>,
        object: ObjectId,
        pass: PassId,
    ) -> StaticRenderNode {
        let entry = pools.get_ubos(object, pass);
        StaticRenderNode {
            base: Self::node_base(pools, pipeline, entry),
        }
    }

    /// Bundles a skinned object with its bones slot.
    ///
    /// # Panics
    /// If the pair is not registered or the object is not skinned.
    pub fn create_skinning_node(
        &self,
        pools: &ObjectUboPools,
        pipeline: Arc<RenderPipeline>,
        object: ObjectId,
        pass: PassId,
    ) -> SkinningRenderNode {
        let entry = pools.get_ubos(object, pass);
        let (ObjectUbo::Skinning(handle), Some(skeleton)) =
            (entry.object_ubo, entry.object.skeleton())
        else {
            panic!("object {object:?} is not a skinned mesh");
        };
        SkinningRenderNode {
            base: Self::node_base(pools, pipeline, entry),
            skeleton,
            skinning: pools.pools().skinning.binding(&handle),
            instanced_bones: None,
        }
    }

    /// Bundles a morphed object with its animation slot.
    ///
    /// # Panics
    /// If the pair is not registered or the object is not morphed.
    pub fn create_morphing_node(
        &self,
        pools: &ObjectUboPools,
        pipeline: Arc<RenderPipeline>,
        object: ObjectId,
        pass: PassId,
    ) -> MorphingRenderNode {
        let entry = pools.get_ubos(object, pass);
        let (ObjectUbo::Morphing(handle), Some(animation)) =
            (entry.object_ubo, entry.object.mesh_animation())
        else {
            panic!("object {object:?} is not a morphed mesh");
        };
        MorphingRenderNode {
            base: Self::node_base(pools, pipeline, entry),
            animation,
            morphing: pools.pools().morphing.binding(&handle),
        }
    }

    /// Bundles a billboard with its dimensions slot.
    ///
    /// # Panics
    /// If the pair is not registered or the object is not a billboard.
    pub fn create_billboard_node(
        &self,
        pools: &ObjectUboPools,
        pipeline: Arc<RenderPipeline>,
        object: ObjectId,
        pass: PassId,
    ) -> BillboardRenderNode {
        let entry = pools.get_ubos(object, pass);
        let ObjectUbo::Billboard(handle) = entry.object_ubo else {
            panic!("object {object:?} is not a billboard");
        };
        BillboardRenderNode {
            base: Self::node_base(pools, pipeline, entry),
            billboard: pools.pools().billboard.binding(&handle),
        }
    }

    /// Groups instances of one submesh, sized by `max_instances`.
    pub fn create_static_batch(&self, nodes: Vec<StaticRenderNode>) -> StaticBatch {
        StaticBatch::new(nodes, self.config.max_instances as usize)
    }

    /// Groups skinned instances and binds their shared bones buffer.
    pub fn create_skinned_batch(
        &self,
        nodes: Vec<SkinningRenderNode>,
    ) -> Result<SkinnedBatch, RenderPassError> {
        let mut batch = SkinnedBatch::new(nodes, self.config.max_instances as usize);
        let label = format!("{}/Bones", self.config.name);
        batch.bones.upload(self.device.as_ref(), &label, 0)?;
        let bones = batch.bones.binding();
        for node in &mut batch.nodes {
            node.instanced_bones = bones;
        }
        Ok(batch)
    }

    // Descriptors

    /// Writes the UBO set of `node`, in the binding order of its pipeline layout.
    pub fn initialise_ubo_descriptor(
        &self,
        node: &mut dyn RenderNode,
    ) -> Result<(), RenderPassError> {
        let ubos = self.ensure_initialised()?;
        let pipeline = node.base().pipeline.clone();
        let layout = pipeline
            .ubo_layout()
            .ok_or_else(|| RenderPassError::PipelineNotReady(pipeline.label().to_owned()))?;

        let mut entries = Vec::new();
        for slot in descriptor_slots(pipeline.flags()) {
            let buffer = match slot {
                UboSlot::PassBuffer => self.scene_buffers()?.pass_buffer,
                UboSlot::LightBuffer => self.scene_buffers()?.light_buffer,
                UboSlot::TextureBuffer => self.scene_buffers()?.texture_buffer,
                UboSlot::Matrix => ubos.matrix_pool.binding(&ubos.matrix),
                UboSlot::Scene => ubos.scene_pool.binding(&ubos.scene),
                _ => node
                    .binding(slot)
                    .ok_or(RenderPassError::MissingNodeBuffer(slot))?,
            };
            entries.push(BindGroupEntry::buffer(slot.binding(), buffer));
        }

        let id = self.device.create_bind_group(&BindGroupDescriptor {
            label: Some(pipeline.label()),
            layout,
            entries: &entries,
        })?;
        self.replace_descriptor(&mut node.base_mut().ubo_descriptor, id);
        Ok(())
    }

    /// Writes the texture set of `node`: its material textures, then the
    /// shadow maps its pipeline samples.
    pub fn initialise_texture_descriptor(
        &self,
        node: &mut dyn RenderNode,
        shadow_maps: &ShadowMaps,
    ) -> Result<(), RenderPassError> {
        self.ensure_initialised()?;
        let pipeline = node.base().pipeline.clone();
        let layout = pipeline
            .texture_layout()
            .ok_or_else(|| RenderPassError::PipelineNotReady(pipeline.label().to_owned()))?;
        let entries = texture_entries(pipeline.flags(), &node.base().pass, shadow_maps)
            .map_err(|MissingShadowMap(name)| RenderPassError::MissingShadowMap(name))?;

        let id = self.device.create_bind_group(&BindGroupDescriptor {
            label: Some(pipeline.label()),
            layout,
            entries: &entries,
        })?;
        self.replace_descriptor(&mut node.base_mut().texture_descriptor, id);
        Ok(())
    }

    fn scene_buffers(&self) -> Result<SceneBuffers, RenderPassError> {
        self.scene_buffers
            .ok_or_else(|| RenderPassError::MissingSceneBuffers(self.config.name.clone()))
    }

    fn replace_descriptor(&self, slot: &mut Option<BindGroupId>, id: BindGroupId) {
        if let Some(old) = slot.replace(id) {
            if let Err(e) = self.device.destroy_bind_group(old) {
                log::warn!("Failed to destroy bind group: {e}");
            }
        }
    }
}

impl<T: RenderTechnique> Drop for RenderPass<T> {
    fn drop(&mut self) {
        self.cleanup();
    }
}
