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

use crate::renderer::api::*;
use crate::renderer::error::ResourceError;
use std::fmt::Debug;

/// The GPU abstraction consumed by render passes and UBO pools.
///
/// Implementations wrap a concrete API (Vulkan, wgpu...). Every method is
/// synchronous; deferred creation is the responsibility of
/// [`crate::event::GpuEventQueue`].
pub trait GraphicsDevice: Send + Sync + Debug + 'static {
    /// Creates a shader module from the provided descriptor.
    /// ## Arguments
    /// * `descriptor` - The shader source and stage.
    /// ## Returns
    /// A `Result` containing the ID of the created shader module.
    /// ## Errors
    /// * `ResourceError::Shader` - If the source fails to compile.
    fn create_shader_module(
        &self,
        descriptor: &ShaderModuleDescriptor,
    ) -> Result<ShaderModuleId, ResourceError>;

    /// Destroys the shader module associated with the given ID.
    /// ## Errors
    /// * `ResourceError` - If the shader module destruction fails.
    fn destroy_shader_module(&self, id: ShaderModuleId) -> Result<(), ResourceError>;

    /// Creates a render pipeline from the provided descriptor.
    /// ## Arguments
    /// * `descriptor` - The pipeline configuration.
    /// ## Returns
    /// A `Result` containing the ID of the created render pipeline.
    /// ## Errors
    /// * `ResourceError::Pipeline` - If the render pipeline creation fails.
    fn create_render_pipeline(
        &self,
        descriptor: &RenderPipelineDescriptor,
    ) -> Result<RenderPipelineId, ResourceError>;

    /// Destroys the render pipeline associated with the given ID.
    fn destroy_render_pipeline(&self, id: RenderPipelineId) -> Result<(), ResourceError>;

    /// Creates a pipeline layout from the provided descriptor.
    /// ## Arguments
    /// * `descriptor` - The bind group layouts, indexed by set.
    /// ## Returns
    /// A `Result` containing the ID of the created pipeline layout.
    fn create_pipeline_layout(
        &self,
        descriptor: &PipelineLayoutDescriptor,
    ) -> Result<PipelineLayoutId, ResourceError>;

    /// Destroys a pipeline layout.
    fn destroy_pipeline_layout(&self, id: PipelineLayoutId) -> Result<(), ResourceError>;

    /// Creates a bind group layout (descriptor set layout).
    /// ## Arguments
    /// * `descriptor` - The ordered list of bindings.
    /// ## Returns
    /// A `Result` containing the ID of the created layout.
    fn create_bind_group_layout(
        &self,
        descriptor: &BindGroupLayoutDescriptor,
    ) -> Result<BindGroupLayoutId, ResourceError>;

    /// Destroys a bind group layout.
    fn destroy_bind_group_layout(&self, id: BindGroupLayoutId) -> Result<(), ResourceError>;

    /// Allocates a bind group (descriptor set) and writes its entries.
    /// ## Arguments
    /// * `descriptor` - The layout and the resources bound to each binding.
    /// ## Returns
    /// A `Result` containing the ID of the allocated bind group.
    fn create_bind_group(
        &self,
        descriptor: &BindGroupDescriptor,
    ) -> Result<BindGroupId, ResourceError>;

    /// Releases a bind group.
    fn destroy_bind_group(&self, id: BindGroupId) -> Result<(), ResourceError>;

    /// Creates a new GPU buffer.
    /// ## Arguments
    /// * `descriptor` - The buffer configuration.
    /// ## Returns
    /// A `Result` containing the ID of the created buffer.
    /// ## Errors
    /// * `ResourceError::OutOfMemory` - If the allocation cannot be satisfied.
    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<BufferId, ResourceError>;

    /// Creates a new GPU buffer and initializes it with the provided data.
    fn create_buffer_with_data(
        &self,
        descriptor: &BufferDescriptor,
        data: &[u8],
    ) -> Result<BufferId, ResourceError>;

    /// Destroys a GPU buffer.
    fn destroy_buffer(&self, id: BufferId) -> Result<(), ResourceError>;

    /// Writes data to a GPU buffer.
    /// ## Arguments
    /// * `id` - The ID of the buffer to write to.
    /// * `offset` - The offset in the buffer where the data will be written.
    /// * `data` - The bytes to write.
    fn write_buffer(&self, id: BufferId, offset: u64, data: &[u8]) -> Result<(), ResourceError>;

    /// Creates a GPU render pass object describing the attachments.
    fn create_render_pass(
        &self,
        descriptor: &RenderPassDescriptor,
    ) -> Result<RenderPassId, ResourceError>;

    /// Destroys a GPU render pass object.
    fn destroy_render_pass(&self, id: RenderPassId) -> Result<(), ResourceError>;

    /// Indicate if a specific feature is supported.
    fn supports_feature(&self, feature_name: &str) -> bool;
}
