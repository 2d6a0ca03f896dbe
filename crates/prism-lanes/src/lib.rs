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

//! # Prism Lanes
//!
//! The render pass layer: a [`render_lane::RenderPass`] turns material passes
//! into cached pipeline variants, assembles render nodes from the per-object
//! UBO slots of `prism-data`, fills instancing buffers every frame and writes
//! the descriptor sets of its nodes.
//!
//! GPU objects are never created on the calling thread. Preparing a pipeline
//! queues a deferred event on the shared `GpuEventQueue`; the render thread
//! runs it with [`render_lane::RenderPass::process_gpu_events`].

#![warn(missing_docs)]

pub mod render_lane;

pub use render_lane::{
    DepthTechnique, ForwardTechnique, PipelineFlags, RenderPass, RenderPassConfig,
    RenderPassError, RenderTechnique,
};
