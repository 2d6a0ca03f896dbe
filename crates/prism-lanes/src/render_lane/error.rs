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

//! Errors raised by render passes and their configuration.

use super::bindings::UboSlot;
use prism_core::renderer::error::{RenderError, ResourceError};
use thiserror::Error;

/// Failures of render pass operations.
#[derive(Debug, Error)]
pub enum RenderPassError {
    /// The pass must be initialised first.
    #[error("render pass '{0}' is not initialised")]
    NotInitialised(String),
    /// A device call failed.
    #[error(transparent)]
    Resource(#[from] ResourceError),
    /// Deferred GPU work failed.
    #[error(transparent)]
    Render(#[from] RenderError),
    /// The configured lighting model is not registered.
    #[error("unknown lighting model '{0}'")]
    UnknownLightingModel(String),
    /// The pipeline of a node has no GPU objects yet.
    #[error("pipeline '{0}' is not ready")]
    PipelineNotReady(String),
    /// Lit pipelines need the lights and materials buffers of the scene.
    #[error("render pass '{0}' has no scene buffers")]
    MissingSceneBuffers(String),
    /// A render node lacks the buffer its pipeline binds at a slot.
    #[error("render node has no buffer for {0:?}")]
    MissingNodeBuffer(UboSlot),
    /// A shadow map sampled by the pipeline was not provided.
    #[error("missing {0} shadow map")]
    MissingShadowMap(&'static str),
}

/// Failures loading or saving a render pass configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The RON text is malformed.
    #[error("failed to parse render pass config: {0}")]
    Parse(#[from] ron::error::SpannedError),
    /// The configuration cannot be written.
    #[error("failed to serialize render pass config: {0}")]
    Serialize(#[from] ron::Error),
    /// A field has an unusable value.
    #[error("invalid render pass config field '{field}': {reason}")]
    Invalid {
        /// The offending field.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}
