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

//! Defines the hierarchy of error types for the rendering subsystem.
//!
//! Only failures at the GPU boundary are represented here. Programmer errors
//! (querying an unregistered object, double-freeing a pool slot) panic instead,
//! and expected absences are expressed with `Option`.

use crate::renderer::api::shader::{ShaderModuleId, ShaderStage};
use std::fmt;

/// An error related to the compilation of a generated shader module.
#[derive(Debug)]
pub enum ShaderError {
    /// The shader source failed to compile into a backend-specific module.
    CompilationError {
        /// A descriptive label for the shader, if available.
        label: String,
        /// The stage the source was compiled for.
        stage: ShaderStage,
        /// Detailed error messages from the shader compiler.
        details: String,
    },
    /// The requested shader module could not be found.
    NotFound {
        /// The ID of the shader module that was not found.
        id: ShaderModuleId,
    },
}

impl fmt::Display for ShaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderError::CompilationError {
                label,
                stage,
                details,
            } => {
                write!(
                    f,
                    "Shader compilation failed for '{label}' ({stage:?}): {details}"
                )
            }
            ShaderError::NotFound { id } => {
                write!(f, "Shader module not found for ID: {id:?}")
            }
        }
    }
}

impl std::error::Error for ShaderError {}

/// An error related to the creation of a graphics pipeline.
#[derive(Debug)]
pub enum PipelineError {
    /// Failed to create a descriptor set layout or a pipeline layout.
    LayoutCreationFailed(String),
    /// The graphics backend failed to compile the full pipeline state object.
    CompilationFailed {
        /// A descriptive label for the pipeline, if available.
        label: Option<String>,
        /// Detailed error messages from the backend.
        details: String,
    },
    /// The color target format is not compatible with the pipeline or device.
    IncompatibleColorTarget(String),
    /// A required graphics feature is not supported by the device.
    FeatureNotSupported(String),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::LayoutCreationFailed(msg) => {
                write!(f, "Pipeline layout creation failed: {msg}")
            }
            PipelineError::CompilationFailed { label, details } => {
                write!(
                    f,
                    "Pipeline compilation failed for '{}': {}",
                    label.as_deref().unwrap_or("Unknown"),
                    details
                )
            }
            PipelineError::IncompatibleColorTarget(msg) => {
                write!(f, "Incompatible color target format: {msg}")
            }
            PipelineError::FeatureNotSupported(msg) => {
                write!(f, "Feature not supported: {msg}")
            }
        }
    }
}

impl std::error::Error for PipelineError {}

/// An error related to the creation or use of a GPU resource.
#[derive(Debug)]
pub enum ResourceError {
    /// A shader-specific error occurred.
    Shader(ShaderError),
    /// A pipeline-specific error occurred.
    Pipeline(PipelineError),
    /// A generic resource could not be found.
    NotFound,
    /// The handle or ID used to reference a resource is invalid.
    InvalidHandle,
    /// The device could not provide the requested amount of memory.
    OutOfMemory {
        /// The size of the failed allocation, in bytes.
        requested: u64,
    },
    /// An error originating from the specific graphics backend implementation.
    BackendError(String),
    /// An attempt was made to access a resource out of its bounds.
    OutOfBounds,
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceError::Shader(err) => write!(f, "Shader resource error: {err}"),
            ResourceError::Pipeline(err) => write!(f, "Pipeline resource error: {err}"),
            ResourceError::NotFound => write!(f, "Resource not found with ID."),
            ResourceError::InvalidHandle => write!(f, "Invalid resource handle or ID."),
            ResourceError::OutOfMemory { requested } => {
                write!(f, "Out of GPU memory while allocating {requested} bytes.")
            }
            ResourceError::BackendError(msg) => {
                write!(f, "Backend-specific resource error: {msg}")
            }
            ResourceError::OutOfBounds => {
                write!(f, "Resource access out of bounds.")
            }
        }
    }
}

impl std::error::Error for ResourceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ResourceError::Shader(err) => Some(err),
            ResourceError::Pipeline(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ShaderError> for ResourceError {
    fn from(err: ShaderError) -> Self {
        ResourceError::Shader(err)
    }
}

impl From<PipelineError> for ResourceError {
    fn from(err: PipelineError) -> Self {
        ResourceError::Pipeline(err)
    }
}

/// A high-level error raised while driving render passes.
#[derive(Debug)]
pub enum RenderError {
    /// An operation was attempted before the render pass was initialized.
    NotInitialized,
    /// A failure occurred while initializing a render pass or its resources.
    InitializationFailed(String),
    /// An error occurred while managing a GPU resource.
    ResourceError(ResourceError),
    /// An unexpected or internal error occurred.
    Internal(String),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::NotInitialized => {
                write!(f, "The render pass is not initialized.")
            }
            RenderError::InitializationFailed(msg) => {
                write!(f, "Failed to initialize render pass: {msg}")
            }
            RenderError::ResourceError(err) => {
                write!(f, "Graphics resource operation failed: {err}")
            }
            RenderError::Internal(msg) => {
                write!(f, "An internal or unexpected error occurred: {msg}")
            }
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RenderError::ResourceError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ResourceError> for RenderError {
    fn from(err: ResourceError) -> Self {
        RenderError::ResourceError(err)
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::*;

    #[test]
    fn shader_error_display() {
        let err = ShaderError::CompilationError {
            label: "Forward/vertex".to_string(),
            stage: ShaderStage::Vertex,
            details: "0:12: 'c3d_mtxView' : undeclared identifier".to_string(),
        };
        assert_eq!(
            format!("{err}"),
            concat!(
                "Shader compilation failed for 'Forward/vertex' (Vertex): ",
                "0:12: 'c3d_mtxView' : undeclared identifier"
            )
        );
    }

    #[test]
    fn resource_error_display_wrapping_pipeline_error() {
        let res_err: ResourceError =
            PipelineError::LayoutCreationFailed("binding 4 declared twice".to_string()).into();
        assert_eq!(
            format!("{res_err}"),
            "Pipeline resource error: Pipeline layout creation failed: binding 4 declared twice"
        );
        assert!(res_err.source().is_some());
    }

    #[test]
    fn render_error_chains_to_shader_error() {
        let shader_err = ShaderError::NotFound {
            id: ShaderModuleId(101),
        };
        let render_err: RenderError = ResourceError::from(shader_err).into();
        assert_eq!(
            format!("{render_err}"),
            concat!(
                "Graphics resource operation failed: Shader resource error: ",
                "Shader module not found for ID: ShaderModuleId(101)"
            )
        );
        let source = render_err.source().expect("render error has a source");
        assert!(source.source().is_some());
    }

    #[test]
    fn out_of_memory_display() {
        let err = ResourceError::OutOfMemory { requested: 4096 };
        assert_eq!(
            format!("{err}"),
            "Out of GPU memory while allocating 4096 bytes."
        );
    }
}
