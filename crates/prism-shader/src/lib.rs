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

//! # Prism Shader
//!
//! GLSL 4.50 generation for the render passes: a typed expression writer,
//! the binding points shared with the pipeline layouts, the uniform block
//! declarations, the lighting models and the per-stage generators.
//!
//! ```
//! use prism_core::renderer::flags::ProgramFlags;
//! use prism_shader::{vertex_shader, ShaderOptions};
//!
//! let source = vertex_shader(&ShaderOptions {
//!     program_flags: ProgramFlags::BILLBOARDS,
//!     ..Default::default()
//! });
//! assert!(source.contains("in vec3 center;"));
//! ```

#![warn(missing_docs)]

pub mod bindings;
pub mod lighting;
/// The flags and derived indices a shader variant is generated from.
pub mod options;
pub mod pixel;
pub mod shadow;
pub mod ubos;
pub mod vertex;
pub mod writer;

pub use lighting::{LightingConfig, LightingModel, LightingModelFactory};
pub use options::ShaderOptions;
pub use pixel::{depth_pixel_shader, pixel_shader};
pub use vertex::{geometry_shader, vertex_shader};
pub use writer::ShaderWriter;
