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

//! Render passes and everything they build: pipeline keys and caches, blend
//! and binding layouts, render nodes and techniques.

mod bindings;
mod blend;
mod config;
mod error;
mod nodes;
mod pipeline;
mod pipeline_flags;
mod render_pass;
mod technique;
mod timer;
mod vertex_layouts;

pub use bindings::*;
pub use blend::*;
pub use config::*;
pub use error::*;
pub use nodes::*;
pub use pipeline::*;
pub use pipeline_flags::*;
pub use render_pass::*;
pub use technique::*;
pub use timer::*;
pub use vertex_layouts::*;
