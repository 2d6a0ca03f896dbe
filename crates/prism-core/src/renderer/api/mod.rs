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

//! Backend-agnostic descriptors and handles consumed by [`super::traits::GraphicsDevice`].

pub mod bind_group;
pub mod buffer;
/// Render pass objects and their attachments.
pub mod pass;
pub mod pipeline;
/// Shader stages and modules.
pub mod shader;
/// Shader stage visibility of descriptor bindings.
pub mod stage_flags;
pub mod texture;

pub use self::bind_group::*;
pub use self::buffer::*;
pub use self::pass::*;
pub use self::pipeline::*;
pub use self::shader::*;
pub use self::stage_flags::*;
pub use self::texture::*;
