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

//! Contracts between scene objects and the renderer.
//!
//! The renderer never walks the scene graph itself. It only sees objects through
//! [`RenderableObject`], identifies them by generation-checked [`ObjectId`]s, and
//! learns about material swaps through the [`MaterialSignal`] each object exposes.

mod material;
mod object;
mod signal;

pub use self::material::{Material, MaterialPass, PassId, TextureUnit, TextureUnitId};
pub use self::object::{
    GeometryBuffers, MeshAnimation, ObjectId, ObjectKind, RenderableObject, Skeleton,
    MAX_BONES_COUNT,
};
pub use self::signal::{ConnectionId, MaterialChanged, MaterialSignal};
