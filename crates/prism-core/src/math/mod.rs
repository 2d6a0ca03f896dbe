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

//! Provides the small set of linear algebra primitives the renderer feeds to the GPU.
//!
//! Every type here is `#[repr(C)]` and `bytemuck::Pod`, so values can be copied
//! verbatim into uniform buffer staging memory.

/// A small constant for floating-point comparisons.
pub const EPSILON: f32 = 1e-5;

/// Surface sizes.
pub mod dimension;
/// The column-major 4x4 matrix.
pub mod matrix;
/// Two, three and four component vectors.
pub mod vector;

pub use self::dimension::Extent2D;
pub use self::matrix::Mat4;
pub use self::vector::{Vec2, Vec3, Vec4};
