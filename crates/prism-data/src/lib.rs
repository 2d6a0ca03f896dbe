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

//! # Prism Data
//!
//! GPU data layouts and the allocators that manage them: the std140 mirrors of
//! every uniform block, the typed [`ubo::UboPool`] free-list allocator, and the
//! [`object_pools::ObjectUboPools`] registry giving each `(object, pass)` pair its
//! own UBO slots.

pub mod object_pools;
pub mod ubo;

pub use object_pools::{EntryKey, ObjectUbo, ObjectUboPools, PoolStats, PoolsEntry};
