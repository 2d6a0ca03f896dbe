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

use super::texture::TextureFormat;
use std::borrow::Cow;

/// An opaque handle to a GPU render pass object (attachments and subpass description).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RenderPassId(pub usize);

/// Describes the attachments of a GPU render pass.
#[derive(Debug, Clone)]
pub struct RenderPassDescriptor<'a> {
    /// An optional debug label.
    pub label: Option<Cow<'a, str>>,
    /// Formats of the color attachments, in location order.
    pub color_formats: Cow<'a, [TextureFormat]>,
    /// Format of the depth attachment, if any.
    pub depth_format: Option<TextureFormat>,
}
