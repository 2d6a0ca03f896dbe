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

use std::borrow::Cow;

/// A programmable stage of the graphics pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ShaderStage {
    /// Vertex processing.
    Vertex,
    /// Optional primitive processing between vertex and fragment stages.
    Geometry,
    /// Fragment (pixel) processing.
    Fragment,
    /// General purpose compute.
    Compute,
}

/// Represents the source data for a shader module.
#[derive(Debug, Clone)]
pub enum ShaderSourceData<'a> {
    /// GLSL 4.50 source text, as produced by the shader writer.
    Glsl(Cow<'a, str>),
}

/// Describes a shader module to be created by the `GraphicsDevice`.
#[derive(Debug, Clone)]
pub struct ShaderModuleDescriptor<'a> {
    /// An optional debug label.
    pub label: Option<&'a str>,
    /// The source of the module.
    pub source: ShaderSourceData<'a>,
    /// The stage this module is compiled for.
    pub stage: ShaderStage,
    /// The entry point, `main` for GLSL.
    pub entry_point: &'a str,
}

/// An opaque handle representing a compiled shader module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShaderModuleId(pub usize);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glsl_descriptor_borrows_source() {
        let source = "#version 450\nvoid main()\n{\n}\n";
        let descriptor = ShaderModuleDescriptor {
            label: Some("depth/fragment"),
            source: ShaderSourceData::Glsl(Cow::Borrowed(source)),
            stage: ShaderStage::Fragment,
            entry_point: "main",
        };
        let ShaderSourceData::Glsl(ref text) = descriptor.source;
        assert!(matches!(text, Cow::Borrowed(_)));
        assert_eq!(text.as_ref(), source);
        assert_eq!(descriptor.stage, ShaderStage::Fragment);
    }
}
