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

use prism_core::renderer::flags::{ProgramFlags, SceneFlags};
use prism_shader::lighting::PhongLightingModel;
use prism_shader::{pixel_shader, LightingConfig, LightingModelFactory, ShaderOptions};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn lit_options(scene_flags: SceneFlags) -> ShaderOptions {
    ShaderOptions {
        program_flags: ProgramFlags::LIGHTING,
        scene_flags,
        ..Default::default()
    }
}

/// The three light loops, each starting where the previous one ended.
fn assert_combined_loops(source: &str, model: &str) {
    let header = "for (int i = begin; i < end; ++i)";
    assert_eq!(source.matches(header).count(), 3, "{model}: light loops");

    let steps = [
        "int begin = 0;",
        "int end = c3d_lightsCount.x;",
        "GetDirectionalLight(i)",
        "begin = end;",
        "end += c3d_lightsCount.y;",
        "GetPointLight(i)",
        "end += c3d_lightsCount.z;",
        "GetSpotLight(i)",
    ];
    let mut cursor = 0;
    for step in steps {
        let found = source[cursor..]
            .find(step)
            .unwrap_or_else(|| panic!("{model}: '{step}' missing after offset {cursor}"));
        cursor += found + step.len();
    }
}

#[test]
fn every_registered_model_iterates_all_light_types() {
    init_logger();
    let factory = LightingModelFactory::with_defaults();
    let options = lit_options(SceneFlags::empty());
    let config = LightingConfig::default();
    for name in factory.names() {
        let model = factory.create(name, &config).expect("registered model");
        assert_eq!(model.name(), name);
        let source = pixel_shader(&options, Some(model.as_ref()));
        assert_combined_loops(&source, name);
    }
}

#[test]
fn custom_models_are_used_once_registered() {
    init_logger();
    let mut factory = LightingModelFactory::with_defaults();
    assert!(!factory.contains("toon"));
    factory.register("toon", |config| Box::new(PhongLightingModel::new(*config)));
    assert!(factory.contains("toon"));

    let model = factory
        .create("toon", &LightingConfig::default())
        .expect("toon is registered");
    let source = pixel_shader(&lit_options(SceneFlags::empty()), Some(model.as_ref()));
    assert_combined_loops(&source, "toon");
    assert!(factory.create("cel", &LightingConfig::default()).is_none());
}

#[test]
fn shadowed_models_sample_only_casting_lights() {
    init_logger();
    let scene_flags = SceneFlags::SHADOW_FILTER_PCF | SceneFlags::SHADOW_SPOT;
    let config = LightingConfig {
        scene_flags,
        texture_count: 2,
    };
    let factory = LightingModelFactory::with_defaults();
    for name in factory.names() {
        let model = factory.create(name, &config).expect("registered model");
        let source = pixel_shader(&lit_options(scene_flags), Some(model.as_ref()));
        assert_combined_loops(&source, name);
        assert!(source.contains("ComputeSpotShadow"), "{name}: spot shadows");
        assert!(!source.contains("ComputePointShadow"), "{name}: point shadows");
        assert!(!source.contains("ComputeDirectionalShadow"), "{name}: directional");
    }
}
