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

//! A registry of lighting models, looked up by name.

use super::{
    DisneyLightingModel, LightingConfig, LightingModel, MetallicRoughnessLightingModel,
    PhongLightingModel, SpecularGlossinessLightingModel,
};
use ahash::AHashMap;
use std::fmt;

/// Builds a lighting model for a configuration.
pub type LightingModelConstructor =
    Box<dyn Fn(&LightingConfig) -> Box<dyn LightingModel> + Send + Sync>;

/// Maps lighting model names to their constructors.
///
/// The factory is an ordinary value owned by whoever generates shaders; there
/// is no global instance.
pub struct LightingModelFactory {
    constructors: AHashMap<String, LightingModelConstructor>,
}

impl LightingModelFactory {
    /// Creates an empty factory.
    pub fn new() -> Self {
        Self {
            constructors: AHashMap::new(),
        }
    }

    /// Creates a factory holding `phong`, `pbr_mr`, `pbr_sg` and `disney`.
    pub fn with_defaults() -> Self {
        let mut factory = Self::new();
        factory.register(PhongLightingModel::NAME, |config| {
            Box::new(PhongLightingModel::new(*config))
        });
        factory.register(MetallicRoughnessLightingModel::NAME, |config| {
            Box::new(MetallicRoughnessLightingModel::new(*config))
        });
        factory.register(SpecularGlossinessLightingModel::NAME, |config| {
            Box::new(SpecularGlossinessLightingModel::new(*config))
        });
        factory.register(DisneyLightingModel::NAME, |config| {
            Box::new(DisneyLightingModel::new(*config))
        });
        factory
    }

    /// Registers `constructor` under `name`, replacing any previous one.
    pub fn register(
        &mut self,
        name: &str,
        constructor: impl Fn(&LightingConfig) -> Box<dyn LightingModel> + Send + Sync + 'static,
    ) {
        if self
            .constructors
            .insert(name.to_owned(), Box::new(constructor))
            .is_some()
        {
            log::debug!("Lighting model '{name}' replaced.");
        } else {
            log::debug!("Lighting model '{name}' registered.");
        }
    }

    /// Creates the model registered under `name`, if any.
    pub fn create(&self, name: &str, config: &LightingConfig) -> Option<Box<dyn LightingModel>> {
        let constructor = self.constructors.get(name)?;
        Some(constructor(config))
    }

    /// Returns `true` if a model is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    /// The registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.constructors.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for LightingModelFactory {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl fmt::Debug for LightingModelFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LightingModelFactory")
            .field("models", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_registered() {
        let factory = LightingModelFactory::default();
        assert_eq!(factory.names(), ["disney", "pbr_mr", "pbr_sg", "phong"]);
        let model = factory.create("pbr_sg", &LightingConfig::default());
        assert_eq!(model.map(|m| m.name().to_owned()).as_deref(), Some("pbr_sg"));
    }

    #[test]
    fn unknown_name_is_none() {
        let factory = LightingModelFactory::new();
        assert!(factory.create("phong", &LightingConfig::default()).is_none());
        assert!(!factory.contains("phong"));
    }

    #[test]
    fn registration_replaces_by_name() {
        let mut factory = LightingModelFactory::with_defaults();
        factory.register("phong", |config| Box::new(DisneyLightingModel::new(*config)));
        let model = factory.create("phong", &LightingConfig::default());
        assert_eq!(model.map(|m| m.name().to_owned()).as_deref(), Some("disney"));
        assert_eq!(factory.names().len(), 4);
    }
}
