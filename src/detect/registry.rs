use std::collections::HashMap;

use anyhow::{anyhow, Result};

use super::backend::Detector;
use super::backends::{MotionDetector, StubDetector};
use crate::geometry::Size;

/// Builds a detector for a given model input size.
pub type BackendFactory = fn(Size) -> Box<dyn Detector>;

/// Named detector constructors.
///
/// The registry hands out freshly built, exclusively owned detectors; it
/// never holds a live instance itself.
pub struct BackendRegistry {
    factories: HashMap<String, BackendFactory>,
    default_name: Option<String>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
            default_name: None,
        }
    }

    /// Registry with the built-in backends; "motion" is the default.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register("motion", |input| Box::new(MotionDetector::new(input)));
        registry.register("stub", |input| Box::new(StubDetector::new(input)));
        registry
    }

    /// Register a factory. The first registered backend becomes the default.
    pub fn register(&mut self, name: &str, factory: BackendFactory) {
        if self.default_name.is_none() {
            self.default_name = Some(name.to_string());
        }
        self.factories.insert(name.to_string(), factory);
    }

    /// Set default backend by name.
    pub fn set_default(&mut self, name: &str) -> Result<()> {
        if !self.factories.contains_key(name) {
            return Err(anyhow!("backend '{}' not registered", name));
        }
        self.default_name = Some(name.to_string());
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered backend names, sorted.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }

    /// Build the named backend.
    pub fn create(&self, name: &str, input: Size) -> Result<Box<dyn Detector>> {
        let factory = self.factories.get(name).ok_or_else(|| {
            anyhow!(
                "unknown detector backend '{}' (available: {})",
                name,
                self.list().join(", ")
            )
        })?;
        Ok(factory(input))
    }

    /// Build the default backend.
    pub fn create_default(&self, input: Size) -> Result<Box<dyn Detector>> {
        let name = self
            .default_name
            .as_deref()
            .ok_or_else(|| anyhow!("no detector backend registered"))?;
        self.create(name, input)
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}
