use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};

use crate::detect::result::Detection;
use crate::frame::Frame;

use super::backend::DetectorBackend;

/// Thread-safe registry of detector backends.
///
/// Backends are wrapped in `Mutex` because `DetectorBackend::detect` takes `&mut self`.
pub struct BackendRegistry {
    backends: HashMap<String, SharedBackend>,
    default_name: Option<String>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self {
            backends: HashMap::new(),
            default_name: None,
        }
    }

    /// Register a backend. The first registered backend becomes the default.
    pub fn register<B: DetectorBackend + 'static>(&mut self, backend: B) {
        let name = backend.name().to_string();
        if self.default_name.is_none() {
            self.default_name = Some(name.clone());
        }
        self.backends.insert(name, SharedBackend::new(backend));
    }

    /// Set default backend by name.
    pub fn set_default(&mut self, name: &str) -> Result<()> {
        if !self.backends.contains_key(name) {
            return Err(anyhow!("backend '{}' not registered", name));
        }
        self.default_name = Some(name.to_string());
        Ok(())
    }

    /// Get backend by name.
    pub fn get(&self, name: &str) -> Option<SharedBackend> {
        self.backends.get(name).cloned()
    }

    /// Get default backend.
    pub fn default_backend(&self) -> Option<SharedBackend> {
        self.default_name.as_ref().and_then(|name| self.get(name))
    }

    /// List registered backends, sorted by name.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.backends.keys().cloned().collect();
        names.sort();
        names
    }

    /// Resolve a backend by name, or the default when `name` is `None`.
    pub fn resolve(&self, name: Option<&str>) -> Result<SharedBackend> {
        match name {
            Some(name) => self.get(name).ok_or_else(|| {
                anyhow!(
                    "backend '{}' not registered (available: {})",
                    name,
                    self.list().join(", ")
                )
            }),
            None => self
                .default_backend()
                .ok_or_else(|| anyhow!("no detector backends registered")),
        }
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Cloneable handle to a registered backend.
#[derive(Clone)]
pub struct SharedBackend {
    name: &'static str,
    inner: Arc<Mutex<dyn DetectorBackend>>,
}

impl SharedBackend {
    pub fn new<B: DetectorBackend + 'static>(backend: B) -> Self {
        Self {
            name: backend.name(),
            inner: Arc::new(Mutex::new(backend)),
        }
    }
}

impl DetectorBackend for SharedBackend {
    fn name(&self) -> &'static str {
        self.name
    }

    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| anyhow!("backend lock poisoned"))?;
        guard.detect(frame)
    }

    fn warm_up(&mut self) -> Result<()> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| anyhow!("backend lock poisoned"))?;
        guard.warm_up()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::ScriptedBackend;

    #[test]
    fn first_registered_backend_is_default() -> Result<()> {
        let mut registry = BackendRegistry::new();
        registry.register(ScriptedBackend::new());
        registry.register(crate::detect::ColorBlobBackend::default());

        let backend = registry.resolve(None)?;
        assert_eq!(backend.name(), "scripted");

        registry.set_default("color")?;
        assert_eq!(registry.resolve(None)?.name(), "color");
        assert_eq!(registry.list(), vec!["color", "scripted"]);
        Ok(())
    }

    #[test]
    fn unknown_backend_is_rejected() {
        let mut registry = BackendRegistry::new();
        assert!(registry.resolve(None).is_err());
        registry.register(ScriptedBackend::new());
        assert!(registry.set_default("tract").is_err());
        assert!(registry.resolve(Some("tract")).is_err());
    }
}
