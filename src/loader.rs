//! Loading override-transform modules at runtime.
//!
//! Override files sitting next to content files supersede the default
//! transformer. Getting at their code is abstracted behind
//! [`CapabilityLoader`]: given a module path, produce the module's named
//! exports, or fail distinctly for "no module behind that path" vs. "module
//! found but failed to load".
//!
//! The shipped implementation is [`ModuleRegistry`], a compiled plugin
//! registry: hosts register a factory per override path, and every load
//! re-invokes the factory. Nothing is cached between loads, so a
//! re-registered module takes effect immediately, matching the on-disk
//! override files being editable without a restart.

use crate::transform::Transform;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoadError {
    /// The override file exists on disk but no module is loadable for it.
    #[error("no module registered for {0}")]
    NotFound(String),
    /// The module was found but failed to produce its exports.
    #[error("failed to load {path}: {message}")]
    Load { path: String, message: String },
}

/// One named export of a loaded module.
#[derive(Clone)]
pub enum Export {
    /// A callable transform.
    Transform(Arc<dyn Transform>),
    /// Any non-callable exported value, kept as its display form.
    Value(String),
}

impl std::fmt::Debug for Export {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Export::Transform(_) => f.debug_tuple("Transform").finish(),
            Export::Value(v) => f.debug_tuple("Value").field(v).finish(),
        }
    }
}

pub type ExportMap = HashMap<String, Export>;

/// Loads override modules by path.
pub trait CapabilityLoader: Send + Sync {
    /// Produce the module's exports. Implementations must load fresh on
    /// every call, never from a compiled-module cache, so edits to
    /// override files are picked up without a restart.
    fn load(&self, path: &Path) -> Result<ExportMap, LoadError>;
}

type ModuleFactory = Arc<dyn Fn() -> Result<ExportMap, String> + Send + Sync>;

/// Compiled plugin registry: override modules registered as factories.
#[derive(Default)]
pub struct ModuleRegistry {
    modules: Mutex<HashMap<PathBuf, ModuleFactory>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the module behind `path`. The factory runs anew on every
    /// load; an `Err` from it surfaces as [`LoadError::Load`].
    pub fn register<F>(&self, path: impl Into<PathBuf>, factory: F)
    where
        F: Fn() -> Result<ExportMap, String> + Send + Sync + 'static,
    {
        self.modules
            .lock()
            .unwrap()
            .insert(path.into(), Arc::new(factory));
    }

    /// Register a module exporting a single transform under `export_name`.
    pub fn register_transform(
        &self,
        path: impl Into<PathBuf>,
        export_name: impl Into<String>,
        transform: Arc<dyn Transform>,
    ) {
        let export_name = export_name.into();
        self.register(path, move || {
            Ok(HashMap::from([(
                export_name.clone(),
                Export::Transform(transform.clone()),
            )]))
        });
    }
}

impl CapabilityLoader for ModuleRegistry {
    fn load(&self, path: &Path) -> Result<ExportMap, LoadError> {
        let factory = self
            .modules
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| LoadError::NotFound(path.display().to_string()))?;
        factory().map_err(|message| LoadError::Load {
            path: path.display().to_string(),
            message,
        })
    }
}
