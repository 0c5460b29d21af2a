//! On-disk module descriptors
//!
//! A descriptor is a small JSON file declaring a unit's name, language,
//! dependencies, and surface operation names. Surface callables produced
//! here are in-process stubs; a real deployment binds them to the
//! language's own runtime behind the same `LanguageLoader` interface.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use trellis_core::{Module, ModuleLanguage, OpFn, Surface};

use crate::error::{LoadError, Result};

/// JSON shape of a module descriptor file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleDescriptor {
    pub name: String,
    #[serde(default)]
    pub language: Option<ModuleLanguage>,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub public_operations: Vec<String>,
    #[serde(default)]
    pub internal_operations: Vec<String>,
    /// Source file the unit's implementation lives in, relative to the
    /// descriptor unless absolute.
    #[serde(default)]
    pub source_file: Option<PathBuf>,
}

impl ModuleDescriptor {
    /// Resolve the descriptor's source file against its own location.
    /// Falls back to the descriptor path itself when none is declared.
    pub fn resolve_source(&self, location: &Path) -> PathBuf {
        match &self.source_file {
            Some(file) if file.is_absolute() => file.clone(),
            Some(file) => location
                .parent()
                .map(|dir| dir.join(file))
                .unwrap_or_else(|| file.clone()),
            None => location.to_path_buf(),
        }
    }

    /// Build a `Module` from this descriptor, binding each declared
    /// operation to a logging stub.
    pub fn into_module(self, location: &Path, language: ModuleLanguage) -> Module {
        let source = self.resolve_source(location);

        let mut public_surface = Surface::new();
        for op in &self.public_operations {
            public_surface.insert(op.clone(), stub_op(&self.name, op));
        }
        let mut internal_surface = Surface::new();
        for op in &self.internal_operations {
            internal_surface.insert(op.clone(), stub_op(&self.name, op));
        }

        let mut module = Module::new(self.name, language, source);
        module.dependencies = self.dependencies;
        module.public_surface = public_surface;
        module.internal_surface = internal_surface;
        module
    }
}

/// Locate and parse a descriptor. Directories are probed for a
/// `module.json` inside them.
pub async fn read_descriptor(location: &Path) -> Result<ModuleDescriptor> {
    let path = if location.is_dir() {
        location.join("module.json")
    } else {
        location.to_path_buf()
    };
    if !path.exists() {
        return Err(LoadError::NotFound { path });
    }

    let raw = tokio::fs::read_to_string(&path)
        .await
        .map_err(|error| LoadError::Io {
            path: path.clone(),
            error,
        })?;
    serde_json::from_str(&raw).map_err(|e| LoadError::Parse {
        path,
        message: e.to_string(),
    })
}

fn stub_op(module: &str, op: &str) -> OpFn {
    let module = module.to_string();
    let op = op.to_string();
    Arc::new(move |_args| {
        let module = module.clone();
        let op = op.clone();
        Box::pin(async move {
            tracing::debug!(%module, %op, "invoked unbound surface operation");
            Ok(Value::Null)
        })
    })
}
