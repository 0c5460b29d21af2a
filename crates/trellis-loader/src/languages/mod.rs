//! Per-language loader strategies

pub mod generic;
pub mod javascript;
pub mod python;
pub mod rust;

use std::path::Path;
use std::sync::Arc;

use trellis_core::{Module, ModuleLanguage};

use crate::adapter::LanguageLoader;
use crate::descriptor::read_descriptor;
use crate::error::Result;

/// Get the loader strategy for a language.
pub fn loader_for(language: ModuleLanguage) -> Arc<dyn LanguageLoader> {
    match language {
        ModuleLanguage::Rust => Arc::new(rust::RustLoader),
        ModuleLanguage::Python => Arc::new(python::PythonLoader),
        ModuleLanguage::JavaScript | ModuleLanguage::TypeScript => {
            Arc::new(javascript::JavaScriptLoader)
        }
        ModuleLanguage::Go | ModuleLanguage::Other => Arc::new(generic::GenericLoader),
    }
}

/// Load a descriptor whose language is declared inside the file itself,
/// delegating to that language's loader.
pub async fn load_any(location: &Path) -> Result<Module> {
    let descriptor = read_descriptor(location).await?;
    let language = descriptor
        .language
        .or_else(|| {
            descriptor
                .source_file
                .as_deref()
                .map(ModuleLanguage::from_path)
        })
        .unwrap_or(ModuleLanguage::Other);
    loader_for(language).load(location).await
}

/// Module names must be non-empty and filesystem/registry safe.
pub(crate) fn valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Source extension check, skipped for descriptor-only modules.
pub(crate) fn source_matches(module: &Module, extensions: &[&str]) -> bool {
    match module.source.extension().and_then(|e| e.to_str()) {
        // Descriptor-only module: the source is the descriptor itself.
        Some("json") | None => true,
        Some(ext) => extensions.contains(&ext),
    }
}
