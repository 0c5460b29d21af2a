//! JavaScript / TypeScript module loader

use std::path::Path;

use async_trait::async_trait;
use trellis_core::{Module, ModuleLanguage};

use super::{source_matches, valid_name};
use crate::adapter::LanguageLoader;
use crate::descriptor::read_descriptor;
use crate::error::Result;

/// Handles both JavaScript and TypeScript descriptors; the module keeps
/// whichever tag it declared.
pub struct JavaScriptLoader;

#[async_trait]
impl LanguageLoader for JavaScriptLoader {
    fn language(&self) -> ModuleLanguage {
        ModuleLanguage::JavaScript
    }

    fn extensions(&self) -> &[&str] {
        &["js", "jsx", "mjs", "cjs", "ts", "tsx"]
    }

    async fn load(&self, location: &Path) -> Result<Module> {
        let descriptor = read_descriptor(location).await?;
        let language = descriptor.language.unwrap_or(ModuleLanguage::JavaScript);
        Ok(descriptor.into_module(location, language))
    }

    fn validate(&self, module: &Module) -> bool {
        matches!(
            module.language,
            ModuleLanguage::JavaScript | ModuleLanguage::TypeScript
        ) && valid_name(&module.name)
            && source_matches(module, self.extensions())
    }
}
