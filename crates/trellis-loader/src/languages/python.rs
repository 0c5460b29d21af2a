//! Python module loader

use std::path::Path;

use async_trait::async_trait;
use trellis_core::{Module, ModuleLanguage};

use super::{source_matches, valid_name};
use crate::adapter::LanguageLoader;
use crate::descriptor::read_descriptor;
use crate::error::Result;

pub struct PythonLoader;

#[async_trait]
impl LanguageLoader for PythonLoader {
    fn language(&self) -> ModuleLanguage {
        ModuleLanguage::Python
    }

    fn extensions(&self) -> &[&str] {
        &["py", "pyi"]
    }

    async fn load(&self, location: &Path) -> Result<Module> {
        let descriptor = read_descriptor(location).await?;
        let language = descriptor.language.unwrap_or(ModuleLanguage::Python);
        Ok(descriptor.into_module(location, language))
    }

    fn validate(&self, module: &Module) -> bool {
        module.language == ModuleLanguage::Python
            && valid_name(&module.name)
            && source_matches(module, self.extensions())
    }
}
