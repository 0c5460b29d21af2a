//! Fallback loader for languages without a dedicated strategy

use std::path::Path;

use async_trait::async_trait;
use trellis_core::{Module, ModuleLanguage};

use super::valid_name;
use crate::adapter::LanguageLoader;
use crate::descriptor::read_descriptor;
use crate::error::Result;

pub struct GenericLoader;

#[async_trait]
impl LanguageLoader for GenericLoader {
    fn language(&self) -> ModuleLanguage {
        ModuleLanguage::Other
    }

    fn extensions(&self) -> &[&str] {
        &[]
    }

    async fn load(&self, location: &Path) -> Result<Module> {
        let descriptor = read_descriptor(location).await?;
        let language = descriptor.language.unwrap_or(ModuleLanguage::Other);
        Ok(descriptor.into_module(location, language))
    }

    fn validate(&self, module: &Module) -> bool {
        valid_name(&module.name)
    }
}
