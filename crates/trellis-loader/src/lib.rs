//! Trellis Loader — per-language module loading behind a caching adapter

pub mod adapter;
pub mod descriptor;
pub mod error;
pub mod languages;


pub use adapter::{LanguageLoader, LoadOutcome, LoadRecord, LoaderAdapter};
pub use descriptor::{ModuleDescriptor, read_descriptor};
pub use error::{LoadError, Result};
pub use languages::{load_any, loader_for};
