//! Trellis Registry — the module coordination authority

pub mod error;
pub mod events;
pub mod registry;


pub use error::{RegistryError, Result};
pub use events::RegistryEvent;
pub use registry::{GroupLoadOutcome, ModuleOutcome, Registry, RegistryStats, SessionState};
