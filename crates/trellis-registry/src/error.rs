//! Registry error types

use thiserror::Error;
use trellis_core::CoreError;

/// Type alias for registry results
pub type Result<T> = std::result::Result<T, RegistryError>;

/// Failures that abort an entire registry call. Per-module load and
/// initialization failures are not here; they surface in the per-module
/// outcome map instead.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// Requested group has no configuration entry; nothing to partially
    /// succeed.
    #[error("group not found: {name}")]
    GroupNotFound {
        /// The unknown group name
        name: String,
    },

    /// Requested module is not in the catalogue
    #[error("module not found: {name}")]
    ModuleNotFound {
        /// The unknown module name
        name: String,
    },

    /// Propagated resolver or config failure (cycles are fatal to an
    /// ordering request)
    #[error(transparent)]
    Core(#[from] CoreError),
}
