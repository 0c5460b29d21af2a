//! Error taxonomy for the coordination core

use std::path::PathBuf;

use thiserror::Error;

/// Type alias for core results
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors produced by the catalogue, resolver, and configuration layers.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Requested module name is unknown to the registry
    #[error("module not found: {name}")]
    ModuleNotFound {
        /// The unknown module name
        name: String,
    },

    /// Requested group name has no configuration entry
    #[error("group not found: {name}")]
    GroupNotFound {
        /// The unknown group name
        name: String,
    },

    /// A load-order request involved an unbroken dependency cycle
    #[error("dependency cycle prevents load ordering: {}", unplaced.join(" -> "))]
    CycleDetected {
        /// Modules that could not be placed in the ordering
        unplaced: Vec<String>,
    },

    /// Deployment configuration could not be read or parsed
    #[error("config error in {}: {message}", path.display())]
    Config {
        /// Path to the offending config file
        path: PathBuf,
        /// What went wrong
        message: String,
    },
}

/// Failure raised by a lifecycle hook or surface operation.
#[derive(Error, Debug, Clone)]
#[error("hook failed: {0}")]
pub struct HookError(pub String);
