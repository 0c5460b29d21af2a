//! Loader error types

use std::path::PathBuf;

use thiserror::Error;
use trellis_core::ModuleLanguage;

/// Type alias for loader results
pub type Result<T> = std::result::Result<T, LoadError>;

/// Failures a loader adapter can surface. None of these ever leave a
/// partial entry in the adapter cache.
#[derive(Error, Debug)]
pub enum LoadError {
    /// No descriptor exists at the location
    #[error("descriptor not found: {}", path.display())]
    NotFound {
        /// Location that was probed
        path: PathBuf,
    },

    /// Descriptor could not be read
    #[error("io error reading {}: {error}", path.display())]
    Io {
        /// Location that failed to read
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        error: std::io::Error,
    },

    /// Descriptor was not valid JSON
    #[error("invalid descriptor {}: {message}", path.display())]
    Parse {
        /// Location of the malformed descriptor
        path: PathBuf,
        /// Parser message
        message: String,
    },

    /// Descriptor parsed but failed language-specific validation
    #[error("module '{name}' failed {language} validation: {message}")]
    Validation {
        /// Name declared by the descriptor
        name: String,
        /// Language whose rules rejected it
        language: ModuleLanguage,
        /// What the rules objected to
        message: String,
    },

    /// The language-specific load never completed
    #[error("load of {} timed out after {seconds}s", path.display())]
    Timeout {
        /// Location being loaded
        path: PathBuf,
        /// The timeout that elapsed
        seconds: u64,
    },
}
