//! Trellis Core — module data model, dependency resolver, and metrics

pub mod config;
pub mod error;
pub mod graph;
pub mod metrics;
pub mod model;


pub use config::{CoordinationConfig, LanguagePolicy};
pub use error::{CoreError, HookError, Result};
pub use graph::DependencyGraph;
pub use model::{
    ComplexityClass, FileMetrics, InstantiationRequest, InstantiationResult, Lifecycle, Module,
    ModuleLanguage, NoopLifecycle, OpFn, OpFuture, SessionId, SplitPriority, SplitReason, Surface,
};
