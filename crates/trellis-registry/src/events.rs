//! Lifecycle event stream published by the registry

use trellis_core::{ModuleLanguage, SplitPriority};

/// Events collaborators may subscribe to. Delivered over a tokio
/// broadcast channel; slow subscribers lag, they never block the
/// registry.
#[derive(Debug, Clone)]
pub enum RegistryEvent {
    ModuleRegistered {
        name: String,
        language: ModuleLanguage,
        dependency_count: usize,
    },
    ModuleInstantiated {
        original: String,
        created: Vec<String>,
        target_language: ModuleLanguage,
    },
    PerformanceAlert {
        module: String,
        line_count: usize,
        max_lines: usize,
        priority: SplitPriority,
    },
}
