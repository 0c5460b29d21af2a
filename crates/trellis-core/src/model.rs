//! Core data structures for the module catalogue

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::HookError;

/// Logical context (e.g. one user) for which modules are activated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        SessionId(id.into())
    }

    /// Sentinel session used when an adapter tears a module down outside
    /// any user session.
    pub fn adapter_teardown() -> Self {
        SessionId("__adapter_teardown__".to_string())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Implementation languages a loader adapter can produce modules for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleLanguage {
    Rust,
    Python,
    JavaScript,
    TypeScript,
    Go,
    Other,
}

impl ModuleLanguage {
    /// Detect language from file extension.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("rs") => ModuleLanguage::Rust,
            Some("py") | Some("pyi") => ModuleLanguage::Python,
            Some("js") | Some("jsx") | Some("mjs") | Some("cjs") => ModuleLanguage::JavaScript,
            Some("ts") | Some("tsx") => ModuleLanguage::TypeScript,
            Some("go") => ModuleLanguage::Go,
            _ => ModuleLanguage::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleLanguage::Rust => "rust",
            ModuleLanguage::Python => "python",
            ModuleLanguage::JavaScript => "javascript",
            ModuleLanguage::TypeScript => "typescript",
            ModuleLanguage::Go => "go",
            ModuleLanguage::Other => "other",
        }
    }
}

impl fmt::Display for ModuleLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Boxed future returned by a surface operation.
pub type OpFuture = Pin<Box<dyn Future<Output = Result<Value, HookError>> + Send>>;

/// An async callable exposed through a module surface.
pub type OpFn = Arc<dyn Fn(Value) -> OpFuture + Send + Sync>;

/// Named set of operations a module exposes. Public and internal surfaces
/// are separate instances; only the public one ever leaves the registry.
#[derive(Clone, Default)]
pub struct Surface {
    ops: HashMap<String, OpFn>,
}

impl Surface {
    pub fn new() -> Self {
        Surface {
            ops: HashMap::new(),
        }
    }

    pub fn insert(&mut self, name: impl Into<String>, op: OpFn) {
        self.ops.insert(name.into(), op);
    }

    pub fn get(&self, name: &str) -> Option<&OpFn> {
        self.ops.get(name)
    }

    /// Invoke a named operation.
    pub async fn call(&self, name: &str, args: Value) -> Result<Value, HookError> {
        let op = self
            .ops
            .get(name)
            .ok_or_else(|| HookError(format!("no such operation: {name}")))?;
        op(args).await
    }

    pub fn operation_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.ops.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

impl fmt::Debug for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Surface")
            .field("operations", &self.operation_names())
            .finish()
    }
}

/// Per-session lifecycle hooks. Both hooks must be idempotent per session.
#[async_trait]
pub trait Lifecycle: Send + Sync {
    async fn initialize(&self, session: &SessionId) -> Result<(), HookError>;
    async fn cleanup(&self, session: &SessionId) -> Result<(), HookError>;
}

/// Default lifecycle for modules without hooks of their own.
pub struct NoopLifecycle;

#[async_trait]
impl Lifecycle for NoopLifecycle {
    async fn initialize(&self, _session: &SessionId) -> Result<(), HookError> {
        Ok(())
    }

    async fn cleanup(&self, _session: &SessionId) -> Result<(), HookError> {
        Ok(())
    }
}

/// A named, independently loadable unit of functionality.
#[derive(Clone)]
pub struct Module {
    /// Unique identifier within the registry.
    pub name: String,
    /// Which loader adapter produced this module.
    pub language: ModuleLanguage,
    /// Names of modules that must initialize before this one.
    pub dependencies: Vec<String>,
    pub public_surface: Surface,
    pub internal_surface: Surface,
    /// Where the module's definition lives.
    pub source: PathBuf,
    pub lifecycle: Arc<dyn Lifecycle>,
}

impl Module {
    pub fn new(name: impl Into<String>, language: ModuleLanguage, source: impl Into<PathBuf>) -> Self {
        Module {
            name: name.into(),
            language,
            dependencies: Vec::new(),
            public_surface: Surface::new(),
            internal_surface: Surface::new(),
            source: source.into(),
            lifecycle: Arc::new(NoopLifecycle),
        }
    }

    pub fn with_dependencies(mut self, dependencies: Vec<String>) -> Self {
        self.dependencies = dependencies;
        self
    }

    pub fn with_lifecycle(mut self, lifecycle: Arc<dyn Lifecycle>) -> Self {
        self.lifecycle = lifecycle;
        self
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module")
            .field("name", &self.name)
            .field("language", &self.language)
            .field("dependencies", &self.dependencies)
            .field("public_surface", &self.public_surface)
            .field("source", &self.source)
            .finish()
    }
}

/// Relative size classification against the language's configured maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComplexityClass {
    Low,
    Medium,
    High,
}

/// Transient analysis output for one module's source. Produced on demand,
/// never persisted beyond the scan cycle that created it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileMetrics {
    pub line_count: usize,
    pub complexity: ComplexityClass,
    pub function_count: usize,
    pub type_count: usize,
    pub extracted_dependencies: Vec<String>,
}

/// Why a module was proposed for splitting. Variants are ordered by
/// priority; the first matching reason wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SplitReason {
    SizeLimit,
    Complexity,
    Performance,
    Maintenance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitPriority {
    Critical,
    High,
    Medium,
    Low,
}

/// Proposal to split an over-sized module into a new skeletal unit.
#[derive(Debug, Clone, Serialize)]
pub struct InstantiationRequest {
    /// Module the proposal originated from.
    pub original: String,
    /// Name of the new unit (original name plus a version suffix).
    pub new_name: String,
    pub target_language: ModuleLanguage,
    pub reason: SplitReason,
    pub priority: SplitPriority,
    /// Generated skeletal content: empty lifecycle hooks, empty surfaces.
    pub skeleton: String,
    pub estimated_lines: usize,
    pub created_at: DateTime<Utc>,
}

/// Outcome of applying a batch of instantiation requests.
#[derive(Debug, Clone, Default, Serialize)]
pub struct InstantiationResult {
    pub original: String,
    pub created: Vec<String>,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
    pub estimated_sizes: HashMap<String, usize>,
}
