//! Module registry / coordinator
//!
//! The single shared authority over the module catalogue and per-session
//! active sets. Constructed explicitly and passed by handle; there is no
//! global instance. All catalogue mutation funnels through the public
//! operations here, which serialize writes per entry while unrelated
//! entries proceed concurrently.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::{RwLock, broadcast};
use trellis_core::{
    CoordinationConfig, DependencyGraph, InstantiationResult, Module, ModuleLanguage, SessionId,
    Surface, metrics,
};
use trellis_loader::{LoaderAdapter, languages};
use trellis_policy::PolicyEngine;

use crate::error::{RegistryError, Result};
use crate::events::RegistryEvent;

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Per-session activation state.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub session_id: SessionId,
    /// Modules whose `initialize` completed successfully this session.
    pub active_modules: HashSet<String>,
    pub started_at: DateTime<Utc>,
}

impl SessionState {
    fn new(session_id: SessionId) -> Self {
        SessionState {
            session_id,
            active_modules: HashSet::new(),
            started_at: Utc::now(),
        }
    }
}

/// Outcome for one module within a group load.
#[derive(Debug, Clone, PartialEq)]
pub enum ModuleOutcome {
    Initialized,
    /// Already active for this session; skipped.
    AlreadyActive,
    NotFound,
    LoadFailed(String),
    InitFailed(String),
    TimedOut,
    /// A declared dependency names no registered module.
    DependencyUnresolved(String),
    /// A dependency is registered but did not become active this
    /// session (its own initialize failed earlier in the order).
    DependencyNotReady(String),
}

impl ModuleOutcome {
    pub fn is_active(&self) -> bool {
        matches!(self, ModuleOutcome::Initialized | ModuleOutcome::AlreadyActive)
    }
}

/// Per-module results of a `load_group_for_session` call. Partial
/// success is expected and reported, never escalated to a group failure.
#[derive(Debug)]
pub struct GroupLoadOutcome {
    pub group: String,
    pub session: SessionId,
    /// (module name, outcome) in initialization order; unknown group
    /// members come first.
    pub outcomes: Vec<(String, ModuleOutcome)>,
}

impl GroupLoadOutcome {
    pub fn outcome(&self, name: &str) -> Option<&ModuleOutcome> {
        self.outcomes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, o)| o)
    }

    /// Modules active for the session after this call.
    pub fn active(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|(_, o)| o.is_active())
            .map(|(n, _)| n.as_str())
            .collect()
    }

    pub fn failed(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|(_, o)| !o.is_active())
            .map(|(n, _)| n.as_str())
            .collect()
    }
}

/// Read-only snapshot of the registry.
#[derive(Debug, Clone, Serialize)]
pub struct RegistryStats {
    pub total_modules: usize,
    pub modules_by_language: HashMap<String, usize>,
    pub active_sessions: usize,
    pub adapter_count: usize,
    /// Load attempts recorded per adapter language.
    pub loads_by_language: HashMap<String, usize>,
    pub load_failures_by_language: HashMap<String, usize>,
    pub cycle_count: usize,
    pub missing_dependency_count: usize,
}

/// The coordinator. Owns the catalogue and all session state; the graph
/// resolver and policy engine hold no state beyond a single call.
pub struct Registry {
    config: CoordinationConfig,
    catalogue: DashMap<String, Arc<Module>>,
    sessions: DashMap<SessionId, SessionState>,
    adapters: DashMap<ModuleLanguage, Arc<LoaderAdapter>>,
    /// Derived view, rebuilt lazily after any registration change.
    graph: RwLock<Option<Arc<DependencyGraph>>>,
    events: broadcast::Sender<RegistryEvent>,
}

impl Registry {
    pub fn new(config: CoordinationConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Registry {
            config,
            catalogue: DashMap::new(),
            sessions: DashMap::new(),
            adapters: DashMap::new(),
            graph: RwLock::new(None),
            events,
        }
    }

    /// Registry with one caching adapter per supported language.
    pub fn with_default_adapters(config: CoordinationConfig) -> Self {
        let registry = Self::new(config);
        for language in [
            ModuleLanguage::Rust,
            ModuleLanguage::Python,
            ModuleLanguage::JavaScript,
            ModuleLanguage::Other,
        ] {
            let adapter = LoaderAdapter::new(
                languages::loader_for(language),
                registry.config.load_timeout(),
                registry.config.history_limit,
            );
            registry.register_adapter(Arc::new(adapter));
        }
        registry
    }

    pub fn register_adapter(&self, adapter: Arc<LoaderAdapter>) {
        self.adapters.insert(adapter.language(), adapter);
    }

    pub fn adapter_for(&self, language: ModuleLanguage) -> Option<Arc<LoaderAdapter>> {
        self.adapters
            .get(&language)
            .map(|a| a.clone())
            .or_else(|| match language {
                // TypeScript modules load through the JavaScript adapter
                // unless one was registered specifically.
                ModuleLanguage::TypeScript => self
                    .adapters
                    .get(&ModuleLanguage::JavaScript)
                    .map(|a| a.clone()),
                _ => None,
            })
    }

    /// Subscribe to the lifecycle event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.events.subscribe()
    }

    pub fn config(&self) -> &CoordinationConfig {
        &self.config
    }

    /// Insert or overwrite a module by name. Marks the dependency graph
    /// stale and publishes `module-registered`.
    pub async fn register(&self, module: Module) {
        let name = module.name.clone();
        let language = module.language;
        let dependency_count = module.dependencies.len();

        self.catalogue.insert(name.clone(), Arc::new(module));
        *self.graph.write().await = None;

        tracing::info!(module = %name, %language, "module registered");
        let _ = self.events.send(RegistryEvent::ModuleRegistered {
            name,
            language,
            dependency_count,
        });
    }

    pub fn get(&self, name: &str) -> Option<Arc<Module>> {
        self.catalogue.get(name).map(|entry| entry.clone())
    }

    /// Public surface of a module. The internal surface never leaves the
    /// registry.
    pub fn get_public_surface(&self, name: &str) -> Result<Surface> {
        self.catalogue
            .get(name)
            .map(|entry| entry.public_surface.clone())
            .ok_or_else(|| RegistryError::ModuleNotFound {
                name: name.to_string(),
            })
    }

    /// Current dependency graph, rebuilt from the catalogue when stale.
    pub async fn dependency_graph(&self) -> Arc<DependencyGraph> {
        {
            let guard = self.graph.read().await;
            if let Some(graph) = guard.as_ref() {
                return graph.clone();
            }
        }

        let mut guard = self.graph.write().await;
        if let Some(graph) = guard.as_ref() {
            return graph.clone();
        }
        let pairs: Vec<(String, Vec<String>)> = self
            .catalogue
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().dependencies.clone()))
            .collect();
        let graph = Arc::new(DependencyGraph::build(pairs));
        tracing::debug!(?graph, "dependency graph rebuilt");
        *guard = Some(graph.clone());
        graph
    }

    /// Bring a configured group into a ready state for a session.
    ///
    /// Modules initialize strictly in resolver order; a module's hook
    /// only runs once all of its in-group dependencies are active for
    /// the session. Individual failures are reported per module and
    /// never abort the rest of the group. Calling this twice for the
    /// same session is idempotent.
    pub async fn load_group_for_session(
        &self,
        group: &str,
        session: &SessionId,
    ) -> Result<GroupLoadOutcome> {
        let members: Vec<String> = self
            .config
            .group(group)
            .ok_or_else(|| RegistryError::GroupNotFound {
                name: group.to_string(),
            })?
            .to_vec();

        let graph = self.dependency_graph().await;
        let known: Vec<String> = members
            .iter()
            .filter(|name| graph.contains(name))
            .cloned()
            .collect();
        // An unbroken cycle among the requested modules is fatal here.
        let order = graph.resolve_load_order(&known)?;

        let mut outcomes: Vec<(String, ModuleOutcome)> = members
            .iter()
            .filter(|name| !graph.contains(name.as_str()))
            .map(|name| (name.clone(), ModuleOutcome::NotFound))
            .collect();

        self.sessions
            .entry(session.clone())
            .or_insert_with(|| SessionState::new(session.clone()));

        for name in order {
            let outcome = self.activate_module(&name, session).await;
            if !outcome.is_active() {
                tracing::warn!(module = %name, %session, ?outcome, "module not activated");
            }
            outcomes.push((name, outcome));
        }

        Ok(GroupLoadOutcome {
            group: group.to_string(),
            session: session.clone(),
            outcomes,
        })
    }

    async fn activate_module(&self, name: &str, session: &SessionId) -> ModuleOutcome {
        if self.is_active(session, name) {
            return ModuleOutcome::AlreadyActive;
        }
        let Some(module) = self.get(name) else {
            return ModuleOutcome::NotFound;
        };

        // Loadable but not initializable until every dependency resolves
        // and is active for this session.
        for dep in &module.dependencies {
            if !self.catalogue.contains_key(dep) {
                return ModuleOutcome::DependencyUnresolved(dep.clone());
            }
            if !self.is_active(session, dep) {
                return ModuleOutcome::DependencyNotReady(dep.clone());
            }
        }

        // Descriptor-backed modules refresh through their language's
        // adapter cache before first use.
        if module.source.extension().and_then(|e| e.to_str()) == Some("json") {
            if let Some(adapter) = self.adapter_for(module.language) {
                if adapter.cached(&module.source).is_none() && module.source.exists() {
                    if let Err(err) = adapter.load(&module.source).await {
                        return ModuleOutcome::LoadFailed(err.to_string());
                    }
                }
            }
        }

        match tokio::time::timeout(
            self.config.init_timeout(),
            module.lifecycle.initialize(session),
        )
        .await
        {
            Ok(Ok(())) => {
                let mut state = self
                    .sessions
                    .entry(session.clone())
                    .or_insert_with(|| SessionState::new(session.clone()));
                state.active_modules.insert(name.to_string());
                tracing::debug!(module = name, %session, "module initialized");
                ModuleOutcome::Initialized
            }
            Ok(Err(err)) => ModuleOutcome::InitFailed(err.to_string()),
            Err(_) => ModuleOutcome::TimedOut,
        }
    }

    fn is_active(&self, session: &SessionId, name: &str) -> bool {
        self.sessions
            .get(session)
            .is_some_and(|state| state.active_modules.contains(name))
    }

    /// Modules currently active for a session.
    pub fn active_modules(&self, session: &SessionId) -> Vec<String> {
        self.sessions
            .get(session)
            .map(|state| {
                let mut names: Vec<String> = state.active_modules.iter().cloned().collect();
                names.sort();
                names
            })
            .unwrap_or_default()
    }

    /// Tear down every module active for the session, then discard its
    /// state. Hook failures are logged, never propagated.
    pub async fn cleanup_session(&self, session: &SessionId) -> usize {
        let Some((_, state)) = self.sessions.remove(session) else {
            return 0;
        };

        let mut cleaned = 0;
        for name in &state.active_modules {
            let Some(module) = self.get(name) else {
                continue;
            };
            match tokio::time::timeout(self.config.init_timeout(), module.lifecycle.cleanup(session))
                .await
            {
                Ok(Ok(())) => cleaned += 1,
                Ok(Err(err)) => {
                    tracing::warn!(module = %name, %session, "cleanup failed: {err}");
                }
                Err(_) => {
                    tracing::warn!(module = %name, %session, "cleanup timed out");
                }
            }
        }
        tracing::info!(%session, cleaned, "session cleaned up");
        cleaned
    }

    /// Clean up every live session.
    pub async fn shutdown(&self) {
        let sessions: Vec<SessionId> = self.sessions.iter().map(|e| e.key().clone()).collect();
        for session in sessions {
            self.cleanup_session(&session).await;
        }
    }

    /// Scan catalogue modules through the metrics extractor and policy
    /// engine; register scaffolds for anything flagged and publish the
    /// corresponding events. Dependency wiring between an original and
    /// its new instances is deliberately left to whoever authors the
    /// split.
    pub async fn scan_for_instantiation(&self, engine: &PolicyEngine) -> Vec<InstantiationResult> {
        let candidates: Vec<(String, ModuleLanguage, std::path::PathBuf)> = self
            .catalogue
            .iter()
            .map(|entry| {
                (
                    entry.key().clone(),
                    entry.value().language,
                    entry.value().source.clone(),
                )
            })
            .collect();

        let mut results = Vec::new();
        for (name, language, source) in candidates {
            let Ok(text) = tokio::fs::read_to_string(&source).await else {
                continue;
            };
            let max = self.config.policy(language).max_file_size;
            let facts = metrics::extract(&text, language, max);
            let Some(decision) = engine.evaluate(&name, &source, &facts, language) else {
                continue;
            };

            let mut result = InstantiationResult {
                original: name.clone(),
                warnings: decision.warnings.clone(),
                ..Default::default()
            };
            for request in &decision.requests {
                let scaffold_source = source.with_file_name(format!(
                    "{}.{}",
                    request.new_name,
                    trellis_policy::scaffold::extension(request.target_language)
                ));
                let scaffold =
                    Module::new(request.new_name.clone(), request.target_language, scaffold_source);
                self.register(scaffold).await;
                result.created.push(request.new_name.clone());
                result
                    .estimated_sizes
                    .insert(request.new_name.clone(), request.estimated_lines);
            }

            let _ = self.events.send(RegistryEvent::ModuleInstantiated {
                original: name.clone(),
                created: result.created.clone(),
                target_language: decision.target_language,
            });
            let _ = self.events.send(RegistryEvent::PerformanceAlert {
                module: name.clone(),
                line_count: facts.line_count,
                max_lines: max,
                priority: decision.priority,
            });

            engine.record_result(&result, decision.reason);
            results.push(result);
        }
        results
    }

    /// Read-only snapshot.
    pub async fn stats(&self) -> RegistryStats {
        let mut modules_by_language: HashMap<String, usize> = HashMap::new();
        for entry in self.catalogue.iter() {
            *modules_by_language
                .entry(entry.value().language.as_str().to_string())
                .or_insert(0) += 1;
        }
        let mut loads_by_language = HashMap::new();
        let mut load_failures_by_language = HashMap::new();
        for entry in self.adapters.iter() {
            let language = entry.key().as_str().to_string();
            loads_by_language.insert(language.clone(), entry.value().total_loads());
            load_failures_by_language.insert(language, entry.value().total_failures());
        }
        let graph = self.dependency_graph().await;

        RegistryStats {
            total_modules: self.catalogue.len(),
            modules_by_language,
            active_sessions: self.sessions.len(),
            adapter_count: self.adapters.len(),
            loads_by_language,
            load_failures_by_language,
            cycle_count: graph.cycles().len(),
            missing_dependency_count: graph.missing_dependencies().len(),
        }
    }
}
