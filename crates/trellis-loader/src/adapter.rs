//! Caching wrapper around a language loader
//!
//! One adapter instance per language. Loads are idempotent per location,
//! failures never leave a partial cache entry, and every attempt lands in
//! a bounded per-location history.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use futures_util::future::join_all;
use trellis_core::{Module, ModuleLanguage, SessionId};

use crate::error::{LoadError, Result};

/// Pluggable per-language load strategy.
///
/// The core never assumes a language runtime is embedded in-process;
/// an implementation may shell out or speak RPC behind this interface.
#[async_trait]
pub trait LanguageLoader: Send + Sync {
    fn language(&self) -> ModuleLanguage;

    /// File extensions this loader recognizes for source files.
    fn extensions(&self) -> &[&str];

    async fn load(&self, location: &Path) -> Result<Module>;

    /// Language-specific validation of a freshly loaded module.
    fn validate(&self, _module: &Module) -> bool {
        true
    }
}

/// One load attempt: when, how long, and how it ended.
#[derive(Debug, Clone)]
pub struct LoadRecord {
    pub at: DateTime<Utc>,
    pub duration_ms: u64,
    pub outcome: LoadOutcome,
}

#[derive(Debug, Clone)]
pub enum LoadOutcome {
    Success,
    Failure(String),
}

/// Caching adapter wrapping one `LanguageLoader`.
pub struct LoaderAdapter {
    loader: Arc<dyn LanguageLoader>,
    timeout: Duration,
    history_limit: usize,
    cache: DashMap<PathBuf, Arc<Module>>,
    history: DashMap<PathBuf, VecDeque<LoadRecord>>,
    errors: DashMap<PathBuf, VecDeque<LoadRecord>>,
}

impl LoaderAdapter {
    pub fn new(loader: Arc<dyn LanguageLoader>, timeout: Duration, history_limit: usize) -> Self {
        LoaderAdapter {
            loader,
            timeout,
            history_limit: history_limit.max(1),
            cache: DashMap::new(),
            history: DashMap::new(),
            errors: DashMap::new(),
        }
    }

    pub fn language(&self) -> ModuleLanguage {
        self.loader.language()
    }

    /// Load a module, returning the cached entry when the exact location
    /// was loaded before. A failed load is recorded and surfaced; it is
    /// never cached.
    pub async fn load(&self, location: &Path) -> Result<Arc<Module>> {
        let key = location.to_path_buf();
        if let Some(cached) = self.cache.get(&key) {
            return Ok(cached.clone());
        }

        let started = Instant::now();
        let result = match tokio::time::timeout(self.timeout, self.loader.load(location)).await {
            Ok(result) => result,
            Err(_) => Err(LoadError::Timeout {
                path: key.clone(),
                seconds: self.timeout.as_secs(),
            }),
        };
        let duration_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(module) => {
                if !self.loader.validate(&module) {
                    let err = LoadError::Validation {
                        name: module.name.clone(),
                        language: self.loader.language(),
                        message: "descriptor failed language validation".to_string(),
                    };
                    self.record(&key, duration_ms, Some(err.to_string()));
                    return Err(err);
                }
                let module = Arc::new(module);
                self.cache.insert(key.clone(), module.clone());
                self.record(&key, duration_ms, None);
                tracing::debug!(
                    module = %module.name,
                    language = %self.loader.language(),
                    location = %key.display(),
                    "loaded module"
                );
                Ok(module)
            }
            Err(err) => {
                self.record(&key, duration_ms, Some(err.to_string()));
                Err(err)
            }
        }
    }

    /// Load many locations: groups of at most `max_concurrent` processed
    /// sequentially, full parallelism inside a group. Only successes are
    /// aggregated; failures are logged and recorded per location.
    pub async fn load_multiple(
        &self,
        locations: &[PathBuf],
        max_concurrent: usize,
    ) -> Vec<Arc<Module>> {
        let mut loaded = Vec::new();
        for group in locations.chunks(max_concurrent.max(1)) {
            let results = join_all(group.iter().map(|location| self.load(location))).await;
            for result in results {
                match result {
                    Ok(module) => loaded.push(module),
                    Err(err) => tracing::warn!("batch load failed: {err}"),
                }
            }
        }
        loaded
    }

    /// Evict the cache entry, then load fresh.
    pub async fn reload(&self, location: &Path) -> Result<Arc<Module>> {
        self.cache.remove(location);
        self.load(location).await
    }

    /// Run the cached module's cleanup under the adapter-teardown
    /// sentinel session, then evict it. Returns whether an entry was
    /// evicted.
    pub async fn unload(&self, location: &Path) -> bool {
        match self.cache.remove(location) {
            Some((_, module)) => {
                let session = SessionId::adapter_teardown();
                if let Err(err) = module.lifecycle.cleanup(&session).await {
                    tracing::warn!(module = %module.name, "cleanup during unload failed: {err}");
                }
                true
            }
            None => false,
        }
    }

    pub fn cached(&self, location: &Path) -> Option<Arc<Module>> {
        self.cache.get(location).map(|entry| entry.clone())
    }

    pub fn cached_modules(&self) -> Vec<Arc<Module>> {
        self.cache.iter().map(|entry| entry.value().clone()).collect()
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Load history for a location, most recent last.
    pub fn history(&self, location: &Path) -> Vec<LoadRecord> {
        self.history
            .get(location)
            .map(|entries| entries.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Load attempts recorded across every location.
    pub fn total_loads(&self) -> usize {
        self.history.iter().map(|entry| entry.value().len()).sum()
    }

    /// Failed attempts recorded across every location.
    pub fn total_failures(&self) -> usize {
        self.errors.iter().map(|entry| entry.value().len()).sum()
    }

    /// Failed attempts only, most recent last.
    pub fn error_history(&self, location: &Path) -> Vec<LoadRecord> {
        self.errors
            .get(location)
            .map(|entries| entries.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn record(&self, key: &Path, duration_ms: u64, error: Option<String>) {
        let record = LoadRecord {
            at: Utc::now(),
            duration_ms,
            outcome: match &error {
                Some(message) => LoadOutcome::Failure(message.clone()),
                None => LoadOutcome::Success,
            },
        };

        push_bounded(&self.history, key, record.clone(), self.history_limit);
        if error.is_some() {
            push_bounded(&self.errors, key, record, self.history_limit);
        }
    }
}

fn push_bounded(
    map: &DashMap<PathBuf, VecDeque<LoadRecord>>,
    key: &Path,
    record: LoadRecord,
    limit: usize,
) {
    let mut entries = map.entry(key.to_path_buf()).or_default();
    entries.push_back(record);
    while entries.len() > limit {
        entries.pop_front();
    }
}
