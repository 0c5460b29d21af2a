//! Instantiation policy engine
//!
//! Watches per-file metrics and proposes splitting units that have grown
//! past their language's configured limits. State machine per monitored
//! module: stable -> flagged -> instantiated. The engine scaffolds new
//! units; it never migrates behavior.

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use trellis_core::{
    ComplexityClass, CoordinationConfig, FileMetrics, InstantiationRequest, InstantiationResult,
    LanguagePolicy, ModuleLanguage, SplitPriority, SplitReason,
};

use crate::scaffold;

/// Where a monitored module sits in the split lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileState {
    Stable,
    Flagged,
    Instantiated,
}

/// One applied split, kept per module.
#[derive(Debug, Clone)]
pub struct SplitRecord {
    pub at: DateTime<Utc>,
    pub reason: SplitReason,
    pub created: Vec<String>,
}

/// A flagged module's split proposal.
#[derive(Debug, Clone)]
pub struct SplitDecision {
    pub reason: SplitReason,
    pub priority: SplitPriority,
    pub target_language: ModuleLanguage,
    pub requests: Vec<InstantiationRequest>,
    /// Degradations encountered while deciding (e.g. no viable target
    /// language; kept the current one).
    pub warnings: Vec<String>,
}

/// Policy engine. Holds no module state beyond the monitoring maps; all
/// inputs arrive as `FileMetrics` produced by the metrics extractor.
pub struct PolicyEngine {
    policies: HashMap<ModuleLanguage, LanguagePolicy>,
    /// Domain keyword -> language with declared affinity for it.
    affinity: Vec<(String, ModuleLanguage)>,
    states: DashMap<String, FileState>,
    /// Module name -> line count at flag time. Guards against request
    /// storms from periodic scans of an unchanged file.
    flagged: DashMap<String, usize>,
    /// Module name -> version suffixes already handed out, recorded or
    /// not. Proposals from different flags never collide on a name.
    reserved: DashMap<String, usize>,
    history: DashMap<String, Vec<SplitRecord>>,
}

impl PolicyEngine {
    pub fn new(policies: HashMap<ModuleLanguage, LanguagePolicy>) -> Self {
        let mut affinity = Vec::new();
        let mut languages: Vec<&ModuleLanguage> = policies.keys().collect();
        languages.sort_by_key(|l| l.as_str());
        for language in languages {
            for domain in &policies[language].preferred_domains {
                affinity.push((domain.to_lowercase(), *language));
            }
        }

        PolicyEngine {
            policies,
            affinity,
            states: DashMap::new(),
            flagged: DashMap::new(),
            reserved: DashMap::new(),
            history: DashMap::new(),
        }
    }

    pub fn from_config(config: &CoordinationConfig) -> Self {
        Self::new(config.languages.clone())
    }

    /// The hard line limit for a language.
    pub fn max_lines(&self, language: ModuleLanguage) -> usize {
        self.policies
            .get(&language)
            .cloned()
            .unwrap_or_default()
            .max_file_size
    }

    /// Whether any split threshold is crossed.
    pub fn should_instantiate(&self, metrics: &FileMetrics, language: ModuleLanguage) -> bool {
        let max = self.max_lines(language);
        metrics.line_count >= max
            || (metrics.complexity == ComplexityClass::High
                && metrics.line_count as f64 >= 0.7 * max as f64)
            || metrics.function_count > 20
            || metrics.type_count > 5
    }

    /// Evaluate one module's metrics. Returns a decision when the module
    /// newly crosses a threshold; `None` while stable or while an
    /// identical request is already outstanding.
    pub fn evaluate(
        &self,
        module: &str,
        source: &Path,
        metrics: &FileMetrics,
        language: ModuleLanguage,
    ) -> Option<SplitDecision> {
        let max = self.max_lines(language);
        let over_limit = metrics.line_count >= max;
        let complexity_heavy = metrics.complexity == ComplexityClass::High
            && metrics.line_count as f64 >= 0.7 * max as f64;
        let too_many_functions = metrics.function_count > 20;
        let too_many_types = metrics.type_count > 5;

        if !(over_limit || complexity_heavy || too_many_functions || too_many_types) {
            self.states.insert(module.to_string(), FileState::Stable);
            self.flagged.remove(module);
            return None;
        }

        // Same file, unchanged, already requested: flag at most once.
        if self
            .flagged
            .get(module)
            .is_some_and(|lines| *lines == metrics.line_count)
        {
            return None;
        }

        // First matching reason wins, in fixed priority order.
        let reason = if over_limit {
            SplitReason::SizeLimit
        } else if complexity_heavy {
            SplitReason::Complexity
        } else if too_many_functions {
            SplitReason::Performance
        } else {
            SplitReason::Maintenance
        };
        let priority = if over_limit {
            SplitPriority::Critical
        } else if complexity_heavy {
            SplitPriority::High
        } else if too_many_functions {
            SplitPriority::Medium
        } else {
            SplitPriority::Low
        };

        let mut warnings = Vec::new();
        let target_language = self.select_target_language(module, source, language, &mut warnings);

        let count = if priority == SplitPriority::Critical { 2 } else { 1 };
        let recorded: usize = self
            .history
            .get(module)
            .map(|records| records.iter().map(|r| r.created.len()).sum())
            .unwrap_or(0);
        let reserved = self.reserved.get(module).map(|v| *v).unwrap_or(0);
        let existing_versions = recorded.max(reserved);
        let estimated_lines = (metrics.line_count / (count + 1)).max(1);

        let requests = (0..count)
            .map(|i| {
                // The original counts as v1.
                let new_name = format!("{module}_v{}", existing_versions + i + 2);
                InstantiationRequest {
                    original: module.to_string(),
                    skeleton: scaffold::skeleton(&new_name, target_language),
                    new_name,
                    target_language,
                    reason,
                    priority,
                    estimated_lines,
                    created_at: Utc::now(),
                }
            })
            .collect();

        self.reserved
            .insert(module.to_string(), existing_versions + count);
        self.flagged.insert(module.to_string(), metrics.line_count);
        self.states.insert(module.to_string(), FileState::Flagged);
        tracing::info!(
            module,
            ?reason,
            ?priority,
            target = %target_language,
            "module flagged for instantiation"
        );

        Some(SplitDecision {
            reason,
            priority,
            target_language,
            requests,
            warnings,
        })
    }

    /// Pick a target language by matching domain keywords against the
    /// module's name and source path. Falls back to the current language
    /// when nothing matches; a policy violation degrades, it never fails.
    fn select_target_language(
        &self,
        module: &str,
        source: &Path,
        current: ModuleLanguage,
        warnings: &mut Vec<String>,
    ) -> ModuleLanguage {
        let haystack = format!("{} {}", module, source.display()).to_lowercase();
        for (keyword, language) in &self.affinity {
            if haystack.contains(keyword.as_str()) {
                return *language;
            }
        }
        warnings.push(format!(
            "no configured language matches domain keywords for '{module}'; keeping {current}"
        ));
        tracing::debug!(module, %current, "no affinity match; keeping current language");
        current
    }

    /// Record an applied split. Transitions the module to `Instantiated`.
    pub fn record_result(&self, result: &InstantiationResult, reason: SplitReason) {
        self.history
            .entry(result.original.clone())
            .or_default()
            .push(SplitRecord {
                at: Utc::now(),
                reason,
                created: result.created.clone(),
            });
        self.states
            .insert(result.original.clone(), FileState::Instantiated);
    }

    pub fn state(&self, module: &str) -> FileState {
        self.states
            .get(module)
            .map(|s| *s)
            .unwrap_or(FileState::Stable)
    }

    pub fn history(&self, module: &str) -> Vec<SplitRecord> {
        self.history
            .get(module)
            .map(|records| records.clone())
            .unwrap_or_default()
    }
}
