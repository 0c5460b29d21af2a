//! Unit tests for trellis-policy

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use trellis_core::{
    ComplexityClass, FileMetrics, InstantiationResult, LanguagePolicy, ModuleLanguage,
    SplitPriority, SplitReason, metrics,
};

use crate::engine::{FileState, PolicyEngine};

fn engine_with(max: usize, domains: &[(ModuleLanguage, &[&str])]) -> PolicyEngine {
    let mut policies = HashMap::new();
    policies.insert(
        ModuleLanguage::Rust,
        LanguagePolicy {
            max_file_size: max,
            preferred_domains: Vec::new(),
        },
    );
    for (language, keywords) in domains {
        policies.insert(
            *language,
            LanguagePolicy {
                max_file_size: max,
                preferred_domains: keywords.iter().map(|k| k.to_string()).collect(),
            },
        );
    }
    PolicyEngine::new(policies)
}

fn facts(line_count: usize, max: usize, function_count: usize, type_count: usize) -> FileMetrics {
    FileMetrics {
        line_count,
        complexity: metrics::classify(line_count, max),
        function_count,
        type_count,
        extracted_dependencies: Vec::new(),
    }
}

fn source(name: &str) -> PathBuf {
    PathBuf::from(format!("src/{name}.rs"))
}

#[test]
fn oversized_file_is_critical_and_doubly_split() {
    let engine = engine_with(300, &[]);
    let decision = engine
        .evaluate(
            "bigFile",
            &source("bigFile"),
            &facts(310, 300, 4, 1),
            ModuleLanguage::Rust,
        )
        .expect("310 lines against a 300 max must flag");

    assert_eq!(decision.reason, SplitReason::SizeLimit);
    assert_eq!(decision.priority, SplitPriority::Critical);
    assert_eq!(decision.requests.len(), 2);
    assert_eq!(decision.requests[0].new_name, "bigFile_v2");
    assert_eq!(decision.requests[1].new_name, "bigFile_v3");
    assert!(decision.requests[0].skeleton.contains("initialize"));
    assert!(decision.requests[0].estimated_lines > 0);
}

#[test]
fn exactly_at_the_max_still_flags() {
    let engine = engine_with(300, &[]);
    let metrics = facts(300, 300, 0, 0);
    assert!(engine.should_instantiate(&metrics, ModuleLanguage::Rust));
}

#[test]
fn high_complexity_near_the_limit_flags_without_exceeding_it() {
    let engine = engine_with(300, &[]);
    // 80% of max: High complexity, above the 70% floor, below the cap.
    let decision = engine
        .evaluate(
            "dense",
            &source("dense"),
            &facts(240, 300, 3, 1),
            ModuleLanguage::Rust,
        )
        .expect("high complexity at 80% of max must flag");

    assert_eq!(decision.reason, SplitReason::Complexity);
    assert_eq!(decision.priority, SplitPriority::High);
    assert_eq!(decision.requests.len(), 1);
}

#[test]
fn function_count_flags_as_performance() {
    let engine = engine_with(300, &[]);
    let decision = engine
        .evaluate(
            "busy",
            &source("busy"),
            &facts(100, 300, 21, 0),
            ModuleLanguage::Rust,
        )
        .expect("21 functions must flag");

    assert_eq!(decision.reason, SplitReason::Performance);
    assert_eq!(decision.priority, SplitPriority::Medium);
}

#[test]
fn type_count_flags_as_maintenance() {
    let engine = engine_with(300, &[]);
    let decision = engine
        .evaluate(
            "typey",
            &source("typey"),
            &facts(100, 300, 2, 6),
            ModuleLanguage::Rust,
        )
        .expect("6 types must flag");

    assert_eq!(decision.reason, SplitReason::Maintenance);
    assert_eq!(decision.priority, SplitPriority::Low);
}

#[test]
fn under_all_thresholds_stays_stable() {
    let engine = engine_with(300, &[]);
    assert!(engine
        .evaluate(
            "tidy",
            &source("tidy"),
            &facts(100, 300, 5, 2),
            ModuleLanguage::Rust,
        )
        .is_none());
    assert_eq!(engine.state("tidy"), FileState::Stable);
}

#[test]
fn unchanged_file_is_flagged_only_once() {
    let engine = engine_with(300, &[]);
    let metrics = facts(310, 300, 4, 1);
    let path = source("bigFile");

    assert!(engine
        .evaluate("bigFile", &path, &metrics, ModuleLanguage::Rust)
        .is_some());
    // Periodic re-scan of the identical file: no request storm.
    assert!(engine
        .evaluate("bigFile", &path, &metrics, ModuleLanguage::Rust)
        .is_none());
    assert!(engine
        .evaluate("bigFile", &path, &metrics, ModuleLanguage::Rust)
        .is_none());

    // The file changed; it may be flagged again.
    let grown = facts(340, 300, 4, 1);
    assert!(engine
        .evaluate("bigFile", &path, &grown, ModuleLanguage::Rust)
        .is_some());
}

#[test]
fn affinity_keywords_steer_the_target_language() {
    let engine = engine_with(300, &[(ModuleLanguage::Python, &["ai", "data"])]);
    let decision = engine
        .evaluate(
            "ai_companion",
            &source("ai_companion"),
            &facts(310, 300, 4, 1),
            ModuleLanguage::Rust,
        )
        .unwrap();

    assert_eq!(decision.target_language, ModuleLanguage::Python);
    assert!(decision.warnings.is_empty());
}

#[test]
fn source_path_keywords_also_steer_the_target_language() {
    let engine = engine_with(300, &[(ModuleLanguage::Python, &["ai", "data"])]);
    // Nothing in the name matches; the directory does.
    let decision = engine
        .evaluate(
            "helper",
            Path::new("src/ai/helper.rs"),
            &facts(310, 300, 4, 1),
            ModuleLanguage::Rust,
        )
        .unwrap();

    assert_eq!(decision.target_language, ModuleLanguage::Python);
    assert!(decision.warnings.is_empty());
}

#[test]
fn no_affinity_match_falls_back_to_the_current_language() {
    let engine = engine_with(300, &[(ModuleLanguage::Python, &["ai", "data"])]);
    let decision = engine
        .evaluate(
            "renderer",
            &source("renderer"),
            &facts(310, 300, 4, 1),
            ModuleLanguage::Rust,
        )
        .unwrap();

    assert_eq!(decision.target_language, ModuleLanguage::Rust);
    assert_eq!(decision.warnings.len(), 1);
}

#[test]
fn recording_a_result_transitions_to_instantiated() {
    let engine = engine_with(300, &[]);
    let decision = engine
        .evaluate(
            "bigFile",
            &source("bigFile"),
            &facts(310, 300, 4, 1),
            ModuleLanguage::Rust,
        )
        .unwrap();
    assert_eq!(engine.state("bigFile"), FileState::Flagged);

    let result = InstantiationResult {
        original: "bigFile".to_string(),
        created: decision.requests.iter().map(|r| r.new_name.clone()).collect(),
        ..Default::default()
    };
    engine.record_result(&result, decision.reason);

    assert_eq!(engine.state("bigFile"), FileState::Instantiated);
    assert_eq!(engine.history("bigFile").len(), 1);
    assert_eq!(engine.history("bigFile")[0].created.len(), 2);
}

#[test]
fn version_suffixes_continue_after_previous_splits() {
    let engine = engine_with(300, &[]);
    let path = source("bigFile");
    let first = engine
        .evaluate("bigFile", &path, &facts(310, 300, 4, 1), ModuleLanguage::Rust)
        .unwrap();
    let result = InstantiationResult {
        original: "bigFile".to_string(),
        created: first.requests.iter().map(|r| r.new_name.clone()).collect(),
        ..Default::default()
    };
    engine.record_result(&result, first.reason);

    // Still oversized after the split was applied, at a new size.
    let second = engine
        .evaluate("bigFile", &path, &facts(320, 300, 4, 1), ModuleLanguage::Rust)
        .unwrap();
    assert_eq!(second.requests[0].new_name, "bigFile_v4");
    assert_eq!(second.requests[1].new_name, "bigFile_v5");
}

#[test]
fn unrecorded_proposals_never_reuse_a_suffix() {
    let engine = engine_with(300, &[]);
    let path = source("bigFile");
    let first = engine
        .evaluate("bigFile", &path, &facts(310, 300, 4, 1), ModuleLanguage::Rust)
        .unwrap();
    assert_eq!(first.requests[0].new_name, "bigFile_v2");
    assert_eq!(first.requests[1].new_name, "bigFile_v3");

    // The file grew before the first proposal was ever applied; the new
    // proposal must not collide with the outstanding names.
    let second = engine
        .evaluate("bigFile", &path, &facts(340, 300, 4, 1), ModuleLanguage::Rust)
        .unwrap();
    assert_eq!(second.requests[0].new_name, "bigFile_v4");
    assert_eq!(second.requests[1].new_name, "bigFile_v5");
}

#[test]
fn complexity_class_feeds_from_the_shared_extractor() {
    // Wire check: the extractor's relative classification drives the
    // complexity path end to end.
    let metrics = facts(240, 300, 0, 0);
    assert_eq!(metrics.complexity, ComplexityClass::High);
}
