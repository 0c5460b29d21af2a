//! Integration tests for Trellis
//!
//! These tests exercise the full pipeline: descriptors on disk, the
//! loader adapters, the dependency graph, and the registry together.

use std::process::Command;

use tempfile::TempDir;
use trellis_core::{CoordinationConfig, LanguagePolicy, ModuleLanguage, SessionId};
use trellis_policy::PolicyEngine;
use trellis_registry::{ModuleOutcome, Registry, RegistryEvent};

fn write_descriptor(dir: &TempDir, name: &str, deps: &[&str], ops: &[&str]) -> std::path::PathBuf {
    let path = dir.path().join(format!("{name}.json"));
    let body = serde_json::json!({
        "name": name,
        "language": "rust",
        "dependencies": deps,
        "public_operations": ops,
    });
    std::fs::write(&path, serde_json::to_string_pretty(&body).unwrap()).unwrap();
    path
}

async fn registry_from_descriptors(
    dir: &TempDir,
    mut config: CoordinationConfig,
    modules: &[(&str, &[&str])],
) -> Registry {
    config.groups.insert(
        "app".to_string(),
        modules.iter().map(|(name, _)| name.to_string()).collect(),
    );
    let registry = Registry::with_default_adapters(config);
    for (name, deps) in modules {
        let path = write_descriptor(dir, name, deps, &["run"]);
        let module = trellis_loader::load_any(&path).await.unwrap();
        registry.register(module).await;
    }
    registry
}

/// Test that the CLI can be invoked
#[tokio::test]
async fn test_cli_invocation() {
    let output = Command::new("cargo")
        .args(["run", "--", "--help"])
        .current_dir(".")
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("trellis"));
    assert!(stdout.contains("coordination"));
}

/// Descriptors on disk, loaded and registered, initialize in dependency
/// order when their group is requested.
#[tokio::test]
async fn test_group_load_follows_dependency_order() {
    let dir = TempDir::new().unwrap();
    let registry = registry_from_descriptors(
        &dir,
        CoordinationConfig::default(),
        &[("ui", &["api"]), ("api", &["auth"]), ("auth", &[])],
    )
    .await;

    let session = SessionId::new("s-order");
    let outcome = registry.load_group_for_session("app", &session).await.unwrap();

    assert_eq!(outcome.failed(), Vec::<&str>::new());
    let order: Vec<&str> = outcome
        .outcomes
        .iter()
        .map(|(name, _)| name.as_str())
        .collect();
    let pos = |name: &str| order.iter().position(|n| *n == name).unwrap();
    assert!(pos("auth") < pos("api"));
    assert!(pos("api") < pos("ui"));
    assert_eq!(registry.active_modules(&session), vec!["api", "auth", "ui"]);
}

/// Loading the same group twice for one session activates nothing new.
#[tokio::test]
async fn test_repeat_group_load_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let registry = registry_from_descriptors(
        &dir,
        CoordinationConfig::default(),
        &[("api", &["auth"]), ("auth", &[])],
    )
    .await;

    let session = SessionId::new("s-repeat");
    registry.load_group_for_session("app", &session).await.unwrap();
    let second = registry.load_group_for_session("app", &session).await.unwrap();

    for (name, outcome) in &second.outcomes {
        assert_eq!(outcome, &ModuleOutcome::AlreadyActive, "module {name}");
    }
    assert_eq!(registry.active_modules(&session), vec!["api", "auth"]);
}

/// A group member that was never registered is reported per module and
/// does not block the rest of the group.
#[tokio::test]
async fn test_missing_member_does_not_block_group() {
    let dir = TempDir::new().unwrap();
    let mut config = CoordinationConfig::default();
    config.groups.insert(
        "app".to_string(),
        vec!["auth".to_string(), "ghost".to_string()],
    );
    let registry = Registry::with_default_adapters(config);
    let path = write_descriptor(&dir, "auth", &[], &["login"]);
    registry
        .register(trellis_loader::load_any(&path).await.unwrap())
        .await;

    let session = SessionId::new("s-partial");
    let outcome = registry.load_group_for_session("app", &session).await.unwrap();

    assert_eq!(outcome.outcome("ghost"), Some(&ModuleOutcome::NotFound));
    assert_eq!(outcome.outcome("auth"), Some(&ModuleOutcome::Initialized));
    assert_eq!(registry.active_modules(&session), vec!["auth"]);
}

/// An oversized source file crosses the policy threshold, produces two
/// scaffold modules, and announces both over the event channel.
#[tokio::test]
async fn test_oversized_module_is_split_into_scaffolds() {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("payments.rs");
    let body: String = (0..310).map(|i| format!("// line {i}\n")).collect();
    std::fs::write(&source, body).unwrap();

    let mut config = CoordinationConfig::default();
    config.languages.insert(
        ModuleLanguage::Rust,
        LanguagePolicy {
            max_file_size: 300,
            preferred_domains: Vec::new(),
        },
    );
    let registry = Registry::with_default_adapters(config);
    let mut module = trellis_core::Module::new("payments", ModuleLanguage::Rust, &source);
    module.dependencies = Vec::new();
    registry.register(module).await;

    let mut events = registry.subscribe();
    let engine = PolicyEngine::from_config(registry.config());
    let results = registry.scan_for_instantiation(&engine).await;

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].original, "payments");
    assert_eq!(results[0].created, vec!["payments_v2", "payments_v3"]);
    assert!(registry.get("payments_v2").is_some());
    assert!(registry.get("payments_v3").is_some());

    let mut saw_instantiated = false;
    let mut saw_alert = false;
    while let Ok(event) = events.try_recv() {
        match event {
            RegistryEvent::ModuleInstantiated { original, .. } => {
                assert_eq!(original, "payments");
                saw_instantiated = true;
            }
            RegistryEvent::PerformanceAlert { module, line_count, .. } => {
                assert_eq!(module, "payments");
                assert_eq!(line_count, 310);
                saw_alert = true;
            }
            _ => {}
        }
    }
    assert!(saw_instantiated);
    assert!(saw_alert);

    // The same unchanged file is not flagged a second time.
    let again = registry.scan_for_instantiation(&engine).await;
    assert!(again.is_empty());
}

/// Cleaning up a session runs lifecycle teardown and frees its modules.
#[tokio::test]
async fn test_cleanup_session_releases_modules() {
    let dir = TempDir::new().unwrap();
    let registry = registry_from_descriptors(
        &dir,
        CoordinationConfig::default(),
        &[("api", &["auth"]), ("auth", &[])],
    )
    .await;

    let session = SessionId::new("s-cleanup");
    registry.load_group_for_session("app", &session).await.unwrap();
    assert_eq!(registry.cleanup_session(&session).await, 2);
    assert!(registry.active_modules(&session).is_empty());

    // A fresh load for the same session starts from scratch.
    let reload = registry.load_group_for_session("app", &session).await.unwrap();
    assert_eq!(reload.active().len(), 2);
}
