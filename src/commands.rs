//! CLI command implementations

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use anyhow::Context;
use trellis_core::CoordinationConfig;
use trellis_policy::PolicyEngine;
use trellis_registry::Registry;

pub async fn order(root: PathBuf, config_path: PathBuf, group: String) -> anyhow::Result<()> {
    let registry = build_registry(&root, &config_path).await?;

    let members: Vec<String> = registry
        .config()
        .group(&group)
        .with_context(|| format!("group '{group}' is not configured"))?
        .to_vec();

    let graph = registry.dependency_graph().await;
    let order = graph.resolve_load_order(&members)?;

    println!("Load order for group '{group}':");
    for (index, name) in order.iter().enumerate() {
        println!("  {:>3}. {}", index + 1, name);
    }
    for member in &members {
        if !graph.contains(member) {
            println!("  (not registered: {member})");
        }
    }
    Ok(())
}

pub async fn scan(root: PathBuf, config_path: PathBuf) -> anyhow::Result<()> {
    let registry = build_registry(&root, &config_path).await?;
    let engine = PolicyEngine::from_config(registry.config());

    let results = registry.scan_for_instantiation(&engine).await;
    if results.is_empty() {
        println!("No modules crossed their instantiation thresholds.");
        return Ok(());
    }

    for result in results {
        println!("{} -> {}", result.original, result.created.join(", "));
        for (name, lines) in &result.estimated_sizes {
            println!("    {name}: ~{lines} lines");
        }
        for warning in &result.warnings {
            println!("    warning: {warning}");
        }
    }
    Ok(())
}

pub async fn stats(root: PathBuf, config_path: PathBuf) -> anyhow::Result<()> {
    let registry = build_registry(&root, &config_path).await?;
    let stats = registry.stats().await;
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}

/// Build a registry from the deployment config and register every
/// descriptor found under the root.
async fn build_registry(root: &Path, config_path: &Path) -> anyhow::Result<Registry> {
    let config = if config_path.exists() {
        let config = CoordinationConfig::from_path(config_path)?;
        for warning in config.validate() {
            tracing::warn!("config: {warning}");
        }
        config
    } else {
        tracing::warn!(
            "no config at {}; using defaults",
            config_path.display()
        );
        CoordinationConfig::default()
    };

    let registry = Registry::with_default_adapters(config);
    register_descriptors(&registry, root).await?;
    Ok(registry)
}

/// Walk the root for `*.json` module descriptors and register each one.
/// Individual load failures are logged and skipped.
async fn register_descriptors(registry: &Registry, root: &Path) -> anyhow::Result<()> {
    let mut queue = VecDeque::new();
    queue.push_back(root.to_path_buf());
    let mut registered = 0usize;

    while let Some(dir) = queue.pop_front() {
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("cannot read directory {}: {e}", dir.display());
                continue;
            }
        };

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("cannot read entry: {e}");
                    continue;
                }
            };
            let path = entry.path();

            // Skip hidden files and directories
            if entry.file_name().to_string_lossy().starts_with('.') {
                continue;
            }

            if path.is_dir() {
                queue.push_back(path);
            } else if path.extension().and_then(|e| e.to_str()) == Some("json") {
                match trellis_loader::load_any(&path).await {
                    Ok(module) => {
                        registry.register(module).await;
                        registered += 1;
                    }
                    Err(e) => tracing::warn!("skipping {}: {e}", path.display()),
                }
            }
        }
    }

    tracing::info!("registered {registered} module descriptors");
    Ok(())
}
