//! Source metrics extraction
//!
//! Pure text analysis: given raw source and a language tag, produce size
//! and complexity facts. Never fails on malformed input — constructs the
//! patterns cannot recognize are simply omitted from the counts.

use std::sync::LazyLock;

use regex::Regex;

use crate::model::{ComplexityClass, FileMetrics, ModuleLanguage};

static RUST_FN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*(?:pub(?:\([^)]*\))?\s+)?(?:async\s+)?(?:unsafe\s+)?fn\s+[A-Za-z_]\w*")
        .expect("static pattern")
});
static RUST_TYPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*(?:pub(?:\([^)]*\))?\s+)?(?:struct|enum|trait|union|type)\s+[A-Za-z_]\w*")
        .expect("static pattern")
});
static RUST_DEP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*(?:pub\s+)?use\s+([A-Za-z_]\w*)").expect("static pattern")
});

static PY_FN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*(?:async\s+)?def\s+[A-Za-z_]\w*").expect("static pattern"));
static PY_TYPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*class\s+[A-Za-z_]\w*").expect("static pattern"));
static PY_DEP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*(?:from\s+([A-Za-z_][\w.]*)\s+import|import\s+([A-Za-z_][\w.]*))")
        .expect("static pattern")
});

static JS_FN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bfunction\s+[A-Za-z_$][\w$]*|\b[A-Za-z_$][\w$]*\s*=\s*(?:async\s*)?\([^)]*\)\s*=>")
        .expect("static pattern")
});
static JS_TYPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:class|interface|enum)\s+[A-Za-z_$][\w$]*").expect("static pattern")
});
static JS_DEP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"require\(\s*['"]([^'"]+)['"]\s*\)|from\s+['"]([^'"]+)['"]"#).expect("static pattern")
});

static GO_FN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^func\s").expect("static pattern"));
static GO_TYPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^type\s+[A-Za-z_]\w*").expect("static pattern"));
static GO_DEP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?m)^\s*import\s+"([^"]+)""#).expect("static pattern"));

/// Classify line count relative to the language's configured maximum:
/// High at >= 80% of the max, Medium at >= 50%, else Low.
pub fn classify(line_count: usize, max_lines: usize) -> ComplexityClass {
    if max_lines == 0 {
        return ComplexityClass::High;
    }
    let ratio = line_count as f64 / max_lines as f64;
    if ratio >= 0.8 {
        ComplexityClass::High
    } else if ratio >= 0.5 {
        ComplexityClass::Medium
    } else {
        ComplexityClass::Low
    }
}

/// Extract metrics from raw source text.
///
/// `max_lines` is the language's configured maximum size, used only for
/// the relative complexity classification.
pub fn extract(source: &str, language: ModuleLanguage, max_lines: usize) -> FileMetrics {
    let line_count = source.lines().count();

    let (function_count, type_count, extracted_dependencies) = match language {
        ModuleLanguage::Rust => (
            RUST_FN.find_iter(source).count(),
            RUST_TYPE.find_iter(source).count(),
            capture_deps(&RUST_DEP, source),
        ),
        ModuleLanguage::Python => (
            PY_FN.find_iter(source).count(),
            PY_TYPE.find_iter(source).count(),
            capture_deps(&PY_DEP, source),
        ),
        ModuleLanguage::JavaScript | ModuleLanguage::TypeScript => (
            JS_FN.find_iter(source).count(),
            JS_TYPE.find_iter(source).count(),
            capture_deps(&JS_DEP, source),
        ),
        ModuleLanguage::Go => (
            GO_FN.find_iter(source).count(),
            GO_TYPE.find_iter(source).count(),
            capture_deps(&GO_DEP, source),
        ),
        // No recognizer for this language; only size facts apply.
        ModuleLanguage::Other => (0, 0, Vec::new()),
    };

    FileMetrics {
        line_count,
        complexity: classify(line_count, max_lines),
        function_count,
        type_count,
        extracted_dependencies,
    }
}

/// Collect the first non-empty capture of each match, deduplicated in
/// first-seen order.
fn capture_deps(pattern: &Regex, source: &str) -> Vec<String> {
    let mut deps: Vec<String> = Vec::new();
    for caps in pattern.captures_iter(source) {
        let name = caps
            .iter()
            .skip(1)
            .flatten()
            .map(|m| m.as_str().to_string())
            .next();
        if let Some(name) = name {
            if !deps.contains(&name) {
                deps.push(name);
            }
        }
    }
    deps
}
