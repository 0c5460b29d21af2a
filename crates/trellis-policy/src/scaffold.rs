//! Skeleton generation for instantiated modules
//!
//! The engine only scaffolds: empty lifecycle hooks, empty surfaces.
//! Relocating behavior into a scaffold is a manual or tool-assisted step
//! outside the core.

use trellis_core::ModuleLanguage;

/// Generate skeletal source for a new module in the target language.
pub fn skeleton(name: &str, language: ModuleLanguage) -> String {
    match language {
        ModuleLanguage::Rust => format!(
            "//! {name} — generated scaffold\n\
             \n\
             pub async fn initialize(_session: &str) {{\n\
             }}\n\
             \n\
             pub async fn cleanup(_session: &str) {{\n\
             }}\n"
        ),
        ModuleLanguage::Python => format!(
            "\"\"\"{name} — generated scaffold\"\"\"\n\
             \n\
             \n\
             class Module:\n\
             \x20\x20\x20\x20async def initialize(self, session):\n\
             \x20\x20\x20\x20\x20\x20\x20\x20pass\n\
             \n\
             \x20\x20\x20\x20async def cleanup(self, session):\n\
             \x20\x20\x20\x20\x20\x20\x20\x20pass\n"
        ),
        ModuleLanguage::JavaScript | ModuleLanguage::TypeScript => format!(
            "// {name} — generated scaffold\n\
             \n\
             export async function initialize(session) {{\n\
             }}\n\
             \n\
             export async function cleanup(session) {{\n\
             }}\n"
        ),
        ModuleLanguage::Go => format!(
            "// {name} — generated scaffold\n\
             package {name}\n\
             \n\
             func Initialize(session string) {{\n\
             }}\n\
             \n\
             func Cleanup(session string) {{\n\
             }}\n"
        ),
        ModuleLanguage::Other => format!("# {name} — generated scaffold\n"),
    }
}

/// Source extension scaffolds use for the target language.
pub fn extension(language: ModuleLanguage) -> &'static str {
    match language {
        ModuleLanguage::Rust => "rs",
        ModuleLanguage::Python => "py",
        ModuleLanguage::JavaScript => "js",
        ModuleLanguage::TypeScript => "ts",
        ModuleLanguage::Go => "go",
        ModuleLanguage::Other => "txt",
    }
}
