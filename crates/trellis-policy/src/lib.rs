//! Trellis Policy — size/complexity thresholds and split proposals

pub mod engine;
pub mod scaffold;

#[cfg(test)]
mod tests;

pub use engine::{FileState, PolicyEngine, SplitDecision, SplitRecord};
