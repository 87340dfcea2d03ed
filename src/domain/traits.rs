// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The two seams of the data pipeline:
//
//   SplitSource      — where the raw windows of a fold come from.
//                      Loading is dataset specific (MASS, SleepEDF,
//                      ...), so the training code only ever sees
//                      this trait.
//
//   SignalTransform  — an optional per-window transformation
//                      applied when an item is read.
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;

use crate::domain::recording::{Channel, Split};

/// Raw windows and labels for one split of one fold.
/// The two vectors are parallel; `SignalDataset::from_parts`
/// rejects them if their lengths differ.
#[derive(Debug, Clone, Default)]
pub struct SplitParts {
    pub signals: Vec<Vec<Vec<f32>>>,
    pub labels:  Vec<usize>,
}

/// Any component that can produce the windows of a split.
///
/// Implementations:
///   - JsonSplitSource  → `{root}/{dataset}/{fold}/{split}.json`
///   - SyntheticSource  → seeded random windows (smoke runs, tests)
pub trait SplitSource {
    fn load(&self, dataset: &str, split: Split, channel: Channel, fold: usize) -> Result<SplitParts>;
}

/// A transformation applied to a window before it is batched.
/// Must be shareable across data loader threads.
pub trait SignalTransform: Send + Sync {
    fn apply(&self, signal: Vec<Vec<f32>>) -> Vec<Vec<f32>>;
}
