// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from stored windows to device-ready tensor batches:
//
//   SplitSource       → raw (signals, labels) for one split of a fold
//       │
//       ▼
//   SignalDataset     → implements Burn's Dataset trait,
//       │               applies the optional transform
//       ▼
//   SignalBatcher     → stacks items into [N, C, L] batches
//       │
//       ▼
//   DataLoader        → feeds batches to the training loop
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Implements Burn's Dataset trait for signal windows
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;

/// JSON and synthetic split sources
pub mod source;

/// Per-window transformations (`--trans`)
pub mod transform;

use anyhow::Result;

use crate::domain::recording::{Channel, Split};
use crate::domain::traits::SplitSource;
use dataset::SignalDataset;
use transform::Standardize;

/// The three datasets of one fold.
pub struct FoldDatasets {
    pub train: SignalDataset,
    pub valid: SignalDataset,
    pub test:  SignalDataset,
}

/// Build train / valid / test datasets for `fold`, fresh on
/// every call.
pub fn build_fold_datasets(
    source:    &dyn SplitSource,
    dataset:   &str,
    fold:      usize,
    transform: bool,
) -> Result<FoldDatasets> {
    let build = |split: Split| -> Result<SignalDataset> {
        let parts = source.load(dataset, split, Channel::All, fold)?;
        let ds    = SignalDataset::from_parts(parts)?;
        Ok(if transform { ds.with_transform(Box::new(Standardize)) } else { ds })
    };
    Ok(FoldDatasets {
        train: build(Split::Train)?,
        valid: build(Split::Valid)?,
        test:  build(Split::Test)?,
    })
}
