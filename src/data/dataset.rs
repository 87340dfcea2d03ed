// ============================================================
// Layer 4 — Signal Dataset
// ============================================================
// Wraps the parallel (signals, labels) vectors of one split in
// Burn's Dataset trait so the DataLoader can call .get(index)
// and .len() on it.
//
// The two vectors must have the same length; this is checked
// once in from_parts so .get() can never pair a window with the
// wrong label.

use anyhow::{bail, Result};
use burn::data::dataset::Dataset;

use crate::domain::recording::SignalItem;
use crate::domain::traits::{SignalTransform, SplitParts};

pub struct SignalDataset {
    signals:   Vec<Vec<Vec<f32>>>,
    labels:    Vec<usize>,
    transform: Option<Box<dyn SignalTransform>>,
}

impl SignalDataset {
    /// Build a dataset from parallel signal / label vectors.
    /// Fails if the two vectors disagree in length.
    pub fn from_parts(parts: SplitParts) -> Result<Self> {
        let SplitParts { signals, labels } = parts;
        if signals.len() != labels.len() {
            bail!(
                "dataset has {} signals but {} labels",
                signals.len(),
                labels.len()
            );
        }
        Ok(Self { signals, labels, transform: None })
    }

    /// Apply `transform` to every window returned by `get`.
    pub fn with_transform(mut self, transform: Box<dyn SignalTransform>) -> Self {
        self.transform = Some(transform);
        self
    }

    pub fn has_transform(&self) -> bool {
        self.transform.is_some()
    }
}

impl Dataset<SignalItem> for SignalDataset {
    fn get(&self, index: usize) -> Option<SignalItem> {
        let signal = self.signals.get(index)?.clone();
        let label  = *self.labels.get(index)?;
        let signal = match &self.transform {
            Some(t) => t.apply(signal),
            None    => signal,
        };
        Some(SignalItem::new(signal, label))
    }

    fn len(&self) -> usize {
        self.labels.len()
    }
}
