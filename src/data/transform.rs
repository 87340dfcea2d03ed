// ============================================================
// Layer 4 — Signal Transforms
// ============================================================
// Per-window transformations applied by SignalDataset::get
// when `--trans` is set.

use crate::domain::traits::SignalTransform;

const STD_EPS: f32 = 1e-8;

/// Per-channel z-score: each channel is shifted to zero mean
/// and scaled to unit variance. Flat channels only get centred.
#[derive(Debug, Clone, Copy, Default)]
pub struct Standardize;

impl SignalTransform for Standardize {
    fn apply(&self, signal: Vec<Vec<f32>>) -> Vec<Vec<f32>> {
        signal.into_iter().map(standardize_channel).collect()
    }
}

fn standardize_channel(mut ch: Vec<f32>) -> Vec<f32> {
    if ch.is_empty() {
        return ch;
    }
    let n    = ch.len() as f32;
    let mean = ch.iter().sum::<f32>() / n;
    let var  = ch.iter().map(|x| (x - mean).powi(2)).sum::<f32>() / n;
    let std  = var.sqrt();
    let scale = if std > STD_EPS { 1.0 / std } else { 1.0 };
    for x in ch.iter_mut() {
        *x = (*x - mean) * scale;
    }
    ch
}
