// ============================================================
// Layer 4 — Split Sources
// ============================================================
// Concrete SplitSource implementations.
//
//   JsonSplitSource  — reads already-prepared windows from
//                      {root}/{dataset}/{fold}/{split}.json
//                      Any dataset-specific preprocessing (EDF
//                      parsing, filtering, epoching, scoring) is
//                      done upstream; this file only carries the
//                      result.
//
//   SyntheticSource  — seeded random windows whose dominant
//                      frequency depends on the label. Used for
//                      `--dataset synthetic` smoke runs and tests.
//
// JSON document layout:
//   { "signals": [[[f32; L]; C]; N], "labels": [usize; N] }

use anyhow::{Context, Result};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};

use crate::domain::recording::{Channel, Split, EEG_CHANNEL, EOG_CHANNEL, WINDOW_LEN};
use crate::domain::traits::{SplitParts, SplitSource};

/// Dataset name that selects the synthetic source.
pub const SYNTHETIC_DATASET: &str = "synthetic";

#[derive(Debug, Serialize, Deserialize)]
struct SplitFile {
    signals: Vec<Vec<Vec<f32>>>,
    labels:  Vec<usize>,
}

pub struct JsonSplitSource {
    root: PathBuf,
}

impl JsonSplitSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn split_path(&self, dataset: &str, split: Split, fold: usize) -> PathBuf {
        self.root
            .join(dataset)
            .join(fold.to_string())
            .join(format!("{split}.json"))
    }
}

impl SplitSource for JsonSplitSource {
    fn load(&self, dataset: &str, split: Split, channel: Channel, fold: usize) -> Result<SplitParts> {
        let path = self.split_path(dataset, split, fold);
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read split file '{}'", path.display()))?;
        let file: SplitFile = serde_json::from_str(&json)
            .with_context(|| format!("Malformed split file '{}'", path.display()))?;

        tracing::debug!("Loaded {} windows from '{}'", file.labels.len(), path.display());

        let signals = file
            .signals
            .into_iter()
            .map(|s| select_channel(s, channel))
            .collect();
        Ok(SplitParts { signals, labels: file.labels })
    }
}

fn select_channel(signal: Vec<Vec<f32>>, channel: Channel) -> Vec<Vec<f32>> {
    let keep = match channel {
        Channel::All => return signal,
        Channel::Eeg => EEG_CHANNEL,
        Channel::Eog => EOG_CHANNEL,
    };
    signal.into_iter().nth(keep).into_iter().collect()
}

/// Number of windows per split produced by SyntheticSource.
#[derive(Debug, Clone, Copy)]
pub struct SyntheticSizes {
    pub train: usize,
    pub valid: usize,
    pub test:  usize,
}

impl Default for SyntheticSizes {
    fn default() -> Self {
        Self { train: 64, valid: 16, test: 16 }
    }
}

pub struct SyntheticSource {
    seed:        u64,
    sizes:       SyntheticSizes,
    num_classes: usize,
    window_len:  usize,
}

impl SyntheticSource {
    pub fn new(seed: u64, sizes: SyntheticSizes, num_classes: usize) -> Self {
        Self { seed, sizes, num_classes, window_len: WINDOW_LEN }
    }

    pub fn with_window_len(mut self, window_len: usize) -> Self {
        self.window_len = window_len;
        self
    }

    fn split_seed(&self, split: Split, fold: usize) -> u64 {
        let split_idx = Split::ALL.iter().position(|s| *s == split).unwrap_or(0) as u64;
        self.seed
            .wrapping_mul(1_000_003)
            .wrapping_add(fold as u64 * 31 + split_idx)
    }
}

impl SplitSource for SyntheticSource {
    fn load(&self, _dataset: &str, split: Split, channel: Channel, fold: usize) -> Result<SplitParts> {
        let count = match split {
            Split::Train => self.sizes.train,
            Split::Valid => self.sizes.valid,
            Split::Test  => self.sizes.test,
        };
        let mut rng = StdRng::seed_from_u64(self.split_seed(split, fold));
        let classes = self.num_classes.max(1);

        let mut signals = Vec::with_capacity(count);
        let mut labels  = Vec::with_capacity(count);
        for i in 0..count {
            let label = i % classes;
            // Label-dependent dominant frequency, per-channel phase and noise.
            let freq = (label + 1) as f32 * 0.01;
            let signal: Vec<Vec<f32>> = (0..2)
                .map(|ch| {
                    let phase = ch as f32 * 0.5 + rng.gen_range(0.0..0.1);
                    (0..self.window_len)
                        .map(|t| {
                            let x = (t as f32 * freq * std::f32::consts::TAU + phase).sin();
                            x + rng.gen_range(-0.2..0.2)
                        })
                        .collect()
                })
                .collect();
            signals.push(select_channel(signal, channel));
            labels.push(label);
        }
        Ok(SplitParts { signals, labels })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthetic_is_deterministic() {
        let src = SyntheticSource::new(7, SyntheticSizes { train: 4, valid: 2, test: 2 }, 5)
            .with_window_len(32);
        let a = src.load("synthetic", Split::Train, Channel::All, 21).unwrap();
        let b = src.load("synthetic", Split::Train, Channel::All, 21).unwrap();
        assert_eq!(a.signals, b.signals);
        assert_eq!(a.labels, vec![0, 1, 2, 3]);
        assert_eq!(a.signals[0].len(), 2);
        assert_eq!(a.signals[0][0].len(), 32);
    }

    #[test]
    fn test_synthetic_split_sizes() {
        let src = SyntheticSource::new(0, SyntheticSizes { train: 4, valid: 2, test: 3 }, 5)
            .with_window_len(8);
        assert_eq!(src.load("x", Split::Valid, Channel::All, 1).unwrap().labels.len(), 2);
        assert_eq!(src.load("x", Split::Test, Channel::All, 1).unwrap().labels.len(), 3);
    }

    #[test]
    fn test_json_source_reads_split_file() {
        let dir = tempfile::tempdir().unwrap();
        let src = JsonSplitSource::new(dir.path());
        let path = src.split_path("MASS", Split::Valid, 3);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let file = SplitFile {
            signals: vec![vec![vec![1.0, 2.0], vec![3.0, 4.0]]],
            labels:  vec![4],
        };
        fs::write(&path, serde_json::to_string(&file).unwrap()).unwrap();

        let all = src.load("MASS", Split::Valid, Channel::All, 3).unwrap();
        assert_eq!(all.signals[0].len(), 2);
        assert_eq!(all.labels, vec![4]);

        let eog = src.load("MASS", Split::Valid, Channel::Eog, 3).unwrap();
        assert_eq!(eog.signals[0], vec![vec![3.0, 4.0]]);
    }

    #[test]
    fn test_json_source_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let src = JsonSplitSource::new(dir.path());
        assert!(src.load("MASS", Split::Train, Channel::All, 1).is_err());
    }
}
