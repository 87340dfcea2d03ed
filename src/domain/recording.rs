// ============================================================
// Layer 3 — Recording Domain Types
// ============================================================
// One labelled 30-second window of a polysomnography recording.
//
// A window carries several channels of equal length. By
// convention the EEG trace sits at channel index 0 and the EOG
// trace at channel index 1; further channels (EMG, ...) are
// allowed but ignored by the dual-branch network.
//
//   signal[0] = EEG   (3000 samples at 100 Hz)
//   signal[1] = EOG   (3000 samples at 100 Hz)
//   label     = sleep stage index (W, N1, N2, N3, REM → 0..5)

use serde::{Deserialize, Serialize};
use std::fmt;

/// Channel index of the EEG trace inside a signal window.
pub const EEG_CHANNEL: usize = 0;

/// Channel index of the EOG trace inside a signal window.
pub const EOG_CHANNEL: usize = 1;

/// Samples per channel in one window.
pub const WINDOW_LEN: usize = 3000;

/// A single (signal, label) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalItem {
    /// channels × samples
    pub signal: Vec<Vec<f32>>,
    pub label:  usize,
}

impl SignalItem {
    pub fn new(signal: Vec<Vec<f32>>, label: usize) -> Self {
        Self { signal, label }
    }

    pub fn num_channels(&self) -> usize {
        self.signal.len()
    }

    /// Samples per channel (0 for an empty window).
    pub fn len(&self) -> usize {
        self.signal.first().map(Vec::len).unwrap_or(0)
    }
}

/// Which partition of a fold a dataset represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Split {
    Train,
    Valid,
    Test,
}

impl Split {
    pub const ALL: [Split; 3] = [Split::Train, Split::Valid, Split::Test];

    pub fn as_str(&self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Valid => "valid",
            Split::Test  => "test",
        }
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Channel selector handed to a data source.
/// The dual-branch network always consumes `All`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Channel {
    All,
    Eeg,
    Eog,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::All => f.write_str("ALL"),
            Channel::Eeg => f.write_str("EEG"),
            Channel::Eog => f.write_str("EOG"),
        }
    }
}
