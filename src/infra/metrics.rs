// ============================================================
// Layer 6 — Metrics
// ============================================================
// AverageMeter — running mean of a scalar over a batch stream.
//                Reset at the start of each epoch, updated once
//                per batch, read when the epoch line is logged.
//
// EpochMetrics — the six numbers reported for one epoch and the
//                log line built from them:
//
//   Epoch: [ 3], total_loss: 1.2345,train-acc:[61.2500] || valid acc:[58.0000], loss 1.3021 || test acc:[57.5000], loss 1.3110

use serde::{Deserialize, Serialize};

/// Computes and stores the average and current value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AverageMeter {
    pub val:   f64,
    pub sum:   f64,
    pub count: f64,
    pub avg:   f64,
}

impl AverageMeter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Record `value` observed `weight` times. Callers pass a
    /// positive weight; the average is undefined otherwise.
    pub fn update(&mut self, value: f64, weight: f64) {
        self.val    = value;
        self.sum   += value * weight;
        self.count += weight;
        self.avg    = self.sum / self.count;
    }

    /// `update(value, 1.0)`
    pub fn record(&mut self, value: f64) {
        self.update(value, 1.0);
    }
}

/// One row of metrics for a single epoch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochMetrics {
    pub epoch:      usize,
    pub train_loss: f64,
    /// percent
    pub train_acc:  f64,
    pub valid_acc:  f64,
    pub valid_loss: f64,
    pub test_acc:   f64,
    pub test_loss:  f64,
}

impl EpochMetrics {
    pub fn info_line(&self) -> String {
        format!(
            "Epoch: [{:2}], total_loss: {:.4},train-acc:[{:.4}] || valid acc:[{:.4}], loss {:.4} || test acc:[{:.4}], loss {:.4}",
            self.epoch,
            self.train_loss,
            self.train_acc,
            self.valid_acc,
            self.valid_loss,
            self.test_acc,
            self.test_loss,
        )
    }
}

/// 100 · correct / total, 0 for an empty split.
pub fn accuracy_percent(correct: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    100.0 * correct as f64 / total as f64
}
