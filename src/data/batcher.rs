// ============================================================
// Layer 4 — Signal Batcher
// ============================================================
// Implements Burn's Batcher trait to stack a Vec<SignalItem>
// into one [batch, channels, samples] float tensor plus a
// [batch] integer label tensor.
//
//   Input:  N items, each C channels × L samples
//   Output: signals [N, C, L], labels [N]
//
// All windows of a batch must share C and L; a ragged batch is
// a data error and aborts the run.
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::domain::recording::{SignalItem, EEG_CHANNEL, EOG_CHANNEL};

#[derive(Debug, Clone)]
pub struct SignalBatch<B: Backend> {
    /// [batch_size, channels, samples]
    pub signals: Tensor<B, 3>,

    /// [batch_size] sleep stage indices
    pub labels: Tensor<B, 1, Int>,
}

impl<B: Backend> SignalBatch<B> {
    pub fn size(&self) -> usize {
        self.labels.dims()[0]
    }

    /// Split the stacked signal into the two single-channel
    /// network inputs, returned as (eog, eeg), each [N, 1, L].
    pub fn split_channels(&self) -> (Tensor<B, 3>, Tensor<B, 3>) {
        let [n, _, len] = self.signals.dims();
        let eeg = self.signals.clone()
            .slice([0..n, EEG_CHANNEL..EEG_CHANNEL + 1, 0..len]);
        let eog = self.signals.clone()
            .slice([0..n, EOG_CHANNEL..EOG_CHANNEL + 1, 0..len]);
        (eog, eeg)
    }
}

/// Holds the target device so tensors are created on the
/// configured GPU / CPU.
#[derive(Clone, Debug)]
pub struct SignalBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> SignalBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<SignalItem, SignalBatch<B>> for SignalBatcher<B> {
    fn batch(&self, items: Vec<SignalItem>) -> SignalBatch<B> {
        let batch_size = items.len();
        let channels   = items[0].num_channels();
        let len        = items[0].len();

        // ── Flatten [N][C][L] into one contiguous Vec ─────────────────────────
        let mut flat: Vec<f32> = Vec::with_capacity(batch_size * channels * len);
        for item in &items {
            assert!(
                item.num_channels() == channels && item.len() == len,
                "ragged batch: expected {}x{} window, got {}x{}",
                channels, len, item.num_channels(), item.len(),
            );
            for ch in &item.signal {
                assert_eq!(ch.len(), len, "channels of one window differ in length");
                flat.extend_from_slice(ch);
            }
        }

        let labels: Vec<i32> = items.iter().map(|s| s.label as i32).collect();

        let signals = Tensor::<B, 1>::from_floats(flat.as_slice(), &self.device)
            .reshape([batch_size, channels, len]);
        let labels = Tensor::<B, 1, Int>::from_ints(labels.as_slice(), &self.device);

        SignalBatch { signals, labels }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    fn item(eeg: f32, eog: f32, label: usize) -> SignalItem {
        SignalItem::new(vec![vec![eeg; 6], vec![eog; 6]], label)
    }

    #[test]
    fn test_batch_shapes() {
        let batcher = SignalBatcher::<TestBackend>::new(Default::default());
        let batch = batcher.batch(vec![item(0.0, 1.0, 2), item(0.5, 1.5, 4), item(0.0, 0.0, 0)]);
        assert_eq!(batch.signals.dims(), [3, 2, 6]);
        assert_eq!(batch.labels.dims(), [3]);
        assert_eq!(batch.size(), 3);

        let labels: Vec<i64> = batch.labels.into_data().iter::<i64>().collect();
        assert_eq!(labels, vec![2, 4, 0]);
    }

    #[test]
    fn test_split_channels_convention() {
        let batcher = SignalBatcher::<TestBackend>::new(Default::default());
        let batch = batcher.batch(vec![item(3.0, 7.0, 1), item(3.0, 7.0, 1)]);
        let (eog, eeg) = batch.split_channels();
        assert_eq!(eog.dims(), [2, 1, 6]);
        assert_eq!(eeg.dims(), [2, 1, 6]);

        let eeg_mean: f32 = eeg.mean().into_scalar().elem();
        let eog_mean: f32 = eog.mean().into_scalar().elem();
        assert_eq!(eeg_mean, 3.0);
        assert_eq!(eog_mean, 7.0);
    }

    #[test]
    #[should_panic(expected = "ragged batch")]
    fn test_ragged_batch_panics() {
        let batcher = SignalBatcher::<TestBackend>::new(Default::default());
        let short = SignalItem::new(vec![vec![0.0; 3], vec![0.0; 3]], 0);
        batcher.batch(vec![item(0.0, 0.0, 0), short]);
    }
}
