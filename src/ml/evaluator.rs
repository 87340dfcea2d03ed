// ============================================================
// Layer 5 — Evaluation
// ============================================================
// One pass over a validation / test loader with the model in
// inference mode. Callers pass `model.valid()`, i.e. the network
// on the inner (non-autodiff) backend: no gradients are tracked,
// dropout is off and batch norm uses its running statistics.
//
// The two heads vote by summing their logits:
//   cout = c1 + c2,  loss = CE(cout, y),  pred = argmax(cout)

use burn::{
    data::dataloader::DataLoader,
    nn::loss::CrossEntropyLossConfig,
    prelude::*,
};

use crate::data::batcher::SignalBatch;
use crate::infra::metrics::{accuracy_percent, AverageMeter};
use crate::ml::model::DualBranchNet;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    /// percent
    pub accuracy: f64,
    /// mean of per-batch losses
    pub loss:     f64,
}

/// Number of rows whose argmax matches the label.
pub fn count_correct<B: Backend>(logits: Tensor<B, 2>, labels: Tensor<B, 1, Int>) -> usize {
    let correct: i64 = logits
        .argmax(1)
        .flatten::<1>(0, 1)
        .equal(labels)
        .int()
        .sum()
        .into_scalar()
        .elem::<i64>();
    correct as usize
}

pub fn evaluate<B: Backend>(
    model:  &DualBranchNet<B>,
    loader: &dyn DataLoader<SignalBatch<B>>,
) -> Evaluation {
    let mut loss_meter = AverageMeter::new();
    let mut correct = 0usize;
    let mut total   = 0usize;

    for batch in loader.iter() {
        let (eog, eeg) = batch.split_channels();
        let output = model.forward(eog, eeg);
        let cout   = output.combined_logits();

        let ce   = CrossEntropyLossConfig::new().init(&cout.device());
        let loss = ce.forward(cout.clone(), batch.labels.clone());
        loss_meter.record(loss.into_scalar().elem::<f64>());

        total   += batch.size();
        correct += count_correct(cout, batch.labels);
    }

    Evaluation {
        accuracy: accuracy_percent(correct, total),
        loss:     loss_meter.avg,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{
        batcher::SignalBatcher,
        dataset::SignalDataset,
        source::{SyntheticSizes, SyntheticSource},
    };
    use crate::domain::recording::{Channel, Split};
    use crate::domain::traits::SplitSource;
    use crate::ml::model::DualBranchConfig;
    use burn::{
        backend::{ndarray::NdArrayDevice, NdArray},
        data::dataloader::DataLoaderBuilder,
    };

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_count_correct() {
        let device = Default::default();
        let logits = Tensor::<TestBackend, 2>::from_floats([[0.1, 0.9], [0.8, 0.2], [0.3, 0.7]], &device);
        let labels = Tensor::<TestBackend, 1, Int>::from_ints([1, 1, 1], &device);
        assert_eq!(count_correct(logits, labels), 2);
    }

    #[test]
    fn test_evaluation_is_deterministic() {
        let device: NdArrayDevice = Default::default();
        let source = SyntheticSource::new(3, SyntheticSizes { train: 0, valid: 6, test: 0 }, 5);
        let parts  = source.load("synthetic", Split::Valid, Channel::All, 1).unwrap();
        let dataset = SignalDataset::from_parts(parts).unwrap();
        let loader = DataLoaderBuilder::new(SignalBatcher::<TestBackend>::new(device.clone()))
            .batch_size(4)
            .build(dataset);

        let model: DualBranchNet<TestBackend> = DualBranchConfig::new().init(&device);
        let first  = evaluate(&model, loader.as_ref());
        let second = evaluate(&model, loader.as_ref());

        assert_eq!(first, second);
        assert!(first.accuracy >= 0.0 && first.accuracy <= 100.0);
        assert!(first.loss.is_finite());
    }

    #[test]
    fn test_empty_split_scores_zero() {
        let device: NdArrayDevice = Default::default();
        let dataset = SignalDataset::from_parts(Default::default()).unwrap();
        let loader = DataLoaderBuilder::new(SignalBatcher::<TestBackend>::new(device.clone()))
            .batch_size(4)
            .build(dataset);

        let model: DualBranchNet<TestBackend> = DualBranchConfig::new().init(&device);
        let eval = evaluate(&model, loader.as_ref());
        assert_eq!(eval.accuracy, 0.0);
        assert_eq!(eval.loss, 0.0);
    }
}
