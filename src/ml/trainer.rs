// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Epoch loop for one fold, using Burn's DataLoader and Adam.
//
// Per epoch:
//   1. train pass    forward (c1, c2, o1, o2) → multi-task loss
//                    → backward → Adam step
//   2. evaluation    model.valid() on the valid and test loaders
//   3. checkpoint    if valid acc ≥ best so far: delete the previous
//                    checkpoint, save `{epoch}-{test_acc:.4}.pt`
//   4. log           one info line with all six metrics
//
// Burn builds fresh gradients on every backward() call, so there
// is no explicit zero_grad step.
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use anyhow::Result;
use burn::{
    data::{dataloader::DataLoaderBuilder, dataset::Dataset},
    module::AutodiffModule,
    optim::{decay::WeightDecayConfig, AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use std::path::PathBuf;

use crate::application::train_use_case::TrainConfig;
use crate::data::{batcher::SignalBatcher, FoldDatasets};
use crate::infra::checkpoint::CheckpointManager;
use crate::infra::metrics::{accuracy_percent, AverageMeter, EpochMetrics};
use crate::ml::evaluator::{count_correct, evaluate};
use crate::ml::loss::LossBalancer;
use crate::ml::model::DualBranchNet;
use crate::ml::resume::ResumePoint;

/// Everything the optimiser updates: the network plus the
/// learnable loss weights used by `--loss_weight auto`.
#[derive(Module, Debug)]
pub struct Learner<B: Backend> {
    pub net:      DualBranchNet<B>,
    pub balancer: LossBalancer<B>,
}

/// Best-by-validation checkpoint of a fold. An epoch whose
/// validation accuracy is at least the best so far replaces the
/// retained file, so ties move to the later epoch.
#[derive(Debug, Clone, Default)]
pub struct BestCheckpoint {
    pub valid_acc: f64,
    pub epoch:     Option<usize>,
    pub path:      Option<PathBuf>,
}

impl BestCheckpoint {
    /// Start from a restored checkpoint (if any); it is deleted by
    /// the first improvement.
    pub fn resumed_from(path: Option<PathBuf>) -> Self {
        Self { path, ..Self::default() }
    }

    /// Save `net` if `valid_acc` does not fall below the best so far.
    /// Returns whether the retained checkpoint changed.
    pub fn offer<B: Backend>(
        &mut self,
        ckpt:      &CheckpointManager,
        net:       &DualBranchNet<B>,
        epoch:     usize,
        valid_acc: f64,
        test_acc:  f64,
    ) -> Result<bool> {
        if valid_acc < self.valid_acc {
            return Ok(false);
        }
        if let Some(previous) = self.path.take() {
            ckpt.remove(&previous)?;
        }
        self.valid_acc = valid_acc;
        self.epoch     = Some(epoch);
        self.path      = Some(ckpt.save(net, epoch, test_acc)?);
        Ok(true)
    }
}

/// Outcome of one fold.
#[derive(Debug, Clone, Default)]
pub struct TrainingSummary {
    pub history:        Vec<EpochMetrics>,
    pub best_epoch:     Option<usize>,
    pub best_valid_acc: f64,
    pub checkpoint:     Option<PathBuf>,
}

pub fn train<B: AutodiffBackend>(
    cfg:      &TrainConfig,
    net:      DualBranchNet<B>,
    resume:   ResumePoint,
    datasets: FoldDatasets,
    ckpt:     &CheckpointManager,
    device:   &B::Device,
) -> Result<TrainingSummary> {
    let criterion = cfg.criterion();
    tracing::info!("weight:{:?} mode:{:?}", cfg.weight, cfg.loss_weight);

    // ── Adam with weight decay ────────────────────────────────────────────────
    let mut optim = AdamConfig::new()
        .with_epsilon(1e-6)
        .with_weight_decay(Some(WeightDecayConfig::new(1e-4)))
        .init();

    // ── Loaders: train on the autodiff backend, eval on the inner one ─────────
    let train_len = datasets.train.len();
    let train_loader = DataLoaderBuilder::new(SignalBatcher::<B>::new(device.clone()))
        .batch_size(cfg.batch_size)
        .shuffle(cfg.seed)
        .build(datasets.train);
    let valid_loader = DataLoaderBuilder::new(SignalBatcher::<B::InnerBackend>::new(device.clone()))
        .batch_size(cfg.batch_size)
        .build(datasets.valid);
    let test_loader = DataLoaderBuilder::new(SignalBatcher::<B::InnerBackend>::new(device.clone()))
        .batch_size(cfg.batch_size)
        .build(datasets.test);

    let mut learner = Learner { net, balancer: LossBalancer::new(device) };
    let mut train_loss = AverageMeter::new();
    let mut best = BestCheckpoint::resumed_from(resume.checkpoint);
    let mut history = Vec::new();

    for epoch in resume.start_epoch..cfg.epoch {
        // ── Training phase ────────────────────────────────────────────────────
        train_loss.reset();
        let mut correct = 0usize;

        for batch in train_loader.iter() {
            let (eog, eeg) = batch.split_channels();
            let output = learner.net.forward(eog, eeg);
            let loss   = criterion.forward(&output, batch.labels.clone(), &learner.balancer);

            correct += count_correct(output.c1.clone(), batch.labels.clone());
            let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();

            let grads = GradientsParams::from_grads(loss.backward(), &learner);
            learner = optim.step(cfg.lr, learner, grads);

            train_loss.record(loss_val);
        }
        let train_acc = accuracy_percent(correct, train_len);

        // ── Evaluation phase ──────────────────────────────────────────────────
        let net_valid = learner.net.valid();
        let valid = evaluate(&net_valid, valid_loader.as_ref());
        let test  = evaluate(&net_valid, test_loader.as_ref());

        let metrics = EpochMetrics {
            epoch,
            train_loss: train_loss.avg,
            train_acc,
            valid_acc:  valid.accuracy,
            valid_loss: valid.loss,
            test_acc:   test.accuracy,
            test_loss:  test.loss,
        };

        // ── Keep only the best-by-validation checkpoint ───────────────────────
        best.offer(ckpt, &learner.net, epoch, valid.accuracy, test.accuracy)?;

        tracing::info!("{}", metrics.info_line());
        history.push(metrics);
    }

    Ok(TrainingSummary {
        history,
        best_epoch:     best.epoch,
        best_valid_acc: best.valid_acc,
        checkpoint:     best.path,
    })
}
