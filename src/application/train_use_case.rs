// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the fold loop. For every fold in [start, end):
//
//   Step 1: Create the fold directory          (Layer 6 - infra)
//   Step 2: Install the fold's logger          (Layer 6 - infra)
//   Step 3: Save config, seed the backend
//   Step 4: Build / resume the model           (Layer 5 - ml)
//   Step 5: Build train / valid / test sets    (Layer 4 - data)
//   Step 6: Run the epoch loop                 (Layer 5 - ml)
//
// The configuration, device and logger are passed down
// explicitly; nothing below this layer reads global state.

use anyhow::{bail, Result};
use burn::{
    backend::{
        ndarray::NdArrayDevice,
        wgpu::WgpuDevice,
        Autodiff, NdArray, Wgpu,
    },
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use serde::{Deserialize, Serialize};
use clap::ValueEnum;
use std::{
    panic::{self, AssertUnwindSafe},
    path::Path,
};

use crate::data::{
    build_fold_datasets,
    source::{JsonSplitSource, SyntheticSizes, SyntheticSource, SYNTHETIC_DATASET},
};
use crate::domain::traits::SplitSource;
use crate::infra::{
    checkpoint::CheckpointManager,
    logging::{fold_dispatch, LogMode},
    run_dir::RunDir,
};
use crate::ml::{
    loss::{LossMode, LossWeighting, MultiTaskLoss, WeightMode, NUM_TERMS},
    model::DualBranchConfig,
    resume::load_model,
    trainer::{train, TrainingSummary},
};

// ─── Backend selection ────────────────────────────────────────────────────────
// `auto` takes the wgpu device when its adapter can be brought up and
// falls back to the CPU otherwise. The choice is made once, before the
// first fold.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// wgpu if available, else ndarray
    Auto,
    /// GPU through wgpu, indexed by device_id
    Wgpu,
    /// CPU
    #[value(name = "ndarray")]
    NdArray,
}

impl BackendKind {
    /// Turn `Auto` into a concrete backend; `gpu_available` is only
    /// consulted for `Auto`.
    pub fn resolve(self, gpu_available: impl FnOnce() -> bool) -> BackendKind {
        match self {
            BackendKind::Auto => {
                if gpu_available() { BackendKind::Wgpu } else { BackendKind::NdArray }
            }
            concrete => concrete,
        }
    }
}

/// burn-wgpu panics when no adapter matches the device, so the first
/// allocation runs under catch_unwind with the panic hook muted.
fn wgpu_available(device: &WgpuDevice) -> bool {
    let hook = panic::take_hook();
    panic::set_hook(Box::new(|_| {}));
    let probe = panic::catch_unwind(AssertUnwindSafe(|| {
        Tensor::<Wgpu, 1>::zeros([1], device).into_data();
    }));
    panic::set_hook(hook);
    probe.is_ok()
}

// ─── Training Configuration ──────────────────────────────────────────────────
// Built once from the CLI, validated, then read-only.
// Serialisable so each fold directory keeps a config.json.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub resume:      bool,
    pub lr:          f64,
    pub batch_size:  usize,
    /// Total number of epochs; training stops after epoch - 1.
    pub epoch:       usize,
    pub dataset:     String,
    pub device_id:   usize,
    pub name:        String,
    /// [c1 head, c2 head, consistency] for fixed weighting
    pub weight:      [f64; NUM_TERMS],
    pub start:       usize,
    pub end:         usize,
    pub trans:       bool,
    pub loss:        LossMode,
    pub loss_weight: WeightMode,
    pub backend:     BackendKind,
    pub seed:        u64,
    pub data_root:   String,
    pub out_dir:     String,
    pub log_mode:    LogMode,
    pub num_classes: usize,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            resume:      true,
            lr:          1e-4,
            batch_size:  128,
            epoch:       100,
            dataset:     "MASS".to_string(),
            device_id:   0,
            name:        "EE".to_string(),
            weight:      [1.0; NUM_TERMS],
            start:       21,
            end:         31,
            trans:       false,
            loss:        LossMode::Cos,
            loss_weight: WeightMode::Auto,
            backend:     BackendKind::Auto,
            seed:        42,
            data_root:   "data".to_string(),
            out_dir:     ".".to_string(),
            log_mode:    LogMode::Append,
            num_classes: 5,
        }
    }
}

impl TrainConfig {
    pub fn validate(&self) -> Result<()> {
        if self.start >= self.end {
            bail!("fold range [{}, {}) is empty", self.start, self.end);
        }
        if self.batch_size == 0 {
            bail!("batch_size must be positive");
        }
        if !(self.lr > 0.0) {
            bail!("learning rate must be positive, got {}", self.lr);
        }
        if self.num_classes < 2 {
            bail!("num_classes must be at least 2");
        }
        Ok(())
    }

    pub fn criterion(&self) -> MultiTaskLoss {
        let weighting = match self.loss_weight {
            WeightMode::Fixed => LossWeighting::Fixed(self.weight),
            WeightMode::Auto => LossWeighting::Auto,
        };
        MultiTaskLoss::new(self.loss.into(), weighting)
    }

    pub fn model_config(&self) -> DualBranchConfig {
        DualBranchConfig::new().with_num_classes(self.num_classes)
    }

    /// Synthetic windows for `--dataset synthetic`, prepared JSON
    /// splits under data_root otherwise.
    pub fn split_source(&self) -> Box<dyn SplitSource> {
        if self.dataset == SYNTHETIC_DATASET {
            Box::new(SyntheticSource::new(self.seed, SyntheticSizes::default(), self.num_classes))
        } else {
            Box::new(JsonSplitSource::new(&self.data_root))
        }
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Resolve the device once, then train every fold.
    pub fn execute(&self) -> Result<()> {
        let cfg = &self.config;
        cfg.validate()?;
        let source = cfg.split_source();

        let gpu = WgpuDevice::DiscreteGpu(cfg.device_id);
        let backend = cfg.backend.resolve(|| wgpu_available(&gpu));
        if cfg.backend == BackendKind::Auto && backend == BackendKind::NdArray {
            tracing::warn!("No wgpu adapter for {:?}, falling back to CPU", gpu);
        }

        let reports = match backend {
            BackendKind::Wgpu => {
                tracing::info!("Using WGPU device: {:?}", gpu);
                run_folds::<Autodiff<Wgpu>>(cfg, source.as_ref(), &gpu)?
            }
            BackendKind::NdArray | BackendKind::Auto => {
                tracing::info!("Using CPU (ndarray) backend");
                run_folds::<Autodiff<NdArray>>(cfg, source.as_ref(), &NdArrayDevice::Cpu)?
            }
        };

        for (fold, summary) in &reports {
            tracing::info!(
                "Fold {} done: best epoch {:?}, valid acc {:.4}",
                fold, summary.best_epoch, summary.best_valid_acc,
            );
        }
        Ok(())
    }
}

/// Train folds start..end in ascending order.
pub fn run_folds<B: AutodiffBackend>(
    cfg:    &TrainConfig,
    source: &dyn SplitSource,
    device: &B::Device,
) -> Result<Vec<(usize, TrainingSummary)>> {
    let mut reports = Vec::with_capacity(cfg.end.saturating_sub(cfg.start));
    for fold in cfg.start..cfg.end {
        let summary = run_fold::<B>(cfg, source, fold, device)?;
        reports.push((fold, summary));
    }
    Ok(reports)
}

pub fn run_fold<B: AutodiffBackend>(
    cfg:    &TrainConfig,
    source: &dyn SplitSource,
    fold:   usize,
    device: &B::Device,
) -> Result<TrainingSummary> {
    // ── Step 1: Fold directory ────────────────────────────────────────────────
    let run = RunDir::create(
        Path::new(&cfg.out_dir),
        &cfg.name,
        &cfg.loss.to_string(),
        &cfg.dataset,
        fold,
    )?;

    // ── Step 2: Logger for this fold ──────────────────────────────────────────
    let dispatch = fold_dispatch(&run.log_path(), fold, cfg.log_mode)?;

    tracing::dispatcher::with_default(&dispatch, || {
        tracing::info!("Using args :{:?}", cfg);

        // ── Step 3: Config file and RNG ───────────────────────────────────────
        let ckpt = CheckpointManager::new(run.path());
        ckpt.save_config(cfg)?;
        B::seed(cfg.seed);

        // ── Step 4: Model, possibly resumed ───────────────────────────────────
        let (net, resume) = load_model::<B>(cfg, &ckpt, device)?;

        // ── Step 5: Datasets ──────────────────────────────────────────────────
        let datasets = build_fold_datasets(source, &cfg.dataset, fold, cfg.trans)?;
        tracing::debug!(
            "Fold {}: {} train / {} valid / {} test windows",
            fold,
            burn::data::dataset::Dataset::len(&datasets.train),
            burn::data::dataset::Dataset::len(&datasets.valid),
            burn::data::dataset::Dataset::len(&datasets.test),
        );

        // ── Step 6: Epoch loop ────────────────────────────────────────────────
        train(cfg, net, resume, datasets, &ckpt, device)
    })
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::batcher::SignalBatcher;
    use crate::ml::evaluator::evaluate;
    use burn::{data::dataloader::DataLoaderBuilder, module::AutodiffModule};
    use std::fs;

    type TestBackend = Autodiff<NdArray<f32>>;

    fn tiny_source() -> SyntheticSource {
        SyntheticSource::new(11, SyntheticSizes { train: 4, valid: 2, test: 2 }, 5)
    }

    fn tiny_config(out_dir: &Path) -> TrainConfig {
        TrainConfig {
            resume:     false,
            lr:         1e-3,
            batch_size: 2,
            epoch:      2,
            dataset:    SYNTHETIC_DATASET.to_string(),
            start:      1,
            end:        2,
            backend:    BackendKind::NdArray,
            out_dir:    out_dir.to_string_lossy().into_owned(),
            ..TrainConfig::default()
        }
    }

    fn checkpoints(dir: &Path) -> Vec<String> {
        fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|n| n.ends_with(".pt"))
            .collect()
    }

    #[test]
    fn test_validate_rejects_bad_config() {
        let ok = TrainConfig::default();
        assert!(ok.validate().is_ok());
        assert!(TrainConfig { start: 5, end: 5, ..ok.clone() }.validate().is_err());
        assert!(TrainConfig { batch_size: 0, ..ok.clone() }.validate().is_err());
        assert!(TrainConfig { lr: 0.0, ..ok.clone() }.validate().is_err());
        assert!(TrainConfig { num_classes: 1, ..ok.clone() }.validate().is_err());
    }

    #[test]
    fn test_criterion_follows_config() {
        let cfg = TrainConfig {
            loss:        LossMode::Mse,
            loss_weight: WeightMode::Fixed,
            weight:      [0.5, 1.0, 2.0],
            ..TrainConfig::default()
        };
        let c = cfg.criterion();
        assert_eq!(c.weighting, LossWeighting::Fixed([0.5, 1.0, 2.0]));
        assert_eq!(c.consistency, crate::ml::loss::ConsistencyLoss::Mse);
    }

    #[test]
    fn test_two_epoch_run_keeps_one_checkpoint() {
        let out = tempfile::tempdir().unwrap();
        let cfg = tiny_config(out.path());
        let device = NdArrayDevice::Cpu;

        let summary = run_fold::<TestBackend>(&cfg, &tiny_source(), 1, &device).unwrap();
        assert_eq!(summary.history.len(), 2);

        let fold_dir = out.path().join("EE-cos/synthetic/1");
        let files = checkpoints(&fold_dir);
        assert_eq!(files.len(), 1);

        let best = summary.best_epoch.unwrap();
        let best_row = &summary.history[best];
        assert_eq!(files[0], format!("{}-{:.4}.pt", best, best_row.test_acc));
        assert_eq!(summary.best_valid_acc, best_row.valid_acc);

        let log = fs::read_to_string(fold_dir.join("log.txt")).unwrap();
        let epoch_lines: Vec<&str> = log.lines().filter(|l| l.contains("Epoch: [")).collect();
        assert_eq!(epoch_lines.len(), 2);
        for line in epoch_lines {
            for key in ["total_loss:", "train-acc:", "valid acc:", "test acc:", "] 1:INFO: "] {
                assert!(line.contains(key), "missing {key} in {line}");
            }
            assert_eq!(line.matches("loss").count(), 3);
        }
        assert!(fold_dir.join("config.json").exists());
    }

    #[test]
    fn test_resume_continues_after_saved_epoch() {
        let out = tempfile::tempdir().unwrap();
        let device = NdArrayDevice::Cpu;
        let source = tiny_source();

        let first = TrainConfig { epoch: 1, ..tiny_config(out.path()) };
        let summary = run_fold::<TestBackend>(&first, &source, 1, &device).unwrap();
        let saved = summary.history[0].clone();

        // Restored parameters reproduce the metrics logged at save time.
        let fold_dir = out.path().join("EE-cos/synthetic/1");
        let ckpt = CheckpointManager::new(&fold_dir);
        let resume_cfg = TrainConfig { resume: true, epoch: 2, ..tiny_config(out.path()) };
        let (net, point) = load_model::<TestBackend>(&resume_cfg, &ckpt, &device).unwrap();
        assert_eq!(point.start_epoch, 1);

        let datasets = build_fold_datasets(&source, SYNTHETIC_DATASET, 1, false).unwrap();
        let loader = DataLoaderBuilder::new(SignalBatcher::<NdArray<f32>>::new(device.clone()))
            .batch_size(resume_cfg.batch_size)
            .build(datasets.test);
        let eval = evaluate(&net.valid(), loader.as_ref());
        assert!((eval.accuracy - saved.test_acc).abs() < 1e-9);
        assert!((eval.loss - saved.test_loss).abs() < 1e-6);

        // Resumed run trains epoch 1 only and still keeps a single file.
        let resumed = run_fold::<TestBackend>(&resume_cfg, &source, 1, &device).unwrap();
        assert_eq!(resumed.history.len(), 1);
        assert_eq!(resumed.history[0].epoch, 1);
        assert_eq!(checkpoints(&fold_dir).len(), 1);
    }

    #[test]
    fn test_equal_validation_keeps_later_epoch() {
        // With no validation windows every epoch scores 0, a tie.
        let out = tempfile::tempdir().unwrap();
        let source = SyntheticSource::new(11, SyntheticSizes { train: 4, valid: 0, test: 2 }, 5);
        let cfg = TrainConfig { epoch: 3, ..tiny_config(out.path()) };

        let summary = run_fold::<TestBackend>(&cfg, &source, 1, &NdArrayDevice::Cpu).unwrap();
        assert!(summary.history.iter().all(|m| m.valid_acc == 0.0));
        assert_eq!(summary.best_epoch, Some(2));

        let files = checkpoints(&out.path().join("EE-cos/synthetic/1"));
        assert_eq!(files, vec![format!("2-{:.4}.pt", summary.history[2].test_acc)]);
    }

    #[test]
    fn test_fresh_rerun_discards_old_checkpoints() {
        let out = tempfile::tempdir().unwrap();
        let device = NdArrayDevice::Cpu;
        let source = SyntheticSource::new(11, SyntheticSizes { train: 4, valid: 0, test: 2 }, 5);
        let fold_dir = out.path().join("EE-cos/synthetic/1");

        let first = TrainConfig { epoch: 3, ..tiny_config(out.path()) };
        run_fold::<TestBackend>(&first, &source, 1, &device).unwrap();
        assert!(checkpoints(&fold_dir)[0].starts_with("2-"));

        let rerun = TrainConfig { resume: false, epoch: 1, ..tiny_config(out.path()) };
        run_fold::<TestBackend>(&rerun, &source, 1, &device).unwrap();
        let files = checkpoints(&fold_dir);
        assert_eq!(files.len(), 1);
        assert!(files[0].starts_with("0-"), "stale checkpoint kept: {files:?}");

        // A later resume continues from the fresh run, not the old one.
        let resume_cfg = TrainConfig { resume: true, epoch: 2, ..tiny_config(out.path()) };
        let (_, point) = load_model::<TestBackend>(&resume_cfg, &CheckpointManager::new(&fold_dir), &device).unwrap();
        assert_eq!(point.start_epoch, 1);
    }

    #[test]
    fn test_backend_resolution() {
        assert_eq!(BackendKind::Auto.resolve(|| true), BackendKind::Wgpu);
        assert_eq!(BackendKind::Auto.resolve(|| false), BackendKind::NdArray);
        assert_eq!(BackendKind::NdArray.resolve(|| true), BackendKind::NdArray);
        assert_eq!(
            BackendKind::Wgpu.resolve(|| panic!("explicit backend must not probe")),
            BackendKind::Wgpu,
        );
    }

    #[test]
    fn test_fold_range_creates_one_directory_per_fold() {
        let out = tempfile::tempdir().unwrap();
        let cfg = TrainConfig {
            start: 21,
            end:   31,
            epoch: 0,
            ..tiny_config(out.path())
        };
        let reports = run_folds::<TestBackend>(&cfg, &tiny_source(), &NdArrayDevice::Cpu).unwrap();

        let folds: Vec<usize> = reports.iter().map(|(f, _)| *f).collect();
        assert_eq!(folds, (21..31).collect::<Vec<_>>());

        let root = out.path().join("EE-cos/synthetic");
        assert_eq!(fs::read_dir(&root).unwrap().count(), 10);
        for fold in 21..31 {
            let log = fs::read_to_string(root.join(fold.to_string()).join("log.txt")).unwrap();
            assert!(log.contains(&format!("] {fold}:INFO: Using args")));
        }
    }
}
