// ============================================================
// Layer 5 — Model Loader
// ============================================================
// Builds a fresh network and, when resuming, restores the
// highest-epoch checkpoint of the fold directory. Training then
// continues at (checkpoint epoch + 1).
//
// A fresh start (resume off) discards whatever checkpoints an
// earlier run left behind, so the fold directory never holds more
// than the one file the epoch loop maintains.

use anyhow::Result;
use burn::prelude::*;
use std::path::PathBuf;

use crate::application::train_use_case::TrainConfig;
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::model::DualBranchNet;

/// Where training picks up.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResumePoint {
    pub start_epoch: usize,
    /// The checkpoint that was restored. It stays the "previous best"
    /// file so the next improvement replaces it.
    pub checkpoint:  Option<PathBuf>,
}

pub fn load_model<B: Backend>(
    cfg:    &TrainConfig,
    ckpt:   &CheckpointManager,
    device: &B::Device,
) -> Result<(DualBranchNet<B>, ResumePoint)> {
    let model: DualBranchNet<B> = cfg.model_config().init(device);

    if !cfg.resume {
        let stale = ckpt.clear()?;
        if stale > 0 {
            tracing::info!("Fresh start: removed {} old checkpoint(s)", stale);
        }
        return Ok((model, ResumePoint::default()));
    }
    let Some((epoch, path)) = ckpt.latest()? else {
        return Ok((model, ResumePoint::default()));
    };

    let (record, stored_epoch) = ckpt.load::<B>(&path, device)?;
    if stored_epoch != epoch {
        tracing::warn!(
            "Checkpoint '{}' stores epoch {} but is named for epoch {}",
            path.display(), stored_epoch, epoch,
        );
    }
    tracing::info!("Load {} - Epoch:{}", path.display(), epoch);

    Ok((
        model.load_record(record),
        ResumePoint { start_epoch: epoch + 1, checkpoint: Some(path) },
    ))
}
