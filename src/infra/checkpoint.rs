// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores model weights for one fold directory.
//
// What gets saved per checkpoint:
//   A CheckpointRecord { model, epoch } serialised with Burn's
//   NamedMpkBytesRecorder at full precision, so a resumed model
//   reproduces the metrics logged when it was saved. The bytes are
//   written by hand to keep the exact `{epoch}-{acc:.4}.pt` name.
//
// File naming convention:
//   {name}-{loss}/{dataset}/{fold}/
//     {epoch}-{test_acc:.4}.pt   ← the single retained checkpoint
//     config.json                ← effective run configuration
//     log.txt
//
// The epoch is parsed back out of the file name (text before the
// first '-'). When several checkpoints are present the one with
// the highest parsed epoch wins; names are not zero-padded, so
// lexicographic order would put "9-..." after "10-...".
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{anyhow, bail, Context, Result};
use burn::{
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkBytesRecorder, Record, Recorder},
};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::application::train_use_case::TrainConfig;
use crate::ml::model::DualBranchNet;

pub const CHECKPOINT_EXT: &str = "pt";

type ModelRecord<B> = <DualBranchNet<B> as Module<B>>::Record;
type CheckpointRecorder = NamedMpkBytesRecorder<FullPrecisionSettings>;

/// What a checkpoint file holds.
#[derive(Record)]
pub struct CheckpointRecord<B: Backend> {
    pub model: ModelRecord<B>,
    pub epoch: usize,
}

pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// The directory must already exist (see RunDir::create).
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn file_name(epoch: usize, test_acc: f64) -> String {
        format!("{epoch}-{test_acc:.4}.{CHECKPOINT_EXT}")
    }

    /// Epoch encoded in a checkpoint file name.
    pub fn parse_epoch(path: &Path) -> Result<usize> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| anyhow!("checkpoint path '{}' has no file name", path.display()))?;
        let Some((prefix, _)) = name.split_once('-') else {
            bail!("malformed checkpoint name '{name}': missing '-' separator");
        };
        prefix
            .parse::<usize>()
            .with_context(|| format!("malformed checkpoint name '{name}': non-numeric epoch"))
    }

    /// All checkpoint files in the directory, unordered.
    pub fn list(&self) -> Result<Vec<PathBuf>> {
        let entries = fs::read_dir(&self.dir)
            .with_context(|| format!("Cannot list '{}'", self.dir.display()))?;
        let mut files = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.is_file() && path.extension().is_some_and(|e| e == CHECKPOINT_EXT) {
                files.push(path);
            }
        }
        Ok(files)
    }

    /// Checkpoint with the highest epoch, if any.
    pub fn latest(&self) -> Result<Option<(usize, PathBuf)>> {
        let mut best: Option<(usize, PathBuf)> = None;
        for path in self.list()? {
            let epoch = Self::parse_epoch(&path)?;
            if best.as_ref().map_or(true, |(e, _)| epoch > *e) {
                best = Some((epoch, path));
            }
        }
        Ok(best)
    }

    /// Save the model as `{epoch}-{test_acc:.4}.pt` and return the path.
    pub fn save<B: Backend>(
        &self,
        model:    &DualBranchNet<B>,
        epoch:    usize,
        test_acc: f64,
    ) -> Result<PathBuf> {
        let path = self.dir.join(Self::file_name(epoch, test_acc));
        let record = CheckpointRecord::<B> {
            model: model.clone().into_record(),
            epoch,
        };
        let bytes = CheckpointRecorder::default()
            .record(record, ())
            .map_err(|e| anyhow!("failed to serialise checkpoint: {e}"))?;
        fs::write(&path, bytes)
            .with_context(|| format!("Failed to save checkpoint to '{}'", path.display()))?;

        tracing::debug!("Saved checkpoint '{}'", path.display());
        Ok(path)
    }

    /// Load a checkpoint file and return (model record, stored epoch).
    pub fn load<B: Backend>(
        &self,
        path:   &Path,
        device: &B::Device,
    ) -> Result<(ModelRecord<B>, usize)> {
        let bytes = fs::read(path)
            .with_context(|| format!("Cannot read checkpoint '{}'", path.display()))?;
        let record: CheckpointRecord<B> = CheckpointRecorder::default()
            .load(bytes, device)
            .map_err(|e| anyhow!("corrupted checkpoint '{}': {e}", path.display()))?;
        Ok((record.model, record.epoch))
    }

    /// Delete every checkpoint in the directory; returns how many went.
    pub fn clear(&self) -> Result<usize> {
        let files = self.list()?;
        for path in &files {
            self.remove(path)?;
        }
        Ok(files.len())
    }

    pub fn remove(&self, path: &Path) -> Result<()> {
        if path.exists() {
            fs::remove_file(path)
                .with_context(|| format!("Failed to delete checkpoint '{}'", path.display()))?;
            tracing::debug!("Removed checkpoint '{}'", path.display());
        }
        Ok(())
    }

    /// Write the effective configuration next to the checkpoints.
    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        let path = self.dir.join("config.json");
        let json = serde_json::to_string_pretty(cfg)?;
        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::model::DualBranchConfig;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_file_name_format() {
        assert_eq!(CheckpointManager::file_name(7, 81.25), "7-81.2500.pt");
    }

    #[test]
    fn test_parse_epoch() {
        assert_eq!(CheckpointManager::parse_epoch(Path::new("run/12-80.0000.pt")).unwrap(), 12);
        assert!(CheckpointManager::parse_epoch(Path::new("run/best.pt")).is_err());
        assert!(CheckpointManager::parse_epoch(Path::new("run/x-80.0000.pt")).is_err());
    }

    #[test]
    fn test_latest_uses_numeric_epoch() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["9-50.0000.pt", "10-40.0000.pt", "2-90.0000.pt", "log.txt"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        let mgr = CheckpointManager::new(dir.path());
        let (epoch, path) = mgr.latest().unwrap().unwrap();
        assert_eq!(epoch, 10);
        assert!(path.ends_with("10-40.0000.pt"));
        assert_eq!(mgr.list().unwrap().len(), 3);
    }

    #[test]
    fn test_latest_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(CheckpointManager::new(dir.path()).latest().unwrap().is_none());
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let device = Default::default();
        let model: DualBranchNet<TestBackend> = DualBranchConfig::new().with_embed_dim(8).init(&device);
        let mgr = CheckpointManager::new(dir.path());

        let path = mgr.save(&model, 4, 62.5).unwrap();
        assert!(path.ends_with("4-62.5000.pt"));

        let (record, epoch) = mgr.load::<TestBackend>(&path, &device).unwrap();
        assert_eq!(epoch, 4);

        let fresh: DualBranchNet<TestBackend> = DualBranchConfig::new().with_embed_dim(8).init(&device);
        let restored = fresh.load_record(record);
        let original: Vec<f32> = model.eog_head.weight.val().into_data().iter::<f32>().collect();
        let loaded:   Vec<f32> = restored.eog_head.weight.val().into_data().iter::<f32>().collect();
        assert_eq!(original, loaded);

        mgr.remove(&path).unwrap();
        assert!(mgr.list().unwrap().is_empty());
    }

    #[test]
    fn test_corrupted_checkpoint_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("3-10.0000.pt");
        fs::write(&path, b"not a record").unwrap();
        let mgr = CheckpointManager::new(dir.path());
        let err = mgr.load::<TestBackend>(&path, &Default::default()).err().expect("expected load to fail");
        assert!(err.to_string().contains("corrupted checkpoint"));
    }

    #[test]
    fn test_truncated_checkpoint_fails() {
        let dir = tempfile::tempdir().unwrap();
        let device = Default::default();
        let model: DualBranchNet<TestBackend> = DualBranchConfig::new().with_embed_dim(8).init(&device);
        let mgr = CheckpointManager::new(dir.path());

        let path = mgr.save(&model, 1, 20.0).unwrap();
        let bytes = fs::read(&path).unwrap();
        fs::write(&path, &bytes[..bytes.len() / 2]).unwrap();
        assert!(mgr.load::<TestBackend>(&path, &device).is_err());
    }

    #[test]
    fn test_clear_removes_only_checkpoints() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["0-10.0000.pt", "4-30.0000.pt", "log.txt", "config.json"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        let mgr = CheckpointManager::new(dir.path());
        assert_eq!(mgr.clear().unwrap(), 2);
        assert!(mgr.list().unwrap().is_empty());
        assert!(dir.path().join("log.txt").exists());
    }
}
