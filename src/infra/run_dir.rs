// ============================================================
// Layer 6 — Run Directory
// ============================================================
// Derives the on-disk location of one fold's artifacts:
//
//   {out_dir}/{name}-{loss}/{dataset}/{fold}/
//
// Each level is created only if absent. Two processes creating
// the same tree at the same time can race on the existence check;
// runs are expected to process one fold at a time per process.

use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};

pub fn run_name(name: &str, loss: &str) -> String {
    format!("{name}-{loss}")
}

#[derive(Debug, Clone)]
pub struct RunDir {
    path: PathBuf,
}

impl RunDir {
    /// Create (if needed) and return the directory for `fold`.
    pub fn create(out_dir: &Path, name: &str, loss: &str, dataset: &str, fold: usize) -> Result<Self> {
        let run  = out_dir.join(run_name(name, loss));
        let data = run.join(dataset);
        let path = data.join(fold.to_string());

        for dir in [&run, &data, &path] {
            if !dir.exists() {
                fs::create_dir(dir)
                    .with_context(|| format!("Cannot create run directory '{}'", dir.display()))?;
            }
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn log_path(&self) -> PathBuf {
        self.path.join("log.txt")
    }
}
