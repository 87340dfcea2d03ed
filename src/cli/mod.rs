// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Parses the command line with clap and hands a TrainConfig to
// the application layer. It only routes, never computes.

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::TrainArgs;

use crate::application::train_use_case::{TrainConfig, TrainUseCase};

#[derive(Parser, Debug)]
#[command(
    name = "sleep-stage-trainer",
    version = "0.1.0",
    about = "Train a dual-branch EEG/EOG sleep-stage network fold by fold."
)]
pub struct Cli {
    #[command(flatten)]
    pub args: TrainArgs,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        let config = TrainConfig::try_from(self.args)?;
        tracing::info!(
            "Training folds {}..{} of '{}' for {} epochs",
            config.start, config.end, config.dataset, config.epoch,
        );
        TrainUseCase::new(config).execute()?;
        println!("Training complete.");
        Ok(())
    }
}
