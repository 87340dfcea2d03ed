// ============================================================
// Layer 1 — CLI Arguments
// ============================================================
// Every hyperparameter of a run is a --flag with a default.
// Flag names keep their snake_case spelling (--batch_size,
// --device_id, --loss_weight, ...).
//
// Reference: Rust Book §12 (Building a CLI Program)

use anyhow::{anyhow, Error};
use clap::{ArgAction, Args};

use crate::application::train_use_case::{BackendKind, TrainConfig};
use crate::infra::logging::LogMode;
use crate::ml::loss::{LossMode, WeightMode, NUM_TERMS};

#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Resume each fold from its latest checkpoint if one exists
    #[arg(short = 'r', long, default_value_t = true, action = ArgAction::Set)]
    pub resume: bool,

    /// Adam learning rate
    #[arg(long, default_value_t = 1e-4)]
    pub lr: f64,

    #[arg(long = "batch_size", default_value_t = 128)]
    pub batch_size: usize,

    /// Number of epochs per fold
    #[arg(long, default_value_t = 100)]
    pub epoch: usize,

    /// Dataset name; "synthetic" generates random windows
    #[arg(long, default_value = "MASS")]
    pub dataset: String,

    /// GPU index for the wgpu backend
    #[arg(long = "device_id", default_value_t = 0)]
    pub device_id: usize,

    /// Run name; artifacts go to {name}-{loss}/{dataset}/{fold}
    #[arg(long, default_value = "EE")]
    pub name: String,

    /// Weights of the c1, c2 and consistency terms (fixed weighting)
    #[arg(long, value_delimiter = ',', default_values_t = [1.0, 1.0, 1.0])]
    pub weight: Vec<f64>,

    /// First fold (inclusive)
    #[arg(long, default_value_t = 21)]
    pub start: usize,

    /// Last fold (exclusive)
    #[arg(long, default_value_t = 31)]
    pub end: usize,

    /// Standardise every window per channel
    #[arg(long, default_value_t = false, action = ArgAction::Set)]
    pub trans: bool,

    /// Consistency term between the two embeddings
    #[arg(long, value_enum, default_value_t = LossMode::Cos)]
    pub loss: LossMode,

    /// Weighting of the three loss terms
    #[arg(long = "loss_weight", value_enum, default_value_t = WeightMode::Auto)]
    pub loss_weight: WeightMode,

    /// Compute backend; auto probes wgpu and falls back to ndarray
    #[arg(long, value_enum, default_value_t = BackendKind::Auto)]
    pub backend: BackendKind,

    /// Seed for weight init, shuffling and synthetic data
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Root of {dataset}/{fold}/{split}.json files
    #[arg(long = "data_root", default_value = "data")]
    pub data_root: String,

    /// Directory under which the run tree is created
    #[arg(long = "out_dir", default_value = ".")]
    pub out_dir: String,

    /// What to do with an existing log.txt
    #[arg(long = "log_mode", value_enum, default_value_t = LogMode::Append)]
    pub log_mode: LogMode,

    #[arg(long = "num_classes", default_value_t = 5)]
    pub num_classes: usize,
}

impl TryFrom<TrainArgs> for TrainConfig {
    type Error = Error;

    fn try_from(a: TrainArgs) -> Result<Self, Self::Error> {
        let weight: [f64; NUM_TERMS] = a.weight.as_slice().try_into().map_err(|_| {
            anyhow!("--weight takes {} values, got {}", NUM_TERMS, a.weight.len())
        })?;
        Ok(TrainConfig {
            resume:      a.resume,
            lr:          a.lr,
            batch_size:  a.batch_size,
            epoch:       a.epoch,
            dataset:     a.dataset,
            device_id:   a.device_id,
            name:        a.name,
            weight,
            start:       a.start,
            end:         a.end,
            trans:       a.trans,
            loss:        a.loss,
            loss_weight: a.loss_weight,
            backend:     a.backend,
            seed:        a.seed,
            data_root:   a.data_root,
            out_dir:     a.out_dir,
            log_mode:    a.log_mode,
            num_classes: a.num_classes,
        })
    }
}
