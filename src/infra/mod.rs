// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting concerns used by the training workflow:
//
//   run_dir.rs     — {name}-{loss}/{dataset}/{fold} layout
//   logging.rs     — per-fold console + log.txt sinks
//   checkpoint.rs  — best-checkpoint files and config.json
//   metrics.rs     — AverageMeter and the per-epoch log line
//
// Reference: Rust Book §7 (Modules)
//            Rust Book §9 (Error Handling with anyhow)
//            Burn Book §5 (Checkpointing)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Per-fold tracing dispatch
pub mod logging;

/// Running averages and epoch metrics
pub mod metrics;

/// Fold directory creation
pub mod run_dir;
