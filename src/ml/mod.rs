// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All network, loss and optimisation code lives here.
//
//   model.rs      — dual-branch 1D CNN (EOG branch, EEG branch),
//                   each with an auxiliary embedding and a head
//   loss.rs       — two cross-entropy terms + consistency term,
//                   fixed or learned weighting
//   resume.rs     — fresh model or restore from the fold's
//                   latest checkpoint
//   evaluator.rs  — inference-mode pass returning (acc, loss)
//   trainer.rs    — the epoch loop and best-checkpoint retention
//
// Reference: Burn Book §3 (Building Blocks), §5 (Training)

/// Dual-branch EEG/EOG network
pub mod model;

/// Multi-task loss and weighting strategies
pub mod loss;

/// Model construction and checkpoint resume
pub mod resume;

/// Validation / test evaluation
pub mod evaluator;

/// Full training loop with validation and checkpointing
pub mod trainer;
