// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Orchestrates the other layers to train a range of folds.
//
// Rules for this layer:
//   - No ML math or model code here
//   - No argument parsing here (that's Layer 1)
//   - Only workflow coordination
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

// The fold-by-fold training workflow
pub mod train_use_case;
