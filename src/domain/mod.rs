// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types and traits describing what a recording,
// a split and a fold ARE. No Burn types, no file I/O.
//
// Everything the training pipeline passes between layers
// (signal items, split/channel selectors, the data source and
// transform abstractions) is defined here so the other layers
// can be tested without a GPU.
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// Signal items and the split / channel selectors
pub mod recording;

// Core abstractions (traits) that other layers implement
pub mod traits;
