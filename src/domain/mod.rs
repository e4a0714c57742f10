// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain structs, enums and traits describing the fine-tuning
// workflow. Nothing here touches burn or the network. The only
// file access is TrainingConfig reading and writing its own JSON.
//
// Rules for this layer:
//   - NO Burn framework types
//   - NO network calls
//   - File I/O limited to the run configuration

// A question/answer record and the train/test split
pub mod example;

// Run-level configuration (model name, max length, dataset source)
pub mod config;

// Accelerator-vs-CPU selection rule
pub mod device;

// Core abstractions (traits) that other layers implement
pub mod traits;
