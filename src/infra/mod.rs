// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Everything that touches the filesystem, the hub or the
// network on behalf of the other layers:
//
//   registry.rs        — local path vs hub repository resolution
//   tokenizer_store.rs — pretrained tokenizer loading, pad = eos
//   checkpoint.rs      — model directories, numbered training
//                        checkpoints and their rotation
//   hf_import.rs       — hub model.safetensors into CausalLm
//   metrics.rs         — log history rows (CSV + trainer state)
//   device_probe.rs    — accelerator count on this host
//   hosted.rs          — hosted fine-tuning API client

/// Local-or-hub artifact resolution
pub mod registry;

/// Tokenizer loading and saving
pub mod tokenizer_store;

/// Model saving, loading and checkpoint rotation
pub mod checkpoint;

/// GPT-NeoX safetensors weight import
pub mod hf_import;

/// Training log history
pub mod metrics;

/// Accelerator detection
pub mod device_probe;

/// Hosted fine-tuning service client
pub mod hosted;
