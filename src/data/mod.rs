// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// From question/answer records to tensor batches:
//
//   .jsonl file / hub dataset
//       │
//       ▼
//   loader            → parses records into Examples
//       │
//       ▼
//   splitter          → seeded train/test split
//       │
//       ▼
//   FinetuneDataset   → question+answer → token ids (burn Dataset)
//       │
//       ▼
//   CausalLmBatcher   → pads and stacks into tensors
//       │
//       ▼
//   DataLoader        → feeds batches to the training loop
//
// The moderation scan reads Examples directly.

/// JSON-lines and hub dataset sources
pub mod loader;

/// Seeded train/test split
pub mod splitter;

/// Implements Burn's Dataset trait for tokenised examples
pub mod dataset;

/// Implements Burn's Batcher trait with per-batch padding
pub mod batcher;

/// Finds answers that carry the moderation phrase
pub mod moderation;
