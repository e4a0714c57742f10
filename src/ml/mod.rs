// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// The burn-specific code: architecture, generation, training
// and backend selection.
//
//   model.rs         — GPT-NeoX style causal decoder
//   generation.rs    — greedy autoregressive decoding
//   inferencer.rs    — prompt in, completion out
//   training_args.rs — optimiser / schedule configuration
//   trainer.rs       — accumulation, evaluation, checkpoints
//   summary.rs       — parameter count, memory, FLOPs
//   backend.rs       — Wgpu vs NdArray at run time
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)

/// Causal language model architecture
pub mod model;

/// Greedy decoding loop
pub mod generation;

/// Text-to-completion helper and the local Completer
pub mod inferencer;

/// Trainer configuration
pub mod training_args;

/// Fine-tuning loop with evaluation and checkpointing
pub mod trainer;

/// Model size and cost estimates
pub mod summary;

/// Run-time backend dispatch
pub mod backend;
