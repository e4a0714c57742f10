// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Each use case wires the lower layers together for one
// command. Use cases that need tensors implement BackendTask so
// the CLI can run them on whichever backend was selected.
//
// Rules for this layer:
//   - No ML math or model code here
//   - Printing only of final results; progress goes to tracing
//   - Only workflow coordination

// Fine-tuning, optionally as the full walkthrough
pub mod train_use_case;

// Single question against one model
pub mod ask_use_case;

// Base vs fine-tuned comparison and the moderation scan
pub mod compare_use_case;

// Hosted fine-tuning round trip
pub mod hosted_use_case;

// Fresh base checkpoint for offline runs
pub mod init_use_case;

// Text rendering of comparisons and evaluation tables
pub mod report;
