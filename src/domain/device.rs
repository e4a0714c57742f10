// ============================================================
// Layer 3 — Compute Device Selection
// ============================================================
// The one branching rule in the pipeline: use an accelerator
// when at least one is present, otherwise the CPU.

use std::fmt;

/// Where tensors live for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    Accelerator,
    Cpu,
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceKind::Accelerator => write!(f, "accelerator"),
            DeviceKind::Cpu         => write!(f, "cpu"),
        }
    }
}

/// Pick the device kind from the number of accelerators reported.
pub fn select_device(accelerator_count: usize) -> DeviceKind {
    if accelerator_count > 0 {
        tracing::debug!("Select accelerator device ({accelerator_count} available)");
        DeviceKind::Accelerator
    } else {
        tracing::debug!("Select CPU device");
        DeviceKind::Cpu
    }
}
