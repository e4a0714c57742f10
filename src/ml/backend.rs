// ============================================================
// Layer 5 — Backend Selection
// ============================================================
// Burn picks the compute backend at compile time, so choosing
// one at run time means instantiating the work once per backend
// and branching on the selected device:
//
//   Accelerator → Autodiff<Wgpu>     on WgpuDevice::default()
//   Cpu         → Autodiff<NdArray>  on NdArrayDevice::Cpu
//
// With gradient checkpointing the autodiff graph uses burn's
// balanced strategy, recomputing cheap activations in backward
// instead of keeping them.

use anyhow::Result;
use burn::{
    backend::{
        autodiff::checkpoint::strategy::BalancedCheckpointing,
        ndarray::NdArrayDevice,
        wgpu::WgpuDevice,
        Autodiff, NdArray, Wgpu,
    },
    tensor::backend::AutodiffBackend,
};

use crate::domain::device::DeviceKind;

/// Work that is generic over the training backend.
///
/// Inference-only work uses `B::InnerBackend`.
pub trait BackendTask {
    type Output;

    fn run<B: AutodiffBackend>(self, device: B::Device) -> Result<Self::Output>;
}

pub fn dispatch<T: BackendTask>(kind: DeviceKind, gradient_checkpointing: bool, task: T) -> Result<T::Output> {
    tracing::info!(
        "Running on {} (gradient checkpointing {})",
        kind,
        if gradient_checkpointing { "on" } else { "off" },
    );
    match (kind, gradient_checkpointing) {
        (DeviceKind::Accelerator, false) => task.run::<Autodiff<Wgpu>>(WgpuDevice::default()),
        (DeviceKind::Accelerator, true)  => {
            task.run::<Autodiff<Wgpu, BalancedCheckpointing>>(WgpuDevice::default())
        }
        (DeviceKind::Cpu, false) => task.run::<Autodiff<NdArray>>(NdArrayDevice::Cpu),
        (DeviceKind::Cpu, true)  => {
            task.run::<Autodiff<NdArray, BalancedCheckpointing>>(NdArrayDevice::Cpu)
        }
    }
}
