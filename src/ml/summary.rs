// ============================================================
// Layer 5 — Model Summary
// ============================================================
// What the walkthrough prints before training:
//
//   module tree
//   parameter count
//   memory footprint    params × 4 bytes (f32), in GB
//   training FLOPs      6 × params × max_length × accumulation
//                       per optimisation step
//
// The FLOP figure is the usual forward + backward estimate of
// 2 + 4 FLOPs per parameter per token.

use burn::prelude::*;
use std::fmt;

use crate::ml::model::CausalLm;

#[derive(Debug, Clone, PartialEq)]
pub struct ModelSummary {
    pub tree:           String,
    pub num_params:     usize,
    pub memory_gb:      f64,
    pub flops_per_step: f64,
}

impl ModelSummary {
    pub fn new<B: Backend>(
        model:                       &CausalLm<B>,
        max_length:                  usize,
        gradient_accumulation_steps: usize,
    ) -> Self {
        let num_params = model.num_params();
        Self {
            tree: model.to_string(),
            num_params,
            memory_gb: num_params as f64 * 4.0 / 1e9,
            flops_per_step: estimate_training_flops(num_params, max_length, gradient_accumulation_steps),
        }
    }
}

pub fn estimate_training_flops(num_params: usize, max_length: usize, gradient_accumulation_steps: usize) -> f64 {
    6.0 * num_params as f64 * max_length as f64 * gradient_accumulation_steps as f64
}

impl fmt::Display for ModelSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.tree)?;
        writeln!(f, "Parameters:       {}", self.num_params)?;
        writeln!(f, "Memory footprint: {:.3} GB", self.memory_gb)?;
        write!(f,   "FLOPs per step:   {:.3e}", self.flops_per_step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{tiny_model_config, TestBackend};

    #[test]
    fn test_flops_formula() {
        assert_eq!(estimate_training_flops(70_000_000, 2048, 4), 6.0 * 70e6 * 2048.0 * 4.0);
    }

    #[test]
    fn test_summary_counts_params() {
        let model: CausalLm<TestBackend> = tiny_model_config(20).init(&Default::default());
        let summary = ModelSummary::new(&model, 64, 4);
        assert_eq!(summary.num_params, model.num_params());
        assert!((summary.memory_gb - summary.num_params as f64 * 4e-9).abs() < 1e-12);
        assert!(summary.to_string().contains("Parameters:"));
    }
}
