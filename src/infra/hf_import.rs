// ============================================================
// Layer 6 — Hugging Face Weight Import
// ============================================================
// Builds a CausalLm from the model.safetensors that GPT-NeoX
// repositories on the hub publish, e.g. EleutherAI/pythia-70m.
//
//   hub tensor name                          → CausalLm field
//   gpt_neox.embed_in.weight                 → embed_in
//   gpt_neox.layers.{i}.input_layernorm      → input_layernorm
//   gpt_neox.layers.{i}.post_attention_layernorm
//                                            → post_attention_layernorm
//   gpt_neox.layers.{i}.attention.query_key_value
//                                            → attention.query_key_value
//   gpt_neox.layers.{i}.attention.dense      → attention.dense
//   gpt_neox.layers.{i}.mlp.dense_h_to_4h    → mlp_in
//   gpt_neox.layers.{i}.mlp.dense_4h_to_h    → mlp_out
//   gpt_neox.final_layer_norm                → final_layer_norm
//   embed_out.weight                         → embed_out
//
// Linear weights are stored [out, in] on the hub and [in, out]
// in burn, so they are transposed on the way in. Names are
// accepted with or without the `gpt_neox.` prefix. Buffers such
// as rotary inv_freq and attention masks are ignored; they are
// recomputed from the config.
//
// F32, F16 and BF16 tensors are widened to f32.

use anyhow::{anyhow, bail, Context, Result};
use burn::{
    module::Param,
    nn::{LayerNorm, Linear},
    prelude::*,
    tensor::{bf16, f16},
};
use safetensors::{tensor::TensorView, Dtype, SafeTensors};
use std::{fs, path::Path};

use crate::ml::model::{CausalLm, CausalLmConfig};

pub const SAFETENSORS_FILE: &str = "model.safetensors";

const BASE_PREFIX: &str = "gpt_neox.";

/// Load `model.safetensors` weights into a model shaped by `config`.
pub fn import_safetensors<B: Backend>(
    config: &CausalLmConfig,
    path:   &Path,
    device: &B::Device,
) -> Result<CausalLm<B>> {
    let bytes = fs::read(path)
        .with_context(|| format!("Cannot read '{}'", path.display()))?;
    let tensors = SafeTensors::deserialize(&bytes)
        .map_err(|e| anyhow!("Invalid safetensors file '{}': {e}", path.display()))?;
    let weights = HubWeights::<B> { tensors, device };

    let (vocab, hidden, inter) = (config.vocab_size, config.hidden_size, config.intermediate_size);
    let mut model = config.init::<B>(device);

    model.embed_in.weight = Param::from_tensor(weights.tensor("embed_in.weight", [vocab, hidden])?);
    for (i, layer) in model.layers.iter_mut().enumerate() {
        let p = format!("layers.{i}");
        weights.layer_norm(&mut layer.input_layernorm, &format!("{p}.input_layernorm"), hidden)?;
        weights.layer_norm(&mut layer.post_attention_layernorm, &format!("{p}.post_attention_layernorm"), hidden)?;
        weights.linear(&mut layer.attention.query_key_value, &format!("{p}.attention.query_key_value"), hidden, 3 * hidden)?;
        weights.linear(&mut layer.attention.dense, &format!("{p}.attention.dense"), hidden, hidden)?;
        weights.linear(&mut layer.mlp_in, &format!("{p}.mlp.dense_h_to_4h"), hidden, inter)?;
        weights.linear(&mut layer.mlp_out, &format!("{p}.mlp.dense_4h_to_h"), inter, hidden)?;
    }
    weights.layer_norm(&mut model.final_layer_norm, "final_layer_norm", hidden)?;
    weights.linear(&mut model.embed_out, "embed_out", hidden, vocab)?;

    tracing::info!(
        "Imported {} layers from '{}'",
        config.num_hidden_layers,
        path.display(),
    );
    Ok(model)
}

struct HubWeights<'a, B: Backend> {
    tensors: SafeTensors<'a>,
    device:  &'a B::Device,
}

impl<B: Backend> HubWeights<'_, B> {
    fn view(&self, name: &str) -> Result<TensorView<'_>> {
        self.tensors
            .tensor(&format!("{BASE_PREFIX}{name}"))
            .or_else(|_| self.tensors.tensor(name))
            .map_err(|_| anyhow!("Tensor '{name}' is missing from the checkpoint"))
    }

    fn tensor<const D: usize>(&self, name: &str, shape: [usize; D]) -> Result<Tensor<B, D>> {
        let view = self.view(name)?;
        if view.shape() != shape.as_slice() {
            bail!("Tensor '{name}' has shape {:?}, expected {:?}", view.shape(), shape);
        }
        let values = widen_to_f32(&view).with_context(|| format!("Cannot read tensor '{name}'"))?;
        Ok(Tensor::from_data(TensorData::new(values, shape), self.device))
    }

    /// `bias` is loaded only when the layer has one.
    fn linear(&self, linear: &mut Linear<B>, prefix: &str, d_in: usize, d_out: usize) -> Result<()> {
        let weight = self.tensor::<2>(&format!("{prefix}.weight"), [d_out, d_in])?;
        linear.weight = Param::from_tensor(weight.transpose());
        if linear.bias.is_some() {
            let bias = self.tensor::<1>(&format!("{prefix}.bias"), [d_out])?;
            linear.bias = Some(Param::from_tensor(bias));
        }
        Ok(())
    }

    fn layer_norm(&self, norm: &mut LayerNorm<B>, prefix: &str, d: usize) -> Result<()> {
        norm.gamma = Param::from_tensor(self.tensor::<1>(&format!("{prefix}.weight"), [d])?);
        norm.beta  = Param::from_tensor(self.tensor::<1>(&format!("{prefix}.bias"), [d])?);
        Ok(())
    }
}

fn widen_to_f32(view: &TensorView<'_>) -> Result<Vec<f32>> {
    let data = view.data();
    let values = match view.dtype() {
        Dtype::F32 => data
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect(),
        Dtype::F16 => data
            .chunks_exact(2)
            .map(|b| f16::from_le_bytes([b[0], b[1]]).to_f32())
            .collect(),
        Dtype::BF16 => data
            .chunks_exact(2)
            .map(|b| bf16::from_le_bytes([b[0], b[1]]).to_f32())
            .collect(),
        other => bail!("unsupported dtype {other:?}"),
    };
    Ok(values)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::test_utils::{tiny_model_config, TestBackend};
    use std::collections::BTreeMap;

    fn bytes_of<const D: usize>(t: Tensor<TestBackend, D>) -> (Vec<usize>, Vec<u8>) {
        let shape = t.dims().to_vec();
        let values: Vec<f32> = t.into_data().to_vec().unwrap();
        (shape, values.iter().flat_map(|v| v.to_le_bytes()).collect())
    }

    /// Export `model` with hub names and torch layouts.
    pub(crate) fn export(model: &CausalLm<TestBackend>, path: &Path) {
        let mut out: BTreeMap<String, (Vec<usize>, Vec<u8>)> = BTreeMap::new();
        let mut linear = |name: &str, l: &Linear<TestBackend>| {
            out.insert(format!("{name}.weight"), bytes_of(l.weight.val().transpose()));
            if let Some(b) = &l.bias {
                out.insert(format!("{name}.bias"), bytes_of(b.val()));
            }
        };
        for (i, layer) in model.layers.iter().enumerate() {
            let p = format!("gpt_neox.layers.{i}");
            linear(&format!("{p}.attention.query_key_value"), &layer.attention.query_key_value);
            linear(&format!("{p}.attention.dense"), &layer.attention.dense);
            linear(&format!("{p}.mlp.dense_h_to_4h"), &layer.mlp_in);
            linear(&format!("{p}.mlp.dense_4h_to_h"), &layer.mlp_out);
        }
        linear("embed_out", &model.embed_out);

        let mut norm = |name: String, n: &LayerNorm<TestBackend>| {
            out.insert(format!("{name}.weight"), bytes_of(n.gamma.val()));
            out.insert(format!("{name}.bias"), bytes_of(n.beta.val()));
        };
        for (i, layer) in model.layers.iter().enumerate() {
            norm(format!("gpt_neox.layers.{i}.input_layernorm"), &layer.input_layernorm);
            norm(format!("gpt_neox.layers.{i}.post_attention_layernorm"), &layer.post_attention_layernorm);
        }
        norm("gpt_neox.final_layer_norm".to_string(), &model.final_layer_norm);
        out.insert("gpt_neox.embed_in.weight".to_string(), bytes_of(model.embed_in.weight.val()));

        let views: Vec<(String, TensorView<'_>)> = out
            .iter()
            .map(|(k, (shape, data))| (k.clone(), TensorView::new(Dtype::F32, shape.clone(), data).unwrap()))
            .collect();
        safetensors::serialize_to_file(views, &None, path).unwrap();
    }

    #[test]
    fn test_imported_model_matches_exported_one() {
        let dir = tempfile::tempdir().unwrap();
        let device = Default::default();
        let config = tiny_model_config(30);
        let original: CausalLm<TestBackend> = config.init(&device);
        let path = dir.path().join(SAFETENSORS_FILE);
        export(&original, &path);

        let imported = import_safetensors::<TestBackend>(&config, &path, &device).unwrap();
        let ids = Tensor::<TestBackend, 1, Int>::from_ints([4, 9, 2, 7].as_slice(), &device).reshape([1, 4]);
        let a: Vec<f32> = original.forward(ids.clone()).into_data().to_vec().unwrap();
        let b: Vec<f32> = imported.forward(ids).into_data().to_vec().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_missing_tensor_is_named() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SAFETENSORS_FILE);
        let data = 1.0f32.to_le_bytes();
        let only = vec![("embed_out.weight", TensorView::new(Dtype::F32, vec![1, 1], &data).unwrap())];
        safetensors::serialize_to_file(only, &None, &path).unwrap();

        let err = import_safetensors::<TestBackend>(&tiny_model_config(30), &path, &Default::default())
            .unwrap_err();
        assert!(format!("{err:#}").contains("embed_in.weight"));
    }

    #[test]
    fn test_half_precision_is_widened() {
        let halves: Vec<u8> = [f16::from_f32(1.5), f16::from_f32(-0.25)]
            .iter()
            .flat_map(|v| v.to_le_bytes())
            .collect();
        let view = TensorView::new(Dtype::F16, vec![2], &halves).unwrap();
        assert_eq!(widen_to_f32(&view).unwrap(), vec![1.5, -0.25]);

        let brains: Vec<u8> = bf16::from_f32(2.0).to_le_bytes().to_vec();
        let view = TensorView::new(Dtype::BF16, vec![1], &brains).unwrap();
        assert_eq!(widen_to_f32(&view).unwrap(), vec![2.0]);
    }
}
