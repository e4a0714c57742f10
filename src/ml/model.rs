// ============================================================
// Layer 5 — Causal Language Model (Burn)
// ============================================================
// A GPT-NeoX style decoder, the architecture of the Pythia
// family used as base checkpoints:
//
//   token embedding
//     └── N × decoder block
//           ├── pre-norm multi-head self-attention
//           │     (causal mask, rotary embedding on the first
//           │      `rotary_pct` of every head dimension)
//           └── pre-norm GELU MLP
//               combined with a parallel residual:
//                 x + attn(ln1(x)) + mlp(ln2(x))
//   final layer norm
//   untied output projection → vocabulary logits
//
// Reference: Black et al. (2022) GPT-NeoX-20B
//            Su et al. (2021) RoFormer

use anyhow::{bail, Result};
use burn::{
    nn::{
        attention::generate_autoregressive_mask,
        Embedding, EmbeddingConfig,
        LayerNorm, LayerNormConfig,
        Linear, LinearConfig,
    },
    prelude::*,
    tensor::activation::{gelu, log_softmax, softmax},
};

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize.
#[derive(Config, Debug)]
pub struct CausalLmConfig {
    pub vocab_size:              usize,
    pub hidden_size:             usize,
    pub num_hidden_layers:       usize,
    pub num_attention_heads:     usize,
    pub intermediate_size:       usize,
    pub max_position_embeddings: usize,
    #[config(default = 0.25)]
    pub rotary_pct:              f64,
    #[config(default = 10000.0)]
    pub rotary_emb_base:         f64,
    #[config(default = 1e-5)]
    pub layer_norm_eps:          f64,
    #[config(default = true)]
    pub use_parallel_residual:   bool,
}

impl CausalLmConfig {
    /// Architecture of EleutherAI/pythia-70m for a given vocabulary.
    pub fn pythia_70m(vocab_size: usize) -> Self {
        Self::new(vocab_size, 512, 6, 8, 2048, 2048)
    }

    pub fn head_dim(&self) -> usize {
        self.hidden_size / self.num_attention_heads
    }

    /// Rotary dimensions per head, rounded down to an even count.
    pub fn rotary_ndims(&self) -> usize {
        let n = (self.head_dim() as f64 * self.rotary_pct) as usize;
        n - n % 2
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_attention_heads == 0 || self.hidden_size % self.num_attention_heads != 0 {
            bail!(
                "hidden_size ({}) must be divisible by num_attention_heads ({})",
                self.hidden_size, self.num_attention_heads
            );
        }
        if !(0.0..=1.0).contains(&self.rotary_pct) {
            bail!("rotary_pct must be within [0, 1], got {}", self.rotary_pct);
        }
        if self.vocab_size == 0 || self.max_position_embeddings == 0 {
            bail!("vocab_size and max_position_embeddings must be non-zero");
        }
        Ok(())
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> CausalLm<B> {
        let embed_in = EmbeddingConfig::new(self.vocab_size, self.hidden_size).init(device);
        let layers = (0..self.num_hidden_layers)
            .map(|_| self.build_block(device))
            .collect();
        let final_layer_norm = LayerNormConfig::new(self.hidden_size)
            .with_epsilon(self.layer_norm_eps)
            .init(device);
        let embed_out = LinearConfig::new(self.hidden_size, self.vocab_size)
            .with_bias(false)
            .init(device);
        CausalLm {
            embed_in, layers, final_layer_norm, embed_out,
            max_position_embeddings: self.max_position_embeddings,
        }
    }

    fn build_block<B: Backend>(&self, device: &B::Device) -> DecoderBlock<B> {
        let norm = || {
            LayerNormConfig::new(self.hidden_size)
                .with_epsilon(self.layer_norm_eps)
                .init(device)
        };
        let attention = Attention {
            query_key_value: LinearConfig::new(self.hidden_size, 3 * self.hidden_size).init(device),
            dense:           LinearConfig::new(self.hidden_size, self.hidden_size).init(device),
            num_heads:       self.num_attention_heads,
            head_dim:        self.head_dim(),
            rotary_ndims:    self.rotary_ndims(),
            rotary_base:     self.rotary_emb_base,
        };
        DecoderBlock {
            input_layernorm:          norm(),
            post_attention_layernorm: norm(),
            attention,
            mlp_in:  LinearConfig::new(self.hidden_size, self.intermediate_size).init(device),
            mlp_out: LinearConfig::new(self.intermediate_size, self.hidden_size).init(device),
            parallel_residual: self.use_parallel_residual,
        }
    }
}

// ─── Attention ────────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct Attention<B: Backend> {
    pub query_key_value: Linear<B>,
    pub dense:           Linear<B>,
    pub num_heads:       usize,
    pub head_dim:        usize,
    pub rotary_ndims:    usize,
    pub rotary_base:     f64,
}

impl<B: Backend> Attention<B> {
    /// x: [batch, seq_len, hidden] → [batch, seq_len, hidden]
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        let [batch, seq_len, hidden] = x.dims();
        let (nh, hd) = (self.num_heads, self.head_dim);
        let device = x.device();

        // GPT-NeoX packs q, k, v per head: [.., heads, 3 * head_dim]
        let qkv = self.query_key_value.forward(x)
            .reshape([batch, seq_len, nh, 3 * hd])
            .swap_dims(1, 2); // [batch, heads, seq_len, 3 * head_dim]
        let q = qkv.clone().slice([0..batch, 0..nh, 0..seq_len, 0..hd]);
        let k = qkv.clone().slice([0..batch, 0..nh, 0..seq_len, hd..2 * hd]);
        let v = qkv.slice([0..batch, 0..nh, 0..seq_len, 2 * hd..3 * hd]);

        let (q, k) = if self.rotary_ndims > 0 {
            let (cos, sin) = rotary_tables::<B>(seq_len, self.rotary_ndims, self.rotary_base, &device);
            let shape = [batch, nh, seq_len, self.rotary_ndims];
            let cos = cos.reshape([1, 1, seq_len, self.rotary_ndims]).expand(shape);
            let sin = sin.reshape([1, 1, seq_len, self.rotary_ndims]).expand(shape);
            (
                apply_rotary(q, cos.clone(), sin.clone(), self.rotary_ndims),
                apply_rotary(k, cos, sin, self.rotary_ndims),
            )
        } else {
            (q, k)
        };

        let scores = q.matmul(k.swap_dims(2, 3)) / (hd as f64).sqrt();
        let mask = generate_autoregressive_mask::<B>(batch, seq_len, &device)
            .unsqueeze_dim::<4>(1)
            .expand([batch, nh, seq_len, seq_len]);
        let probs = softmax(scores.mask_fill(mask, -1.0e9), 3);

        let context = probs.matmul(v)
            .swap_dims(1, 2)
            .reshape([batch, seq_len, hidden]);
        self.dense.forward(context)
    }
}

/// cos/sin tables of shape [seq_len, rotary_ndims], laid out as
/// `cat(freqs, freqs)` to pair with `rotate_half`.
pub fn rotary_tables<B: Backend>(
    seq_len: usize,
    rotary_ndims: usize,
    base: f64,
    device: &B::Device,
) -> (Tensor<B, 2>, Tensor<B, 2>) {
    let half = rotary_ndims / 2;
    let mut angles = Vec::with_capacity(seq_len * rotary_ndims);
    for pos in 0..seq_len {
        for i in 0..rotary_ndims {
            let inv_freq = base.powf(-((2 * (i % half)) as f64) / rotary_ndims as f64);
            angles.push((pos as f64 * inv_freq) as f32);
        }
    }
    let angles = Tensor::<B, 1>::from_floats(angles.as_slice(), device)
        .reshape([seq_len, rotary_ndims]);
    (angles.clone().cos(), angles.sin())
}

fn rotate_half<B: Backend>(x: Tensor<B, 4>) -> Tensor<B, 4> {
    let [b, h, s, d] = x.dims();
    let x1 = x.clone().slice([0..b, 0..h, 0..s, 0..d / 2]);
    let x2 = x.slice([0..b, 0..h, 0..s, d / 2..d]);
    Tensor::cat(vec![x2.neg(), x1], 3)
}

fn apply_rotary<B: Backend>(
    x: Tensor<B, 4>,
    cos: Tensor<B, 4>,
    sin: Tensor<B, 4>,
    rotary_ndims: usize,
) -> Tensor<B, 4> {
    let [b, h, s, d] = x.dims();
    let x_rot = x.clone().slice([0..b, 0..h, 0..s, 0..rotary_ndims]);
    let rotated = x_rot.clone() * cos + rotate_half(x_rot) * sin;
    if rotary_ndims == d {
        rotated
    } else {
        let x_pass = x.slice([0..b, 0..h, 0..s, rotary_ndims..d]);
        Tensor::cat(vec![rotated, x_pass], 3)
    }
}

// ─── Decoder Block ────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct DecoderBlock<B: Backend> {
    pub input_layernorm:          LayerNorm<B>,
    pub post_attention_layernorm: LayerNorm<B>,
    pub attention:                Attention<B>,
    pub mlp_in:                   Linear<B>,
    pub mlp_out:                  Linear<B>,
    pub parallel_residual:        bool,
}

impl<B: Backend> DecoderBlock<B> {
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        let attn = self.attention.forward(self.input_layernorm.forward(x.clone()));
        if self.parallel_residual {
            let mlp = self.mlp(self.post_attention_layernorm.forward(x.clone()));
            x + attn + mlp
        } else {
            let x = x + attn;
            let mlp = self.mlp(self.post_attention_layernorm.forward(x.clone()));
            x + mlp
        }
    }

    fn mlp(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        self.mlp_out.forward(gelu(self.mlp_in.forward(x)))
    }
}

// ─── Model ────────────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct CausalLm<B: Backend> {
    pub embed_in:                Embedding<B>,
    pub layers:                  Vec<DecoderBlock<B>>,
    pub final_layer_norm:        LayerNorm<B>,
    pub embed_out:               Linear<B>,
    pub max_position_embeddings: usize,
}

impl<B: Backend> CausalLm<B> {
    /// Device the parameters live on.
    pub fn device(&self) -> B::Device {
        self.embed_in.weight.val().device()
    }

    /// input_ids: [batch, seq_len] → logits: [batch, seq_len, vocab]
    pub fn forward(&self, input_ids: Tensor<B, 2, Int>) -> Tensor<B, 3> {
        let mut x = self.embed_in.forward(input_ids);
        for layer in &self.layers {
            x = layer.forward(x);
        }
        self.embed_out.forward(self.final_layer_norm.forward(x))
    }

    /// Mean next-token cross entropy over non-padded positions.
    ///
    /// Position t predicts token t + 1; a target counts only where
    /// `attention_mask` is 1. Requires seq_len >= 2.
    pub fn forward_loss(
        &self,
        input_ids:      Tensor<B, 2, Int>,
        attention_mask: Tensor<B, 2, Int>,
    ) -> Tensor<B, 1> {
        let [batch, seq_len] = input_ids.dims();
        let logits = self.forward(input_ids.clone());
        let vocab = logits.dims()[2];
        let n = batch * (seq_len - 1);

        let logits = logits
            .slice([0..batch, 0..seq_len - 1, 0..vocab])
            .reshape([n, vocab]);
        let targets = input_ids
            .slice([0..batch, 1..seq_len])
            .reshape([n, 1]);
        let mask = attention_mask
            .slice([0..batch, 1..seq_len])
            .reshape([n])
            .float();

        let token_log_probs = log_softmax(logits, 1).gather(1, targets).reshape([n]);
        let count = mask.clone().sum();
        (token_log_probs * mask).sum().neg() / count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{tiny_model_config, TestBackend};

    #[test]
    fn test_forward_shape() {
        let device = Default::default();
        let cfg = tiny_model_config(50);
        let model: CausalLm<TestBackend> = cfg.init(&device);
        let ids = Tensor::<TestBackend, 1, Int>::from_ints([1, 2, 3, 4, 5, 6].as_slice(), &device)
            .reshape([2, 3]);
        assert_eq!(model.forward(ids).dims(), [2, 3, 50]);
    }

    #[test]
    fn test_loss_is_finite_and_positive() {
        let device = Default::default();
        let model: CausalLm<TestBackend> = tiny_model_config(50).init(&device);
        let ids = Tensor::<TestBackend, 1, Int>::from_ints([3, 4, 5, 0, 7, 8, 9, 10].as_slice(), &device)
            .reshape([2, 4]);
        let mask = Tensor::<TestBackend, 1, Int>::from_ints([1, 1, 1, 0, 1, 1, 1, 1].as_slice(), &device)
            .reshape([2, 4]);
        let loss: f64 = model.forward_loss(ids, mask).into_scalar().elem::<f64>();
        assert!(loss.is_finite());
        assert!(loss > 0.0);
    }

    #[test]
    fn test_causal_prefix_logits_ignore_future_tokens() {
        let device = Default::default();
        let model: CausalLm<TestBackend> = tiny_model_config(50).init(&device);
        let a = Tensor::<TestBackend, 1, Int>::from_ints([5, 6, 7].as_slice(), &device).reshape([1, 3]);
        let b = Tensor::<TestBackend, 1, Int>::from_ints([5, 6, 9].as_slice(), &device).reshape([1, 3]);
        let la = model.forward(a).slice([0..1, 0..2, 0..50]).into_data().to_vec::<f32>().unwrap();
        let lb = model.forward(b).slice([0..1, 0..2, 0..50]).into_data().to_vec::<f32>().unwrap();
        for (x, y) in la.iter().zip(lb.iter()) {
            assert!((x - y).abs() < 1e-4);
        }
    }

    #[test]
    fn test_rotary_ndims_even() {
        let mut cfg = tiny_model_config(50);
        cfg.rotary_pct = 0.3;
        assert_eq!(cfg.rotary_ndims() % 2, 0);
    }

    #[test]
    fn test_invalid_heads_rejected() {
        let mut cfg = tiny_model_config(50);
        cfg.num_attention_heads = 3;
        assert!(cfg.validate().is_err());
    }
}
