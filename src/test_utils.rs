// ============================================================
// Test fixtures
// ============================================================
// Small, offline stand-ins for the real artifacts:
//
//   tiny_tokenizer     → byte-level BPE over the 256 byte symbols
//                        plus <|endoftext|>, no merges, so every
//                        character of ASCII text is one token
//   tiny_model_config  → a 2-layer decoder that runs in
//                        milliseconds on NdArray
//   sample_examples    → Lamini-style question/answer records

use burn::backend::{Autodiff, NdArray};
use serde_json::{json, Map, Value};
use std::{fs, io::Write, path::Path};

use crate::domain::example::Example;
use crate::infra::tokenizer_store::TextTokenizer;
use crate::ml::model::CausalLmConfig;

pub type TestBackend = NdArray;
pub type TestAutodiffBackend = Autodiff<NdArray>;

pub const EOS: &str = "<|endoftext|>";

pub fn tiny_model_config(vocab_size: usize) -> CausalLmConfig {
    CausalLmConfig::new(vocab_size, 16, 2, 2, 32, 64).with_rotary_pct(0.5)
}

/// GPT-2's printable mapping of the 256 byte values.
fn bytes_to_unicode() -> Vec<char> {
    let mut printable: Vec<u32> = (u32::from('!')..=u32::from('~'))
        .chain(u32::from('¡')..=u32::from('¬'))
        .chain(u32::from('®')..=u32::from('ÿ'))
        .collect();
    let mut mapped = printable.clone();
    let mut n = 0;
    for b in 0..256u32 {
        if !printable.contains(&b) {
            printable.push(b);
            mapped.push(256 + n);
            n += 1;
        }
    }
    let mut table = vec!['\0'; 256];
    for (b, c) in printable.into_iter().zip(mapped) {
        table[b as usize] = char::from_u32(c).unwrap();
    }
    table
}

/// Write `dir/tokenizer.json` and load it.
pub fn tiny_tokenizer(dir: &Path) -> TextTokenizer {
    let mut vocab = Map::new();
    vocab.insert(EOS.to_string(), json!(0));
    for (byte, ch) in bytes_to_unicode().into_iter().enumerate() {
        vocab.insert(ch.to_string(), json!(byte + 1));
    }

    let byte_level = json!({
        "type": "ByteLevel",
        "add_prefix_space": false,
        "trim_offsets": true,
        "use_regex": true
    });
    let spec = json!({
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": [{
            "id": 0,
            "content": EOS,
            "single_word": false,
            "lstrip": false,
            "rstrip": false,
            "normalized": false,
            "special": true
        }],
        "normalizer": null,
        "pre_tokenizer": byte_level.clone(),
        "post_processor": null,
        "decoder": byte_level,
        "model": {
            "type": "BPE",
            "dropout": null,
            "unk_token": null,
            "continuing_subword_prefix": null,
            "end_of_word_suffix": null,
            "fuse_unk": false,
            "byte_fallback": false,
            "vocab": Value::Object(vocab),
            "merges": []
        }
    });

    fs::create_dir_all(dir).unwrap();
    let path = dir.join("tokenizer.json");
    fs::write(&path, serde_json::to_string_pretty(&spec).unwrap()).unwrap();
    TextTokenizer::from_file(&path).unwrap()
}

pub fn sample_examples(n: usize) -> Vec<Example> {
    (0..n)
        .map(|i| Example::new(format!("What is feature {i}?"), format!(" Feature {i} does X.")))
        .collect()
}

pub fn write_jsonl(path: &Path, examples: &[Example]) {
    let mut f = fs::File::create(path).unwrap();
    for ex in examples {
        writeln!(f, "{}", serde_json::to_string(ex).unwrap()).unwrap();
    }
}
