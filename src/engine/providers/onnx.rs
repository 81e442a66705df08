//! ONNX Runtime NLI engine for zero-shot classification.
//!
//! Each candidate label is turned into a hypothesis (`"This example is
//! {label}."`) and paired with the input text as premise. The sequence-pair
//! classifier (e.g. an ONNX export of bart-large-mnli) yields
//! contradiction/neutral/entailment logits per pair; the entailment logits are
//! softmaxed across labels so the scores sum to 1.
//!
//! The model directory must contain `model.onnx` and `tokenizer.json`, plus
//! `config.json` with a `label2id` map unless `engine.entailment_index` is set.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use ort::session::Session;
use ort::value::Tensor;
use serde::Deserialize;
use tokenizers::{Tokenizer, TruncationParams, TruncationStrategy};
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::engine::{EngineError, EngineOutput};
use crate::labels::LabelSet;

/// Subset of the Hugging Face `config.json` we care about.
#[derive(Deserialize)]
struct ModelConfig {
    #[serde(default)]
    label2id: HashMap<String, usize>,
}

struct Inner {
    /// `Session::run` needs `&mut`; requests queue on this lock.
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    hypothesis_template: String,
    entailment_index: usize,
    pad_id: u32,
    /// BERT-style exports take segment ids; BART-style ones don't.
    wants_token_type_ids: bool,
    model_dir: PathBuf,
}

/// Zero-shot classifier backed by an NLI model in ONNX format.
///
/// Cheap to clone — the session and tokenizer are shared.
#[derive(Clone)]
pub struct OnnxNliEngine {
    inner: Arc<Inner>,
}

impl fmt::Debug for OnnxNliEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OnnxNliEngine")
            .field("model_dir", &self.inner.model_dir)
            .field("entailment_index", &self.inner.entailment_index)
            .finish_non_exhaustive()
    }
}

impl OnnxNliEngine {
    /// Load the model and tokenizer from `config.model_dir`. Blocking.
    pub fn load(config: &EngineConfig) -> Result<Self, EngineError> {
        let model_dir = &config.model_dir;
        let model_path = model_dir.join("model.onnx");
        let tokenizer_path = model_dir.join("tokenizer.json");

        if !model_path.exists() {
            return Err(EngineError::Load(format!("model.onnx not found in {}", model_dir.display())));
        }
        if !tokenizer_path.exists() {
            return Err(EngineError::Load(format!(
                "tokenizer.json not found in {}",
                model_dir.display()
            )));
        }

        let entailment_index = match config.entailment_index {
            Some(idx) => idx,
            None => entailment_index_from_config(model_dir)?,
        };

        let session = Session::builder()
            .map_err(|e| EngineError::Load(format!("onnx session builder: {e}")))?
            .commit_from_file(&model_path)
            .map_err(|e| EngineError::Load(format!("onnx session: {e}")))?;

        let wants_token_type_ids = session
            .inputs()
            .iter()
            .any(|input| input.name() == "token_type_ids");

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| EngineError::Load(format!("load tokenizer: {e}")))?;

        let pad_id = tokenizer
            .get_padding()
            .map(|p| p.pad_id)
            .or_else(|| tokenizer.token_to_id("<pad>"))
            .or_else(|| tokenizer.token_to_id("[PAD]"))
            .unwrap_or(0);

        // Truncate the premise only; the hypothesis must survive intact.
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: config.max_length,
                strategy: TruncationStrategy::OnlyFirst,
                ..Default::default()
            }))
            .map_err(|e| EngineError::Load(format!("set truncation: {e}")))?;
        // Pairs are padded by hand to the longest pair in the request.
        tokenizer.with_padding(None);

        info!(
            model = %model_path.display(),
            entailment_index,
            wants_token_type_ids,
            "loaded NLI model"
        );

        Ok(Self {
            inner: Arc::new(Inner {
                session: Mutex::new(session),
                tokenizer,
                hypothesis_template: config.hypothesis_template.clone(),
                entailment_index,
                pad_id,
                wants_token_type_ids,
                model_dir: model_dir.clone(),
            }),
        })
    }

    /// Score `text` against `labels` on a blocking thread.
    pub async fn classify(&self, text: &str, labels: &LabelSet) -> Result<EngineOutput, EngineError> {
        let inner = Arc::clone(&self.inner);
        let text = text.to_string();
        let labels = labels.clone();

        tokio::task::spawn_blocking(move || inner.score(&text, &labels))
            .await
            .map_err(|e| EngineError::Inference(format!("inference task failed: {e}")))?
    }
}

impl Inner {
    fn score(&self, text: &str, labels: &LabelSet) -> Result<EngineOutput, EngineError> {
        if labels.is_empty() {
            return Ok(EngineOutput {
                sequence: text.to_string(),
                labels: vec![],
                scores: vec![],
            });
        }

        let mut encodings = Vec::with_capacity(labels.len());
        for label in labels.iter() {
            let hypothesis = self.hypothesis_template.replacen("{}", label, 1);
            let encoding = self
                .tokenizer
                .encode((text, hypothesis.as_str()), true)
                .map_err(|e| EngineError::Tokenization(format!("label '{label}': {e}")))?;
            encodings.push(encoding);
        }

        let pairs = encodings.len();
        let seq_len = encodings.iter().map(|e| e.get_ids().len()).max().unwrap_or(0);

        // Flat [pairs, seq_len] inputs, right-padded.
        let mut input_ids = vec![i64::from(self.pad_id); pairs * seq_len];
        let mut attention_mask = vec![0i64; pairs * seq_len];
        let mut token_type_ids = vec![0i64; pairs * seq_len];

        for (i, encoding) in encodings.iter().enumerate() {
            let offset = i * seq_len;
            for (j, &id) in encoding.get_ids().iter().enumerate() {
                input_ids[offset + j] = i64::from(id);
            }
            for (j, &mask) in encoding.get_attention_mask().iter().enumerate() {
                attention_mask[offset + j] = i64::from(mask);
            }
            for (j, &tid) in encoding.get_type_ids().iter().enumerate() {
                token_type_ids[offset + j] = i64::from(tid);
            }
        }

        debug!(pairs, seq_len, "running NLI inference");

        let shape = [pairs as i64, seq_len as i64];
        let tensor = |data: Vec<i64>| {
            Tensor::from_array((shape, data.into_boxed_slice()))
                .map_err(|e| EngineError::Inference(format!("build input tensor: {e}")))
        };
        let ids_tensor = tensor(input_ids)?;
        let mask_tensor = tensor(attention_mask)?;

        let (dims, logits) = {
            let mut session = self.session.lock().unwrap_or_else(PoisonError::into_inner);
            let outputs = if self.wants_token_type_ids {
                session.run(ort::inputs![
                    "input_ids" => ids_tensor,
                    "attention_mask" => mask_tensor,
                    "token_type_ids" => tensor(token_type_ids)?,
                ])
            } else {
                session.run(ort::inputs![
                    "input_ids" => ids_tensor,
                    "attention_mask" => mask_tensor,
                ])
            }
            .map_err(|e| EngineError::Inference(e.to_string()))?;

            let (shape, data) = outputs[0]
                .try_extract_tensor::<f32>()
                .map_err(|e| EngineError::Inference(format!("extract logits: {e}")))?;
            let dims: &[i64] = shape;
            (dims.to_vec(), data.to_vec())
        };

        let classes = match dims.as_slice() {
            [n, c] if *n as usize == pairs && *c as usize > self.entailment_index => *c as usize,
            _ => {
                return Err(EngineError::Inference(format!(
                    "unexpected logits shape {dims:?}, expected [{pairs}, >{}]",
                    self.entailment_index
                )));
            }
        };

        let entailment: Vec<f32> = (0..pairs)
            .map(|i| logits[i * classes + self.entailment_index])
            .collect();

        Ok(rank(text, labels, softmax(&entailment)))
    }
}

/// Pair labels with scores, highest score first. Ties keep label order.
fn rank(text: &str, labels: &LabelSet, scores: Vec<f32>) -> EngineOutput {
    let mut ranked: Vec<(String, f32)> = labels
        .iter()
        .map(ToString::to_string)
        .zip(scores)
        .collect();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    let (labels, scores) = ranked.into_iter().unzip();
    EngineOutput {
        sequence: text.to_string(),
        labels,
        scores,
    }
}

fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&x| (x - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Find the entailment class in the model's `config.json` `label2id` map.
fn entailment_index_from_config(model_dir: &Path) -> Result<usize, EngineError> {
    let path = model_dir.join("config.json");
    let raw = fs::read_to_string(&path).map_err(|e| {
        EngineError::Load(format!(
            "cannot read {} (set engine.entailment_index to skip): {e}",
            path.display()
        ))
    })?;
    let parsed: ModelConfig = serde_json::from_str(&raw)
        .map_err(|e| EngineError::Load(format!("parse error in {}: {e}", path.display())))?;

    parsed
        .label2id
        .iter()
        .find(|(name, _)| name.to_ascii_lowercase().starts_with("entail"))
        .map(|(_, &idx)| idx)
        .ok_or_else(|| {
            EngineError::Load(format!(
                "no entailment class in label2id of {} (available: {:?})",
                path.display(),
                parsed.label2id.keys().collect::<Vec<_>>()
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn softmax_sums_to_one() {
        let probs = softmax(&[2.0, 1.0, 0.1]);
        let sum: f32 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        assert!(probs[0] > probs[1] && probs[1] > probs[2]);
    }

    #[test]
    fn softmax_is_shift_invariant() {
        let a = softmax(&[1.0, 2.0]);
        let b = softmax(&[1001.0, 1002.0]);
        assert!((a[0] - b[0]).abs() < 1e-5);
    }

    #[test]
    fn rank_sorts_descending_and_keeps_tie_order() {
        let labels = LabelSet::new(["a", "b", "c"]);
        let out = rank("t", &labels, vec![0.2, 0.4, 0.4]);
        assert_eq!(out.labels, vec!["b", "c", "a"]);
        assert_eq!(out.scores, vec![0.4, 0.4, 0.2]);
    }

    #[test]
    fn entailment_index_read_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let mut f = fs::File::create(dir.path().join("config.json")).unwrap();
        f.write_all(br#"{"label2id": {"contradiction": 0, "neutral": 1, "entailment": 2}}"#)
            .unwrap();
        assert_eq!(entailment_index_from_config(dir.path()).unwrap(), 2);
    }

    #[test]
    fn entailment_index_missing_class_errors() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("config.json"), r#"{"label2id": {"LABEL_0": 0}}"#).unwrap();
        let err = entailment_index_from_config(dir.path()).unwrap_err();
        assert!(err.to_string().contains("no entailment class"));
    }

    #[test]
    fn load_without_model_errors() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = crate::config::Config::test_default(Path::new("labels.json")).engine;
        cfg.provider = "onnx".into();
        cfg.model_dir = dir.path().to_path_buf();
        let err = OnnxNliEngine::load(&cfg).unwrap_err();
        assert!(err.to_string().contains("model.onnx not found"));
    }

    /// Needs an ONNX export of an NLI model, e.g.
    /// `optimum-cli export onnx --model facebook/bart-large-mnli models/bart-large-mnli`.
    #[tokio::test]
    #[ignore = "requires models/bart-large-mnli"]
    async fn classifies_with_real_model() {
        let mut cfg = crate::config::Config::test_default(Path::new("labels.json")).engine;
        cfg.provider = "onnx".into();
        cfg.model_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("models/bart-large-mnli");
        let engine = OnnxNliEngine::load(&cfg).unwrap();

        let labels = LabelSet::new(["sports", "politics", "cooking"]);
        let out = engine
            .classify("The striker scored twice in the final minutes.", &labels)
            .await
            .unwrap();
        assert_eq!(out.labels[0], "sports");
        let sum: f32 = out.scores.iter().sum();
        assert!((sum - 1.0).abs() < 1e-4);
    }
}
