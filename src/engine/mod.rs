//! Zero-shot inference engine abstraction.
//!
//! `ClassifierEngine` is an enum over concrete engine implementations.
//! Add a new variant + module in `providers/` for each additional backend.
//!
//! The service treats every engine as an opaque function
//! `text + candidate labels → per-label scores`. Engines are built once at
//! startup and shared immutably afterwards — clone them freely.

pub mod providers;

use thiserror::Error;

use crate::labels::LabelSet;

// ── Error ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unknown engine provider: {0}")]
    UnknownProvider(String),
    #[error(
        "engine provider '{0}' is not compiled in (rebuild with `--features {0}`, or set provider = \"uniform\")"
    )]
    Unavailable(String),
    #[error("model load failed: {0}")]
    Load(String),
    #[error("tokenization failed: {0}")]
    Tokenization(String),
    #[error("inference failed: {0}")]
    Inference(String),
    #[cfg(test)]
    #[error("{0}")]
    Scripted(String),
}

// ── Output ────────────────────────────────────────────────────────────────────

/// Raw engine result for one input text.
///
/// `labels[i]` is scored by `scores[i]`. Engines may reorder labels (the
/// ONNX engine returns them sorted by descending score) and may normalise
/// the input text into `sequence`.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineOutput {
    pub sequence: String,
    pub labels: Vec<String>,
    pub scores: Vec<f32>,
}

// ── Engine enum ───────────────────────────────────────────────────────────────

/// All available engine backends.
///
/// Enum dispatch avoids `dyn` trait objects and the `async-trait` dependency.
/// Adding a backend = new module + new variant + new `classify` arm.
#[derive(Debug, Clone)]
pub enum ClassifierEngine {
    Uniform(providers::uniform::UniformEngine),
    #[cfg(test)]
    Scripted(providers::scripted::ScriptedEngine),
    #[cfg(feature = "onnx")]
    Onnx(providers::onnx::OnnxNliEngine),
}

impl ClassifierEngine {
    /// Backend name, as used for `engine.provider` in the settings file.
    pub fn name(&self) -> &'static str {
        match self {
            ClassifierEngine::Uniform(_) => "uniform",
            #[cfg(test)]
            ClassifierEngine::Scripted(_) => "scripted",
            #[cfg(feature = "onnx")]
            ClassifierEngine::Onnx(_) => "onnx",
        }
    }

    /// Score `text` against every candidate label.
    pub async fn classify(&self, text: &str, labels: &LabelSet) -> Result<EngineOutput, EngineError> {
        match self {
            ClassifierEngine::Uniform(e) => e.classify(text, labels),
            #[cfg(test)]
            ClassifierEngine::Scripted(e) => e.classify(text, labels),
            #[cfg(feature = "onnx")]
            ClassifierEngine::Onnx(e) => e.classify(text, labels).await,
        }
    }
}
