//! Uniform engine — gives every candidate the same score.
//! Used for smoke-testing the HTTP round-trip without model files.

use crate::engine::{EngineError, EngineOutput};
use crate::labels::LabelSet;

#[derive(Debug, Clone)]
pub struct UniformEngine;

impl UniformEngine {
    pub fn classify(&self, text: &str, labels: &LabelSet) -> Result<EngineOutput, EngineError> {
        let score = if labels.is_empty() { 0.0 } else { 1.0 / labels.len() as f32 };
        Ok(EngineOutput {
            sequence: text.to_string(),
            labels: labels.as_slice().to_vec(),
            scores: vec![score; labels.len()],
        })
    }
}
