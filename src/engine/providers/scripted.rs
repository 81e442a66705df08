//! Scripted engine — replays a fixed sequence of responses.
//!
//! Each call consumes the next response; the last one repeats forever. Lets
//! tests pin exact scores, failures and malformed outputs without loading a
//! model. Compiled for tests only.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use crate::engine::{EngineError, EngineOutput};
use crate::labels::LabelSet;

/// One canned engine response.
#[derive(Debug, Clone)]
pub enum Scripted {
    /// Echo the input text and return these labels and scores.
    Scores { labels: Vec<String>, scores: Vec<f32> },
    /// Return this output verbatim.
    Output(EngineOutput),
    /// Fail with this message.
    Fail(String),
}

#[derive(Debug, Clone)]
pub struct ScriptedEngine {
    script: Arc<Mutex<VecDeque<Scripted>>>,
}

impl ScriptedEngine {
    pub fn new(responses: impl IntoIterator<Item = Scripted>) -> Self {
        Self {
            script: Arc::new(Mutex::new(responses.into_iter().collect())),
        }
    }

    /// Engine that always answers with `labels` / `scores`.
    pub fn scores(labels: &[&str], scores: &[f32]) -> Self {
        Self::new([Scripted::Scores {
            labels: labels.iter().map(ToString::to_string).collect(),
            scores: scores.to_vec(),
        }])
    }

    /// Engine that always fails with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self::new([Scripted::Fail(message.into())])
    }

    pub fn classify(&self, text: &str, _labels: &LabelSet) -> Result<EngineOutput, EngineError> {
        let next = {
            let mut script = self.script.lock().unwrap_or_else(PoisonError::into_inner);
            if script.len() > 1 { script.pop_front() } else { script.front().cloned() }
        };

        match next {
            Some(Scripted::Scores { labels, scores }) => Ok(EngineOutput {
                sequence: text.to_string(),
                labels,
                scores,
            }),
            Some(Scripted::Output(output)) => Ok(output),
            Some(Scripted::Fail(message)) => Err(EngineError::Scripted(message)),
            None => Err(EngineError::Scripted("script is empty".into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels() -> LabelSet {
        LabelSet::new(["a", "b"])
    }

    #[test]
    fn scores_echo_input() {
        let engine = ScriptedEngine::scores(&["a", "b"], &[0.3, 0.7]);
        let out = engine.classify("hello", &labels()).unwrap();
        assert_eq!(out.sequence, "hello");
        assert_eq!(out.scores, vec![0.3, 0.7]);
    }

    #[test]
    fn responses_are_consumed_in_order_and_last_repeats() {
        let engine = ScriptedEngine::new([
            Scripted::Fail("boom".into()),
            Scripted::Scores { labels: vec!["a".into()], scores: vec![1.0] },
        ]);
        assert!(engine.classify("x", &labels()).is_err());
        assert!(engine.classify("x", &labels()).is_ok());
        assert!(engine.classify("x", &labels()).is_ok());
    }

    #[test]
    fn verbatim_output_is_returned_unchanged() {
        let output = EngineOutput {
            sequence: "normalised".into(),
            labels: vec!["b".into()],
            scores: vec![0.5],
        };
        let engine = ScriptedEngine::new([Scripted::Output(output.clone())]);
        assert_eq!(engine.classify("raw", &labels()).unwrap(), output);
    }

    #[test]
    fn empty_script_errors() {
        let engine = ScriptedEngine::new([]);
        let err = engine.classify("x", &labels()).unwrap_err();
        assert!(err.to_string().contains("script is empty"));
    }

    #[test]
    fn clones_share_the_script() {
        let engine = ScriptedEngine::new([
            Scripted::Fail("first".into()),
            Scripted::Fail("second".into()),
        ]);
        let twin = engine.clone();
        assert_eq!(engine.classify("x", &labels()).unwrap_err().to_string(), "first");
        assert_eq!(twin.classify("x", &labels()).unwrap_err().to_string(), "second");
    }
}
