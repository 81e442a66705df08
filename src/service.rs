//! Classification service — the immutable context shared by all handlers.
//!
//! [`ClassifierContext::initialize`] runs once at startup: it loads the
//! candidate labels, then builds the engine. The returned value is wrapped in
//! an `Arc` and never mutated, so handlers read it without locking.

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::Config;
use crate::engine::{ClassifierEngine, EngineOutput, providers};
use crate::error::AppError;
use crate::labels::{self, LabelSet};

// ── Types ─────────────────────────────────────────────────────────────────────

/// Best label for one input text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    /// Input text as echoed by the engine.
    pub text: String,
    pub predicted_label: String,
    pub confidence: f32,
}

/// Snapshot returned by [`ClassifierContext::health`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub config_loaded: bool,
    pub num_labels: usize,
}

/// Per-request failures. Both map to a server error at the HTTP boundary.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Candidate labels not loaded. Check configuration.")]
    NotReady,
    #[error("Classification error: {0}")]
    Classification(String),
}

impl ServiceError {
    /// Stable machine-readable code for error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::NotReady => "service_not_ready",
            ServiceError::Classification(_) => "classification_error",
        }
    }
}

// ── ClassifierContext ─────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ClassifierContext {
    labels: LabelSet,
    engine: ClassifierEngine,
}

impl ClassifierContext {
    pub fn new(labels: LabelSet, engine: ClassifierEngine) -> Self {
        Self { labels, engine }
    }

    /// Load labels and build the engine from `config`.
    ///
    /// Blocking: engine construction may load a large model. Any error here
    /// must stop the process before the listener binds.
    pub fn initialize(config: &Config) -> Result<Self, AppError> {
        let labels = labels::load(&config.labels_path)?;
        if labels.is_empty() {
            return Err(AppError::Startup(format!(
                "no candidate labels in {}",
                config.labels_path.display()
            )));
        }
        info!(
            num_labels = labels.len(),
            path = %config.labels_path.display(),
            "candidate labels loaded"
        );

        let engine = providers::build(&config.engine)?;
        info!(engine = engine.name(), "engine ready");

        Ok(Self::new(labels, engine))
    }

    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    pub fn engine(&self) -> &ClassifierEngine {
        &self.engine
    }

    /// Classify `text` into the single best-scoring candidate label.
    pub async fn classify(&self, text: &str) -> Result<Classification, ServiceError> {
        if self.labels.is_empty() {
            return Err(ServiceError::NotReady);
        }

        let output = self
            .engine
            .classify(text, &self.labels)
            .await
            .map_err(|e| ServiceError::Classification(e.to_string()))?;

        let result = self.pick(output).map_err(ServiceError::Classification)?;
        debug!(
            label = %result.predicted_label,
            confidence = result.confidence,
            "classified"
        );
        Ok(result)
    }

    /// Readiness snapshot. Pure read; never fails.
    pub fn health(&self) -> HealthReport {
        HealthReport {
            status: "healthy",
            config_loaded: !self.labels.is_empty(),
            num_labels: self.labels.len(),
        }
    }

    fn pick(&self, output: EngineOutput) -> Result<Classification, String> {
        let EngineOutput { sequence, mut labels, scores } = output;

        if labels.len() != scores.len() {
            return Err(format!(
                "engine returned {} labels but {} scores",
                labels.len(),
                scores.len()
            ));
        }
        if scores.is_empty() {
            return Err("engine returned no scores".into());
        }

        let idx = select_best(&scores).ok_or("engine returned no comparable scores")?;
        let predicted_label = labels.swap_remove(idx);
        if !self.labels.contains(&predicted_label) {
            return Err(format!("engine returned unknown label '{predicted_label}'"));
        }

        Ok(Classification {
            text: sequence,
            predicted_label,
            confidence: scores[idx],
        })
    }
}

/// Index of the highest score; the first one wins a tie. NaN never wins.
pub fn select_best(scores: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &score) in scores.iter().enumerate() {
        if score.is_nan() {
            continue;
        }
        match best {
            Some((_, top)) if score <= top => {}
            _ => best = Some((i, score)),
        }
    }
    best.map(|(i, _)| i)
}
