//! Candidate label loading.
//!
//! The label file is JSON with a single meaningful key:
//!
//! ```json
//! { "candidate_labels": ["billing", "technical", "account"] }
//! ```
//!
//! Loaded once at startup. Every failure here is fatal: the service must
//! not accept traffic without its labels.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

/// Key holding the label list inside the label file.
pub const LABELS_KEY: &str = "candidate_labels";

#[derive(Debug, Error)]
pub enum LabelsError {
    #[error("label file not found: {0}")]
    NotFound(PathBuf),

    #[error("cannot read label file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("error parsing label file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("label file {path} must contain 'candidate_labels' as a list of strings: {reason}")]
    Shape { path: PathBuf, reason: String },
}

/// Ordered, immutable set of candidate labels.
///
/// Cheap to clone — backed by an `Arc<[String]>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSet {
    labels: Arc<[String]>,
}

impl LabelSet {
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            labels: labels.into_iter().map(Into::into).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.labels
    }

    pub fn contains(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }
}

/// Read and validate the label file at `path`.
pub fn load(path: &Path) -> Result<LabelSet, LabelsError> {
    let raw = fs::read_to_string(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => LabelsError::NotFound(path.to_path_buf()),
        _ => LabelsError::Read {
            path: path.to_path_buf(),
            source: e,
        },
    })?;

    parse(path, &raw)
}

/// Parse label file contents. `path` is only used for error messages.
fn parse(path: &Path, raw: &str) -> Result<LabelSet, LabelsError> {
    let doc: Value = serde_json::from_str(raw).map_err(|e| LabelsError::Parse {
        path: path.to_path_buf(),
        source: e,
    })?;

    let shape_err = |reason: String| LabelsError::Shape {
        path: path.to_path_buf(),
        reason,
    };

    let Some(root) = doc.as_object() else {
        return Err(shape_err("top level is not an object".into()));
    };

    let list = match root.get(LABELS_KEY) {
        Some(Value::Array(items)) => items,
        Some(other) => return Err(shape_err(format!("found {}", json_kind(other)))),
        None => return Err(shape_err("key is missing".into())),
    };

    let labels = list
        .iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::String(s) => Ok(s.clone()),
            other => Err(shape_err(format!("item {i} is {}", json_kind(other)))),
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(LabelSet::new(labels))
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
