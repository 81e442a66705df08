//! Engine implementations.
//!
//! `build(config)` is the factory — called once at startup.
//! Adding a new backend = new module + new match arm.

#[cfg(feature = "onnx")]
pub mod onnx;
#[cfg(test)]
pub mod scripted;
pub mod uniform;

use crate::config::EngineConfig;
use crate::engine::{ClassifierEngine, EngineError};

/// Construct a `ClassifierEngine` from config.
///
/// Loading a real model is slow; callers should run this off the async
/// executor.
pub fn build(config: &EngineConfig) -> Result<ClassifierEngine, EngineError> {
    match config.provider.as_str() {
        "uniform" => Ok(ClassifierEngine::Uniform(uniform::UniformEngine)),
        #[cfg(feature = "onnx")]
        "onnx" => Ok(ClassifierEngine::Onnx(onnx::OnnxNliEngine::load(config)?)),
        #[cfg(not(feature = "onnx"))]
        "onnx" => Err(EngineError::Unavailable("onnx".into())),
        _ => Err(EngineError::UnknownProvider(config.provider.clone())),
    }
}
