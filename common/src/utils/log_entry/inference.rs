use std::path::Display;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InferenceEntry<'a> {
    #[error("Model file {0} not found, detection is unavailable")]
    ModelNotFound(Display<'a>),
    #[error("Failed to load model {0}: {1}")]
    ModelLoadError(Display<'a>, String),
    #[error("Model {0} loaded with {1} classes")]
    ModelLoaded(Display<'a>, usize),
    #[error("Catalog file {0} not found, using an empty catalog")]
    CatalogNotFound(Display<'a>),
    #[error("Failed to load catalog {0}: {1}, using an empty catalog")]
    CatalogLoadError(Display<'a>, String),
    #[error("Catalog {0} loaded with {1} products")]
    CatalogLoaded(Display<'a>, usize),
    #[error("Detection failed: {0}")]
    DetectionFailed(String),
    #[error("Detected {0} with confidence {1:.3}")]
    ItemDetected(String, f32),
}

impl From<InferenceEntry<'_>> for String {
    #[inline(always)]
    fn from(value: InferenceEntry) -> Self {
        value.to_string()
    }
}
