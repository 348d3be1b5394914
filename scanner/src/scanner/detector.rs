use image::DynamicImage;
use thiserror::Error;

/// A detection has to score strictly above this to count.
pub const CONFIDENCE_FLOOR: f32 = 0.5;

#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("Failed to load model: {0}")]
    Load(String),
    #[error("Inference failed: {0}")]
    Inference(String),
    #[error("Unexpected model output: {0}")]
    UnexpectedOutput(String),
    #[error("Inference session is poisoned")]
    Poisoned,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub class_id: usize,
    pub class_name: String,
    pub confidence: f32,
    pub bbox: [f32; 4], // [x_min, y_min, x_max, y_max] in source pixels
}

pub trait Detector: Send + Sync {
    fn detect(&self, image: &DynamicImage) -> Result<Vec<Candidate>, DetectorError>;
}

pub fn select_best(candidates: &[Candidate]) -> Option<&Candidate> {
    let mut best: Option<&Candidate> = None;
    let mut best_confidence = 0.0_f32;
    for candidate in candidates {
        if candidate.confidence > CONFIDENCE_FLOOR && candidate.confidence > best_confidence {
            best_confidence = candidate.confidence;
            best = Some(candidate);
        }
    }
    best
}
