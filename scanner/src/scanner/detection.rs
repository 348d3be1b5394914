use crate::scanner::detector::{DetectorError, select_best};
use crate::scanner::resources::Resources;
use base64::DecodeError;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::{DynamicImage, ImageError};
use serde::Deserialize;
use serde_json::Number;
use std::fmt::Display;
use thiserror::Error;

pub const CATEGORY: &str = "Groceries";

#[derive(Deserialize, Debug)]
pub struct DetectRequest {
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Error, Debug)]
pub enum DetectError {
    #[error("Invalid base64 payload: {0}")]
    Base64(#[from] DecodeError),
    #[error("Invalid image: {0}")]
    Image(#[from] ImageError),
    #[error("{0}")]
    Detector(#[from] DetectorError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Reason {
    ModelUnavailable,
    NoImageData,
    NoItemDetected,
    Failure(String),
}

impl Display for Reason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Reason::ModelUnavailable => write!(f, "Server Error: model file missing"),
            Reason::NoImageData => write!(f, "No image data sent"),
            Reason::NoItemDetected => write!(f, "No item detected"),
            Reason::Failure(message) => write!(f, "{}", message),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DetectionOutcome {
    Detected {
        name: String,
        price: Number,
        confidence: f32,
    },
    NotDetected {
        reason: Reason,
    },
}

impl DetectionOutcome {
    pub fn not_detected(reason: Reason) -> Self {
        DetectionOutcome::NotDetected { reason }
    }

    pub fn failure<E: Display>(err: E) -> Self {
        DetectionOutcome::not_detected(Reason::Failure(err.to_string()))
    }
}

impl From<DetectError> for DetectionOutcome {
    fn from(value: DetectError) -> Self {
        DetectionOutcome::failure(value)
    }
}

/// Drops a `data:<mime>;base64,` header, keeping the segment between the first and second comma.
pub fn strip_data_url(image: &str) -> &str {
    image.split(',').nth(1).unwrap_or(image)
}

pub fn decode_image(payload: &str) -> Result<DynamicImage, DetectError> {
    let payload = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect::<String>();
    let bytes = STANDARD.decode(payload)?;
    Ok(image::load_from_memory(&bytes)?)
}

pub fn detect(resources: &Resources, request: DetectRequest) -> Result<DetectionOutcome, DetectError> {
    let Some(detector) = resources.detector() else {
        return Ok(DetectionOutcome::not_detected(Reason::ModelUnavailable));
    };
    let payload = request.image.as_deref().map(strip_data_url).unwrap_or_default();
    if payload.is_empty() {
        return Ok(DetectionOutcome::not_detected(Reason::NoImageData));
    }
    let image = decode_image(payload)?;
    let candidates = detector.detect(&image)?;
    let product = select_best(&candidates)
        .and_then(|best| resources.catalog().get(&best.class_name).map(|entry| (best, entry)));
    let outcome = match product {
        Some((best, entry)) => DetectionOutcome::Detected {
            name: entry.alias.clone(),
            price: entry.price.clone(),
            confidence: best.confidence,
        },
        None => DetectionOutcome::not_detected(Reason::NoItemDetected),
    };
    Ok(outcome)
}
