use crate::scanner::detector::{Candidate, Detector, DetectorError};
use crate::utils::config::Config;
use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgb, RgbImage};
use ort::session::Session;
use ort::session::builder::GraphOptimizationLevel;
use ort::value::Tensor;
use std::collections::BTreeMap;
use std::fmt::Display;
use std::fs;
use std::path::Path;
use std::sync::Mutex;

const PAD_VALUE: u8 = 114;
const BOX_ATTRIBUTES: usize = 4;
const NAMES_METADATA_KEY: &str = "names";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YoloParams {
    pub input_size: u32,
    pub candidate_threshold: f32,
    pub iou_threshold: f32,
    pub max_detections: usize,
}

impl From<&Config> for YoloParams {
    fn from(config: &Config) -> Self {
        Self {
            input_size: config.input_size,
            candidate_threshold: config.candidate_threshold,
            iou_threshold: config.iou_threshold,
            max_detections: config.max_detections,
        }
    }
}

pub struct YoloDetector {
    session: Mutex<Session>,
    labels: Vec<String>,
    params: YoloParams,
}

impl YoloDetector {
    pub fn load(model_path: &Path, labels_path: Option<&Path>, params: YoloParams) -> Result<Self, DetectorError> {
        let builder = Session::builder().map_err(load_error)?;
        let builder = builder.with_optimization_level(GraphOptimizationLevel::Level3).map_err(load_error)?;
        let session = builder.commit_from_file(model_path).map_err(load_error)?;
        let labels = match labels_path {
            Some(labels_path) => load_labels(labels_path)?,
            None => {
                let names = session.metadata().ok().and_then(|metadata| metadata.custom(NAMES_METADATA_KEY).ok().flatten());
                names.map(|names| parse_names(&names)).unwrap_or_default()
            }
        };
        Ok(Self {
            session: Mutex::new(session),
            labels,
            params,
        })
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }
}

impl Detector for YoloDetector {
    fn detect(&self, image: &DynamicImage) -> Result<Vec<Candidate>, DetectorError> {
        let size = self.params.input_size;
        let (input, letterbox) = letterbox(image, size)?;
        let input = Tensor::from_array(([1_usize, 3, size as usize, size as usize], input)).map_err(inference_error)?;
        let mut session = self.session.lock().map_err(|_| DetectorError::Poisoned)?;
        let outputs = session.run(ort::inputs![input]).map_err(inference_error)?;
        let (shape, data) = outputs[0].try_extract_tensor::<f32>().map_err(inference_error)?;
        let dims = shape.iter().copied().collect::<Vec<i64>>();
        let candidates = decode(&dims, data, &letterbox, self.params.candidate_threshold, &self.labels)?;
        Ok(non_maximum_suppression(candidates, self.params.iou_threshold, self.params.max_detections))
    }
}

fn load_error<E: Display>(err: E) -> DetectorError {
    DetectorError::Load(err.to_string())
}

fn inference_error<E: Display>(err: E) -> DetectorError {
    DetectorError::Inference(err.to_string())
}

fn load_labels(path: &Path) -> Result<Vec<String>, DetectorError> {
    let content = fs::read_to_string(path)
        .map_err(|err| DetectorError::Load(format!("{}: {}", path.display(), err)))?;
    Ok(content.lines().map(|line| line.trim().to_string()).collect())
}

/// Parses the exporter's mapping literal, e.g. `{0: 'apple', 1: 'banana'}`.
fn parse_names(literal: &str) -> Vec<String> {
    let mut names = BTreeMap::new();
    let mut rest = literal.trim().trim_start_matches('{').trim_end_matches('}');
    while let Some((key, tail)) = rest.split_once(':') {
        let Ok(index) = key.trim().trim_start_matches(',').trim().parse::<usize>() else {
            break;
        };
        let tail = tail.trim_start();
        let Some(quote) = tail.chars().next().filter(|c| *c == '\'' || *c == '"') else {
            break;
        };
        let Some(end) = tail[1..].find(quote) else {
            break;
        };
        names.insert(index, tail[1..1 + end].to_string());
        rest = &tail[end + 2..];
    }
    let len = names.keys().next_back().map_or(0, |last| last + 1);
    (0..len)
        .map(|index| names.get(&index).cloned().unwrap_or_else(|| index.to_string()))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Letterbox {
    scale: f32,
    pad_x: f32,
    pad_y: f32,
    width: u32,
    height: u32,
}

impl Letterbox {
    fn new(width: u32, height: u32, size: u32) -> Self {
        let scale = (size as f32 / width as f32).min(size as f32 / height as f32);
        let (new_width, new_height) = Self::scaled(width, height, scale, size);
        Self {
            scale,
            pad_x: ((size - new_width) / 2) as f32,
            pad_y: ((size - new_height) / 2) as f32,
            width,
            height,
        }
    }

    fn scaled(width: u32, height: u32, scale: f32, size: u32) -> (u32, u32) {
        let new_width = ((width as f32 * scale).round() as u32).clamp(1, size);
        let new_height = ((height as f32 * scale).round() as u32).clamp(1, size);
        (new_width, new_height)
    }

    fn restore(&self, bbox: [f32; 4]) -> [f32; 4] {
        let x = |value: f32| ((value - self.pad_x) / self.scale).clamp(0.0, self.width as f32);
        let y = |value: f32| ((value - self.pad_y) / self.scale).clamp(0.0, self.height as f32);
        [x(bbox[0]), y(bbox[1]), x(bbox[2]), y(bbox[3])]
    }
}

fn letterbox(image: &DynamicImage, size: u32) -> Result<(Vec<f32>, Letterbox), DetectorError> {
    let rgb = image.to_rgb8();
    let (width, height) = rgb.dimensions();
    if width == 0 || height == 0 {
        return Err(DetectorError::Inference("image has no pixels".to_string()));
    }
    let letterbox = Letterbox::new(width, height, size);
    let (new_width, new_height) = Letterbox::scaled(width, height, letterbox.scale, size);
    let resized = imageops::resize(&rgb, new_width, new_height, FilterType::Triangle);
    let mut canvas = RgbImage::from_pixel(size, size, Rgb([PAD_VALUE, PAD_VALUE, PAD_VALUE]));
    imageops::overlay(&mut canvas, &resized, letterbox.pad_x as i64, letterbox.pad_y as i64);

    let plane = (size * size) as usize;
    let mut input = vec![0.0_f32; 3 * plane];
    for (x, y, pixel) in canvas.enumerate_pixels() {
        let offset = (y * size + x) as usize;
        input[offset] = pixel[0] as f32 / 255.0;
        input[plane + offset] = pixel[1] as f32 / 255.0;
        input[2 * plane + offset] = pixel[2] as f32 / 255.0;
    }
    Ok((input, letterbox))
}

/// Turns the raw `[1, 4 + classes, anchors]` output (or its transpose) into candidates.
fn decode(dims: &[i64], data: &[f32], letterbox: &Letterbox, threshold: f32, labels: &[String]) -> Result<Vec<Candidate>, DetectorError> {
    let &[batch, first, second] = dims else {
        return Err(DetectorError::UnexpectedOutput(format!("expected 3 dimensions, got {:?}", dims)));
    };
    if batch != 1 || first <= 0 || second <= 0 {
        return Err(DetectorError::UnexpectedOutput(format!("unsupported output shape {:?}", dims)));
    }
    let (first, second) = (first as usize, second as usize);
    if data.len() != first * second {
        return Err(DetectorError::UnexpectedOutput(format!("shape {:?} does not match {} values", dims, data.len())));
    }
    // Anchors always outnumber attributes, which identifies the layout.
    let channel_first = first <= second;
    let (attributes, anchors) = if channel_first { (first, second) } else { (second, first) };
    if attributes <= BOX_ATTRIBUTES {
        return Err(DetectorError::UnexpectedOutput(format!("no class scores in shape {:?}", dims)));
    }
    let value = |attribute: usize, anchor: usize| {
        if channel_first {
            data[attribute * anchors + anchor]
        } else {
            data[anchor * attributes + attribute]
        }
    };

    let mut candidates = Vec::new();
    for anchor in 0..anchors {
        let mut class_id = 0;
        let mut confidence = f32::NEG_INFINITY;
        for class in 0..attributes - BOX_ATTRIBUTES {
            let score = value(BOX_ATTRIBUTES + class, anchor);
            if score > confidence {
                confidence = score;
                class_id = class;
            }
        }
        if confidence <= threshold {
            continue;
        }
        let (cx, cy, w, h) = (value(0, anchor), value(1, anchor), value(2, anchor), value(3, anchor));
        let bbox = letterbox.restore([cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0]);
        candidates.push(Candidate {
            class_id,
            class_name: labels.get(class_id).cloned().unwrap_or_else(|| class_id.to_string()),
            confidence,
            bbox,
        });
    }
    Ok(candidates)
}

fn intersection_over_union(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let width = (a[2].min(b[2]) - a[0].max(b[0])).max(0.0);
    let height = (a[3].min(b[3]) - a[1].max(b[1])).max(0.0);
    let intersection = width * height;
    let area_a = (a[2] - a[0]).max(0.0) * (a[3] - a[1]).max(0.0);
    let area_b = (b[2] - b[0]).max(0.0) * (b[3] - b[1]).max(0.0);
    let union = area_a + area_b - intersection;
    if union <= 0.0 { 0.0 } else { intersection / union }
}

fn non_maximum_suppression(mut candidates: Vec<Candidate>, iou_threshold: f32, max_detections: usize) -> Vec<Candidate> {
    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    let mut kept: Vec<Candidate> = Vec::new();
    for candidate in candidates {
        if kept.len() >= max_detections {
            break;
        }
        let suppressed = kept.iter().any(|kept| {
            kept.class_id == candidate.class_id && intersection_over_union(&kept.bbox, &candidate.bbox) > iou_threshold
        });
        if !suppressed {
            kept.push(candidate);
        }
    }
    kept
}
