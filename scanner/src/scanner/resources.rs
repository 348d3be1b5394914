use crate::scanner::catalog::{Catalog, CatalogError};
use crate::scanner::detector::Detector;
use crate::scanner::yolo::{YoloDetector, YoloParams};
use crate::utils::config::Config;
use crate::utils::logging::*;
use std::io::ErrorKind;

pub struct Resources {
    detector: Option<Box<dyn Detector>>,
    catalog: Catalog,
}

impl Resources {
    pub fn new(detector: Option<Box<dyn Detector>>, catalog: Catalog) -> Self {
        Self { detector, catalog }
    }

    pub async fn load(config: &Config) -> Self {
        let detector = Self::load_detector(config).await;
        let catalog = Self::load_catalog(config).await;
        Self::new(detector, catalog)
    }

    pub fn detector(&self) -> Option<&dyn Detector> {
        self.detector.as_deref()
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    async fn load_detector(config: &Config) -> Option<Box<dyn Detector>> {
        let model_path = config.model_path.as_path();
        if !model_path.exists() {
            logging_error!(InferenceEntry::ModelNotFound(model_path.display()));
            return None;
        }
        match YoloDetector::load(model_path, config.labels_path.as_deref(), YoloParams::from(config)) {
            Ok(detector) => {
                logging_information!(InferenceEntry::ModelLoaded(model_path.display(), detector.labels().len()));
                Some(Box::new(detector))
            }
            Err(err) => {
                logging_error!(InferenceEntry::ModelLoadError(model_path.display(), err.to_string()));
                None
            }
        }
    }

    async fn load_catalog(config: &Config) -> Catalog {
        let catalog_path = config.catalog_path.as_path();
        match Catalog::load(catalog_path) {
            Ok(catalog) => {
                logging_information!(InferenceEntry::CatalogLoaded(catalog_path.display(), catalog.len()));
                catalog
            }
            Err(CatalogError::Read(err)) if err.kind() == ErrorKind::NotFound => {
                logging_warning!(InferenceEntry::CatalogNotFound(catalog_path.display()));
                Catalog::default()
            }
            Err(CatalogError::Read(err)) => {
                logging_error!(InferenceEntry::CatalogLoadError(catalog_path.display(), "unreadable file".to_string()), IOEntry::ReadFileError(catalog_path.display(), err));
                Catalog::default()
            }
            Err(CatalogError::Parse(err)) => {
                logging_error!(InferenceEntry::CatalogLoadError(catalog_path.display(), "malformed JSON".to_string()), IOEntry::SerdeDeserializeError(err));
                Catalog::default()
            }
        }
    }
}
