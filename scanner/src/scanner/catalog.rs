use serde::Deserialize;
use serde_json::Number;
use std::collections::HashMap;
use std::fs;
use std::io::Error as IoError;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("{0}")]
    Read(#[from] IoError),
    #[error("{0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    pub alias: String,
    pub price: Number, // echoed back as written
}

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    products: HashMap<String, CatalogEntry>,
}

impl Catalog {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let json_string = fs::read_to_string(path)?;
        Self::parse(&json_string)
    }

    pub fn parse(json_string: &str) -> Result<Self, CatalogError> {
        let products = serde_json::from_str::<HashMap<String, CatalogEntry>>(json_string)?;
        Ok(Self { products })
    }

    pub fn get(&self, class_name: &str) -> Option<&CatalogEntry> {
        self.products.get(class_name)
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}
