use crate::utils::logging::*;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_PATH: &str = "./scanner.toml";

#[derive(Debug, Deserialize)]
struct ConfigTable {
    #[serde(rename = "Config")]
    config: Config,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub http_server_bind_port: u16, //port
    pub bind_retry_duration: u64, //seconds
    pub model_path: PathBuf, //path
    pub labels_path: Option<PathBuf>, //path
    pub catalog_path: PathBuf, //path
    pub input_size: u32, //pixels
    pub candidate_threshold: f32, //0..1
    pub iou_threshold: f32, //0..1
    pub max_detections: usize, //boxes
    pub max_payload_size: usize, //bytes
    pub max_log_entries: usize, //entries
    pub tls_certificate_path: Option<PathBuf>, //path
    pub tls_private_key_path: Option<PathBuf>, //path
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_server_bind_port: 5000,
            bind_retry_duration: 5,
            model_path: PathBuf::from("model.onnx"),
            labels_path: None,
            catalog_path: PathBuf::from("products.json"),
            input_size: 640,
            candidate_threshold: 0.25,
            iou_threshold: 0.7,
            max_detections: 300,
            max_payload_size: 16 * 1024 * 1024,
            max_log_entries: DEFAULT_LOG_CAPACITY,
            tls_certificate_path: None,
            tls_private_key_path: None,
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        let toml_string = match fs::read_to_string(path) {
            Ok(toml_string) => toml_string,
            Err(err) => {
                logging_console!(warning_entry!(SystemEntry::ConfigNotFound, IOEntry::ReadFileError(path.display(), err)));
                return Self::default();
            }
        };
        match Self::parse(&toml_string) {
            Ok(config) if Self::validate(&config) => config,
            Ok(_) => {
                logging_console!(warning_entry!(SystemEntry::InvalidConfig));
                Self::default()
            }
            Err(err) => {
                logging_console!(warning_entry!(SystemEntry::InvalidConfig, IOEntry::TomlDeserializeError(err)));
                Self::default()
            }
        }
    }

    pub fn parse(toml_string: &str) -> Result<Self, toml::de::Error> {
        toml::from_str::<ConfigTable>(toml_string).map(|config_table| config_table.config)
    }

    pub fn validate(config: &Config) -> bool {
        Config::validate_second(config.bind_retry_duration)
            && Config::validate_ratio(config.candidate_threshold)
            && Config::validate_ratio(config.iou_threshold)
            && Config::validate_input_size(config.input_size)
            && config.max_detections > 0
            && config.max_payload_size > 0
            && config.max_log_entries > 0
            && config.tls_certificate_path.is_some() == config.tls_private_key_path.is_some()
    }

    fn validate_second(second: u64) -> bool {
        second <= 3600
    }

    fn validate_ratio(ratio: f32) -> bool {
        (0.0..=1.0).contains(&ratio)
    }

    // Letterboxing assumes the stride-32 grid every YOLO export uses.
    fn validate_input_size(size: u32) -> bool {
        size > 0 && size % 32 == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_table_keeps_defaults_for_missing_fields() {
        let config = Config::parse("[Config]\nhttp_server_bind_port = 8443\ncatalog_path = \"catalog/products.json\"\n").unwrap();
        assert_eq!(config.http_server_bind_port, 8443);
        assert_eq!(config.catalog_path, PathBuf::from("catalog/products.json"));
        assert_eq!(config.model_path, PathBuf::from("model.onnx"));
        assert_eq!(config.input_size, 640);
        assert!(Config::validate(&config));
    }

    #[test]
    fn missing_table_is_a_parse_error() {
        assert!(Config::parse("http_server_bind_port = 5000\n").is_err());
    }

    #[test]
    fn thresholds_outside_unit_interval_are_rejected() {
        let mut config = Config::default();
        config.candidate_threshold = 1.5;
        assert!(!Config::validate(&config));
        config.candidate_threshold = 0.25;
        config.iou_threshold = -0.1;
        assert!(!Config::validate(&config));
    }

    #[test]
    fn input_size_must_follow_stride() {
        let mut config = Config::default();
        config.input_size = 600;
        assert!(!Config::validate(&config));
        config.input_size = 320;
        assert!(Config::validate(&config));
    }

    #[test]
    fn tls_paths_come_in_pairs() {
        let mut config = Config::default();
        config.tls_certificate_path = Some(PathBuf::from("cert.pem"));
        assert!(!Config::validate(&config));
        config.tls_private_key_path = Some(PathBuf::from("key.pem"));
        assert!(Config::validate(&config));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let path = std::env::temp_dir().join(format!("{}.toml", uuid::Uuid::new_v4()));
        assert_eq!(Config::load(&path), Config::default());
    }

    #[test]
    fn log_retention_must_be_positive() {
        let config = Config::parse("[Config]\nmax_log_entries = 500\n").unwrap();
        assert_eq!(config.max_log_entries, 500);
        assert!(Config::validate(&config));
        let config = Config::parse("[Config]\nmax_log_entries = 0\n").unwrap();
        assert!(!Config::validate(&config));
    }
}
