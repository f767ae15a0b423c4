//! Server configuration

use std::path::PathBuf;
use std::time::Duration;

/// Server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_address: String,
    pub upload_folder: PathBuf,
    pub static_folder: PathBuf,
    pub max_upload_bytes: usize,
    pub cors_origins: Vec<String>,
    pub classifier_model_path: PathBuf,
    pub language_model_url: Option<String>,
    pub language_model_name: String,
    pub language_model_token: Option<String>,
    pub language_model_timeout: Duration,
}

/// Default request body cap (20 MiB)
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.into())
}

fn env_parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            bind_address: env_or("BIND_ADDRESS", "0.0.0.0:5000"),
            upload_folder: env_or("UPLOAD_FOLDER", "uploads").into(),
            static_folder: env_or("STATIC_FOLDER", "static").into(),
            max_upload_bytes: env_parsed("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES),
            cors_origins: env_or("CORS_ORIGINS", "*")
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            classifier_model_path: env_or("CLASSIFIER_MODEL_PATH", "saved_model_1/model.onnx")
                .into(),
            language_model_url: std::env::var("LANGUAGE_MODEL_URL")
                .ok()
                .filter(|s| !s.is_empty()),
            language_model_name: env_or(
                "LANGUAGE_MODEL_NAME",
                "FinancialSupport/gpt2-ft-medical-qa",
            ),
            language_model_token: std::env::var("LANGUAGE_MODEL_TOKEN")
                .ok()
                .filter(|s| !s.is_empty()),
            language_model_timeout: Duration::from_secs(env_parsed(
                "LANGUAGE_MODEL_TIMEOUT_SECS",
                60,
            )),
        }
    }
}
