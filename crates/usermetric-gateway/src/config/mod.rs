//! Gateway config loader (strict parsing).

pub mod schema;

use std::fs;

use usermetric_core::error::{Result, UserMetricError};

pub use schema::{GatewayConfig, ServerSection, StoreBackend, StoreSection};

/// Environment variable overriding the config file location.
pub const CONFIG_PATH_ENV: &str = "USERMETRIC_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "usermetric.yaml";

pub fn config_path() -> String {
    std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string())
}

pub fn load_from_file(path: &str) -> Result<GatewayConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| UserMetricError::Internal(format!("read config {path} failed: {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<GatewayConfig> {
    let cfg: GatewayConfig = serde_yaml::from_str(s)
        .map_err(|e| UserMetricError::BadInput(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
