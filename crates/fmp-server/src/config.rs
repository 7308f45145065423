//! Server configuration from environment.

use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    pub data_dir: PathBuf,
    pub default_step_m: f64,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            server_port: env::var("FMP_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(8000),
            data_dir: env::var("FMP_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("app_data")),
            default_step_m: env::var("FMP_DEFAULT_STEP_M")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5.0),
        }
    }
}
