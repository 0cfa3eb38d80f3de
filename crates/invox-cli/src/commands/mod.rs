//! CLI subcommands.

pub mod config;
pub mod export;
pub mod extract;
pub mod ocr;

use std::path::{Path, PathBuf};

use anyhow::Context;

use invox_core::models::config::InvoxConfig;

/// Load configuration from the given path, or defaults when none is set.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<InvoxConfig> {
    match config_path {
        Some(path) => InvoxConfig::from_file(Path::new(path))
            .with_context(|| format!("failed to load config from {}", path)),
        None => Ok(InvoxConfig::default()),
    }
}

/// Default model directory under the user's data dir.
pub fn default_model_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join("invox").join("models"))
        .unwrap_or_else(|| PathBuf::from("models"))
}
