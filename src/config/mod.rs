// Configuration management module
// Handles TOML configuration loading, validation, and on-disk layout

pub mod settings;

pub use settings::{Config, ConfigError, GenerationConfig, OllamaConfig};

/// Get the configuration directory path
#[inline]
pub fn get_config_dir() -> Result<std::path::PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|dir| dir.join("chat-recall"))
        .ok_or(ConfigError::DirectoryError)
}
