//! Standard paths used by tgpt

use std::path::PathBuf;

/// Standard tgpt paths
pub struct Paths {
    /// Config directory (~/.config/tgpt)
    pub config: PathBuf,
}

impl Default for Paths {
    fn default() -> Self {
        Self::new()
    }
}

impl Paths {
    pub fn new() -> Self {
        let config = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("tgpt");

        Self { config }
    }

    /// Get the config file path
    pub fn config_file(&self) -> PathBuf {
        self.config.join("config.toml")
    }
}
