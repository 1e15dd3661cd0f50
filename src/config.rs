//! Configuration for mudline.
//!
//! TOML configuration is loaded from `~/.mudline/config.toml`:
//!
//! ```toml
//! # Server to connect to when none is given on the command line
//! host = "mud.example.org"
//! port = 4000
//!
//! # Echo sent commands into the output stream
//! echo_input = true
//! ```
//!
//! Command-line arguments override file values.

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default server host
    pub host: Option<String>,
    /// Default server port
    pub port: Option<u16>,
    /// Echo sent commands into the output stream
    pub echo_input: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: None,
            port: None,
            echo_input: true,
        }
    }
}

impl Config {
    /// Load configuration from file, falling back to defaults.
    pub fn load() -> Self {
        if let Some(path) = Self::config_path() {
            if path.exists() {
                if let Ok(content) = fs::read_to_string(&path) {
                    if let Ok(config) = toml::from_str(&content) {
                        return config;
                    }
                }
            }
        }
        Self::default()
    }

    /// Save configuration to file.
    #[allow(dead_code)]
    pub fn save(&self) -> Result<(), String> {
        if let Some(path) = Self::config_path() {
            let content = toml::to_string_pretty(self)
                .map_err(|e| format!("Failed to serialize config: {}", e))?;
            fs::write(&path, content).map_err(|e| format!("Failed to write config: {}", e))?;
            Ok(())
        } else {
            Err("Could not determine config path".to_string())
        }
    }

    fn config_path() -> Option<PathBuf> {
        let home = home_dir()?;
        let dir = home.join(".mudline");
        if !dir.exists() {
            let _ = fs::create_dir_all(&dir);
        }
        Some(dir.join("config.toml"))
    }
}

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
}
