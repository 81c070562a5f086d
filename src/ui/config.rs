use crate::debugger::LaunchConfig;
use crate::muted_error;
use anyhow::Context;
use serde::Deserialize;
use std::fs::read_to_string;
use std::path::{Path, PathBuf};

/// Application configuration, read from a toml file.
///
/// ```toml
/// emulator = "/opt/emulator/bin/emulator"
/// image_extension = "hex"
/// breakpoints = "/home/user/.config/emudbg/breakpoints.toml"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Emulator executable, path or a name searched in `PATH`.
    pub emulator: Option<String>,
    /// Extension of the program image passed to emulator.
    pub image_extension: String,
    /// File where breakpoints are kept between sessions.
    pub breakpoints: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            emulator: None,
            image_extension: "hex".to_string(),
            breakpoints: None,
        }
    }
}

impl Config {
    const DEFAULT_PATH: &'static str = ".config/emudbg/config.toml";

    /// Load configuration from file.
    /// If path is not set, config is read from the home directory, missing file means default config.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let data = match path {
            None => {
                let Some(home) = home::home_dir() else {
                    return Ok(Self::default());
                };
                match muted_error!(read_to_string(home.join(Self::DEFAULT_PATH))) {
                    None => return Ok(Self::default()),
                    Some(data) => data,
                }
            }
            Some(path) => read_to_string(path)
                .with_context(|| format!("read config file {}", path.display()))?,
        };

        Self::parse(&data)
    }

    pub fn parse(data: &str) -> anyhow::Result<Self> {
        toml::from_str(data).context("malformed config")
    }

    pub fn launch_config(&self) -> LaunchConfig {
        LaunchConfig {
            emulator: self.emulator.clone(),
            image_extension: self.image_extension.clone(),
        }
    }
}
