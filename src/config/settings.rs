use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::icon::{IconPair, IconSet};
use crate::util::DataDir;

/// Example configuration file contents (bundled with the binary)
pub const EXAMPLE_CONFIG: &str = include_str!("config.toml.example");

/// Default DevTools endpoint
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:9222";

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// DevTools endpoint (http discovery URL or ws URL)
    pub endpoint: String,
    /// Timeout for a single DevTools command
    pub command_timeout: Duration,
    /// Serialize handlers for the same tab
    pub serialize_per_tab: bool,
    /// Icon asset lookup
    pub icons: IconSet,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            command_timeout: Duration::from_millis(5000),
            serialize_per_tab: true,
            icons: IconSet::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlBrowserConfig {
    pub endpoint: Option<String>,
    pub command_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlBehaviorConfig {
    pub serialize_per_tab: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlIconConfig {
    pub light_16: Option<String>,
    pub light_32: Option<String>,
    pub dark_16: Option<String>,
    pub dark_32: Option<String>,
}

/// TOML representation of the config file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    pub browser: Option<TomlBrowserConfig>,
    pub behavior: Option<TomlBehaviorConfig>,
    pub icons: Option<TomlIconConfig>,
}

fn merge_pair(pair: &mut IconPair, small: Option<String>, large: Option<String>) {
    if let Some(small) = small {
        pair.small = small;
    }
    if let Some(large) = large {
        pair.large = large;
    }
}

impl Config {
    /// Load `config.toml` from `data_dir`, merging with defaults
    pub fn load(data_dir: &DataDir) -> Self {
        let config_file = data_dir.config_file();

        // Create example config on first run
        if !config_file.exists() {
            Self::create_default_config(&config_file);
        }

        Self::load_from(&config_file)
    }

    /// Load configuration from `path`; unreadable or invalid files yield defaults
    pub fn load_from(path: &Path) -> Self {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(_) => return Config::default(),
        };
        match toml::from_str::<TomlConfig>(&contents) {
            Ok(toml_config) => Config::default().merge(toml_config),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Ignoring invalid config file");
                Config::default()
            }
        }
    }

    /// Overlay the values present in `toml_config`
    pub fn merge(mut self, toml_config: TomlConfig) -> Self {
        if let Some(browser) = toml_config.browser {
            if let Some(endpoint) = browser.endpoint {
                self.endpoint = endpoint;
            }
            if let Some(ms) = browser.command_timeout_ms {
                self.command_timeout = Duration::from_millis(ms);
            }
        }

        if let Some(behavior) = toml_config.behavior {
            if let Some(serialize) = behavior.serialize_per_tab {
                self.serialize_per_tab = serialize;
            }
        }

        if let Some(icons) = toml_config.icons {
            merge_pair(&mut self.icons.light, icons.light_16, icons.light_32);
            merge_pair(&mut self.icons.dark, icons.dark_16, icons.dark_32);
        }

        self
    }

    /// Create the default config file from the bundled example
    fn create_default_config(path: &Path) {
        if let Some(parent) = path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                tracing::warn!(error = %e, "Failed to create config directory");
                return;
            }
        }

        if let Err(e) = fs::write(path, EXAMPLE_CONFIG) {
            tracing::warn!(error = %e, "Failed to write default config");
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}
