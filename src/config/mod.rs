mod settings;

pub use settings::{Config, TomlConfig, DEFAULT_ENDPOINT, EXAMPLE_CONFIG};
