//! Files schemeflip keeps on disk.
//!
//! Everything lives under one directory, `~/.schemeflip` unless
//! `--data-dir` names another:
//!
//! ```text
//! <root>/config.toml
//! <root>/schemeflip.db        overrides and tab registry
//! <root>/logs/schemeflip.log
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const DIR_NAME: &str = ".schemeflip";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataDir {
    root: PathBuf,
}

impl DataDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `custom` if given, else `~/.schemeflip` (relative to the working
    /// directory when there is no home)
    pub fn resolve(custom: Option<PathBuf>) -> Self {
        match custom {
            Some(root) => Self::new(root),
            None => Self::new(
                dirs::home_dir()
                    .map(|home| home.join(DIR_NAME))
                    .unwrap_or_else(|| PathBuf::from(DIR_NAME)),
            ),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_file(&self) -> PathBuf {
        self.root.join("config.toml")
    }

    pub fn database(&self) -> PathBuf {
        self.root.join("schemeflip.db")
    }

    pub fn logs(&self) -> PathBuf {
        self.root.join("logs")
    }

    pub fn log_file(&self) -> PathBuf {
        self.logs().join("schemeflip.log")
    }

    /// Create the root and the logs directory
    pub fn create(&self) -> io::Result<()> {
        fs::create_dir_all(self.logs())
    }
}
