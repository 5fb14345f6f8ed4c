use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io,
    path::{Path, PathBuf},
};
use thiserror::Error;
use ward_core::force::DEFAULT_ATOL;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file")]
    Io(#[from] io::Error),
    #[error("failed to parse config file")]
    Parse(#[from] serde_yaml::Error),
}

/// Scan settings, loadable from a YAML file. Command line flags override
/// the file values field by field.
#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(deny_unknown_fields)]
pub struct ScanConfig {
    #[serde(default = "default_root")]
    pub root: PathBuf,
    // glob patterns against directory base names, matching subtrees are skipped
    #[serde(default)]
    pub ignore: Vec<String>,
    #[serde(default = "default_artifact")]
    pub artifact: String,
    #[serde(default = "default_atol")]
    pub atol: f64,
    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            ignore: Vec::new(),
            artifact: default_artifact(),
            atol: default_atol(),
            workers: default_workers(),
        }
    }
}

impl ScanConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_reader(File::open(path)?)?)
    }
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_artifact() -> String {
    "OUTCAR".to_owned()
}

fn default_atol() -> f64 {
    DEFAULT_ATOL
}

fn default_workers() -> usize {
    num_cpus::get()
}
