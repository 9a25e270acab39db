// src/config.rs

use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::debug;

use crate::aggregate::AggregateOptions;
use crate::error::Result;
use crate::load::LoadOptions;

pub const DEFAULT_CONFIG_FILE: &str = "salesboard.yaml";
pub const ENV_SOURCE: &str = "SALESBOARD_SOURCE";
pub const ENV_OUTPUT_DIR: &str = "SALESBOARD_OUTPUT_DIR";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Parquet,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Parquet => "parquet",
        }
    }
}

/// Report settings, read from YAML. Every key is optional.
///
/// ```yaml
/// source: data/Adidas.xlsx
/// sheet: Data
/// header_row: 4
/// output_dir: reports
/// formats: [csv, parquet]
/// unknown_bucket: "(unknown)"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReportConfig {
    pub source: PathBuf,
    pub sheet: Option<String>,
    pub header_row: usize,
    pub output_dir: PathBuf,
    pub formats: Vec<ExportFormat>,
    pub unknown_bucket: Option<String>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            source: PathBuf::from("Adidas.xlsx"),
            sheet: None,
            header_row: 0,
            output_dir: PathBuf::from("reports"),
            formats: vec![ExportFormat::Csv],
            unknown_bucket: None,
        }
    }
}

impl ReportConfig {
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        // an empty document is a valid "all defaults" config
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    /// Read `path`, or `salesboard.yaml` in the working directory when `path`
    /// is `None`. Only the implicit default file may be absent.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };
        if !explicit && !path.exists() {
            debug!("no {} found; using defaults", DEFAULT_CONFIG_FILE);
            return Ok(Self::default());
        }
        let text = fs::read_to_string(&path)?;
        let cfg = Self::from_yaml_str(&text)?;
        debug!(config = %path.display(), "loaded config");
        Ok(cfg)
    }

    /// Apply `SALESBOARD_SOURCE` / `SALESBOARD_OUTPUT_DIR` from `lookup`.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(source) = lookup(ENV_SOURCE).filter(|v| !v.is_empty()) {
            self.source = PathBuf::from(source);
        }
        if let Some(dir) = lookup(ENV_OUTPUT_DIR).filter(|v| !v.is_empty()) {
            self.output_dir = PathBuf::from(dir);
        }
        self
    }

    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            sheet: self.sheet.clone(),
            header_row: self.header_row,
        }
    }

    pub fn aggregate_options(&self) -> AggregateOptions {
        AggregateOptions {
            unknown_bucket: self.unknown_bucket.clone(),
        }
    }
}
