use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::net::petri_net::EngineConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Text,
    Json,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct PnConfig {
    #[serde(default = "default_continuous_boundedness_check")]
    pub continuous_boundedness_check: bool,
    #[serde(default)]
    pub write_dot: bool,
    #[serde(default = "default_report_format")]
    pub report_format: ReportFormat,
}

impl Default for PnConfig {
    fn default() -> Self {
        Self {
            continuous_boundedness_check: default_continuous_boundedness_check(),
            write_dot: false,
            report_format: default_report_format(),
        }
    }
}

impl PnConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: PnConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;
        Ok(config)
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            continuous_boundedness_check: self.continuous_boundedness_check,
        }
    }
}

fn default_continuous_boundedness_check() -> bool {
    true
}

fn default_report_format() -> ReportFormat {
    ReportFormat::Text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let config = PnConfig::load_from_file("/definitely/not/here.toml").unwrap();
        assert_eq!(config, PnConfig::default());
        assert!(config.engine_config().continuous_boundedness_check);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pnbound.toml");
        fs::write(&path, "report_format = \"json\"\nwrite_dot = true\n").unwrap();

        let config = PnConfig::load_from_file(&path).unwrap();
        assert_eq!(config.report_format, ReportFormat::Json);
        assert!(config.write_dot);
        assert!(config.continuous_boundedness_check);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pnbound.toml");
        fs::write(&path, "report_format = \"xml\"").unwrap();
        assert!(PnConfig::load_from_file(&path).is_err());
    }
}
