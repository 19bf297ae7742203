// ⚙️ Pipeline Configuration - Fixed run parameters with an optional override file
//
// Every parameter has a built-in default matching the repository layout
// (spreadsheets under Data/, JSON under frontend/src/data/). A `pipeline.toml`
// in the working directory, or the file named by AGENCY_PIPELINE_CONFIG,
// overrides any subset of them.

use crate::document::HoursMode;
use crate::error::PipelineError;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_ENV_VAR: &str = "AGENCY_PIPELINE_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "pipeline.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct InputFiles {
    pub markets_hours: String,
    pub shopping_hours: String,
    pub markets_cultures: String,
    pub shopping_cultures: String,
    pub markets_services: String,
    pub shopping_services: String,
}

impl Default for InputFiles {
    fn default() -> Self {
        InputFiles {
            markets_hours: "CAFB_Markets_HOO.xlsx".to_string(),
            shopping_hours: "CAFB_Shopping_Partners_HOO.xlsx".to_string(),
            markets_cultures: "CAFB_Markets_Cultures_Served.xlsx".to_string(),
            shopping_cultures: "CAFB_Shopping_Partners_Cultures_Served.xlsx".to_string(),
            markets_services: "CAFB_Markets_Wraparound_Services.xlsx".to_string(),
            shopping_services: "CAFB_Shopping_Partners_Wraparound_Services.xlsx".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OutputFiles {
    pub agencies: String,
    pub services: String,
    pub services_sample: String,
}

impl Default for OutputFiles {
    fn default() -> Self {
        OutputFiles {
            agencies: "agencies.json".to_string(),
            services: "services.json".to_string(),
            services_sample: "services_sample.json".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
    pub inputs: InputFiles,
    pub outputs: OutputFiles,
    /// Shape of `hours` in the agencies document
    pub hours_mode: HoursMode,
    /// Agencies per service in the debug sample
    pub sample_size: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            data_dir: PathBuf::from("Data"),
            output_dir: PathBuf::from("frontend/src/data"),
            inputs: InputFiles::default(),
            outputs: OutputFiles::default(),
            hours_mode: HoursMode::Structured,
            sample_size: 3,
        }
    }
}

impl PipelineConfig {
    /// Defaults, overridden by the env-named file or ./pipeline.toml when present
    pub fn load() -> Result<Self, PipelineError> {
        if let Ok(path) = env::var(CONFIG_ENV_VAR) {
            return Self::from_file(Path::new(&path));
        }

        let local = Path::new(DEFAULT_CONFIG_FILE);
        if local.exists() {
            return Self::from_file(local);
        }

        Ok(Self::default())
    }

    pub fn from_file(path: &Path) -> Result<Self, PipelineError> {
        let content = fs::read_to_string(path).map_err(|e| PipelineError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_toml(&content).map_err(|message| PipelineError::Config {
            path: path.to_path_buf(),
            message,
        })
    }

    pub fn from_toml(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    pub fn input(&self, file_name: &str) -> PathBuf {
        self.data_dir.join(file_name)
    }

    pub fn output(&self, file_name: &str) -> PathBuf {
        self.output_dir.join(file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(
            config.input(&config.inputs.markets_hours),
            PathBuf::from("Data/CAFB_Markets_HOO.xlsx")
        );
        assert_eq!(
            config.output(&config.outputs.services),
            PathBuf::from("frontend/src/data/services.json")
        );
        assert_eq!(config.hours_mode, HoursMode::Structured);
        assert_eq!(config.sample_size, 3);
    }

    #[test]
    fn test_partial_override() {
        let config = PipelineConfig::from_toml(
            r#"
            data_dir = "fixtures"
            hours_mode = "display"

            [inputs]
            markets_hours = "markets.csv"
            "#,
        )
        .unwrap();

        assert_eq!(config.data_dir, PathBuf::from("fixtures"));
        assert_eq!(config.hours_mode, HoursMode::Display);
        assert_eq!(config.inputs.markets_hours, "markets.csv");
        assert_eq!(config.inputs.shopping_hours, "CAFB_Shopping_Partners_HOO.xlsx");
        assert_eq!(config.output_dir, PathBuf::from("frontend/src/data"));
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.toml");
        fs::write(&path, "hours_mode = \"sideways\"").unwrap();
        let err = PipelineConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, PipelineError::Config { .. }));
    }
}
