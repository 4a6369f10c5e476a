//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.covidviews.toml` files.

use crate::cli::OutputFormat;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = ".covidviews.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Dataset settings.
    #[serde(default)]
    pub dataset: DatasetConfig,

    /// Default filter.
    #[serde(default)]
    pub filter: FilterConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// Source file settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Path to the case CSV.
    #[serde(default = "default_data_path")]
    pub path: String,

    /// Field delimiter (a single ASCII character).
    #[serde(default = "default_delimiter")]
    pub delimiter: char,

    /// Column names for each field.
    #[serde(default)]
    pub columns: ColumnsConfig,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            path: default_data_path(),
            delimiter: default_delimiter(),
            columns: ColumnsConfig::default(),
        }
    }
}

fn default_data_path() -> String {
    "data/covid_arg_0_1.csv".to_string()
}

fn default_delimiter() -> char {
    ','
}

/// Source column names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnsConfig {
    #[serde(default = "default_gender_column")]
    pub gender: String,

    #[serde(default = "default_age_column")]
    pub age: String,

    #[serde(default = "default_province_column")]
    pub province: String,
}

impl Default for ColumnsConfig {
    fn default() -> Self {
        Self {
            gender: default_gender_column(),
            age: default_age_column(),
            province: default_province_column(),
        }
    }
}

fn default_gender_column() -> String {
    "sexo".to_string()
}

fn default_age_column() -> String {
    "edad".to_string()
}

fn default_province_column() -> String {
    "residencia_provincia_nombre".to_string()
}

/// Default filter. Empty or absent values fall back to the dataset facets.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Gender codes to select (e.g. ["F", "M"]).
    #[serde(default)]
    pub genders: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age_min: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age_max: Option<u32>,
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Output format.
    #[serde(default)]
    pub format: OutputFormat,

    /// Output path (`-` for stdout).
    #[serde(default = "default_output")]
    pub output: String,

    /// Maximum age-region rows in Markdown output (0 = all).
    #[serde(default = "default_max_age_region_rows")]
    pub max_age_region_rows: usize,

    /// Width of the region bar column in Markdown output.
    #[serde(default = "default_bar_width")]
    pub bar_width: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            output: default_output(),
            max_age_region_rows: default_max_age_region_rows(),
            bar_width: default_bar_width(),
        }
    }
}

fn default_output() -> String {
    "-".to_string()
}

fn default_max_age_region_rows() -> usize {
    200
}

fn default_bar_width() -> usize {
    30
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE_NAME);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// Only values the user actually passed override the file.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref data) = args.data {
            self.dataset.path = data.display().to_string();
        }
        if let Some(delimiter) = args.delimiter {
            self.dataset.delimiter = delimiter;
        }

        if let Some(ref column) = args.gender_column {
            self.dataset.columns.gender = column.clone();
        }
        if let Some(ref column) = args.age_column {
            self.dataset.columns.age = column.clone();
        }
        if let Some(ref column) = args.province_column {
            self.dataset.columns.province = column.clone();
        }

        if let Some(ref genders) = args.genders {
            self.filter.genders = genders.clone();
        }
        if args.age_min.is_some() {
            self.filter.age_min = args.age_min;
        }
        if args.age_max.is_some() {
            self.filter.age_max = args.age_max;
        }

        if let Some(format) = args.format {
            self.report.format = format;
        }
        if let Some(ref output) = args.output {
            self.report.output = output.display().to_string();
        }
    }

    /// Delimiter as a byte, rejecting non-ASCII characters.
    pub fn delimiter_byte(&self) -> Result<u8> {
        let c = self.dataset.delimiter;
        if c.is_ascii() {
            Ok(c as u8)
        } else {
            anyhow::bail!("Delimiter must be a single ASCII character, got '{}'", c)
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.dataset.columns.gender, "sexo");
        assert_eq!(config.dataset.columns.province, "residencia_provincia_nombre");
        assert_eq!(config.dataset.delimiter, ',');
        assert!(config.filter.genders.is_empty());
        assert_eq!(config.report.format, OutputFormat::Markdown);
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[dataset]
path = "cases.tsv"
delimiter = "\t"

[dataset.columns]
gender = "sex"
age = "age_years"

[filter]
genders = ["F"]
age_min = 18

[report]
format = "json"
output = "views.json"
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.dataset.path, "cases.tsv");
        assert_eq!(config.delimiter_byte().unwrap(), b'\t');
        assert_eq!(config.dataset.columns.gender, "sex");
        assert_eq!(config.dataset.columns.age, "age_years");
        assert_eq!(config.dataset.columns.province, "residencia_provincia_nombre");
        assert_eq!(config.filter.genders, vec!["F"]);
        assert_eq!(config.filter.age_min, Some(18));
        assert_eq!(config.filter.age_max, None);
        assert_eq!(config.report.format, OutputFormat::Json);
        assert_eq!(config.report.max_age_region_rows, 200);
    }

    #[test]
    fn test_merge_with_args() {
        let mut config = Config::default();
        config.filter.age_max = Some(80);

        let args = crate::cli::Args::parse_from([
            "covidviews",
            "--data",
            "other.csv",
            "--genders",
            "M,NR",
            "--age-min",
            "10",
            "--format",
            "csv",
        ]);
        config.merge_with_args(&args);

        assert_eq!(config.dataset.path, "other.csv");
        assert_eq!(config.filter.genders, vec!["M", "NR"]);
        assert_eq!(config.filter.age_min, Some(10));
        assert_eq!(config.filter.age_max, Some(80));
        assert_eq!(config.report.format, OutputFormat::Csv);
        assert_eq!(config.report.output, "-");
    }

    #[test]
    fn test_non_ascii_delimiter_rejected() {
        let mut config = Config::default();
        config.dataset.delimiter = '§';
        assert!(config.delimiter_byte().is_err());
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(!toml_str.is_empty());
        assert!(toml_str.contains("[dataset]"));
        assert!(toml_str.contains("[dataset.columns]"));
        assert!(toml_str.contains("[report]"));
    }
}
