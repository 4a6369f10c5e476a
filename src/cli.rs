//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// covidviews - filtered case views for Argentina COVID-19 records
///
/// Loads a case CSV, filters it by gender and age range, and emits the
/// region and age-region tables behind the dashboard charts.
///
/// Examples:
///   covidviews --data data/covid_arg_0_1.csv
///   covidviews --data cases.csv --genders F,M --age-min 18 --age-max 65
///   covidviews --data cases.csv --format json --output views.json
///   covidviews --data cases.csv --interactive
///   covidviews --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Path to the case CSV file
    ///
    /// Overrides the path in .covidviews.toml.
    #[arg(short, long, value_name = "FILE", env = "COVIDVIEWS_DATA")]
    pub data: Option<PathBuf>,

    /// Genders to include (comma-separated codes: F, M, NR)
    ///
    /// Defaults to every gender present in the data.
    #[arg(short, long, value_name = "CODES", value_delimiter = ',')]
    pub genders: Option<Vec<String>>,

    /// Lowest age to include (inclusive)
    #[arg(long, value_name = "AGE")]
    pub age_min: Option<u32>,

    /// Highest age to include (inclusive)
    #[arg(long, value_name = "AGE")]
    pub age_max: Option<u32>,

    /// Output format (markdown, json, csv)
    #[arg(short, long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Output file path (`-` for stdout)
    ///
    /// For csv, the age-region table is written next to it with an
    /// `_age_region` suffix.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Column holding the gender
    #[arg(long, value_name = "NAME")]
    pub gender_column: Option<String>,

    /// Column holding the age
    #[arg(long, value_name = "NAME")]
    pub age_column: Option<String>,

    /// Column holding the province
    #[arg(long, value_name = "NAME")]
    pub province_column: Option<String>,

    /// Field delimiter of the CSV file
    #[arg(long, value_name = "CHAR")]
    pub delimiter: Option<char>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .covidviews.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Start an interactive session that recomputes views on each filter change
    #[arg(short, long)]
    pub interactive: bool,

    /// Print dataset facets (genders, age bounds, provinces) and exit
    #[arg(long)]
    pub facets: bool,

    /// Exit with code 2 when the filter matches no records
    #[arg(long)]
    pub fail_on_empty: bool,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .covidviews.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the views.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Markdown tables (default)
    #[default]
    Markdown,
    /// JSON document
    Json,
    /// CSV files, one per view
    Csv,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.interactive && self.facets {
            return Err("Cannot use both --interactive and --facets".to_string());
        }

        if let (Some(min), Some(max)) = (self.age_min, self.age_max) {
            if min > max {
                return Err(format!(
                    "--age-min ({}) must not be greater than --age-max ({})",
                    min, max
                ));
            }
        }

        if let Some(delimiter) = self.delimiter {
            if !delimiter.is_ascii() {
                return Err("Delimiter must be a single ASCII character".to_string());
            }
        }

        if let Some(ref data) = self.data {
            if !data.exists() {
                return Err(format!("Data file does not exist: {}", data.display()));
            }
            if !data.is_file() {
                return Err(format!("Data path is not a file: {}", data.display()));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args() -> Args {
        Args::parse_from(["covidviews"])
    }

    #[test]
    fn test_parse_filters() {
        let args = Args::parse_from([
            "covidviews",
            "--genders",
            "F,NR",
            "--age-min",
            "5",
            "--age-max",
            "40",
            "--format",
            "json",
        ]);

        assert_eq!(
            args.genders,
            Some(vec!["F".to_string(), "NR".to_string()])
        );
        assert_eq!(args.age_min, Some(5));
        assert_eq!(args.age_max, Some(40));
        assert_eq!(args.format, Some(OutputFormat::Json));
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_inverted_age_range() {
        let mut args = make_args();
        args.age_min = Some(50);
        args.age_max = Some(10);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_missing_data_file() {
        let mut args = make_args();
        args.data = Some(PathBuf::from("/definitely/not/here.csv"));
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());

        let mut args = make_args();
        args.interactive = true;
        args.facets = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }
}
