//! Case dataset loading and cleaning.
//!
//! This module reads the delimited source file through a configurable
//! column mapping and drops rows with missing or malformed demographic
//! fields before any aggregation happens.

use crate::models::{CaseRecord, Gender};
use csv::{ReaderBuilder, StringRecord};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Errors that make the dataset unusable.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open data file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed CSV input: {0}")]
    Csv(#[from] csv::Error),

    #[error("column '{column}' not found in header (available: {available})")]
    MissingColumn { column: String, available: String },
}

/// Names of the source columns holding each field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMapping {
    pub gender: String,
    pub age: String,
    pub province: String,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            gender: "sexo".to_string(),
            age: "edad".to_string(),
            province: "residencia_provincia_nombre".to_string(),
        }
    }
}

impl From<&crate::config::ColumnsConfig> for ColumnMapping {
    fn from(config: &crate::config::ColumnsConfig) -> Self {
        Self {
            gender: config.gender.clone(),
            age: config.age.clone(),
            province: config.province.clone(),
        }
    }
}

/// Options for reading a dataset.
#[derive(Debug, Clone)]
pub struct DatasetOptions {
    pub columns: ColumnMapping,
    /// Field delimiter byte
    pub delimiter: u8,
    /// Show a spinner while reading
    pub show_progress: bool,
}

impl Default for DatasetOptions {
    fn default() -> Self {
        Self {
            columns: ColumnMapping::default(),
            delimiter: b',',
            show_progress: false,
        }
    }
}

/// Row accounting for one load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadStats {
    pub rows_read: usize,
    pub rows_kept: usize,
    pub rows_dropped: usize,
}

/// Cleaned, read-only case records plus load statistics.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub source: String,
    pub records: Vec<CaseRecord>,
    pub stats: LoadStats,
}

/// Load a dataset from a file on disk.
pub fn load_dataset(path: &Path, options: &DatasetOptions) -> Result<Dataset, LoadError> {
    info!("Loading case data from: {}", path.display());

    let file = File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let spinner = if options.show_progress {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(format!("Reading {}", path.display()));
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(pb)
    } else {
        None
    };

    let result = read_dataset(file, options);

    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }

    let mut dataset = result?;
    dataset.source = path.display().to_string();

    info!(
        "Loaded {} records ({} rows dropped)",
        dataset.stats.rows_kept, dataset.stats.rows_dropped
    );

    Ok(dataset)
}

/// Read a dataset from any reader. The first row must be a header.
pub fn read_dataset<R: Read>(reader: R, options: &DatasetOptions) -> Result<Dataset, LoadError> {
    let mut csv_reader = ReaderBuilder::new()
        .has_headers(true)
        .delimiter(options.delimiter)
        .flexible(true)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    let indices = ColumnIndices::resolve(&headers, &options.columns)?;
    debug!("Resolved column indices: {:?}", indices);

    let mut records = Vec::new();
    let mut stats = LoadStats::default();

    for row in csv_reader.records() {
        let row = row?;
        stats.rows_read += 1;

        match indices.parse_row(&row) {
            Some(record) => records.push(record),
            None => {
                stats.rows_dropped += 1;
                debug!("Dropping row {}: missing or malformed field", stats.rows_read);
            }
        }
    }

    stats.rows_kept = records.len();

    Ok(Dataset {
        source: String::new(),
        records,
        stats,
    })
}

/// Parse an age cell. Decimal values such as `34.5` are truncated to
/// whole years; negative or non-numeric values are rejected.
pub fn parse_age(cell: &str) -> Option<u32> {
    let cell = cell.trim();
    if cell.is_empty() {
        return None;
    }

    if let Ok(age) = cell.parse::<u32>() {
        return Some(age);
    }

    let value = cell.parse::<f64>().ok()?;
    if value.is_finite() && value >= 0.0 && value <= u32::MAX as f64 {
        Some(value.trunc() as u32)
    } else {
        None
    }
}

#[derive(Debug, Clone, Copy)]
struct ColumnIndices {
    gender: usize,
    age: usize,
    province: usize,
}

impl ColumnIndices {
    fn resolve(headers: &StringRecord, columns: &ColumnMapping) -> Result<Self, LoadError> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim() == name)
                .ok_or_else(|| LoadError::MissingColumn {
                    column: name.to_string(),
                    available: headers.iter().collect::<Vec<_>>().join(", "),
                })
        };

        Ok(Self {
            gender: find(&columns.gender)?,
            age: find(&columns.age)?,
            province: find(&columns.province)?,
        })
    }

    fn parse_row(&self, row: &StringRecord) -> Option<CaseRecord> {
        let gender = Gender::from_label(row.get(self.gender)?)?;
        let age = parse_age(row.get(self.age)?)?;
        let province = row.get(self.province)?.trim();
        if province.is_empty() {
            return None;
        }

        Some(CaseRecord::new(gender, age, province))
    }
}
