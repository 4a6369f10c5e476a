//! View report generation.
//!
//! This module renders the region and age-region views as Markdown,
//! JSON or CSV, ready to be charted by an external tool.

use crate::models::{AgeRegionCount, FilterState, RegionCount, ReportMetadata, ViewReport};
use anyhow::{Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Title of the region view (bar chart).
pub const REGION_TITLE: &str = "COVID-19 Cases by Region";

/// Title of the age-region view (scatter plot).
pub const AGE_REGION_TITLE: &str = "Age-Region Frequency Visualization";

/// Markdown rendering options.
#[derive(Debug, Clone, Copy)]
pub struct MarkdownOptions {
    /// Maximum age-region rows to print (0 = all).
    pub max_age_region_rows: usize,
    /// Width of the longest region bar.
    pub bar_width: usize,
}

impl Default for MarkdownOptions {
    fn default() -> Self {
        Self {
            max_age_region_rows: 200,
            bar_width: 30,
        }
    }
}

impl From<&crate::config::ReportConfig> for MarkdownOptions {
    fn from(config: &crate::config::ReportConfig) -> Self {
        Self {
            max_age_region_rows: config.max_age_region_rows,
            bar_width: config.bar_width,
        }
    }
}

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &ViewReport, options: &MarkdownOptions) -> String {
    let mut output = String::new();

    output.push_str("# COVID-19 Visualizations for Argentina\n\n");
    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_filter_section(&report.filter));
    output.push_str(&generate_region_section(
        &report.region_counts,
        report.metadata.records_filtered,
        options.bar_width,
    ));
    output.push_str(&generate_age_region_section(
        &report.age_region_counts,
        options.max_age_region_rows,
    ));

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Source:** `{}`\n", metadata.source));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Rows Read:** {}\n", metadata.rows_read));
    if metadata.rows_dropped > 0 {
        section.push_str(&format!("- **Rows Dropped:** {}\n", metadata.rows_dropped));
    }
    section.push_str(&format!(
        "- **Records Loaded:** {}\n",
        metadata.records_loaded
    ));
    section.push_str(&format!(
        "- **Records Matching Filter:** {}\n",
        metadata.records_filtered
    ));
    section.push('\n');

    section
}

/// Generate the active filter section.
fn generate_filter_section(filter: &FilterState) -> String {
    format!("## Filter\n\n`{}`\n\n", filter)
}

/// Generate the region table with share and a proportional bar.
fn generate_region_section(regions: &[RegionCount], total: usize, bar_width: usize) -> String {
    let mut section = String::new();

    section.push_str(&format!("## {}\n\n", REGION_TITLE));

    if regions.is_empty() {
        section.push_str("No cases match the current filter.\n\n");
        return section;
    }

    let max_cases = regions.iter().map(|r| r.cases).max().unwrap_or(0);

    section.push_str("| Province | Cases | Share | |\n");
    section.push_str("|:---|---:|---:|:---|\n");

    for region in regions {
        let share = if total > 0 {
            region.cases as f64 * 100.0 / total as f64
        } else {
            0.0
        };
        section.push_str(&format!(
            "| {} | {} | {:.1}% | {} |\n",
            region.province,
            region.cases,
            share,
            bar(region.cases, max_cases, bar_width)
        ));
    }
    section.push('\n');

    section
}

/// Generate the age-region table.
fn generate_age_region_section(rows: &[AgeRegionCount], max_rows: usize) -> String {
    let mut section = String::new();

    section.push_str(&format!("## {}\n\n", AGE_REGION_TITLE));

    if rows.is_empty() {
        section.push_str("No cases match the current filter.\n\n");
        return section;
    }

    section.push_str("| Age | Province | Gender | Cases |\n");
    section.push_str("|---:|:---|:---:|---:|\n");

    let shown = if max_rows == 0 {
        rows.len()
    } else {
        max_rows.min(rows.len())
    };

    for row in &rows[..shown] {
        section.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            row.age, row.province, row.gender, row.cases
        ));
    }
    section.push('\n');

    if shown < rows.len() {
        section.push_str(&format!(
            "*Showing {} of {} rows. Use JSON or CSV output for the full table.*\n\n",
            shown,
            rows.len()
        ));
    }

    section
}

/// Bar scaled so that `max` fills `width` cells. Non-zero values get at least one cell.
fn bar(value: usize, max: usize, width: usize) -> String {
    if max == 0 || width == 0 || value == 0 {
        return String::new();
    }
    let cells = ((value as f64 / max as f64) * width as f64).round() as usize;
    "█".repeat(cells.max(1))
}

/// Generate a JSON report.
pub fn generate_json_report(report: &ViewReport) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

/// Path of the age-region CSV written next to the region CSV.
pub fn age_region_csv_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "views".to_string());
    path.with_file_name(format!("{}_age_region.csv", stem))
}

/// Write the region view as CSV.
pub fn write_region_csv<W: Write>(regions: &[RegionCount], writer: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(["province", "cases"])?;
    for region in regions {
        writer.write_record([region.province.as_str(), region.cases.to_string().as_str()])?;
    }
    writer.flush()?;
    Ok(())
}

/// Write the age-region view as CSV.
pub fn write_age_region_csv<W: Write>(rows: &[AgeRegionCount], writer: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(["age", "province", "gender", "cases"])?;
    for row in rows {
        writer.write_record([
            row.age.to_string().as_str(),
            row.province.as_str(),
            row.gender.code(),
            row.cases.to_string().as_str(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Write both views as CSV files: regions to `path`, age-region rows beside it.
///
/// Returns the path of the age-region file.
pub fn write_csv_reports(report: &ViewReport, path: &Path) -> Result<PathBuf> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    write_region_csv(&report.region_counts, file)?;

    let age_region_path = age_region_csv_path(path);
    let file = std::fs::File::create(&age_region_path)
        .with_context(|| format!("Failed to create {}", age_region_path.display()))?;
    write_age_region_csv(&report.age_region_counts, file)?;

    Ok(age_region_path)
}
