//! covidviews - filtered case views for Argentina COVID-19 records
//!
//! A CLI tool that loads a case CSV, filters it by gender and age range,
//! and produces the region and age-region tables behind the dashboard
//! charts.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (missing data file, bad config, malformed CSV, etc.)
//!   2 - No records match the filter and --fail-on-empty is set

mod analysis;
mod cli;
mod config;
mod loader;
mod models;
mod report;
mod session;

use anyhow::{Context, Result};
use analysis::DatasetFacets;
use chrono::Utc;
use cli::{Args, OutputFormat};
use config::{Config, FilterConfig, CONFIG_FILE_NAME};
use loader::{ColumnMapping, Dataset, DatasetOptions};
use models::{AggregateViews, FilterState, Gender, ReportMetadata, ViewReport};
use report::MarkdownOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("covidviews v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(args) {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Run failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .covidviews.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE_NAME);
    println!("   Edit it to set the data path, column names, and default filter.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Load data, build the views, and emit them. Returns exit code (0 or 2).
fn run(args: Args) -> Result<i32> {
    let start_time = Instant::now();

    // Load configuration
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    // Step 1: Load and clean the dataset
    let options = DatasetOptions {
        columns: ColumnMapping::from(&config.dataset.columns),
        delimiter: config.delimiter_byte()?,
        show_progress: !args.quiet && !args.interactive,
    };
    let data_path = PathBuf::from(&config.dataset.path);
    let dataset = loader::load_dataset(&data_path, &options)
        .with_context(|| format!("Failed to load case data from {}", data_path.display()))?;

    let facets = DatasetFacets::from_records(&dataset.records);

    // Handle --facets: describe the dataset and exit
    if args.facets {
        let stdout = std::io::stdout();
        session::print_facets(&facets, &mut stdout.lock())?;
        return Ok(0);
    }

    // Step 2: Resolve the filter
    let filter = resolve_filter(&config.filter, &facets)?;
    info!("Filter: {}", filter);

    // Handle --interactive: hand control to the session loop
    if args.interactive {
        let mut session = session::Session::new(&dataset.records, filter);
        let stdin = std::io::stdin();
        let stdout = std::io::stdout();
        session.run(stdin.lock(), &mut stdout.lock())?;
        info!(
            "Session ended with [{}]: {} matching records",
            session.filter(),
            session.views().filtered_records
        );
        return Ok(0);
    }

    // Step 3: Build the views
    let views = analysis::build_views(&dataset.records, &filter);
    if views.is_empty() {
        warn!("No records match the filter");
    }

    let report = build_report(&dataset, filter, views);

    // Step 4: Emit
    write_output(&report, &config)?;

    info!(
        "Built {} region rows and {} age-region rows in {:.2}s",
        report.region_counts.len(),
        report.age_region_counts.len(),
        start_time.elapsed().as_secs_f64()
    );

    if args.fail_on_empty && report.metadata.records_filtered == 0 {
        eprintln!("\n⛔ No records match the filter. Failing (exit code 2).");
        return Ok(2);
    }

    Ok(0)
}

/// Combine configured filter values with the dataset defaults.
///
/// Missing genders select every gender present; missing bounds take the
/// dataset's age range. Only two explicit, inverted bounds are an error.
fn resolve_filter(config: &FilterConfig, facets: &DatasetFacets) -> Result<FilterState> {
    let defaults = facets.default_filter();

    let genders: Vec<Gender> = if config.genders.is_empty() {
        defaults.genders().iter().copied().collect()
    } else {
        session::parse_gender_list(&config.genders.join(","))?
    };

    // A single given bound widens the dataset default so it never inverts.
    let (age_min, age_max) = match (config.age_min, config.age_max) {
        (Some(min), Some(max)) => (min, max),
        (Some(min), None) => (min, facets.age_max.unwrap_or(min).max(min)),
        (None, Some(max)) => (facets.age_min.unwrap_or(0).min(max), max),
        (None, None) => (defaults.age_min(), defaults.age_max()),
    };

    FilterState::new(genders, age_min, age_max).context("Invalid filter")
}

/// Assemble the report from a dataset and its views.
fn build_report(dataset: &Dataset, filter: FilterState, views: AggregateViews) -> ViewReport {
    ViewReport {
        metadata: ReportMetadata {
            source: dataset.source.clone(),
            generated_at: Utc::now(),
            rows_read: dataset.stats.rows_read,
            rows_dropped: dataset.stats.rows_dropped,
            records_loaded: dataset.stats.rows_kept,
            records_filtered: views.filtered_records,
        },
        filter,
        region_counts: views.region_counts,
        age_region_counts: views.age_region_counts,
    }
}

/// Write the report in the configured format.
fn write_output(report: &ViewReport, config: &Config) -> Result<()> {
    let to_stdout = config.report.output == "-";
    let output_path = PathBuf::from(&config.report.output);

    match config.report.format {
        OutputFormat::Csv if to_stdout => {
            let stdout = std::io::stdout();
            let mut handle = stdout.lock();
            report::write_region_csv(&report.region_counts, &mut handle)?;
            writeln!(handle)?;
            report::write_age_region_csv(&report.age_region_counts, &mut handle)?;
        }
        OutputFormat::Csv => {
            let age_region_path = report::write_csv_reports(report, &output_path)?;
            println!(
                "✅ Views saved to: {} and {}",
                output_path.display(),
                age_region_path.display()
            );
        }
        format => {
            let content = match format {
                OutputFormat::Json => report::generate_json_report(report)?,
                _ => report::generate_markdown_report(report, &MarkdownOptions::from(&config.report)),
            };

            if to_stdout {
                let stdout = std::io::stdout();
                let mut handle = stdout.lock();
                handle.write_all(content.as_bytes())?;
                if !content.ends_with('\n') {
                    writeln!(handle)?;
                }
            } else {
                std::fs::write(&output_path, &content).with_context(|| {
                    format!("Failed to write report to {}", output_path.display())
                })?;
                println!("✅ Views saved to: {}", output_path.display());
            }
        }
    }

    Ok(())
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", CONFIG_FILE_NAME);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
