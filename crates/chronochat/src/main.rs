use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chronochat_core::aggregation::SummaryTable;
use chronochat_core::chart::format_value;
use chronochat_core::config::ExportConfig;
use chronochat_core::export::{export_artifacts, write_artifacts, ReportText};
use chronochat_core::notes::field_notes;
use chronochat_core::{visualize, ChartType, Dataset, SelectionSpec};
use clap::{Args, Parser, Subcommand};
use comfy_table::Table;
use polars::prelude::AnyValue;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod render;

use render::PlottersRenderer;

#[derive(Parser, Debug)]
#[command(author, version, about = "Timeline analysis for messaging-log exports", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the columns and first rows of an export
    Preview(PreviewArgs),
    /// Build a chart and summary table, then export the chart and a PDF report
    Visualize(VisualizeArgs),
    /// Explain the columns and code values of a message-log export
    Notes,
}

#[derive(Args, Debug)]
struct PreviewArgs {
    /// CSV export to read
    #[arg(short, long)]
    input: PathBuf,
    /// Number of rows to show
    #[arg(long, default_value_t = 10)]
    rows: usize,
}

#[derive(Args, Debug)]
struct VisualizeArgs {
    /// CSV export to read
    #[arg(short, long)]
    input: PathBuf,
    /// Chart type: line, scatter or bar
    #[arg(short, long, default_value = "line")]
    chart: ChartType,
    /// Timestamp column; defaults to the first column named like a timestamp or date
    #[arg(short, long)]
    timestamp: Option<String>,
    /// Attribute to plot; repeat for scatter plots
    #[arg(short, long = "attribute", required = true)]
    attributes: Vec<String>,
    /// Report title
    #[arg(long, default_value = "")]
    title: String,
    /// Report description
    #[arg(long, default_value = "")]
    description: String,
    /// TOML file with export settings
    #[arg(long)]
    config: Option<PathBuf>,
    /// Directory for exported artifacts (overrides config and CHRONOCHAT_OUTPUT_DIR)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,
    /// Also write the chart description as JSON to this path
    #[arg(long)]
    chart_json: Option<PathBuf>,
    /// Print the chart and summary without exporting artifacts
    #[arg(long)]
    no_export: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let cli = Cli::parse();

    let outcome = match cli.command {
        Command::Preview(args) => handle_preview(args),
        Command::Visualize(args) => handle_visualize(args),
        Command::Notes => {
            handle_notes();
            Ok(())
        }
    };

    if let Err(err) = outcome {
        error!(error = %format!("{err:#}"), "request failed");
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn load_dataset(path: &Path) -> Result<Dataset> {
    let file = fs::File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    chronochat_parser::read_dataset(file)
        .with_context(|| format!("failed to load data from {}", path.display()))
}

fn handle_preview(args: PreviewArgs) -> Result<()> {
    let dataset = load_dataset(&args.input)?;

    let mut table = Table::new();
    table.set_header(dataset.columns());
    for record in dataset.records().iter().take(args.rows) {
        table.add_row(record.values().map(ToString::to_string));
    }
    println!("{table}");
    println!("{} rows, {} columns", dataset.height(), dataset.columns().len());
    match dataset.suggest_timestamp_column() {
        Some(column) => println!("Suggested timestamp column: {column}"),
        None => println!("No timestamp-like column found; pass --timestamp explicitly."),
    }
    Ok(())
}

fn handle_visualize(args: VisualizeArgs) -> Result<()> {
    dotenvy::dotenv().ok();

    let mut config = ExportConfig::load(args.config.as_deref())
        .context("failed to load export configuration")?;
    if let Some(dir) = args.output_dir {
        config.output_dir = dir;
    }

    let dataset = load_dataset(&args.input)?;
    let timestamp_column = match args.timestamp {
        Some(column) => column,
        None => dataset
            .suggest_timestamp_column()
            .or_else(|| dataset.columns().first().map(String::as_str))
            .context("the uploaded table has no columns")?
            .to_string(),
    };

    let selection = SelectionSpec::new(args.chart, timestamp_column, args.attributes);
    let result = visualize(&dataset, &selection)?;

    println!("{}", result.chart.layout.title);
    println!(
        "{} of {} rows plotted ({} dropped), timestamps read as {:?}",
        result.cleaned.height(),
        dataset.height(),
        result.dropped_rows,
        result.timestamp_spec.encoding
    );
    println!("Result Table:");
    println!("{}", summary_table(&result.summary)?);

    if let Some(path) = &args.chart_json {
        let json = result
            .chart
            .to_json()
            .context("failed to serialize chart description")?;
        fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
        info!(path = %path.display(), "wrote chart description");
    }

    if args.no_export {
        return Ok(());
    }

    let text = ReportText {
        title: args.title,
        description: args.description,
    };
    let artifacts = export_artifacts(&PlottersRenderer, &result.chart, &text, &config)?;
    let (image_path, report_path) = write_artifacts(&artifacts, &config.output_dir)?;
    println!(
        "Chart ({}): {}",
        artifacts.image.mime_type,
        image_path.display()
    );
    println!(
        "Report ({}): {}",
        artifacts.report.mime_type,
        report_path.display()
    );
    Ok(())
}

fn summary_table(summary: &SummaryTable) -> Result<Table> {
    let frame = summary.dataframe();
    let mut table = Table::new();
    table.set_header(frame.get_column_names_str());

    for idx in 0..frame.height() {
        let mut row = Vec::with_capacity(frame.width());
        for column in frame.get_columns() {
            let cell = match column.get(idx)? {
                AnyValue::Null => String::new(),
                AnyValue::Float64(value) => format_value(value),
                AnyValue::String(value) => value.to_string(),
                other => other.to_string(),
            };
            row.push(cell);
        }
        table.add_row(row);
    }
    Ok(table)
}

fn handle_notes() {
    let mut table = Table::new();
    table.set_header(vec!["Column", "Description", "Codes"]);
    for note in field_notes() {
        let codes = note
            .codes
            .iter()
            .map(|(code, meaning)| format!("{code} = {meaning}"))
            .collect::<Vec<_>>()
            .join("\n");
        table.add_row(vec![note.column.to_string(), note.description.to_string(), codes]);
    }
    println!("{table}");
}
