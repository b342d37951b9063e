//! nxinstrument: NeXus instrument geometry and transformation graphs.
//!
//! nxinstrument reads the JSON description of a NeXus file into an
//! instrument model (components, their shapes and pixel layouts, and the
//! chains of transformations placing them in space), checks it, and writes
//! it back out together with the file-writer's start and stop commands.
//!
//! # Modules
//!
//! - [`model`]: Instrument, component, transformation and geometry types
//! - [`json`]: NeXus JSON reader and writer, command envelope
//! - [`units`]: Unit string parsing and dimensionality checks
//! - [`pixel_grid`]: Pixel grid decoding from offset and id matrices
//! - [`validation`]: Structured reports and instrument checks
//! - [`error`]: Error types for nxinstrument operations

pub mod error;
pub mod json;
pub mod model;
pub mod pixel_grid;
pub mod units;
pub mod validation;

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;

pub use error::NexusError;

use json::{NexusJsonWriter, ReadOptions, ReadOutcome, WriterConfig};
use model::{Component, Geometry, Instrument, PixelData};
use validation::{ValidationIssue, ValidationReport};

/// The nxinstrument CLI application.
#[derive(Parser)]
#[command(name = "nxinstrument")]
#[command(version, author, about)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Load an instrument and summarise its components.
    Inspect(InspectArgs),
    /// Load an instrument and check it for errors and warnings.
    Validate(ValidateArgs),
    /// Load an instrument and write it back out as NeXus JSON.
    Export(ExportArgs),
    /// Wrap an instrument in file-writer start and stop commands.
    Commands(CommandsArgs),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
enum ReportFormat {
    #[default]
    Text,
    Json,
}

/// Options shared by every subcommand that reads an instrument.
#[derive(clap::Args)]
struct InputArgs {
    /// NeXus JSON file to read.
    input: PathBuf,

    /// Report dependency cycles instead of refusing to load.
    #[arg(long)]
    allow_cycles: bool,
}

impl InputArgs {
    fn load(&self) -> Result<ReadOutcome, NexusError> {
        let opts = ReadOptions {
            fail_on_cycle: !self.allow_cycles,
        };
        json::read_json_file(&self.input, &opts)
    }
}

#[derive(clap::Args)]
struct InspectArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Output format for the summary.
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    output: ReportFormat,
}

#[derive(clap::Args)]
struct ValidateArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Treat warnings as errors (exit non-zero if any warnings).
    #[arg(long)]
    strict: bool,

    /// Output format for the report.
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    output: ReportFormat,
}

/// Options for rendering the nexus structure.
#[derive(clap::Args)]
struct WriterArgs {
    /// YAML writer configuration (broker, streams, links, truncation).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Clip array dimensions longer than N elements.
    #[arg(long, value_name = "N")]
    truncate: Option<usize>,

    /// Output file (defaults to stdout).
    #[arg(short = 'o', long = "out")]
    out: Option<PathBuf>,
}

impl WriterArgs {
    fn config(&self) -> Result<WriterConfig, NexusError> {
        match &self.config {
            Some(path) => json::load_writer_config(path),
            None => Ok(WriterConfig::default()),
        }
    }
}

#[derive(clap::Args)]
struct ExportArgs {
    #[command(flatten)]
    input: InputArgs,

    #[command(flatten)]
    writer: WriterArgs,
}

#[derive(clap::Args)]
struct CommandsArgs {
    #[command(flatten)]
    input: InputArgs,

    #[command(flatten)]
    writer: WriterArgs,

    /// Kafka broker address.
    #[arg(long, env = "NXINSTRUMENT_BROKER")]
    broker: Option<String>,

    /// Job id shared by the start and stop commands (generated if omitted).
    #[arg(long)]
    job_id: Option<String>,

    /// Name of the file the file-writer should create.
    #[arg(long)]
    file_name: Option<String>,

    /// Start time in milliseconds since the Unix epoch.
    #[arg(long)]
    start_time: Option<i64>,

    /// Stop time in milliseconds since the Unix epoch.
    #[arg(long)]
    stop_time: Option<i64>,
}

/// Run the nxinstrument CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), NexusError> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Inspect(args)) => run_inspect(args),
        Some(Commands::Validate(args)) => run_validate(args),
        Some(Commands::Export(args)) => run_export(args),
        Some(Commands::Commands(args)) => run_commands(args),
        None => {
            println!("nxinstrument {}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("NeXus instrument geometry and transformation graph interchange.");
            println!();
            println!("Run 'nxinstrument --help' for usage information.");
            Ok(())
        }
    }
}

#[derive(Serialize)]
struct InspectSummary<'a> {
    instrument: &'a Instrument,
    report: &'a ValidationReport,
}

#[derive(Serialize)]
struct ReportSummary<'a> {
    error_count: usize,
    warning_count: usize,
    issues: &'a [ValidationIssue],
}

fn run_inspect(args: InspectArgs) -> Result<(), NexusError> {
    let ReadOutcome { instrument, report } = args.input.load()?;

    match args.output {
        ReportFormat::Json => {
            let summary = InspectSummary {
                instrument: &instrument,
                report: &report,
            };
            print_json(&summary, &args.input.input)?;
        }
        ReportFormat::Text => {
            println!(
                "Instrument '{}' in entry '{}' ({} components)",
                instrument.name,
                instrument.entry_name,
                instrument.component_count()
            );
            for component in instrument.components_iter() {
                println!("  {}", describe_component(&instrument, component));
            }
            println!();
            print!("{report}");
        }
    }
    Ok(())
}

fn describe_component(instrument: &Instrument, component: &Component) -> String {
    let geometry = match &component.geometry {
        Some(Geometry::Off(off)) => format!("off ({} faces)", off.face_count()),
        Some(Geometry::Cylindrical(_)) => "cylinder".to_string(),
        None => "none".to_string(),
    };
    let pixels = match &component.pixel_data {
        PixelData::Grid(grid) => format!("grid {}x{}", grid.rows, grid.columns),
        PixelData::Mapping(mapping) => format!("mapping ({} ids)", mapping.ids.len()),
        PixelData::SingleId { id } => format!("id {id}"),
        PixelData::None => "none".to_string(),
    };
    let chain = match instrument.dependency_chain(&component.name) {
        Ok(chain) if chain.is_empty() => "origin".to_string(),
        Ok(chain) => chain
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" -> "),
        Err(err) => err.to_string(),
    };
    format!(
        "{} [{}] transforms={} geometry={} pixels={} chain: {}",
        component.name,
        component.nx_class,
        component.transforms.len(),
        geometry,
        pixels,
        chain
    )
}

fn run_validate(args: ValidateArgs) -> Result<(), NexusError> {
    let ReadOutcome {
        instrument,
        mut report,
    } = args.input.load()?;

    let opts = validation::ValidateOptions {
        strict: args.strict,
    };
    report.extend(validation::validate_instrument(&instrument, &opts));

    match args.output {
        ReportFormat::Json => {
            let body = ReportSummary {
                error_count: report.error_count(),
                warning_count: report.warning_count(),
                issues: &report.issues,
            };
            print_json(&body, &args.input.input)?;
        }
        ReportFormat::Text => print!("{report}"),
    }

    finish_report(report, args.strict)
}

fn finish_report(report: ValidationReport, strict: bool) -> Result<(), NexusError> {
    let passed = if strict {
        report.is_ok_strict()
    } else {
        report.is_ok()
    };

    if !passed {
        Err(NexusError::ValidationFailed {
            error_count: report.error_count(),
            warning_count: report.warning_count(),
            report,
        })
    } else {
        Ok(())
    }
}

fn run_export(args: ExportArgs) -> Result<(), NexusError> {
    let ReadOutcome { instrument, report } = args.input.load()?;
    if !report.is_clean() {
        eprint!("{report}");
    }

    let config = args.writer.config()?;
    let writer = writer_for(&config, args.writer.truncate);

    match &args.writer.out {
        Some(path) => json::write_json_file(path, &instrument, &writer),
        None => print_json(
            &json::instrument_document(&instrument, &writer),
            &args.input.input,
        ),
    }
}

fn run_commands(args: CommandsArgs) -> Result<(), NexusError> {
    let ReadOutcome { instrument, report } = args.input.load()?;
    if !report.is_clean() {
        eprint!("{report}");
    }

    let config = args.writer.config()?;
    let writer = writer_for(&config, args.writer.truncate);
    let structure = writer.structure(&json::instrument_to_tree(&instrument));

    let mut opts = config.command_options();
    if let Some(broker) = args.broker {
        opts.broker = broker;
    }
    if let Some(job_id) = args.job_id {
        opts.job_id = job_id;
    }
    opts.start_time = args.start_time;
    opts.stop_time = args.stop_time;

    let file_name = args
        .file_name
        .or(config.file_name)
        .unwrap_or_else(|| default_file_name(&args.input.input));
    let (write, stop) = json::create_writer_commands(structure, &file_name, &opts);

    match &args.writer.out {
        Some(path) => json::write_commands_file(path, &write, &stop),
        None => print_json(&(write, stop), &args.input.input),
    }
}

/// Flag values win over the configuration file.
fn writer_for(config: &WriterConfig, truncate: Option<usize>) -> NexusJsonWriter {
    let mut writer = config.writer();
    if truncate.is_some() {
        writer.truncate = truncate;
    }
    writer
}

fn default_file_name(input: &Path) -> String {
    let stem = input
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("instrument");
    format!("{stem}.nxs")
}

fn print_json<T: Serialize>(value: &T, source: &Path) -> Result<(), NexusError> {
    let stdout = io::stdout();
    let mut lock = stdout.lock();
    serde_json::to_writer_pretty(&mut lock, value).map_err(|source_err| NexusError::JsonWrite {
        path: source.to_path_buf(),
        source: source_err,
    })?;
    writeln!(lock)?;
    Ok(())
}
