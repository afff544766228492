//! hcpgen command-line tool
//!
//! Generates healthcare plan documents from the subject, plan-content and
//! treatment workbooks, and stamps effective dates into existing documents.

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::fs::File;
use std::path::PathBuf;
use std::process;
use std::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use hcpgen::{
    parse_date_text, stamp_file, GeneratorBuilder, GeneratorConfig, HcpError, NumericErrorPolicy,
    StampOutcome,
};

#[derive(Parser)]
#[command(name = "hcpgen")]
#[command(about = "Healthcare plan document generator", version)]
struct Cli {
    /// Log filter (e.g. "info", "hcpgen=debug"); RUST_LOG is used when omitted
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Also write the log to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate one document per subject and plan type
    Generate(GenerateArgs),
    /// Write an effective date into an existing document
    Stamp {
        /// Document to update
        #[arg(long)]
        input: PathBuf,
        /// Folder for the "Updated_" copy
        #[arg(long)]
        output_folder: PathBuf,
        /// Effective date (e.g. 2021-10-07 or 10/07/2021)
        #[arg(long, value_parser = parse_date_arg)]
        date: NaiveDate,
    },
}

#[derive(Args)]
struct GenerateArgs {
    /// JSON configuration file; the flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,
    /// Subject workbook
    #[arg(long)]
    subjects: Option<PathBuf>,
    /// Plan-content workbook (defaults to the subject workbook)
    #[arg(long)]
    plan_content: Option<PathBuf>,
    /// Treatment database workbook
    #[arg(long)]
    treatments: Option<PathBuf>,
    /// Document template
    #[arg(long)]
    template: Option<PathBuf>,
    /// Root folder for generated documents
    #[arg(long)]
    output_root: Option<PathBuf>,
    /// Effective date written into each generated document
    #[arg(long, value_parser = parse_date_arg)]
    effective_date: Option<NaiveDate>,
    /// Skip the save before treatment notes are injected
    #[arg(long)]
    no_intermediate_save: bool,
    /// Abort the run when a numeric identifier is not a number
    #[arg(long)]
    abort_on_invalid_number: bool,
    /// Print the run summary as JSON to stdout
    #[arg(long)]
    summary_json: bool,
}

fn parse_date_arg(value: &str) -> Result<NaiveDate, String> {
    parse_date_text(value).ok_or_else(|| format!("invalid date: {}", value))
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.log_level.as_deref(), cli.log_file.as_ref()) {
        eprintln!("Error: failed to initialise logging: {}", e);
        process::exit(2);
    }

    let result = match cli.command {
        Commands::Generate(args) => generate(args),
        Commands::Stamp {
            input,
            output_folder,
            date,
        } => stamp(input, output_folder, date),
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "Run failed");
        handle_error(e);
        process::exit(1);
    }
}

fn init_logging(
    level: Option<&str>,
    log_file: Option<&PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let filter = match level {
        Some(level) => EnvFilter::try_new(level)?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("hcpgen=info")),
    };

    let file_layer = match log_file {
        Some(path) => {
            let file = File::create(path)?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .try_init()?;
    Ok(())
}

fn generate(args: GenerateArgs) -> Result<(), HcpError> {
    let config = match &args.config {
        Some(path) => GeneratorConfig::from_json_file(path)?,
        None => GeneratorConfig::default(),
    };

    let mut builder = GeneratorBuilder::from_config(config);
    if let Some(path) = args.subjects {
        builder = builder.with_subject_workbook(path);
    }
    if let Some(path) = args.plan_content {
        builder = builder.with_plan_content_workbook(path);
    }
    if let Some(path) = args.treatments {
        builder = builder.with_treatment_workbook(path);
    }
    if let Some(path) = args.template {
        builder = builder.with_template(path);
    }
    if let Some(path) = args.output_root {
        builder = builder.with_output_root(path);
    }
    if let Some(date) = args.effective_date {
        builder = builder.with_effective_date(date);
    }
    if args.no_intermediate_save {
        builder = builder.write_intermediate(false);
    }
    if args.abort_on_invalid_number {
        builder = builder.with_numeric_error_policy(NumericErrorPolicy::Abort);
    }

    let summary = builder.build()?.run()?;

    for skipped in &summary.subjects_skipped {
        tracing::warn!(row = skipped.row, reason = %skipped.reason, "Subject skipped");
    }
    for plan_type in &summary.plans_without_content {
        tracing::warn!(plan_type = %plan_type, "Plan type has no content row");
    }
    for path in &summary.labels_missing {
        tracing::warn!(path = %path.display(), "Treatment label not found");
    }

    if args.summary_json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!(
            "Healthcare plans updated successfully: {} files ({} documents), {} subjects skipped",
            summary.distinct_files(),
            summary.documents_written.len(),
            summary.subjects_skipped.len()
        );
    }
    Ok(())
}

fn stamp(input: PathBuf, output_folder: PathBuf, date: NaiveDate) -> Result<(), HcpError> {
    let (output, outcome) = stamp_file(&input, &output_folder, date)?;
    match outcome {
        StampOutcome::Stamped => println!("Effective date written: {}", output.display()),
        _ => println!(
            "Effective Date row not found; document copied unchanged: {}",
            output.display()
        ),
    }
    Ok(())
}

fn handle_error(error: HcpError) {
    match error {
        HcpError::Io(io_err) => {
            eprintln!("I/O Error: {}", io_err);
        }
        HcpError::Open { path, source } => {
            eprintln!("Cannot open '{}': {}", path.display(), source);
            eprintln!("Please check that the file exists and you have permission to access it.");
        }
        HcpError::Parse(parse_err) => {
            eprintln!("Spreadsheet Error: {}", parse_err);
            eprintln!("The file may not be a valid workbook or may be corrupted.");
        }
        HcpError::Xml(xml_err) => {
            eprintln!("XML Error: {}", xml_err);
            eprintln!("The document template may be corrupted.");
        }
        HcpError::Utf8(utf8_err) => {
            eprintln!("UTF-8 Conversion Error: {}", utf8_err);
        }
        HcpError::Zip(msg) => {
            eprintln!("ZIP Archive Error: {}", msg);
            eprintln!("The file may be corrupted or not a valid document package.");
        }
        HcpError::Json(json_err) => {
            eprintln!("Configuration File Error: {}", json_err);
        }
        HcpError::Config(msg) => {
            eprintln!("Configuration Error: {}", msg);
        }
        HcpError::MissingColumn { table, column } => {
            eprintln!("Missing Column: '{}' in sheet '{}'", column, table);
            eprintln!("Column names are compared after removing spaces and punctuation.");
        }
        HcpError::InvalidDocument(msg) => {
            eprintln!("Invalid Document: {}", msg);
        }
        HcpError::InvalidNumber { column, value } => {
            eprintln!("Invalid Number: column '{}' has value '{}'", column, value);
            eprintln!("Fix the source data or run without --abort-on-invalid-number to skip the row.");
        }
        HcpError::SecurityViolation(msg) => {
            eprintln!("Security Violation: {}", msg);
        }
    }
}
