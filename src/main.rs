use clap::{Parser, Subcommand};
use std::error::Error;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use tracing::info;

use step_telemetry::config;
use step_telemetry::feature::{Keyword, StepCatalog};
use step_telemetry::report::{RESULTS_SHEET, ReportRenderer, RowStyle, read_report};
use step_telemetry::{TestRun, classify_error, classify_step};

/// Step Telemetry - ledger, analytics and reports for UI automation runs
#[derive(Parser, Debug)]
#[command(
    name = "step-telemetry",
    about = "Execution ledger, analytics and spreadsheet reports for UI automation runs",
    after_help = "ENVIRONMENT VARIABLES:\n\
        STEP_TELEMETRY_REPORTS_DIR    Directory receiving reports\n\
        STEP_TELEMETRY_RUN_NAME       Default run name\n\
        STEP_TELEMETRY_MANIFEST       Write a JSON manifest (true/false)\n\
        STEP_TELEMETRY_FEATURES_DIR   Directory for generated feature files\n\
        RUST_LOG                      Log filter (default: info)"
)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build a report from step observations (one JSON object per line)
    Render {
        /// JSON-lines file of observations
        #[arg(short, long)]
        input: PathBuf,

        /// Run name used in the report file name
        #[arg(short = 'n', long)]
        run_name: Option<String>,

        /// Output directory (default: STEP_TELEMETRY_REPORTS_DIR)
        #[arg(short, long)]
        reports_dir: Option<PathBuf>,

        /// Skip the JSON manifest
        #[arg(long)]
        no_manifest: bool,
    },

    /// Print the sheets of an existing report
    Inspect {
        /// Report file (.xlsx or .json)
        path: PathBuf,
    },

    /// Classify a step name, or an error message with --error
    Classify {
        text: String,

        #[arg(short, long)]
        error: bool,
    },

    /// Generate a Gherkin feature file
    Feature {
        /// What the scenario should verify
        description: String,

        /// Catalog entry as KEYWORD:TEXT (repeatable; default: built-in catalog)
        #[arg(short, long = "step")]
        steps: Vec<String>,

        /// Output directory (default: STEP_TELEMETRY_FEATURES_DIR)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let args = Args::parse();

    match args.command {
        Commands::Render {
            input,
            run_name,
            reports_dir,
            no_manifest,
        } => {
            let mut run = TestRun::new();
            let stats = run.ingest_json_lines(BufReader::new(File::open(&input)?))?;
            info!(
                records = stats.accepted,
                duplicates = stats.duplicates,
                skipped = stats.malformed,
                "observations ingested"
            );

            let renderer = ReportRenderer::new(reports_dir.unwrap_or_else(config::reports_dir))
                .manifest(config::get().report.write_manifest && !no_manifest);
            let run_name = run_name.unwrap_or_else(config::default_run_name);

            let path = run.render(&renderer, &run_name)?;
            let summary = run.summary();
            println!("{}", path.display());
            println!(
                "  {} steps, {} passed, {} failed ({:.1}% success)",
                summary.total, summary.passed, summary.failed, summary.success_rate
            );
        }

        Commands::Inspect { path } => {
            let workbook = read_report(&path)?;
            for sheet in &workbook.sheets {
                println!("{}: {} rows", sheet.name, sheet.rows.len());
            }
            if let Some(results) = workbook.sheet(RESULTS_SHEET) {
                if let Some(header) = results.rows.first() {
                    println!("Header: {}", header.cells.join(" | "));
                }
                let flagged = results
                    .rows
                    .iter()
                    .filter(|r| r.style == RowStyle::Flagged)
                    .count();
                println!("Failed steps: {}", flagged);
            }
        }

        Commands::Classify { text, error } => {
            if error {
                println!("{}", classify_error(Some(text.as_str())));
            } else {
                println!("{}", classify_step(&text));
            }
        }

        Commands::Feature {
            description,
            steps,
            out,
        } => {
            let catalog = if steps.is_empty() {
                StepCatalog::builtin()
            } else {
                let mut catalog = StepCatalog::new();
                for entry in &steps {
                    let (keyword, text) = entry
                        .split_once(':')
                        .ok_or_else(|| format!("Invalid step '{}'. Use KEYWORD:TEXT", entry))?;
                    catalog.add(keyword.parse::<Keyword>()?, text.trim());
                }
                catalog
            };

            let feature = catalog.generate(&description);
            let path = feature.save(&out.unwrap_or_else(config::features_dir))?;
            println!("Feature file created: {}", path.display());
            println!();
            print!("{}", feature);
        }
    }

    Ok(())
}
