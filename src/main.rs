use std::path::PathBuf;

use clap::{Parser, Subcommand};
use meshery_registry::Result;
use meshery_registry::config::{RawOptions, UpdateOptions};
use meshery_registry::logging::{self, LogSink};
use meshery_registry::sync;

fn main() {
    let cli = Cli::parse();
    if let Err(error) = run(cli) {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let sink = LogSink::new();
    logging::init(&cli.log_level, sink.clone())?;

    match cli.command {
        Command::Update(args) => {
            let options = UpdateOptions::new(args.into())?;
            sync::run_update(&options, &sink)?;
            Ok(())
        }
    }
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Keep the component registry in sync with curated metadata."
)]
struct Cli {
    /// Default log filter, used when RUST_LOG is unset.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Update component metadata (SVGs, shapes, styles and other) from a
    /// spreadsheet or a CSV directory.
    Update(UpdateArgs),
}

#[derive(clap::Args)]
struct UpdateArgs {
    /// Relative or absolute path to the models directory.
    #[arg(short, long, default_value = "../server/meshmodel")]
    input: PathBuf,

    /// Directory containing local CSV files; takes precedence over the spreadsheet.
    #[arg(long)]
    csv_dir: Option<PathBuf>,

    /// Identifier of the integration spreadsheet.
    #[arg(long, requires = "spreadsheet_cred")]
    spreadsheet_id: Option<String>,

    /// Base64 encoded credential to download the spreadsheet.
    #[arg(long, env = "MESHERY_SPREADSHEET_CRED", hide_env_values = true)]
    spreadsheet_cred: Option<String>,

    /// Only update this model.
    #[arg(short, long)]
    model: Option<String>,

    /// Definition version directory to update.
    #[arg(long, conflicts_with = "discover_versions")]
    definition_version: Option<String>,

    /// Update every version directory found under each definition group.
    #[arg(long)]
    discover_versions: bool,

    /// Directory receiving the run log.
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

impl From<UpdateArgs> for RawOptions {
    fn from(args: UpdateArgs) -> Self {
        RawOptions {
            input: args.input,
            csv_dir: args.csv_dir,
            spreadsheet_id: args.spreadsheet_id,
            spreadsheet_cred: args.spreadsheet_cred,
            model: args.model,
            definition_version: args.definition_version,
            discover_versions: args.discover_versions,
            log_dir: args.log_dir,
        }
    }
}
