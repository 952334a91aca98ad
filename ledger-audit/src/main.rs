mod dump;
mod reconcile;

use clap::{Parser, Subcommand};
use dump::{dump_sinks, DumpOptions};
use measurs::config::Config;
use reconcile::reconcile_sinks;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "ledger-audit")]
#[command(about = "Operator tooling for the measurs history sinks")]
struct Cli {
    /// Directory holding the key and both history sinks
    #[arg(long, global = true, env = "MEASURS_DATA_DIR", default_value = ".")]
    data_dir: PathBuf,

    /// Key file (default: <data-dir>/measurs.key)
    #[arg(long, global = true, env = "MEASURS_KEY_FILE")]
    key_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decrypt and list both sinks
    Dump {
        /// Write the decrypted entries to a new JSON file
        #[arg(long)]
        export: Option<PathBuf>,
    },

    /// Compare the encrypted records held by the two sinks
    Reconcile {
        /// Exit with status 2 when the sinks diverge
        #[arg(long)]
        strict: bool,
    },
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let mut config = Config::in_dir(&cli.data_dir);
    if let Some(path) = cli.key_file {
        config.key_file = path;
    }

    match cli.command {
        Commands::Dump { export } => {
            let options = DumpOptions { export };
            print!("{}", dump_sinks(&config, &options)?);
        }
        Commands::Reconcile { strict } => {
            let report = reconcile_sinks(&config)?;
            print!("{}", report.render());
            if strict && !report.is_consistent() {
                return Ok(ExitCode::from(2));
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}
