use clap::{Parser, Subcommand};
use measurs::cli::{convert_input, show_history, show_key};
use measurs::config::Config;
use measurs::observe::TracingObserver;
use measurs::telemetry::{init_logging, LogOptions};
use measurs::Grammar;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

/// Version info from build.rs
const VERSION: &str = env!("MEASURS_VERSION");
const BUILD: &str = env!("MEASURS_BUILD");
const PROFILE: &str = env!("MEASURS_PROFILE");
const GIT_HASH: &str = env!("MEASURS_GIT_HASH");

fn get_version() -> &'static str {
    use std::sync::OnceLock;
    static VERSION_STRING: OnceLock<String> = OnceLock::new();
    VERSION_STRING.get_or_init(|| {
        format!("{} {} build {} ({})", PROFILE, VERSION, BUILD, GIT_HASH)
    })
}

#[derive(Parser)]
#[command(name = "measurs")]
#[command(author, about = "Measurement package converter with encrypted history", long_about = None)]
struct Cli {
    /// Print version
    #[arg(short = 'V', long)]
    version: bool,

    /// Directory holding the key and both history sinks
    #[arg(long, global = true, env = "MEASURS_DATA_DIR", default_value = ".")]
    data_dir: PathBuf,

    /// Key file (default: <data-dir>/measurs.key)
    #[arg(long, global = true, env = "MEASURS_KEY_FILE")]
    key_file: Option<PathBuf>,

    /// Primary collection file (default: <data-dir>/history.jsonl)
    #[arg(long, global = true)]
    collection_file: Option<PathBuf>,

    /// Secondary history file (default: <data-dir>/history.json)
    #[arg(long, global = true)]
    history_file: Option<PathBuf>,

    /// Log filter, overridden by RUST_LOG
    #[arg(long, global = true, env = "MEASURS_LOG", default_value = "info")]
    log_level: String,

    /// Also append logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a measurement string and record it
    #[command(alias = "c")]
    Convert {
        /// Measurement string, e.g. "abbcc"
        input: String,

        /// Decoding grammar
        #[arg(long, default_value = "package", value_parser = parse_grammar)]
        grammar: Grammar,
    },

    /// Print the decrypted conversion history
    #[command(alias = "h")]
    History,

    /// Load or create the encryption key and show its fingerprint
    #[command(alias = "k")]
    Key,
}

fn parse_grammar(s: &str) -> Result<Grammar, String> {
    s.parse().map_err(|e| format!("{}", e))
}

impl Cli {
    fn config(&self, grammar: Grammar) -> Config {
        let mut config = Config::in_dir(&self.data_dir);
        if let Some(path) = &self.key_file {
            config.key_file = path.clone();
        }
        if let Some(path) = &self.collection_file {
            config.collection_file = path.clone();
        }
        if let Some(path) = &self.history_file {
            config.history_file = path.clone();
        }
        config.grammar = grammar;
        config
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.version {
        println!("measurs {}", get_version());
        return ExitCode::SUCCESS;
    }

    let command = match &cli.command {
        Some(cmd) => cmd,
        None => {
            use clap::CommandFactory;
            if let Err(e) = Cli::command().print_help() {
                eprintln!("Error: {}", e);
                return ExitCode::FAILURE;
            }
            println!();
            return ExitCode::SUCCESS;
        }
    };

    let log_options = LogOptions {
        level: cli.log_level.clone(),
        file: cli.log_file.clone(),
    };
    if let Err(e) = init_logging(&log_options) {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    let observer = Arc::new(TracingObserver);
    let result = match command {
        Commands::Convert { input, grammar } => cli
            .config(*grammar)
            .open_service(observer)
            .and_then(|service| convert_input(&service, input)),

        Commands::History => cli
            .config(Grammar::default())
            .open_service(observer)
            .and_then(|service| show_history(&service)),

        Commands::Key => show_key(&cli.config(Grammar::default())),
    };

    match result {
        Ok(output) => {
            if output.ends_with('\n') {
                print!("{}", output);
            } else {
                println!("{}", output);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::debug!(error = ?e, "command failed");
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
