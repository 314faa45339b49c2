#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

mod commands;
mod logging;

use clap::Parser;
use miette::{IntoDiagnostic, Result};
use rill_core::Config;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "rill")]
#[command(author, version, about = "A no-bundle dev server for single-file components", long_about = None)]
struct Cli {
    /// Increase logging verbosity (-v for DEBUG, -vv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit JSON formatted logs
    #[arg(long, global = true)]
    json: bool,

    /// Override the working directory
    #[arg(long, global = true, value_name = "PATH")]
    cwd: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Print version information
    Version,

    /// Start the dev server
    Dev {
        /// Port to listen on [default: 9090, or the config file's value]
        #[arg(long, short = 'p')]
        port: Option<u16>,

        /// Host to bind to [default: localhost, or the config file's value]
        #[arg(long)]
        host: Option<String>,

        /// Path to config file (overrides rill.config.json discovery)
        #[arg(long, short = 'c', value_name = "FILE")]
        config: Option<PathBuf>,
    },

    /// Print a file as the dev server would serve it
    Rewrite {
        /// File to transform, relative to the working directory
        file: PathBuf,

        /// Component part to print instead of the driver module
        #[arg(long = "type", value_enum)]
        part: Option<commands::rewrite::Part>,

        /// Style block index (with --type style)
        #[arg(long)]
        index: Option<usize>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Determine working directory
    let cwd = cli
        .cwd
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));

    let config = Config::new(cwd)
        .with_verbosity(cli.verbose)
        .with_json_logs(cli.json);

    logging::init(config.verbosity, config.json_logs);

    match cli.command {
        Some(Commands::Version) | None => commands::version::run(),
        Some(Commands::Dev { port, host, config: config_file }) => {
            let span = tracing::info_span!("dev", cmd = "dev", cwd = %config.cwd.display());
            let _guard = span.enter();

            let action = commands::dev::DevAction {
                cwd: config.cwd.clone(),
                port,
                host,
                config: config_file,
            };
            let rt = tokio::runtime::Runtime::new().into_diagnostic()?;
            rt.block_on(commands::dev::run(action))
        }
        Some(Commands::Rewrite { file, part, index }) => {
            commands::rewrite::run(&config.cwd, &file, part, index)
        }
    }
}
