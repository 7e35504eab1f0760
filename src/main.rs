mod batch;
mod commands;
mod config;
mod diagnostics;
mod discovery;
mod error;
mod index;
mod resolver;
mod rewrite;
mod scanner;
mod types;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

/// Top-level CLI.
#[derive(Parser)]
#[command(name = "linkfix", version, about = "Find and repair broken links in markdown documentation")]
struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    command: Commands,

    /// Config file; a missing file means defaults.
    #[arg(long, global = true, default_value = ".linkfix.toml")]
    config: PathBuf,

    /// Only log warnings and errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Log every resolution decision.
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Report broken and repairable links without modifying any file
    Check {
        /// File or directory to check [default: ./docs if present, else .]
        target: Option<PathBuf>,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Repair links in place
    Fix {
        /// File or directory to fix [default: ./docs if present, else .]
        target: Option<PathBuf>,
        /// Report what would change without writing
        #[arg(long)]
        dry_run: bool,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Configure `env_logger` on stderr; `RUST_LOG` wins over the default filter,
/// the verbosity flags win over both.
fn init_logging(verbose: bool, quiet: bool) {
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    } else if quiet {
        builder.filter_level(log::LevelFilter::Warn);
    }
    builder.target(env_logger::Target::Stderr).init();
    return;
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let result = config::Config::load(&cli.config).and_then(|config| {
        return match cli.command {
            Commands::Check { target, json } => commands::check(&config, target.as_deref(), json),
            Commands::Fix { target, dry_run, json } => commands::fix(&config, target.as_deref(), dry_run, json),
        };
    });

    return match result {
        Ok(code) => code,
        Err(e) => {
            diagnostics::print_error(&e);
            ExitCode::from(2)
        },
    };
}
