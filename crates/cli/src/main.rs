mod config_commands;

use {
    clap::{Parser, Subcommand},
    tracing::debug,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "toxconf", about = "toxconf: read and resolve tox configuration")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the configuration file that would be read.
    Find {
        #[command(flatten)]
        source: config_commands::Source,
        /// Print path and format as a JSON object.
        #[arg(long)]
        json: bool,
    },
    /// Print the configuration as JSON.
    Show {
        #[command(flatten)]
        source: config_commands::Source,
        /// Skip substitution and print the tree as read.
        #[arg(long)]
        raw: bool,
        /// Single-line JSON.
        #[arg(long)]
        compact: bool,
        #[command(flatten)]
        posargs: config_commands::Posargs,
    },
    /// Print one resolved value by dotted key path (e.g. `env_run_base.deps`).
    Get {
        key: String,
        #[command(flatten)]
        source: config_commands::Source,
        #[command(flatten)]
        posargs: config_commands::Posargs,
    },
}

/// Logs go to stderr so stdout carries only command output.
fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    if cli.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    debug!(version = env!("CARGO_PKG_VERSION"), "toxconf starting");

    match cli.command {
        Commands::Find { source, json } => config_commands::find(&source, json),
        Commands::Show {
            source,
            raw,
            compact,
            posargs,
        } => config_commands::show(&source, posargs, raw, compact),
        Commands::Get {
            key,
            source,
            posargs,
        } => config_commands::get(&source, posargs, &key),
    }
}
