mod commands;

use std::process::ExitCode;

use clap::Parser;
use gitsyncr_core::error::GitsyncrError;
use gitsyncr_sync::cancel::INTERRUPTED_EXIT_CODE;

#[derive(Parser)]
#[command(
    name = "gitsyncr",
    version,
    about = "Keep your forks in sync with their upstreams",
    long_about = "Pulls the latest changes from each fork's upstream remote \
                  and pushes them to your fork's remote."
)]
struct Cli {
    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,
    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
    // flags of the default `sync` command
    #[command(flatten)]
    sync: commands::sync::SyncArgs,
    #[command(subcommand)]
    command: Option<commands::Command>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else if cli.quiet {
        tracing::Level::WARN
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .init();

    let command = cli.command.unwrap_or(commands::Command::Sync(cli.sync));
    match commands::run(command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err:#}");
            match err.downcast_ref::<GitsyncrError>() {
                Some(e) if e.aborts_run() => ExitCode::from(INTERRUPTED_EXIT_CODE as u8),
                _ => ExitCode::FAILURE,
            }
        }
    }
}
