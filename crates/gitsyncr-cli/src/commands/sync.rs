use std::time::Duration;

use clap::Args;
use comfy_table::{Cell, Color, Table};
use console::style;
use gitsyncr_auth::{build_credentials, CredentialStore, KeyringStore, MemoryStore};
use gitsyncr_core::config::Config;
use gitsyncr_core::models::sync_state::{SyncRecord, SyncStatus};
use gitsyncr_core::paths;
use gitsyncr_sync::cancel::{spawn_interrupt_listener, CancellationSupervisor};
use gitsyncr_sync::engine::{SyncEngine, SyncOptions, SyncReport};

#[derive(Args)]
pub struct SyncArgs {
    /// Continue with the remaining forks when one fails
    #[arg(long)]
    keep_going: bool,
    /// Give up on a pull or push after SECS seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,
    /// Don't draw progress spinners
    #[arg(long)]
    no_progress: bool,
    /// Don't look up the key passphrase in the OS keychain
    #[arg(long)]
    no_keyring: bool,
}

pub async fn run(args: SyncArgs) -> anyhow::Result<()> {
    let config_path = paths::resolve_config_path()?;
    let config = Config::load_from(&config_path)?;
    if config.forks.is_empty() {
        println!("No forks configured in {}.", config_path.display());
        return Ok(());
    }

    let store: Box<dyn CredentialStore> = if args.no_keyring {
        Box::new(MemoryStore::new())
    } else {
        Box::new(KeyringStore::new())
    };
    let credentials = build_credentials(&config.user, &paths::home_dir()?, store.as_ref())?;

    let mut options = SyncOptions::from_settings(&config.settings);
    options.keep_going |= args.keep_going;
    if let Some(secs) = args.timeout {
        options.network_timeout = Some(Duration::from_secs(secs));
    }
    options.show_progress = !args.no_progress;

    let fork_root = paths::resolve_fork_root()?;
    tracing::info!(
        "syncing {} forks under {}",
        config.forks.len(),
        fork_root.display()
    );

    let supervisor = CancellationSupervisor::new();
    let listener = spawn_interrupt_listener(supervisor.clone());
    let engine = SyncEngine::new(fork_root, options);
    let forks = config.forks;
    let mut report =
        tokio::task::spawn_blocking(move || engine.sync_all(&forks, &credentials, &supervisor))
            .await?;
    listener.abort();

    println!("{}", summary_table(&report));
    println!("{}", summary_line(&report));

    if let Some(err) = report.aborted.take() {
        return Err(err.into());
    }
    let failed = report.count(SyncStatus::Failed);
    if failed > 0 {
        anyhow::bail!("{failed} of {} forks failed to sync", report.records.len());
    }
    Ok(())
}

fn status_color(status: SyncStatus) -> Color {
    match status {
        SyncStatus::Success => Color::Green,
        SyncStatus::Failed => Color::Red,
        SyncStatus::Cancelled => Color::Yellow,
    }
}

fn summary_table(report: &SyncReport) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["FORK", "CHECKOUT", "REMOTES", "PUSH", "TIME", "STATUS"]);
    for record in &report.records {
        table.add_row(vec![
            Cell::new(&record.fork_name),
            Cell::new(
                record
                    .checkout
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "—".to_string()),
            ),
            Cell::new(remotes_column(record)),
            Cell::new(
                record
                    .push
                    .map(|p| p.to_string())
                    .unwrap_or_else(|| "—".to_string()),
            ),
            Cell::new(format!(
                "{:.1}s",
                (record.finished_at - record.started_at).num_milliseconds() as f64 / 1000.0
            )),
            Cell::new(record.status.to_string()).fg(status_color(record.status)),
        ]);
    }
    table
}

fn remotes_column(record: &SyncRecord) -> String {
    if record.remotes.is_empty() {
        return "—".to_string();
    }
    record
        .remotes
        .iter()
        .map(|(name, outcome)| format!("{name}: {outcome}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn summary_line(report: &SyncReport) -> String {
    let unchanged = report.records.iter().filter(|r| r.is_noop()).count();
    let synced = report.count(SyncStatus::Success);
    let failed = report.count(SyncStatus::Failed);
    let cancelled = report.count(SyncStatus::Cancelled);
    format!(
        "Sync complete: {} synced ({unchanged} unchanged) | {} failed | {} cancelled",
        style(synced).green(),
        style(failed).red(),
        style(cancelled).yellow()
    )
}
