pub mod config;
pub mod key;
pub mod sync;

use clap::Subcommand;

#[derive(Subcommand)]
pub enum Command {
    /// Sync every configured fork (the default)
    Sync(sync::SyncArgs),
    /// Create or describe the gitsyncr config
    Config {
        #[command(subcommand)]
        action: config::ConfigAction,
    },
    /// Manage the SSH key passphrase kept in the OS keychain
    Key {
        #[command(subcommand)]
        action: key::KeyAction,
    },
}


pub async fn run(cmd: Command) -> anyhow::Result<()> {
    match cmd {
        Command::Sync(args) => sync::run(args).await,
        Command::Config { action } => config::run(action),
        Command::Key { action } => key::run(action),
    }
}
