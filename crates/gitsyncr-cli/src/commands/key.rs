use clap::Subcommand;
use console::Term;
use gitsyncr_auth::{passphrase_key, CredentialStore, KeyringStore};
use gitsyncr_core::config::Config;
use gitsyncr_core::paths;

#[derive(Subcommand)]
pub enum KeyAction {
    /// Store the passphrase of the configured SSH key
    Set,
    /// Forget the stored passphrase
    Clear,
}

pub fn run(action: KeyAction) -> anyhow::Result<()> {
    let config = Config::load()?;
    let key_path = paths::normalize_key_path(config.user.key.trim(), &paths::home_dir()?);
    let store = KeyringStore::new();
    let entry = passphrase_key(&key_path);

    match action {
        KeyAction::Set => {
            let term = Term::stderr();
            term.write_str(&format!("Passphrase for {}: ", key_path.display()))?;
            let passphrase = term.read_secure_line()?;
            if passphrase.is_empty() {
                anyhow::bail!("empty passphrase, nothing stored");
            }
            store.store(&entry, &passphrase)?;
            println!("Stored passphrase for {}", key_path.display());
        }
        KeyAction::Clear => {
            store.delete(&entry)?;
            println!("Cleared passphrase for {}", key_path.display());
        }
    }
    Ok(())
}
