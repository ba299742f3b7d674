use clap::Subcommand;
use gitsyncr_core::config::Config;
use gitsyncr_core::paths;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Write a starter config unless one already exists
    Init,
    /// Show the resolved locations and the parsed config
    Show,
}

pub fn run(action: ConfigAction) -> anyhow::Result<()> {
    let path = paths::resolve_config_path()?;
    match action {
        ConfigAction::Init => {
            if Config::write_sample(&path)? {
                println!("Wrote starter config to {}", path.display());
                println!("Edit it to list your forks, then run `gitsyncr`.");
            } else {
                println!("Config already exists at {}", path.display());
            }
            Ok(())
        }
        ConfigAction::Show => {
            let config = Config::load_from(&path)?;
            println!("# config: {}", path.display());
            println!("# forks checked out under: {}", paths::resolve_fork_root()?.display());
            println!();
            print!("{}", config.to_toml()?);
            Ok(())
        }
    }
}
