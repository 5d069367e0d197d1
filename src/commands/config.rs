use anyhow::Result;
use execsync_core::config::ExecSyncConfig;
use owo_colors::OwoColorize;

pub fn run() -> Result<()> {
    let config_path = ExecSyncConfig::config_path()?;
    let config = ExecSyncConfig::load()?;

    println!("{}", "Paths".bold());
    println!("  Config:  {}", config_path.display());
    println!("  Data:    {}", config.data_path().display());
    println!();

    println!("{}", "Settings".bold());
    for line in config.to_toml()?.lines() {
        println!("  {}", line);
    }

    Ok(())
}
