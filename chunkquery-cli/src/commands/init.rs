//! Init command - write the default configuration file.

use chunkquery::config::{config_file_path, ConfigFile};

use crate::error::CliError;

/// Run the init command.
pub fn run() -> Result<(), CliError> {
    let path = config_file_path();
    if path.exists() {
        println!("Config file already exists: {}", path.display());
        return Ok(());
    }

    let path = ConfigFile::ensure_exists()?;
    println!("Created config file: {}", path.display());
    println!();
    println!("Edit api_server under [server] to point at your game server.");
    Ok(())
}
