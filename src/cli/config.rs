use crate::config::{user_config_path, SYSTEM_CONFIG_PATH};
use std::fs;
use std::path::{Path, PathBuf};

/// Sample configuration written by `sysloki config init`
pub const SAMPLE_CONFIG: &str = include_str!("../../samples/config.json");

pub fn init(stdout: bool) -> Result<(), Box<dyn std::error::Error>> {
    if stdout {
        print!("{}", SAMPLE_CONFIG);
        return Ok(());
    }

    // Prefer ~/.config/sysloki/config.json, fall back to /etc/sysloki/config.json
    let config_path = user_config_path()
        .filter(|path| match path.parent() {
            Some(parent) => match fs::create_dir_all(parent) {
                Ok(_) => true,
                Err(_) => {
                    eprintln!("Warning: Could not create directory {}", parent.display());
                    eprintln!("Falling back to {}", SYSTEM_CONFIG_PATH);
                    false
                }
            },
            None => false,
        })
        .unwrap_or_else(|| PathBuf::from(SYSTEM_CONFIG_PATH));

    let written = write_config(&config_path, SAMPLE_CONFIG)?;
    println!("Config file written to {}", written.display());
    Ok(())
}

/// Write a config file, refusing to overwrite an existing one
pub fn write_config(path: &Path, content: &str) -> Result<PathBuf, Box<dyn std::error::Error>> {
    if path.exists() {
        return Err(format!(
            "config file already exists at {} (remove it first or use --stdout)",
            path.display()
        )
        .into());
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;

    Ok(path.to_path_buf())
}
