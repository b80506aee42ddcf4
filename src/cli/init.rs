//! `waymark init`: write a commented default config.

use anyhow::{Context, Result, bail};
use std::fs;
use std::path::Path;
use waymark::config::{CONFIG_FILE, WaymarkConfig};
use waymark::log;

/// Write `waymark.toml` into the current directory, or print it with `dry`.
pub fn write_config(dry: bool) -> Result<()> {
    if dry {
        print!("{}", WaymarkConfig::template());
        return Ok(());
    }
    write_config_in(Path::new("."))?;
    log!("init"; "wrote {}", CONFIG_FILE);
    Ok(())
}

fn write_config_in(dir: &Path) -> Result<()> {
    let path = dir.join(CONFIG_FILE);
    if path.exists() {
        bail!("'{}' already exists", path.display());
    }
    fs::write(&path, WaymarkConfig::template())
        .with_context(|| format!("Failed to write config file '{}'", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_config_once() {
        let dir = TempDir::new().unwrap();
        write_config_in(dir.path()).unwrap();

        let written = fs::read_to_string(dir.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(written, WaymarkConfig::template());
        assert!(write_config_in(dir.path()).is_err());
    }
}
