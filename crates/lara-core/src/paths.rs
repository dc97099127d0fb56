use anyhow::Result;
use std::path::PathBuf;

const LARA_DIR: &str = ".lara";
const DB_FILE: &str = "lara.db";
const LOGS_DIR: &str = "logs";

/// Environment variable to override the Lara data directory.
const LARA_DIR_ENV: &str = "LARA_DIR";

/// Resolve the Lara data directory.
/// Priority: LARA_DIR env var > ~/.lara/
pub fn resolve_lara_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(LARA_DIR_ENV)
        && !dir.trim().is_empty()
    {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|h| h.join(LARA_DIR))
        .ok_or_else(|| anyhow::anyhow!("Failed to determine home directory"))
}

/// Ensure the Lara directory exists and return its path.
pub fn ensure_lara_dir() -> Result<PathBuf> {
    let dir = resolve_lara_dir()?;
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Get the database path: ~/.lara/lara.db
pub fn database_path() -> Result<PathBuf> {
    Ok(resolve_lara_dir()?.join(DB_FILE))
}

/// Get the logs directory: ~/.lara/logs/
pub fn logs_dir() -> Result<PathBuf> {
    let dir = ensure_lara_dir()?.join(LOGS_DIR);
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
