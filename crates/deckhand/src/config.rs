use anyhow::{anyhow, Result};
use dirs::home_dir;
use std::path::PathBuf;

/// Get the data root directory (~/.deckhand)
pub fn data_root() -> Result<PathBuf> {
  // Allow tests or callers to override the root directory via env var
  if let Ok(custom_root) = std::env::var("DECKHAND_ROOT") {
    return Ok(PathBuf::from(custom_root));
  }

  let home = home_dir().ok_or_else(|| anyhow!("Could not find home directory"))?;
  Ok(home.join(".deckhand"))
}

/// Directory holding one record document per kind
pub fn records_dir() -> Result<PathBuf> {
  Ok(data_root()?.join("records"))
}

/// Directory holding one embedding partition file per kind
pub fn embeddings_dir() -> Result<PathBuf> {
  Ok(data_root()?.join("embeddings"))
}

/// Read a required credential or endpoint from the environment
pub fn require_env(var: &str) -> Result<String> {
  std::env::var(var).map_err(|_| anyhow!("{} is not set", var))
}
