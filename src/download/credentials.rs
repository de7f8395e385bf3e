//! Kaggle API credentials
//!
//! Looked up the way the Kaggle CLI does: `KAGGLE_USERNAME`/`KAGGLE_KEY`,
//! then `kaggle.json` in `$KAGGLE_CONFIG_DIR`, `~/.kaggle` or the working
//! directory.

use crate::error::{Error, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Clone, Deserialize)]
pub struct KaggleCredentials {
    pub username: String,
    pub key: String,
}

impl std::fmt::Debug for KaggleCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KaggleCredentials")
            .field("username", &self.username)
            .field("key", &"<redacted>")
            .finish()
    }
}

impl KaggleCredentials {
    /// Discover credentials from the process environment and the usual files
    pub fn discover() -> Result<Self> {
        Self::discover_with(|key| std::env::var(key).ok())
    }

    pub fn discover_with<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let (Some(username), Some(key)) = (lookup("KAGGLE_USERNAME"), lookup("KAGGLE_KEY")) {
            return Ok(Self { username, key });
        }
        let candidates = candidate_files(&lookup);
        for path in &candidates {
            if path.is_file() {
                return Self::from_file(path);
            }
        }
        Err(Error::Credentials(format!(
            "set KAGGLE_USERNAME and KAGGLE_KEY or create one of: {}",
            candidates
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        )))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json)
            .map_err(|e| Error::Credentials(format!("{} is not a valid kaggle.json: {}", path.display(), e)))
    }

    /// Value of the HTTP `Authorization` header
    pub fn basic_auth(&self) -> String {
        let token = STANDARD.encode(format!("{}:{}", self.username, self.key));
        format!("Basic {token}")
    }
}

fn candidate_files<F>(lookup: &F) -> Vec<PathBuf>
where
    F: Fn(&str) -> Option<String>,
{
    let mut files = Vec::new();
    if let Some(dir) = lookup("KAGGLE_CONFIG_DIR") {
        files.push(PathBuf::from(dir).join("kaggle.json"));
    }
    if let Some(home) = lookup("HOME").or_else(|| lookup("USERPROFILE")) {
        files.push(PathBuf::from(home).join(".kaggle").join("kaggle.json"));
    }
    files.push(PathBuf::from("kaggle.json"));
    files
}
