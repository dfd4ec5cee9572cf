use anyhow::Result;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::constants::CREDENTIAL_STORAGE_KEY;

const CREDENTIALS_FILE: &str = "credentials.yaml";

/// The single persisted key-value slot holding the API credential
pub struct Storage {
    config_dir: PathBuf,
}

impl Storage {
    pub fn new() -> Self {
        Storage::with_dir(Config::config_dir())
    }

    pub fn with_dir(config_dir: impl Into<PathBuf>) -> Self {
        Storage {
            config_dir: config_dir.into(),
        }
    }

    fn path(&self) -> PathBuf {
        self.config_dir.join(CREDENTIALS_FILE)
    }

    /// Ensure config directory exists
    fn ensure_dir(&self) -> Result<()> {
        if !self.config_dir.exists() {
            fs::create_dir_all(&self.config_dir)?;
        }
        Ok(())
    }

    fn read_entries(path: &Path) -> Result<BTreeMap<String, String>> {
        if !path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(serde_yaml::from_str(&content)?)
    }

    /// Stored credential, if any. Absence is a normal state.
    pub fn load_credential(&self) -> Option<String> {
        match Self::read_entries(&self.path()) {
            Ok(mut entries) => entries
                .remove(CREDENTIAL_STORAGE_KEY)
                .filter(|v| !v.trim().is_empty()),
            Err(e) => {
                tracing::warn!(error = %e, "Could not read stored credential");
                None
            }
        }
    }

    /// Persist the credential, replacing any previous value
    pub fn save_credential(&self, credential: &str) -> Result<()> {
        self.ensure_dir()?;
        let mut entries = BTreeMap::new();
        entries.insert(CREDENTIAL_STORAGE_KEY.to_string(), credential.to_string());
        fs::write(self.path(), serde_yaml::to_string(&entries)?)?;
        Ok(())
    }

    /// Remove the stored credential. Removing nothing is not an error.
    pub fn clear_credential(&self) -> Result<()> {
        let path = self.path();
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }
}

impl Default for Storage {
    fn default() -> Self {
        Self::new()
    }
}
