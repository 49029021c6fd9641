//! Option loading and validation.

use super::model::{LockfileMutexOptions, NewLockedOptions};
use crate::error::{LockfileError, Result};
use std::path::Path;

impl LockfileMutexOptions {
    /// Load options from a YAML file.
    ///
    /// Unknown fields in the YAML are silently ignored for forward compatibility.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            LockfileError::Config(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Parse options from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let options: LockfileMutexOptions = serde_yaml::from_str(yaml)
            .map_err(|e| LockfileError::Config(format!("failed to parse config YAML: {}", e)))?;

        options.validate()?;
        Ok(options)
    }

    /// Serialize options to a YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|e| LockfileError::Config(format!("failed to serialize config to YAML: {}", e)))
    }

    /// Validate option values.
    ///
    /// - `timeout_ms` must be positive: a zero timeout makes every existing
    ///   lockfile immediately stale and the refresher would spin.
    pub fn validate(&self) -> Result<()> {
        if self.timeout_ms == 0 {
            return Err(LockfileError::Config(
                "config validation failed: timeout_ms must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

impl NewLockedOptions {
    /// Parse options from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let options: NewLockedOptions = serde_yaml::from_str(yaml)
            .map_err(|e| LockfileError::Config(format!("failed to parse config YAML: {}", e)))?;

        options.validate()?;
        Ok(options)
    }

    /// Validate option values.
    pub fn validate(&self) -> Result<()> {
        self.mutex.validate()
    }
}
