//! Policy environment configuration — the companion file shipped with the
//! trained weights, holding the training-time control parameters.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::observation::NUM_JOINTS;

/// Training-time environment parameters for the loaded policy.
#[derive(Debug, Clone, Deserialize)]
pub struct EnvConfig {
    /// Policy decimation: inference runs every `decimation`-th physics step.
    #[serde(default = "default_decimation")]
    pub decimation: u32,

    /// Scale applied to the policy action before adding the default pose.
    #[serde(default = "default_action_scale")]
    pub action_scale: f64,

    /// Reference joint configuration, `NUM_JOINTS` entries.
    #[serde(default = "default_pose")]
    pub default_pose: Vec<f64>,
}

fn default_decimation() -> u32 {
    4
}

fn default_action_scale() -> f64 {
    0.5
}

fn default_pose() -> Vec<f64> {
    vec![0.0; NUM_JOINTS]
}

impl EnvConfig {
    /// Load the config from a JSON file. A missing file is fatal: the
    /// policy cannot run without its training-time parameters.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            bail!("policy env config not found at {}", resolve(path).display());
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read env config {}", resolve(path).display()))?;

        let config: EnvConfig = serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse env config {}", resolve(path).display()))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.decimation == 0 {
            bail!("decimation must be at least 1");
        }
        if self.default_pose.len() != NUM_JOINTS {
            bail!(
                "default pose has {} entries, expected {}",
                self.default_pose.len(),
                NUM_JOINTS
            );
        }
        if !self.action_scale.is_finite() {
            bail!("action scale must be finite");
        }
        Ok(())
    }
}

/// Absolute form of a path, for error messages.
pub(crate) fn resolve(path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_with_defaults() {
        let config: EnvConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.decimation, 4);
        assert!((config.action_scale - 0.5).abs() < 1e-12);
        assert_eq!(config.default_pose.len(), NUM_JOINTS);
        config.validate().unwrap();
    }

    #[test]
    fn rejects_wrong_pose_length() {
        let config: EnvConfig =
            serde_json::from_str(r#"{"default_pose": [0.0, 0.0, 0.0]}"#).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_decimation() {
        let config: EnvConfig = serde_json::from_str(r#"{"decimation": 0}"#).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_file_error_names_the_path() {
        let err = EnvConfig::load(Path::new("no_such_env_config.json")).unwrap_err();
        assert!(err.to_string().contains("no_such_env_config.json"));
    }
}
