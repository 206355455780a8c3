use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use fleet_util::errors::FleetError;

use crate::manifest::BuildSettings;

/// Global user configuration loaded from `~/.fleet/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalConfig {
    #[serde(default)]
    pub build: BuildConfig,
}

/// Build settings from `[build]` in global config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    #[serde(default = "default_jobs")]
    pub jobs: u32,
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default, rename = "timeout-secs")]
    pub timeout_secs: Option<u64>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            jobs: default_jobs(),
            command: None,
            timeout_secs: None,
        }
    }
}

fn default_jobs() -> u32 {
    std::thread::available_parallelism()
        .map(|n| n.get() as u32)
        .unwrap_or(4)
}

impl GlobalConfig {
    /// Load the global configuration from `~/.fleet/config.toml`, or return defaults if the file doesn't exist.
    pub fn load() -> miette::Result<Self> {
        Self::load_from(&Self::default_path())
    }

    /// Load the global configuration from an explicit path, defaulting when absent.
    pub fn load_from(path: &Path) -> miette::Result<Self> {
        if !path.is_file() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| FleetError::Config {
            message: format!("Failed to read global config: {e}"),
        })?;
        toml::from_str(&content).map_err(|e| {
            FleetError::Config {
                message: format!("Failed to parse global config {}: {e}", path.display()),
            }
            .into()
        })
    }

    /// Returns the default path to the global config file.
    pub fn default_path() -> PathBuf {
        dirs_path().join("config.toml")
    }
}

/// Returns the path to the Fleet data directory (`~/.fleet/`).
pub fn dirs_path() -> PathBuf {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    Path::new(&home).join(".fleet")
}

/// Settings given explicitly for one invocation (CLI flags or environment).
#[derive(Debug, Clone, Default)]
pub struct BuildOverrides {
    pub jobs: Option<u32>,
    pub build_number: Option<u64>,
    pub timeout_secs: Option<u64>,
}

/// Final build settings after layering overrides, repository and global config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectiveBuildConfig {
    pub jobs: usize,
    pub command: Option<String>,
    pub timeout: Option<Duration>,
    pub build_number: u64,
}

impl EffectiveBuildConfig {
    /// Merge settings; earlier layers win: overrides, then `[build]` in
    /// `fleet.toml`, then the global config.
    pub fn layer(
        overrides: &BuildOverrides,
        repo: &BuildSettings,
        global: &GlobalConfig,
    ) -> Self {
        let jobs = overrides
            .jobs
            .or(repo.jobs)
            .unwrap_or(global.build.jobs)
            .max(1) as usize;
        let timeout_secs = overrides
            .timeout_secs
            .or(repo.timeout_secs)
            .or(global.build.timeout_secs)
            .filter(|secs| *secs > 0);

        Self {
            jobs,
            command: repo.command.clone().or_else(|| global.build.command.clone()),
            timeout: timeout_secs.map(Duration::from_secs),
            build_number: overrides.build_number.or(repo.build_number).unwrap_or(0),
        }
    }
}
