use crate::error::ErrorCode;
use crate::pacing::{BackoffPacing, FixedPacing};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Config file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "hoist.toml";

/// Project settings as written in `hoist.toml`. Every field may also come
/// from the command line, so nothing is required at this stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub project_key: Option<String>,
    #[serde(default)]
    pub epic_type_id: Option<String>,
    #[serde(default)]
    pub story_type_id: Option<String>,
    /// Custom field that stores story points, e.g. `customfield_10016`.
    #[serde(default)]
    pub points_field: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub pacing: PacingConfig,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            project_key: None,
            epic_type_id: None,
            story_type_id: None,
            points_field: None,
            timeout_secs: default_timeout_secs(),
            pacing: PacingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacingConfig {
    #[serde(default = "default_between_children_ms")]
    pub between_children_ms: u64,
    #[serde(default = "default_between_parents_ms")]
    pub between_parents_ms: u64,
    #[serde(default)]
    pub max_retries: u32,
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
    #[serde(default = "default_backoff_max_ms")]
    pub backoff_max_ms: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            between_children_ms: default_between_children_ms(),
            between_parents_ms: default_between_parents_ms(),
            max_retries: 0,
            backoff_base_ms: default_backoff_base_ms(),
            backoff_max_ms: default_backoff_max_ms(),
        }
    }
}

impl PacingConfig {
    /// Build the pacing policy. With `max_retries = 0` it behaves exactly
    /// like [`FixedPacing`].
    #[must_use]
    pub const fn to_policy(&self) -> BackoffPacing {
        let steps = FixedPacing::new(
            Duration::from_millis(self.between_children_ms),
            Duration::from_millis(self.between_parents_ms),
        );
        BackoffPacing::new(steps, self.max_retries).with_backoff(
            Duration::from_millis(self.backoff_base_ms),
            Duration::from_millis(self.backoff_max_ms),
        )
    }
}

/// Values supplied on the command line; `Some` wins over the file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub base_url: Option<String>,
    pub project_key: Option<String>,
    pub epic_type_id: Option<String>,
    pub story_type_id: Option<String>,
    pub points_field: Option<String>,
    pub max_retries: Option<u32>,
    pub no_pacing: bool,
}

impl ProjectConfig {
    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        fn take(slot: &mut Option<String>, value: Option<String>) {
            if value.is_some() {
                *slot = value;
            }
        }

        take(&mut self.base_url, overrides.base_url);
        take(&mut self.project_key, overrides.project_key);
        take(&mut self.epic_type_id, overrides.epic_type_id);
        take(&mut self.story_type_id, overrides.story_type_id);
        take(&mut self.points_field, overrides.points_field);

        if let Some(retries) = overrides.max_retries {
            self.pacing.max_retries = retries;
        }
        if overrides.no_pacing {
            self.pacing.between_children_ms = 0;
            self.pacing.between_parents_ms = 0;
        }
    }

    /// Check that every setting a run needs is present.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] naming the first missing or malformed field.
    pub fn resolve(&self) -> Result<ImportTarget, ConfigError> {
        let base_url = required(self.base_url.as_ref(), "base_url")?;
        if !(base_url.starts_with("https://") || base_url.starts_with("http://")) {
            return Err(ConfigError::InvalidBaseUrl { value: base_url });
        }

        Ok(ImportTarget {
            base_url: base_url.trim_end_matches('/').to_string(),
            project_key: required(self.project_key.as_ref(), "project_key")?,
            epic_type_id: required(self.epic_type_id.as_ref(), "epic_type_id")?,
            story_type_id: required(self.story_type_id.as_ref(), "story_type_id")?,
            points_field: self
                .points_field
                .as_deref()
                .map(str::trim)
                .filter(|field| !field.is_empty())
                .map(ToOwned::to_owned),
            timeout: Duration::from_secs(self.timeout_secs.max(1)),
        })
    }
}

fn required(value: Option<&String>, field: &'static str) -> Result<String, ConfigError> {
    value
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(ToOwned::to_owned)
        .ok_or(ConfigError::Missing { field })
}

/// Fully resolved destination of an import run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportTarget {
    pub base_url: String,
    pub project_key: String,
    pub epic_type_id: String,
    pub story_type_id: String,
    pub points_field: Option<String>,
    pub timeout: Duration,
}

impl ImportTarget {
    /// Board page for the target project.
    #[must_use]
    pub fn board_url(&self) -> String {
        format!(
            "{}/jira/software/projects/{}/boards",
            self.base_url, self.project_key
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required setting `{field}`")]
    Missing { field: &'static str },

    #[error("base_url must start with http:// or https://, got `{value}`")]
    InvalidBaseUrl { value: String },
}

impl ConfigError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        ErrorCode::ConfigIncomplete
    }
}

/// Load `hoist.toml`.
///
/// An explicit `path` must exist. Without one, `DEFAULT_CONFIG_FILE` in
/// `project_root` is used when present and defaults otherwise.
///
/// # Errors
///
/// Fails when the file cannot be read or parsed.
pub fn load_project_config(path: Option<&Path>, project_root: &Path) -> Result<ProjectConfig> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => {
            let default = project_root.join(DEFAULT_CONFIG_FILE);
            if !default.exists() {
                return Ok(ProjectConfig::default());
            }
            default
        }
    };

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<ProjectConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

const fn default_timeout_secs() -> u64 {
    30
}

const fn default_between_children_ms() -> u64 {
    200
}

const fn default_between_parents_ms() -> u64 {
    500
}

const fn default_backoff_base_ms() -> u64 {
    1_000
}

const fn default_backoff_max_ms() -> u64 {
    30_000
}
