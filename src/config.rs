//! Settings of a sync run. Loaded once by the cli and then handed to every stage by reference.

use std::{collections::HashMap, io::ErrorKind, path::Path};

use chrono_tz::Tz;
use serde::Deserialize;
use tracing::debug;

use crate::errors::{SyncError, SyncResult};

pub const DEFAULT_CONFIG_FILE: &str = "secrets.yaml";
pub const CONFIG_TEMPLATE_FILE: &str = "secrets.yaml.template";

pub const DEFAULT_TOGGL_API_URL: &str = "https://api.track.toggl.com";

/// Key names are the upper case ones used in `secrets.yaml.template`.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Maps a project tag (the part of an arbtt tag before the first `_`) to a Toggl project id.
    #[serde(rename = "TOGGL_P_ID_MAP", default)]
    pub project_ids: HashMap<String, u64>,
    #[serde(rename = "TOGGL_KEY")]
    pub api_token: String,
    #[serde(rename = "TOGGL_W_ID")]
    pub workspace_id: u64,
    #[serde(rename = "SOURCE_TIMEZONE", default = "default_source_timezone")]
    pub source_timezone: String,
    #[serde(rename = "ARBTT_STATS", default = "default_arbtt_stats")]
    pub arbtt_stats: String,
    #[serde(rename = "TAG_CATEGORY", default = "default_tag_category")]
    pub tag_category: String,
    #[serde(rename = "TOGGL_API_URL", default = "default_api_url")]
    pub api_url: String,
}

fn default_source_timezone() -> String {
    "America/Los_Angeles".to_string()
}
fn default_arbtt_stats() -> String {
    "arbtt-stats".to_string()
}
fn default_tag_category() -> String {
    "project".to_string()
}
fn default_api_url() -> String {
    DEFAULT_TOGGL_API_URL.to_string()
}

impl Config {
    pub async fn load(path: &Path) -> SyncResult<Self> {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(v) => v,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(SyncError::ConfigMissing {
                    path: path.to_path_buf(),
                })
            }
            Err(e) => return Err(e.into()),
        };
        debug!("Loaded configuration from {path:?}");
        Self::parse(path, &content)
    }

    pub fn parse(path: &Path, content: &str) -> SyncResult<Self> {
        let config: Config =
            serde_yaml::from_str(content).map_err(|e| SyncError::ConfigInvalid {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        // Fail at startup rather than after arbtt-stats already ran.
        config.timezone()?;
        Ok(config)
    }

    pub fn timezone(&self) -> SyncResult<Tz> {
        self.source_timezone
            .parse::<Tz>()
            .map_err(|_| SyncError::UnknownTimeZone(self.source_timezone.clone()))
    }

    /// Unmapped projects are uploaded without a project rather than rejected.
    pub fn project_id(&self, project: &str) -> Option<u64> {
        self.project_ids.get(project).copied()
    }
}
