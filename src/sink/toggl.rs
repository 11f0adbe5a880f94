use async_trait::async_trait;
use reqwest::{Client, Request, StatusCode};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::{config::Config, errors::SyncResult, storage::entities::ActivitySample};

use super::{EntryUploader, UploadOutcome};

/// Marks entries created by this tool, both in `created_with` and as a tag.
pub const CREATED_WITH: &str = "arbtt2toggl";

/// Body of `POST /api/v9/workspaces/{workspace_id}/time_entries`.
#[derive(Debug, Serialize, PartialEq)]
pub struct TimeEntryRequest<'a> {
    pub description: &'a str,
    #[serde(with = "duration_ser")]
    pub duration: chrono::Duration,
    #[serde(with = "start_ser")]
    pub start: chrono::DateTime<chrono::Utc>,
    pub pid: Option<u64>,
    pub workspace_id: u64,
    pub created_with: &'static str,
    pub tags: [&'static str; 1],
}

mod duration_ser {
    use chrono::Duration;
    use serde::Serializer;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i64(duration.num_seconds())
    }
}

/// Starts are already in UTC, Toggl wants them with an explicit `Z`.
mod start_ser {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::Serializer;

    pub fn serialize<S>(start: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&start.to_rfc3339_opts(SecondsFormat::Secs, true))
    }
}

/// Creates time entries through the Toggl Track v9 api.
pub struct TogglClient {
    http: Client,
    endpoint: String,
    config: Config,
}

impl TogglClient {
    pub fn new(config: &Config) -> Self {
        Self::with_http(config, Client::new())
    }

    pub fn with_http(config: &Config, http: Client) -> Self {
        Self {
            http,
            endpoint: format!(
                "{}/api/v9/workspaces/{}/time_entries",
                config.api_url.trim_end_matches('/'),
                config.workspace_id
            ),
            config: config.clone(),
        }
    }

    pub fn request_body<'a>(&self, entry: &'a ActivitySample) -> TimeEntryRequest<'a> {
        TimeEntryRequest {
            description: &entry.description,
            duration: entry.duration,
            start: entry.start,
            pid: self.config.project_id(&entry.project),
            workspace_id: self.config.workspace_id,
            created_with: CREATED_WITH,
            tags: [CREATED_WITH],
        }
    }

    fn build_request(&self, entry: &ActivitySample) -> SyncResult<Request> {
        Ok(self
            .http
            .post(&self.endpoint)
            .basic_auth(&self.config.api_token, Some("api_token"))
            .json(&self.request_body(entry))
            .build()?)
    }
}

#[async_trait]
impl EntryUploader for TogglClient {
    #[instrument(skip_all, fields(project = %entry.project, start = %entry.start))]
    async fn upload(&self, entry: &ActivitySample) -> SyncResult<UploadOutcome> {
        let request = self.build_request(entry)?;
        let response = self.http.execute(request).await?;
        let status = response.status();
        debug!("Toggl answered {status}");

        match status {
            StatusCode::OK => {
                // The entry exists at this point, an unreadable body must not fail the run.
                let created = response.json::<Value>().await.unwrap_or_default();
                debug!("Created time entry {}", created["id"]);
                Ok(UploadOutcome::Created)
            }
            StatusCode::TOO_MANY_REQUESTS => Ok(UploadOutcome::RateLimited {
                body: response.text().await.unwrap_or_default(),
            }),
            status => Ok(UploadOutcome::Rejected {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            }),
        }
    }
}
