use std::{
    ffi::OsString,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use chrono::{NaiveDateTime, Timelike};
use tokio::{fs, io::AsyncWriteExt};
use tracing::{debug, info};

use crate::{
    errors::{SyncError, SyncResult},
    utils::time::{unix_epoch, CHECKPOINT_FORMAT},
};

/// Remembers the local time up to which activity has been uploaded. The file holds a single
/// `YYYY-MM-DD HH:MM:SS` line.
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the last sync time, or the start of the unix epoch if no sync happened yet.
    pub async fn load(&self) -> SyncResult<NaiveDateTime> {
        Ok(self.load_opt().await?.unwrap_or_else(unix_epoch))
    }

    /// Same as [CheckpointStore::load] but tells apart a missing checkpoint.
    pub async fn load_opt(&self) -> SyncResult<Option<NaiveDateTime>> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(v) => v,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No checkpoint at {:?}", self.path);
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let value = content.trim();
        NaiveDateTime::parse_from_str(value, CHECKPOINT_FORMAT)
            .map(Some)
            .map_err(|_| SyncError::CorruptCheckpoint {
                path: self.path.clone(),
                value: value.to_string(),
            })
    }

    /// Overwrites the checkpoint. The value is written into a sibling file first and then renamed
    /// over the old one, so an interrupted save never leaves a truncated checkpoint behind.
    pub async fn save(&self, moment: NaiveDateTime) -> SyncResult<()> {
        if let Some(parent) = self.path.parent().filter(|v| !v.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let moment = moment.with_nanosecond(0).unwrap_or(moment);
        let temporary = self.temporary_path();
        {
            let mut file = fs::File::create(&temporary).await?;
            file.write_all(moment.format(CHECKPOINT_FORMAT).to_string().as_bytes())
                .await?;
            file.sync_all().await?;
        }
        fs::rename(&temporary, &self.path).await?;

        info!("Saved checkpoint {moment} to {:?}", self.path);
        Ok(())
    }

    fn temporary_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|v| v.to_os_string())
            .unwrap_or_else(|| OsString::from("last_run"));
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
