//! A sync run goes through these steps:
//!   - Read the last checkpoint.
//!   - Ask the [ActivitySource] for everything recorded since then.
//!   - Merge neighbouring samples with [merge::merge_samples].
//!   - Upload the result with [upload_all].
//!   - Move the checkpoint forward, only if every entry was uploaded.

pub mod merge;

use chrono::NaiveDateTime;
use tracing::{info, instrument};

use crate::{
    errors::SyncResult,
    sink::{upload_all, EntryUploader, SyncPacing, UploadEvent},
    source::ActivitySource,
    storage::{checkpoint::CheckpointStore, entities::ActivitySample},
    utils::clock::Clock,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub samples: usize,
    pub entries: usize,
    pub uploaded: usize,
    /// Value written into the checkpoint.
    pub checkpoint: NaiveDateTime,
}

/// Entries that a sync would upload right now, together with the upper edge of the window they
/// were read from.
pub struct PendingEntries {
    pub samples: usize,
    pub entries: Vec<ActivitySample>,
    pub last_run: NaiveDateTime,
    pub window_end: NaiveDateTime,
}

/// Reads and merges everything recorded since the last checkpoint. Doesn't modify anything.
pub async fn collect_pending(
    source: &impl ActivitySource,
    checkpoint: &CheckpointStore,
    clock: &dyn Clock,
) -> SyncResult<PendingEntries> {
    let last_run = checkpoint.load().await?;
    let window_end = clock.time().naive_local();
    info!("Reading activity between {last_run} and {window_end}");

    let samples = source.fetch_since(last_run, window_end).await?;
    let sample_count = samples.len();
    let entries = merge::merge_samples(samples);
    info!("Merged {sample_count} samples into {} entries", entries.len());

    Ok(PendingEntries {
        samples: sample_count,
        entries,
        last_run,
        window_end,
    })
}

/// Executes a full sync. The checkpoint is only written after the last upload succeeded, so a
/// failed run is repeated as a whole next time.
#[instrument(skip_all)]
pub async fn run_sync(
    source: &impl ActivitySource,
    uploader: &impl EntryUploader,
    checkpoint: &CheckpointStore,
    clock: &dyn Clock,
    pacing: SyncPacing,
    progress: &dyn Fn(UploadEvent),
) -> SyncResult<SyncReport> {
    let PendingEntries {
        samples,
        entries,
        window_end,
        ..
    } = collect_pending(source, checkpoint, clock).await?;

    let uploaded = upload_all(&entries, uploader, clock, pacing, progress).await?;

    checkpoint.save(window_end).await?;

    let report = SyncReport {
        samples,
        entries: entries.len(),
        uploaded,
        checkpoint: window_end,
    };
    info!("Sync finished {report:?}");
    Ok(report)
}
