//! Uploading of merged entries. [toggl::TogglClient] talks to the api, [upload_all] paces the
//! uploads and deals with rate limiting.

pub mod toggl;

use std::time::Duration;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use reqwest::StatusCode;
use tracing::{debug, info, warn};

use crate::{
    errors::{SyncError, SyncResult},
    storage::entities::ActivitySample,
    utils::clock::Clock,
};

/// Pause after every created entry, keeps a long batch under Toggl's request rate.
pub const INTER_UPLOAD_DELAY: Duration = Duration::from_millis(100);
/// Pause before the single retry of a rate limited entry.
pub const RATE_LIMIT_BACKOFF: Duration = Duration::from_secs(60);
pub const MAX_RATE_LIMIT_RETRIES: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncPacing {
    pub inter_upload_delay: Duration,
    pub rate_limit_backoff: Duration,
}

impl Default for SyncPacing {
    fn default() -> Self {
        Self {
            inter_upload_delay: INTER_UPLOAD_DELAY,
            rate_limit_backoff: RATE_LIMIT_BACKOFF,
        }
    }
}

/// What the remote side answered to a single upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Created,
    RateLimited { body: String },
    Rejected { status: u16, body: String },
}

/// Progress of [upload_all] worth telling whoever is watching the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadEvent {
    Started { entries: usize },
    RateLimited { backoff: Duration },
}

/// Represents a place time entries are created in. Transport failures are errors, anything the
/// service answered is an [UploadOutcome].
#[cfg_attr(test, automock)]
#[async_trait]
pub trait EntryUploader: Send + Sync {
    async fn upload(&self, entry: &ActivitySample) -> SyncResult<UploadOutcome>;
}

/// Uploads entries one after another. Stops at the first entry that could not be created, entries
/// before it stay uploaded.
pub async fn upload_all(
    entries: &[ActivitySample],
    uploader: &impl EntryUploader,
    clock: &dyn Clock,
    pacing: SyncPacing,
    progress: &dyn Fn(UploadEvent),
) -> SyncResult<usize> {
    progress(UploadEvent::Started {
        entries: entries.len(),
    });
    for (index, entry) in entries.iter().enumerate() {
        debug!("Uploading entry {}/{}: {entry:?}", index + 1, entries.len());
        upload_with_retry(entry, uploader, clock, pacing, progress).await?;
        clock.sleep(pacing.inter_upload_delay).await;
    }
    info!("Uploaded {} entries", entries.len());
    Ok(entries.len())
}

async fn upload_with_retry(
    entry: &ActivitySample,
    uploader: &impl EntryUploader,
    clock: &dyn Clock,
    pacing: SyncPacing,
    progress: &dyn Fn(UploadEvent),
) -> SyncResult<()> {
    let mut retries = 0;
    loop {
        match uploader.upload(entry).await? {
            UploadOutcome::Created => return Ok(()),
            UploadOutcome::RateLimited { .. } if retries < MAX_RATE_LIMIT_RETRIES => {
                warn!(
                    "Rate limit exceeded. Sleeping for {} seconds",
                    pacing.rate_limit_backoff.as_secs_f64()
                );
                progress(UploadEvent::RateLimited {
                    backoff: pacing.rate_limit_backoff,
                });
                clock.sleep(pacing.rate_limit_backoff).await;
                retries += 1;
            }
            UploadOutcome::RateLimited { body } => {
                return Err(SyncError::Upload {
                    status: StatusCode::TOO_MANY_REQUESTS.as_u16(),
                    body,
                })
            }
            UploadOutcome::Rejected { status, body } => {
                return Err(SyncError::Upload { status, body })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        cell::RefCell,
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc,
        },
    };

    use anyhow::Result;
    use chrono::{Duration, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
    use mockall::Sequence;

    use crate::{
        errors::SyncError,
        storage::entities::ActivitySample,
        utils::{clock::TestClock, logging::TEST_LOGGING},
    };

    use super::{
        upload_all, MockEntryUploader, SyncPacing, UploadEvent, UploadOutcome,
        INTER_UPLOAD_DELAY, RATE_LIMIT_BACKOFF,
    };

    const TEST_DATE_TIME: NaiveDateTime = NaiveDateTime::new(
        NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
        NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
    );

    fn entries() -> Vec<ActivitySample> {
        let base = ActivitySample {
            project: "A".into(),
            description: "first".into(),
            start: Utc.from_utc_datetime(&TEST_DATE_TIME),
            duration: Duration::seconds(300),
        };
        vec![
            base.clone(),
            base.clone()
                .with_description("second")
                .with_start(Utc.from_utc_datetime(&TEST_DATE_TIME) + Duration::minutes(10)),
            base.with_description("third")
                .with_start(Utc.from_utc_datetime(&TEST_DATE_TIME) + Duration::minutes(20)),
        ]
    }

    fn clock() -> TestClock {
        TestClock::new(Local.from_utc_datetime(&TEST_DATE_TIME))
    }

    fn ignore(_: UploadEvent) {}

    fn rejected(status: u16) -> UploadOutcome {
        UploadOutcome::Rejected {
            status,
            body: "nope".into(),
        }
    }

    #[tokio::test]
    async fn uploads_every_entry_in_order() -> Result<()> {
        *TEST_LOGGING;
        let mut uploader = MockEntryUploader::new();
        let mut sequence = Sequence::new();
        for description in ["first", "second", "third"] {
            uploader
                .expect_upload()
                .withf(move |entry| entry.description == description)
                .times(1)
                .in_sequence(&mut sequence)
                .returning(|_| Ok(UploadOutcome::Created));
        }
        let clock = clock();

        let uploaded =
            upload_all(&entries(), &uploader, &clock, SyncPacing::default(), &ignore).await?;

        assert_eq!(uploaded, 3);
        assert_eq!(clock.sleeps(), vec![INTER_UPLOAD_DELAY; 3]);
        Ok(())
    }

    #[tokio::test]
    async fn rate_limit_is_retried_once() -> Result<()> {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut uploader = MockEntryUploader::new();
        {
            let calls = calls.clone();
            uploader.expect_upload().times(4).returning(move |_| {
                match calls.fetch_add(1, Ordering::SeqCst) {
                    1 => Ok(UploadOutcome::RateLimited {
                        body: "slow down".into(),
                    }),
                    _ => Ok(UploadOutcome::Created),
                }
            });
        }
        let clock = clock();

        let uploaded =
            upload_all(&entries(), &uploader, &clock, SyncPacing::default(), &ignore).await?;

        assert_eq!(uploaded, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(
            clock.sleeps(),
            vec![
                INTER_UPLOAD_DELAY,
                RATE_LIMIT_BACKOFF,
                INTER_UPLOAD_DELAY,
                INTER_UPLOAD_DELAY
            ]
        );
        Ok(())
    }

    #[tokio::test]
    async fn second_rate_limit_aborts() {
        let mut uploader = MockEntryUploader::new();
        uploader.expect_upload().times(2).returning(|_| {
            Ok(UploadOutcome::RateLimited {
                body: "slow down".into(),
            })
        });
        let clock = clock();

        let result =
            upload_all(&entries(), &uploader, &clock, SyncPacing::default(), &ignore).await;

        assert!(matches!(result, Err(SyncError::Upload { status: 429, .. })));
        assert_eq!(clock.sleeps(), vec![RATE_LIMIT_BACKOFF]);
    }

    #[tokio::test]
    async fn rejection_after_rate_limit_aborts() {
        let calls = AtomicUsize::new(0);
        let mut uploader = MockEntryUploader::new();
        uploader.expect_upload().times(2).returning(move |_| {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(UploadOutcome::RateLimited {
                    body: "slow down".into(),
                })
            } else {
                Ok(rejected(500))
            }
        });
        let clock = clock();

        let result =
            upload_all(&entries(), &uploader, &clock, SyncPacing::default(), &ignore).await;

        assert!(matches!(result, Err(SyncError::Upload { status: 500, .. })));
    }

    #[tokio::test]
    async fn rejection_stops_the_batch() {
        let mut uploader = MockEntryUploader::new();
        let mut sequence = Sequence::new();
        uploader
            .expect_upload()
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|_| Ok(UploadOutcome::Created));
        uploader
            .expect_upload()
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|_| Ok(rejected(403)));
        let clock = clock();

        let result =
            upload_all(&entries(), &uploader, &clock, SyncPacing::default(), &ignore).await;

        assert!(
            matches!(result, Err(SyncError::Upload { status: 403, body }) if body == "nope")
        );
        assert_eq!(clock.sleeps(), vec![INTER_UPLOAD_DELAY]);
    }

    #[tokio::test]
    async fn custom_pacing_is_used() -> Result<()> {
        let calls = AtomicUsize::new(0);
        let mut uploader = MockEntryUploader::new();
        uploader.expect_upload().returning(move |_| {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(UploadOutcome::RateLimited { body: "".into() })
            } else {
                Ok(UploadOutcome::Created)
            }
        });
        let clock = clock();
        let pacing = SyncPacing {
            inter_upload_delay: std::time::Duration::from_millis(1),
            rate_limit_backoff: std::time::Duration::from_millis(2),
        };

        upload_all(&entries()[..1], &uploader, &clock, pacing, &ignore).await?;

        assert_eq!(
            clock.sleeps(),
            vec![
                std::time::Duration::from_millis(2),
                std::time::Duration::from_millis(1)
            ]
        );
        Ok(())
    }

    #[tokio::test]
    async fn progress_reports_start_and_rate_limit() -> Result<()> {
        let calls = AtomicUsize::new(0);
        let mut uploader = MockEntryUploader::new();
        uploader.expect_upload().times(4).returning(move |_| {
            if calls.fetch_add(1, Ordering::SeqCst) == 2 {
                Ok(UploadOutcome::RateLimited {
                    body: "slow down".into(),
                })
            } else {
                Ok(UploadOutcome::Created)
            }
        });
        let clock = clock();
        let events = RefCell::new(Vec::new());

        upload_all(
            &entries(),
            &uploader,
            &clock,
            SyncPacing::default(),
            &|event| events.borrow_mut().push(event),
        )
        .await?;

        assert_eq!(
            events.into_inner(),
            vec![
                UploadEvent::Started { entries: 3 },
                UploadEvent::RateLimited {
                    backoff: RATE_LIMIT_BACKOFF
                },
            ]
        );
        Ok(())
    }
}
