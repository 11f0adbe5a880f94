//! Contains logic for reading activity out of the tracker.
//! [arbtt::ArbttStats] is the main artifact of this module.

pub mod arbtt;

use async_trait::async_trait;
use chrono::NaiveDateTime;
#[cfg(test)]
use mockall::automock;

use crate::{errors::SyncResult, storage::entities::ActivitySample};

/// Intended to serve as a contract for anything able to list tracked activity.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ActivitySource: Send + Sync {
    /// Returns every sample recorded between `last_run` and `now`, both naive local times.
    /// Order of the returned samples is unspecified.
    async fn fetch_since(
        &self,
        last_run: NaiveDateTime,
        now: NaiveDateTime,
    ) -> SyncResult<Vec<ActivitySample>>;
}
