use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;

use std::sync::Arc;

/// One block of tracked activity. The source reader produces one of these per arbtt interval,
/// the merger then folds neighbouring samples of the same project into longer ones. Both stages
/// share the type since a merged entry is just a sample that covers more time.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct ActivitySample {
    pub project: Arc<str>,
    pub description: String,
    pub start: DateTime<Utc>,
    pub duration: Duration,
}

impl ActivitySample {
    pub fn end(&self) -> DateTime<Utc> {
        self.start + self.duration
    }

    pub fn with_start(self, start: DateTime<Utc>) -> Self {
        Self { start, ..self }
    }

    pub fn with_description(self, description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..self
        }
    }
}
