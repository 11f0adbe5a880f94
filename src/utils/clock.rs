use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local};

/// Represents an entity responsible for providing dates and pauses across application. This
/// allows tests to run a sync without actually waiting out rate limits.
#[async_trait]
pub trait Clock: Sync + Send {
    fn time(&self) -> DateTime<Local>;

    async fn sleep(&self, duration: Duration);
}

pub struct DefaultClock;

#[async_trait]
impl Clock for DefaultClock {
    fn time(&self) -> DateTime<Local> {
        Local::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Clock frozen at a given moment. Sleeps return immediately and are recorded instead.
#[cfg(test)]
pub struct TestClock {
    pub now: DateTime<Local>,
    pub sleeps: std::sync::Mutex<Vec<Duration>>,
}

#[cfg(test)]
impl TestClock {
    pub fn new(now: DateTime<Local>) -> Self {
        Self {
            now,
            sleeps: Default::default(),
        }
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl Clock for TestClock {
    fn time(&self) -> DateTime<Local> {
        self.now
    }

    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
    }
}
