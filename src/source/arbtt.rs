use std::io;

use async_trait::async_trait;
use chrono::{NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use csv::StringRecord;
use tokio::process::Command;
use tracing::{debug, info, instrument, trace};

use crate::{
    config::Config,
    errors::{SyncError, SyncResult},
    storage::entities::ActivitySample,
    utils::time::{parse_hms_duration, sample_age, ARBTT_TIME_FORMAT},
};

use super::ActivitySource;

/// First cell of the header row arbtt-stats prints before the intervals.
const HEADER_SENTINEL: &str = "Tag";

/// Separates the project from the description inside a tag, e.g. `work_code_review`.
const TAG_SEPARATOR: char = '_';

/// Reads intervals through the `arbtt-stats` command line tool.
pub struct ArbttStats {
    command: String,
    tag_category: String,
    timezone: Tz,
}

impl ArbttStats {
    pub fn new(command: impl Into<String>, tag_category: impl Into<String>, timezone: Tz) -> Self {
        Self {
            command: command.into(),
            tag_category: tag_category.into(),
            timezone,
        }
    }

    pub fn from_config(config: &Config) -> SyncResult<Self> {
        Ok(Self::new(
            config.arbtt_stats.clone(),
            config.tag_category.clone(),
            config.timezone()?,
        ))
    }

    fn arguments(&self, sample_age: &str) -> [String; 3] {
        [
            format!("--intervals={}:", self.tag_category),
            "--output-format=csv".to_string(),
            format!("--filter=$sampleage<={sample_age}"),
        ]
    }
}

#[async_trait]
impl ActivitySource for ArbttStats {
    #[instrument(skip(self))]
    async fn fetch_since(
        &self,
        last_run: NaiveDateTime,
        now: NaiveDateTime,
    ) -> SyncResult<Vec<ActivitySample>> {
        let arguments = self.arguments(&sample_age(last_run, now));
        debug!("Running {} {:?}", self.command, arguments);

        let output = Command::new(&self.command)
            .args(&arguments)
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            return Err(SyncError::ExternalTool {
                command: self.command.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let samples = parse_samples(output.stdout.as_slice(), self.timezone)?;
        info!("{} returned {} samples", self.command, samples.len());
        Ok(samples)
    }
}

/// Converts arbtt-stats csv output into samples. The header and blank rows are skipped, every
/// other row has to describe an interval.
pub fn parse_samples(input: impl io::Read, timezone: Tz) -> SyncResult<Vec<ActivitySample>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(input);

    let mut samples = vec![];
    for record in reader.records() {
        let record = record?;
        if record.iter().all(|v| v.trim().is_empty()) || record.get(0) == Some(HEADER_SENTINEL) {
            continue;
        }
        let line = record.position().map(|v| v.line()).unwrap_or_default();
        let sample = parse_row(&record, line, timezone)?;
        trace!("Parsed {sample:?}");
        samples.push(sample);
    }
    Ok(samples)
}

fn parse_row(record: &StringRecord, line: u64, timezone: Tz) -> SyncResult<ActivitySample> {
    let malformed = |reason: String| SyncError::MalformedRow { line, reason };

    // The third column holds the end of the interval. Duration already covers it.
    let (Some(tag), Some(start), Some(_), Some(duration)) =
        (record.get(0), record.get(1), record.get(2), record.get(3))
    else {
        return Err(malformed(format!(
            "expected 4 columns, found {}",
            record.len()
        )));
    };

    let mut tokens = tag.split(TAG_SEPARATOR);
    let project = tokens.next().unwrap_or_default();
    let description = tokens.collect::<Vec<_>>().join(" ");

    let local_start = NaiveDateTime::parse_from_str(start.trim(), ARBTT_TIME_FORMAT)
        .map_err(|e| malformed(format!("invalid start {start:?}: {e}")))?;
    // During the autumn transition the wall clock repeats an hour; the earlier reading wins.
    let start = timezone
        .from_local_datetime(&local_start)
        .earliest()
        .ok_or_else(|| malformed(format!("start {local_start} does not exist in {timezone}")))?
        .with_timezone(&Utc);

    let duration = parse_hms_duration(duration)
        .ok_or_else(|| malformed(format!("invalid duration {duration:?}")))?;

    Ok(ActivitySample {
        project: project.into(),
        description,
        start,
        duration,
    })
}
