use chrono::{DateTime, Duration, NaiveDateTime, Utc};

/// This is the standard way of writing a local timestamp into the checkpoint file.
pub const CHECKPOINT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format arbtt-stats uses for interval boundaries in csv output.
pub const ARBTT_TIME_FORMAT: &str = "%m/%d/%y %H:%M:%S";

/// Start of the unix epoch as a naive local time. Used when nothing was synced yet.
pub fn unix_epoch() -> NaiveDateTime {
    DateTime::<Utc>::UNIX_EPOCH.naive_utc()
}

/// Age window for arbtt `$sampleage` filter in `HH:MM` form. Hours are not wrapped at 24 and
/// leftover seconds are dropped.
pub fn sample_age(last_run: NaiveDateTime, now: NaiveDateTime) -> String {
    let age = (now - last_run).max(Duration::zero());
    format!("{:02}:{:02}", age.num_hours(), age.num_minutes() % 60)
}

/// Parses `H:MM:SS` into a duration. Hours can have any number of digits.
pub fn parse_hms_duration(value: &str) -> Option<Duration> {
    let mut parts = value.trim().split(':');
    let hours = parts.next()?.parse::<i64>().ok()?;
    let minutes = parts.next()?.parse::<i64>().ok()?;
    let seconds = parts.next()?.parse::<i64>().ok()?;
    if parts.next().is_some() || hours < 0 || minutes < 0 || seconds < 0 {
        return None;
    }
    let total = hours
        .checked_mul(3600)?
        .checked_add(minutes.checked_mul(60)?)?
        .checked_add(seconds)?;
    Duration::try_seconds(total)
}

pub fn format_duration(v: Duration) -> String {
    if v.num_hours() > 0 {
        format!(
            "{}h{}m{}s",
            v.num_hours(),
            v.num_minutes() % 60,
            v.num_seconds() % 60
        )
    } else if v.num_minutes() > 0 {
        format!("{}m{}s", v.num_minutes() % 60, v.num_seconds() % 60)
    } else {
        format!("{}s", v.num_seconds() % 60)
    }
}
