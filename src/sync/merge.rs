use chrono::Duration;

use crate::storage::entities::ActivitySample;

/// Value used to bridge gaps between samples of one project. arbtt splits intervals whenever the
/// tag flips for a moment, which should not produce separate entries in Toggl.
pub const MAX_MERGE_GAP: Duration = Duration::seconds(60);

pub const DESCRIPTION_SEPARATOR: &str = ", ";

/// Creates an ordered sequence of entries out of unordered samples. Samples are sorted by start and
/// then folded greedily into the previous entry if it has the same project and ended at most
/// [MAX_MERGE_GAP] before the sample started.
pub fn merge_samples(mut samples: Vec<ActivitySample>) -> Vec<ActivitySample> {
    // Stable, ties keep the order they were read in.
    samples.sort_by_key(|v| v.start);

    let mut entries: Vec<ActivitySample> = Vec::with_capacity(samples.len());
    for sample in samples {
        match entries.last_mut() {
            Some(entry)
                if entry.project == sample.project
                    && sample.start <= entry.end() + MAX_MERGE_GAP =>
            {
                entry.duration += sample.duration;
                if !entry.description.contains(sample.description.as_str()) {
                    entry.description.push_str(DESCRIPTION_SEPARATOR);
                    entry.description.push_str(&sample.description);
                }
            }
            Some(_) | None => entries.push(sample),
        }
    }

    entries
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};

    use crate::storage::entities::ActivitySample;

    use super::merge_samples;

    const TEST_DATE_TIME: NaiveDateTime = NaiveDateTime::new(
        NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
        NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
    );

    fn at(seconds: i64) -> DateTime<Utc> {
        Utc.from_utc_datetime(&TEST_DATE_TIME) + Duration::seconds(seconds)
    }

    fn sample(project: &str, description: &str, start: i64, duration: i64) -> ActivitySample {
        ActivitySample {
            project: project.into(),
            description: description.into(),
            start: at(start),
            duration: Duration::seconds(duration),
        }
    }

    fn total(values: &[ActivitySample]) -> Duration {
        values.iter().fold(Duration::zero(), |ac, next| ac + next.duration)
    }

    #[test]
    fn merges_close_samples_of_one_project() {
        let merged = merge_samples(vec![
            sample("A", "design", 0, 300),
            sample("A", "review", 330, 120),
            sample("B", "mail", 600, 60),
        ]);

        assert_eq!(
            merged,
            vec![
                sample("A", "design, review", 0, 420),
                sample("B", "mail", 600, 60),
            ]
        );
    }

    #[test]
    fn sorts_unordered_input() {
        let merged = merge_samples(vec![
            sample("B", "mail", 600, 60),
            sample("A", "review", 330, 120),
            sample("A", "design", 0, 300),
        ]);

        assert_eq!(merged[0].start, at(0));
        assert_eq!(merged[0].description, "design, review");
        assert_eq!(merged[1].project.as_ref(), "B");
    }

    #[test]
    fn gap_of_exactly_a_minute_is_merged() {
        let merged = merge_samples(vec![sample("A", "x", 0, 300), sample("A", "y", 360, 60)]);
        assert_eq!(merged, vec![sample("A", "x, y", 0, 360)]);
    }

    #[test]
    fn gap_over_a_minute_is_not_merged() {
        let merged = merge_samples(vec![sample("A", "x", 0, 300), sample("A", "y", 361, 60)]);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn different_projects_are_never_merged() {
        let merged = merge_samples(vec![
            sample("A", "x", 0, 300),
            sample("B", "x", 0, 300),
            sample("A", "x", 300, 300),
        ]);
        assert_eq!(merged.len(), 3);
    }

    #[test]
    fn repeated_description_is_not_duplicated() {
        let merged = merge_samples(vec![
            sample("A", "code review", 0, 60),
            sample("A", "review", 60, 60),
            sample("A", "", 120, 60),
            sample("A", "code review", 180, 60),
        ]);
        assert_eq!(merged, vec![sample("A", "code review", 0, 240)]);
    }

    #[test]
    fn ties_keep_input_order() {
        let merged = merge_samples(vec![
            sample("A", "first", 0, 60),
            sample("B", "second", 0, 60),
        ]);
        assert_eq!(merged[0].description, "first");
        assert_eq!(merged[1].description, "second");
    }

    #[test]
    fn duration_is_conserved() {
        let samples = vec![
            sample("A", "a", 0, 300),
            sample("A", "b", 320, 40),
            sample("B", "c", 400, 100),
            sample("A", "d", 700, 10),
            sample("A", "e", 2000, 500),
            sample("B", "c", 2400, 100),
        ];
        let merged = merge_samples(samples.clone());
        assert_eq!(total(&merged), total(&samples));
    }

    #[test]
    fn merging_merged_entries_changes_nothing() {
        let merged = merge_samples(vec![
            sample("A", "a", 0, 300),
            sample("A", "b", 320, 40),
            sample("B", "c", 400, 100),
            sample("A", "d", 700, 10),
            sample("A", "e", 2000, 500),
        ]);
        assert_eq!(merge_samples(merged.clone()), merged);
    }

    #[test]
    fn empty_input() {
        assert!(merge_samples(vec![]).is_empty());
    }
}
