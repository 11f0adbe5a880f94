use std::path::Path;

use ansi_term::Colour;
use chrono::{Local, NaiveDateTime};

use crate::{
    config::Config,
    storage::entities::ActivitySample,
    sync::PendingEntries,
    utils::time::{format_duration, unix_epoch},
};

const TIME_FORMAT: &str = "%x %H:%M:%S";

/// Prints entries the next sync would create. One line per entry, tab separated.
pub fn print_preview(config: &Config, pending: &PendingEntries) {
    println!(
        "{} samples since {} merge into {} entries",
        pending.samples,
        format_last_run(pending.last_run),
        pending.entries.len()
    );
    for entry in &pending.entries {
        println!("{}", format_entry(config, entry));
    }
}

pub fn print_checkpoint(path: &Path, last_run: Option<NaiveDateTime>) {
    match last_run {
        Some(v) => println!("Last sync {} ({})", format_last_run(v), path.display()),
        None => println!("Nothing was synced yet ({} doesn't exist)", path.display()),
    }
}

fn format_last_run(last_run: NaiveDateTime) -> String {
    if last_run == unix_epoch() {
        "the beginning".to_string()
    } else {
        last_run.format(TIME_FORMAT).to_string()
    }
}

fn format_entry(config: &Config, entry: &ActivitySample) -> String {
    let project_id = config
        .project_id(&entry.project)
        .map(|v| v.to_string())
        .unwrap_or_else(|| "-".to_string());
    format!(
        "{}\t{}\t{}\t{}\t{}",
        entry.start.with_timezone(&Local).format(TIME_FORMAT),
        format_duration(entry.duration),
        Colour::Cyan.paint(entry.project.as_ref()),
        project_id,
        entry.description
    )
}
