//! Uploads activity tracked by arbtt into Toggl Track.
//! Samples since the last run are read through `arbtt-stats`, neighbouring samples of one project
//! are merged and every resulting entry is created in Toggl. The time of a successful run is
//! remembered so the next one only picks up new activity.
//!

pub mod cli;
pub mod config;
pub mod errors;
pub mod sink;
pub mod source;
pub mod storage;
pub mod sync;
pub mod utils;
