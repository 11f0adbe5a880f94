//!  Local state of the tool.
//!   - [entities::ActivitySample] is the record passed between reading, merging and uploading.
//!   - [checkpoint::CheckpointStore] remembers when the last successful sync happened.

pub mod checkpoint;
pub mod entities;
