//! Fetch activity: best-effort JSONL event log and its aggregation.

pub mod events;
pub mod reporter;
