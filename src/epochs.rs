//! Epoch-table annotations
//!
//! Epochs arrive with a `tags` list per row; exactly one tag is the
//! CamelCase name of the stimulus script that ran (the rest are lowercase
//! qualifiers). These helpers copy that name into its own column and mark
//! whether the task epoch ran first in its session.

use crate::table;
use crate::Result;
use arrow::array::{ArrayRef, BooleanArray, RecordBatch, StringArray};
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Epoch name of the main task-switching script.
pub const TASK_EPOCH: &str = "DynamicRouting1";

/// Append a `name` column holding each epoch's script name: the first tag
/// containing an ASCII uppercase letter, null when no tag qualifies.
///
/// # Errors
///
/// Fails when the `tags` column is missing or not a list of strings.
pub fn add_epoch_name_column(epochs: &RecordBatch) -> Result<RecordBatch> {
    let tags = table::string_list_values(epochs, "tags")?;
    let names: Vec<Option<String>> = tags
        .iter()
        .map(|row| {
            row.iter()
                .find(|tag| tag.chars().any(|c| c.is_ascii_uppercase()))
                .cloned()
        })
        .collect();
    let column: ArrayRef = Arc::new(StringArray::from(names));
    table::with_column(epochs, "name", column)
}

/// Append an `is_task_first` column: true when the session's
/// [`TASK_EPOCH`] started at the session's earliest `start_time`, null for
/// sessions without a task epoch.
///
/// Expects `session_id`, `name` (see [`add_epoch_name_column`]) and
/// `start_time` columns.
///
/// # Errors
///
/// Fails when any of the three columns is missing or mistyped.
pub fn add_is_task_first_column(epochs: &RecordBatch) -> Result<RecordBatch> {
    let sessions = table::utf8_values(epochs, "session_id")?;
    let names = table::utf8_values(epochs, "name")?;
    let starts = table::f64_values(epochs, "start_time")?;

    let mut min_start: FxHashMap<&str, f64> = FxHashMap::default();
    let mut task_start: FxHashMap<&str, f64> = FxHashMap::default();
    for ((session, name), start) in sessions.iter().zip(&names).zip(&starts) {
        let (Some(session), Some(start)) = (session.as_deref(), *start) else {
            continue;
        };
        min_start
            .entry(session)
            .and_modify(|m| *m = m.min(start))
            .or_insert(start);
        if name.as_deref() == Some(TASK_EPOCH) {
            // Sessions can rerun the task; only the first run counts.
            task_start.entry(session).or_insert(start);
        }
    }

    let values: Vec<Option<bool>> = sessions
        .iter()
        .map(|session| {
            let session = session.as_deref()?;
            let task = task_start.get(session)?;
            Some((task - min_start[session]).abs() < f64::EPSILON)
        })
        .collect();
    let column: ArrayRef = Arc::new(BooleanArray::from(values));
    table::with_column(epochs, "is_task_first", column)
}
