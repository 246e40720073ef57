//! Task-switching behavior criteria
//!
//! Performance tables carry one row per block with intra-modal
//! (`same_modal_dprime`) and cross-modal (`cross_modal_dprime`) sensitivity.
//! A session or subject "passes" when more than [`MIN_PASSING_BLOCKS`]
//! blocks clear the d-prime threshold on both measures.

use crate::table;
use crate::Result;
use arrow::array::{ArrayRef, BooleanArray, RecordBatch, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Default d-prime threshold for the task-switching criteria.
pub const DPRIME_THRESHOLD: f64 = 1.5;

/// A session/subject passes only with strictly more than this many passing
/// blocks.
pub const MIN_PASSING_BLOCKS: usize = 3;

/// Summarize which sessions pass the task-switching criteria.
///
/// A session passes when more than [`MIN_PASSING_BLOCKS`] of its blocks have
/// `same_modal_dprime >= threshold` and more than [`MIN_PASSING_BLOCKS`]
/// have `cross_modal_dprime >= threshold`.
///
/// Returns a two-column batch (`session_id`, `passed`), rows sorted by
/// session key.
///
/// # Errors
///
/// Fails when the `session_id` or d-prime columns are missing.
pub fn passing_sessions(performance: &RecordBatch, threshold: f64) -> Result<RecordBatch> {
    let sessions = table::utf8_values(performance, "session_id")?;
    let same = table::f64_values(performance, "same_modal_dprime")?;
    let cross = table::f64_values(performance, "cross_modal_dprime")?;

    let mut counts: BTreeMap<String, (usize, usize)> = BTreeMap::new();
    for ((session, same), cross) in sessions.into_iter().zip(same).zip(cross) {
        let Some(session) = session else { continue };
        let entry = counts.entry(session).or_default();
        if same.is_some_and(|d| d >= threshold) {
            entry.0 += 1;
        }
        if cross.is_some_and(|d| d >= threshold) {
            entry.1 += 1;
        }
    }

    let ids: Vec<&str> = counts.keys().map(String::as_str).collect();
    let passed: Vec<bool> = counts
        .values()
        .map(|(same, cross)| *same > MIN_PASSING_BLOCKS && *cross > MIN_PASSING_BLOCKS)
        .collect();

    let schema = Schema::new(vec![
        Field::new("session_id", DataType::Utf8, false),
        Field::new("passed", DataType::Boolean, false),
    ]);
    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from(ids)),
        Arc::new(BooleanArray::from(passed)),
    ];
    Ok(RecordBatch::try_new(Arc::new(schema), columns)?)
}

/// Whether one subject passes the criteria across its whole performance
/// history.
///
/// D-primes are summed per `block_index`; a block passes when both sums
/// exceed `threshold`, and the subject passes with more than
/// [`MIN_PASSING_BLOCKS`] passing blocks.
///
/// # Errors
///
/// Fails when the `subject_id`, `block_index` or d-prime columns are
/// missing.
pub fn is_subject_passing(
    performance: &RecordBatch,
    subject_id: &str,
    threshold: f64,
) -> Result<bool> {
    let subjects = table::utf8_values(performance, "subject_id")?;
    let blocks = table::i64_values(performance, "block_index")?;
    let same = table::f64_values(performance, "same_modal_dprime")?;
    let cross = table::f64_values(performance, "cross_modal_dprime")?;

    let mut sums: FxHashMap<i64, (f64, f64)> = FxHashMap::default();
    for (((subject, block), same), cross) in
        subjects.into_iter().zip(blocks).zip(same).zip(cross)
    {
        if subject.as_deref() != Some(subject_id) {
            continue;
        }
        let Some(block) = block else { continue };
        let entry = sums.entry(block).or_default();
        entry.0 += same.unwrap_or_default();
        entry.1 += cross.unwrap_or_default();
    }

    let passing = sums
        .values()
        .filter(|(same, cross)| *same > threshold && *cross > threshold)
        .count();
    Ok(passing > MIN_PASSING_BLOCKS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Float64Array, Int64Array};

    fn performance_batch(rows: &[(&str, i64, f64, f64)]) -> RecordBatch {
        let schema = Schema::new(vec![
            Field::new("session_id", DataType::Utf8, false),
            Field::new("subject_id", DataType::Utf8, false),
            Field::new("block_index", DataType::Int64, false),
            Field::new("same_modal_dprime", DataType::Float64, false),
            Field::new("cross_modal_dprime", DataType::Float64, false),
        ]);
        let subjects: Vec<&str> = rows
            .iter()
            .map(|(s, ..)| s.split('_').next().unwrap_or(s))
            .collect();
        RecordBatch::try_new(
            Arc::new(schema),
            vec![
                Arc::new(StringArray::from(
                    rows.iter().map(|(s, ..)| *s).collect::<Vec<&str>>(),
                )),
                Arc::new(StringArray::from(subjects)),
                Arc::new(Int64Array::from(
                    rows.iter().map(|(_, b, ..)| *b).collect::<Vec<i64>>(),
                )),
                Arc::new(Float64Array::from(
                    rows.iter().map(|(_, _, d, _)| *d).collect::<Vec<f64>>(),
                )),
                Arc::new(Float64Array::from(
                    rows.iter().map(|(.., d)| *d).collect::<Vec<f64>>(),
                )),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_four_passing_blocks_pass() {
        let session = "660023_2023-08-09_0";
        let rows: Vec<(&str, i64, f64, f64)> =
            (0..4).map(|b| (session, b, 2.0, 1.8)).collect();
        let summary = passing_sessions(&performance_batch(&rows), DPRIME_THRESHOLD).unwrap();
        assert_eq!(summary.num_rows(), 1);
        assert_eq!(
            table::bool_values(&summary, "passed").unwrap(),
            vec![Some(true)]
        );
    }

    #[test]
    fn test_three_passing_blocks_fail() {
        let session = "660023_2023-08-09_0";
        let rows: Vec<(&str, i64, f64, f64)> =
            (0..3).map(|b| (session, b, 2.0, 1.8)).collect();
        let summary = passing_sessions(&performance_batch(&rows), DPRIME_THRESHOLD).unwrap();
        assert_eq!(
            table::bool_values(&summary, "passed").unwrap(),
            vec![Some(false)]
        );
    }

    #[test]
    fn test_both_measures_required() {
        let session = "660023_2023-08-09_0";
        // Intra-modal clears the bar in 4 blocks, cross-modal never does.
        let rows: Vec<(&str, i64, f64, f64)> =
            (0..4).map(|b| (session, b, 2.0, 0.5)).collect();
        let summary = passing_sessions(&performance_batch(&rows), DPRIME_THRESHOLD).unwrap();
        assert_eq!(
            table::bool_values(&summary, "passed").unwrap(),
            vec![Some(false)]
        );
    }

    #[test]
    fn test_sessions_sorted_in_summary() {
        let rows = [
            ("b_2023-01-02_0", 0, 0.0, 0.0),
            ("a_2023-01-01_0", 0, 0.0, 0.0),
        ];
        let summary = passing_sessions(&performance_batch(&rows), DPRIME_THRESHOLD).unwrap();
        assert_eq!(
            table::utf8_values(&summary, "session_id").unwrap(),
            vec![
                Some("a_2023-01-01_0".to_string()),
                Some("b_2023-01-02_0".to_string())
            ]
        );
    }

    #[test]
    fn test_subject_passing_sums_blocks() {
        // Two sessions contribute 1.0 each to 4 blocks: sums clear 1.5.
        let mut rows = Vec::new();
        for session in ["660023_2023-08-09_0", "660023_2023-08-10_0"] {
            for block in 0..4 {
                rows.push((session, block, 1.0, 1.0));
            }
        }
        let batch = performance_batch(&rows);
        assert!(is_subject_passing(&batch, "660023", DPRIME_THRESHOLD).unwrap());
        assert!(!is_subject_passing(&batch, "999999", DPRIME_THRESHOLD).unwrap());
    }
}
