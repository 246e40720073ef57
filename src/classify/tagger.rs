//! Flags-table derivation, memoization and the boolean-tag join
//!
//! The tagger derives the flags table once per `version` and keeps it in a
//! process-wide cache; the join attaches the flags (plus the synthesized
//! `session_id` key) to arbitrary caller tables.

use super::{FlagStrategy, SessionFlags};
use crate::catalog::ComponentSource;
use crate::session::session_key;
use crate::table;
use crate::Result;
use arrow::array::{ArrayRef, BooleanArray, RecordBatch, StringArray};
use arrow::compute;
use arrow::datatypes::{DataType, Field, Schema};
use dashmap::DashMap;
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// The component holding raw session records.
const SESSION_COMPONENT: &str = "session";

/// Per-session classification flags, keyed by the composite session key.
#[derive(Debug, Default)]
pub struct FlagsTable {
    by_session: FxHashMap<String, SessionFlags>,
}

impl FlagsTable {
    /// Flags for `session_id`, if the session was classified.
    #[must_use]
    pub fn get(&self, session_id: &str) -> Option<SessionFlags> {
        self.by_session.get(session_id).copied()
    }

    /// Number of classified sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_session.len()
    }

    /// Whether no session was classified.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_session.is_empty()
    }

    /// Render the table as a record batch: a `session_id` column followed by
    /// one boolean column per flag, rows sorted by session key.
    ///
    /// # Errors
    ///
    /// Returns an error if batch construction fails.
    pub fn to_record_batch(&self) -> Result<RecordBatch> {
        let mut keys: Vec<&String> = self.by_session.keys().collect();
        keys.sort_unstable();

        let mut fields = vec![Field::new("session_id", DataType::Utf8, false)];
        let mut columns: Vec<ArrayRef> = vec![Arc::new(StringArray::from(
            keys.iter().map(|k| k.as_str()).collect::<Vec<&str>>(),
        ))];
        for column in SessionFlags::COLUMNS {
            let values: Vec<bool> = keys
                .iter()
                .map(|k| {
                    self.by_session[k.as_str()]
                        .value(column)
                        .unwrap_or_default()
                })
                .collect();
            fields.push(Field::new(column, DataType::Boolean, false));
            columns.push(Arc::new(BooleanArray::from(values)));
        }

        Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?)
    }

    /// Render the table as a pretty-printed JSON object keyed by session id,
    /// for export to non-Arrow consumers.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        let sorted: std::collections::BTreeMap<&str, &SessionFlags> = self
            .by_session
            .iter()
            .map(|(k, v)| (k.as_str(), v))
            .collect();
        Ok(serde_json::to_string_pretty(&sorted)?)
    }
}

impl FromIterator<(String, SessionFlags)> for FlagsTable {
    fn from_iter<T: IntoIterator<Item = (String, SessionFlags)>>(iter: T) -> Self {
        Self {
            by_session: iter.into_iter().collect(),
        }
    }
}

/// Derives classification flags per session and joins them onto tables.
///
/// The flags table is computed once per `version` and memoized in a
/// process-wide unbounded cache; there is no invalidation short of a process
/// restart. Concurrent readers may race on a first computation of the same
/// version, which at worst computes it twice with identical results.
pub struct SessionTagger {
    source: Arc<dyn ComponentSource>,
    strategy: Box<dyn FlagStrategy>,
    cache: DashMap<Option<String>, Arc<FlagsTable>>,
}

impl SessionTagger {
    /// Create a tagger reading session records from `source` and classifying
    /// them with `strategy`.
    pub fn new(source: Arc<dyn ComponentSource>, strategy: impl FlagStrategy + 'static) -> Self {
        Self {
            source,
            strategy: Box::new(strategy),
            cache: DashMap::new(),
        }
    }

    /// The memoized flags table for `version`.
    ///
    /// # Errors
    ///
    /// Propagates session-component read failures and strategy validation
    /// errors.
    pub fn flags_table(&self, version: Option<&str>) -> Result<Arc<FlagsTable>> {
        let cache_key = version.map(str::to_string);
        if let Some(hit) = self.cache.get(&cache_key) {
            tracing::debug!(?version, "classification cache hit");
            return Ok(Arc::clone(&hit));
        }

        let session = self.source.read_component(SESSION_COMPONENT, version)?;
        let table = Arc::new(self.derive(&session)?);
        tracing::debug!(?version, sessions = table.len(), "classified sessions");
        self.cache.insert(cache_key, Arc::clone(&table));
        Ok(table)
    }

    /// The flags table for `version` rendered as a record batch.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`flags_table`](Self::flags_table).
    pub fn classification_table(&self, version: Option<&str>) -> Result<RecordBatch> {
        self.flags_table(version)?.to_record_batch()
    }

    fn derive(&self, session: &RecordBatch) -> Result<FlagsTable> {
        let keys = session_keys(session)?;
        let keywords = if table::has_column(session, "keywords") {
            table::string_list_values(session, "keywords")?
        } else {
            vec![Vec::new(); session.num_rows()]
        };

        let mut by_session = FxHashMap::default();
        for (key, keywords) in keys.into_iter().zip(keywords) {
            let Some(key) = key else { continue };
            let flags = self.strategy.classify(&key, &keywords)?;
            by_session.insert(key, flags);
        }
        Ok(FlagsTable { by_session })
    }

    /// Inner-join the flags for `version` onto `batch`.
    ///
    /// An existing `session_id` column is reused as the join key; otherwise
    /// one is synthesized from `subject_id`, `date` and `session_idx` and
    /// appended to the output. Rows whose key has no classification record
    /// are dropped; zero overlap yields zero rows and a warning, not an
    /// error. The input batch is not mutated.
    ///
    /// # Errors
    ///
    /// Fails when the key columns are missing or the flags table cannot be
    /// derived.
    pub fn add_classification_columns(
        &self,
        batch: &RecordBatch,
        version: Option<&str>,
    ) -> Result<RecordBatch> {
        let flags = self.flags_table(version)?;

        let (keyed, keys) = if table::has_column(batch, "session_id") {
            (batch.clone(), table::utf8_values(batch, "session_id")?)
        } else {
            let keys = synthesize_keys(batch)?;
            let column: ArrayRef = Arc::new(StringArray::from(keys.clone()));
            (table::with_column(batch, "session_id", column)?, keys)
        };

        let mask: BooleanArray = keys
            .iter()
            .map(|k| k.as_deref().is_some_and(|k| flags.get(k).is_some()))
            .collect::<Vec<bool>>()
            .into();
        let matched = compute::filter_record_batch(&keyed, &mask)?;

        if matched.num_rows() == 0 && keyed.num_rows() > 0 {
            tracing::warn!(
                ?version,
                input_rows = keyed.num_rows(),
                "no session in the table matched a classification record; all rows dropped"
            );
        } else {
            tracing::debug!(
                ?version,
                input_rows = keyed.num_rows(),
                matched_rows = matched.num_rows(),
                "joined classification columns"
            );
        }

        let matched_keys = table::utf8_values(&matched, "session_id")?;
        let mut out = matched;
        for column in SessionFlags::COLUMNS {
            let values: Vec<bool> = matched_keys
                .iter()
                .map(|k| {
                    k.as_deref()
                        .and_then(|k| flags.get(k))
                        .and_then(|f| f.value(column))
                        .unwrap_or_default()
                })
                .collect();
            out = table::with_column(&out, column, Arc::new(BooleanArray::from(values)))?;
        }
        Ok(out)
    }
}

/// Session keys for each row: reuse a `session_id` column when the table
/// provides one, otherwise synthesize from the three natural-key columns.
fn session_keys(batch: &RecordBatch) -> Result<Vec<Option<String>>> {
    if table::has_column(batch, "session_id") {
        table::utf8_values(batch, "session_id")
    } else {
        synthesize_keys(batch)
    }
}

/// Synthesize `subject_id_date_session_idx` per row. Rows with a null (or
/// negative-index) component synthesize no key and fall out of inner joins.
fn synthesize_keys(batch: &RecordBatch) -> Result<Vec<Option<String>>> {
    let subjects = table::utf8_values(batch, "subject_id")?;
    let dates = table::utf8_values(batch, "date")?;
    let indices = table::i64_values(batch, "session_idx")?;

    Ok(subjects
        .into_iter()
        .zip(dates)
        .zip(indices)
        .map(|((subject, date), idx)| {
            let subject = subject?;
            let date = date?;
            let idx = u32::try_from(idx?).ok()?;
            Some(session_key(&subject, &date, idx))
        })
        .collect())
}
