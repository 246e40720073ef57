//! Property-based tests for session keys, flag derivation and the tag join.

use arrow::array::{Int64Array, RecordBatch, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use dr_summary::{
    session_key, ComponentSource, Error, LazyCache, MembershipStrategy, Result, SessionId,
    SessionTagger,
};
use proptest::prelude::*;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

// ============================================================================
// Strategies
// ============================================================================

/// `(subject_id, date, session_idx)` triples as they appear in the cache.
fn arb_triple() -> impl Strategy<Value = (String, String, u32)> {
    (
        100_000u32..1_000_000,
        (2020i32..2026, 1u32..=12, 1u32..=28),
        0u32..4,
    )
        .prop_map(|(subject, (y, m, d), idx)| {
            (subject.to_string(), format!("{y:04}-{m:02}-{d:02}"), idx)
        })
}

fn arb_session_keys(max: usize) -> impl Strategy<Value = Vec<String>> {
    proptest::collection::vec(arb_triple(), 1..max)
        .prop_map(|triples| {
            triples
                .iter()
                .map(|(s, d, i)| session_key(s, d, *i))
                .collect()
        })
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Synthesized keys always parse back to the same components.
    #[test]
    fn prop_session_key_roundtrip((subject, date, idx) in arb_triple()) {
        let key = session_key(&subject, &date, idx);
        let id = SessionId::parse(&key).unwrap();
        prop_assert_eq!(id.subject_id(), subject.as_str());
        prop_assert_eq!(id.session_idx(), idx);
        prop_assert_eq!(id.to_string(), key);
    }

    /// Set-membership flags are complementary for every session.
    #[test]
    fn prop_membership_flags_complementary(
        keys in arb_session_keys(20),
        memberships in proptest::collection::vec((any::<bool>(), any::<bool>()), 20),
    ) {
        let ephys: Vec<String> = keys
            .iter()
            .zip(&memberships)
            .filter(|(_, (e, _))| *e)
            .map(|(k, _)| k.clone())
            .collect();
        let templeton: Vec<String> = keys
            .iter()
            .zip(&memberships)
            .filter(|(_, (_, t))| *t)
            .map(|(k, _)| k.clone())
            .collect();
        let strategy = MembershipStrategy::new(ephys, templeton);

        use dr_summary::FlagStrategy;
        for key in &keys {
            let flags = strategy.classify(key, &[]).unwrap();
            prop_assert_eq!(flags.is_training, !flags.is_ephys);
            prop_assert_eq!(flags.is_dynamic_routing, !flags.is_templeton);
            prop_assert!(!flags.is_opto);
        }
    }

    /// Inner join keeps exactly the rows whose key has a classification
    /// record, in input order.
    #[test]
    fn prop_inner_join_row_count(
        keys in arb_session_keys(16),
        classified_mask in proptest::collection::vec(any::<bool>(), 16),
    ) {
        let classified: HashSet<&String> = keys
            .iter()
            .zip(&classified_mask)
            .filter(|(_, keep)| **keep)
            .map(|(k, _)| k)
            .collect();

        let tagger = tagger_for(classified.iter().map(|k| k.as_str()));
        let input = key_batch(&keys);
        let joined = tagger.add_classification_columns(&input, None).unwrap();

        let expected = keys.iter().filter(|k| classified.contains(k)).count();
        prop_assert_eq!(joined.num_rows(), expected);
    }

    /// A lazy entry's thunk runs exactly once no matter how often it is read.
    #[test]
    fn prop_lazy_get_idempotent(reads in 1usize..20) {
        use std::sync::atomic::{AtomicUsize, Ordering};
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let mut cache: LazyCache<usize> = LazyCache::new();
        cache.insert_pending("session", move || {
            Ok(counter.fetch_add(1, Ordering::SeqCst))
        });
        for _ in 0..reads {
            cache.get("session").unwrap();
        }
        prop_assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}

// ============================================================================
// Fixtures
// ============================================================================

struct FixedSource {
    components: HashMap<String, RecordBatch>,
}

impl ComponentSource for FixedSource {
    fn read_component(&self, component: &str, _version: Option<&str>) -> Result<RecordBatch> {
        self.components
            .get(component)
            .cloned()
            .ok_or_else(|| Error::ComponentNotFound(component.to_string()))
    }
}

/// A tagger whose session component contains exactly `session_ids`.
fn tagger_for<'a>(session_ids: impl Iterator<Item = &'a str>) -> SessionTagger {
    let ids: Vec<&str> = session_ids.collect();
    let schema = Schema::new(vec![Field::new("session_id", DataType::Utf8, false)]);
    let session = RecordBatch::try_new(
        Arc::new(schema),
        vec![Arc::new(StringArray::from(ids))],
    )
    .unwrap();

    let mut components = HashMap::new();
    components.insert("session".to_string(), session);
    // Membership sets are irrelevant here; the join only needs the keys.
    SessionTagger::new(
        Arc::new(FixedSource { components }),
        MembershipStrategy::default(),
    )
}

fn key_batch(keys: &[String]) -> RecordBatch {
    let schema = Schema::new(vec![
        Field::new("session_id", DataType::Utf8, false),
        Field::new("row", DataType::Int64, false),
    ]);
    RecordBatch::try_new(
        Arc::new(schema),
        vec![
            Arc::new(StringArray::from(
                keys.iter().map(String::as_str).collect::<Vec<&str>>(),
            )),
            Arc::new(Int64Array::from(
                (0..keys.len() as i64).collect::<Vec<i64>>(),
            )),
        ],
    )
    .unwrap()
}
