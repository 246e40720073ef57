//! Lazy, memoizing key-value container
//!
//! Component tables are expensive to read, and interactive sessions rarely
//! touch all of them. [`LazyCache`] holds one deferred computation per key
//! and evaluates each at most once, on first access.
//!
//! Each entry carries an explicit tagged state (`Pending` | `Evaluated`)
//! rather than inferring "already evaluated" from the shape of the stored
//! value. A thunk that fails leaves its entry `Pending` and propagates the
//! error on the access that triggered evaluation; it is never misclassified
//! as evaluated.

use crate::{Error, Result};
use rustc_hash::FxHashMap;

/// Boxed deferred computation, as stored for each pending entry.
pub type Thunk<V> = Box<dyn Fn() -> Result<V> + Send + Sync>;

enum Entry<V> {
    Pending(Thunk<V>),
    Evaluated(V),
}

/// Read-mostly mapping whose values are computed at most once.
///
/// Keys iterate and count without forcing evaluation; only [`get`](Self::get)
/// forces it. Effectively immutable after the entries are registered: an
/// entry transitions from `Pending` to `Evaluated` exactly once and there is
/// no
/// invalidation or eviction.
///
/// Single-threaded by construction: `get` takes `&mut self`, which makes the
/// unguarded check-then-set on first access explicit at the type level.
///
/// # Example
///
/// ```rust
/// use dr_summary::LazyCache;
///
/// let mut cache: LazyCache<i32> = LazyCache::new();
/// cache.insert_pending("a", || Ok(1 + 1));
/// assert!(!cache.is_evaluated("a"));
/// assert_eq!(*cache.get("a")?, 2);
/// assert!(cache.is_evaluated("a"));
/// # Ok::<(), dr_summary::Error>(())
/// ```
pub struct LazyCache<V> {
    entries: FxHashMap<String, Entry<V>>,
}

impl<V> LazyCache<V> {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: FxHashMap::default(),
        }
    }

    /// Register a deferred computation for `key`.
    ///
    /// Last write wins: re-registering a key discards the previous entry,
    /// evaluated or not.
    pub fn insert_pending(
        &mut self,
        key: impl Into<String>,
        thunk: impl Fn() -> Result<V> + Send + Sync + 'static,
    ) {
        self.entries
            .insert(key.into(), Entry::Pending(Box::new(thunk)));
    }

    /// Register an already-materialized value for `key` (no evaluation will
    /// ever run for it). Last write wins.
    pub fn insert_value(&mut self, key: impl Into<String>, value: V) {
        self.entries.insert(key.into(), Entry::Evaluated(value));
    }

    /// Get the value for `key`, evaluating its thunk on first access.
    ///
    /// Idempotent: later calls return the cached value without re-invoking
    /// the thunk.
    ///
    /// # Errors
    ///
    /// Returns [`Error::KeyNotFound`] for unregistered keys. A failing thunk
    /// propagates its error and leaves the entry pending, so a later call
    /// retries the computation.
    pub fn get(&mut self, key: &str) -> Result<&V> {
        if let Some(Entry::Pending(thunk)) = self.entries.get(key) {
            let value = thunk()?;
            tracing::debug!(key, "lazy entry evaluated");
            self.entries.insert(key.to_owned(), Entry::Evaluated(value));
        }
        match self.entries.get(key) {
            Some(Entry::Evaluated(value)) => Ok(value),
            Some(Entry::Pending(_)) => unreachable!("entry was evaluated above"),
            None => Err(Error::KeyNotFound(key.to_owned())),
        }
    }

    /// Iterate over registered keys. Never forces evaluation.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Number of registered keys. Never forces evaluation.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `key` is registered. Never forces evaluation.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Whether `key` has already been evaluated (or was supplied as a plain
    /// value). Never forces evaluation.
    #[must_use]
    pub fn is_evaluated(&self, key: &str) -> bool {
        matches!(self.entries.get(key), Some(Entry::Evaluated(_)))
    }
}

impl<V> Default for LazyCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Build a cache of already-materialized values; later keys win on
/// collision.
impl<V> FromIterator<(String, V)> for LazyCache<V> {
    fn from_iter<T: IntoIterator<Item = (String, V)>>(iter: T) -> Self {
        let mut cache = Self::new();
        for (key, value) in iter {
            cache.insert_value(key, value);
        }
        cache
    }
}

/// Build a cache of pending entries from `(key, thunk)` pairs; later keys
/// win on collision.
impl<V> FromIterator<(String, Thunk<V>)> for LazyCache<V> {
    fn from_iter<T: IntoIterator<Item = (String, Thunk<V>)>>(iter: T) -> Self {
        let mut cache = Self::new();
        for (key, thunk) in iter {
            cache.entries.insert(key, Entry::Pending(thunk));
        }
        cache
    }
}

impl<V> std::fmt::Debug for LazyCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut keys: Vec<&str> = self.keys().collect();
        keys.sort_unstable();
        f.debug_struct("LazyCache").field("keys", &keys).finish()
    }
}
