//! # dr-summary: columnar session cache for the dynamic routing study
//!
//! Loads tabular experiment records from a per-component Parquet cache,
//! derives boolean classification flags per session, and joins those flags
//! onto downstream tables by the composite session key.
//!
//! Two pieces carry the design:
//!
//! - [`LazyCache`]: mapping whose values are deferred computations,
//!   evaluated at most once on first access. Lets callers hold "all the
//!   dataframes" while only paying for the ones they touch.
//! - [`SessionTagger`]: derives `is_ephys` / `is_templeton` / `is_training`
//!   / `is_dynamic_routing` / `is_opto` per session (keyword-based or
//!   ID-set-based), memoizes the result per cache version, and inner-joins
//!   the flags onto any table carrying the session's natural key.
//!
//! ## Example
//!
//! ```rust,no_run
//! use dr_summary::{Catalog, KeywordStrategy, ParquetSource};
//! use std::sync::Arc;
//!
//! let source = Arc::new(ParquetSource::with_root("/data/cache"));
//! let catalog = Catalog::new(source, KeywordStrategy);
//!
//! // Nothing is read yet.
//! let mut dfs = catalog.dataframes(Some("0.0.172"), true);
//!
//! // First access reads the epochs table and tags it; later accesses are
//! // served from the cache.
//! let epochs = dfs.get("epochs")?;
//! println!("{} epochs", epochs.num_rows());
//! # Ok::<(), dr_summary::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod behavior;
pub mod catalog;
pub mod classify;
pub mod epochs;
pub mod error;
pub mod lazy;
pub mod session;
pub mod table;

pub use catalog::{Catalog, ComponentSource, ParquetSource};
pub use classify::{
    FlagStrategy, FlagsTable, KeywordStrategy, MembershipStrategy, SessionFlags, SessionTagger,
};
pub use error::{Error, Result};
pub use lazy::{LazyCache, Thunk};
pub use session::{session_key, SessionId};
