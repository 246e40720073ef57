//! Component catalog and lazy per-component tables
//!
//! An experiment's recorded data is cached as one Parquet table per named
//! component. The catalog knows which components exist, reads them through
//! the [`ComponentSource`] seam, and hands callers a [`LazyCache`] so that
//! only the components actually touched get read.

use crate::classify::{FlagStrategy, SessionTagger};
use crate::lazy::LazyCache;
use crate::{Error, Result};
use arrow::array::RecordBatch;
use arrow::compute;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Every table-like component of a cached experiment.
pub const ALL_COMPONENTS: &[&str] = &[
    "session",
    "subject",
    "epochs",
    "trials",
    "performance",
    "devices",
    "electrode_groups",
    "electrodes",
    "units",
];

/// Spike tables are orders of magnitude larger than the rest and never
/// wanted in interactive summaries.
const EXCLUDED_COMPONENT: &str = "units";

/// The components served by [`Catalog::dataframes`]: all of
/// [`ALL_COMPONENTS`] except `units`.
pub fn table_components() -> impl Iterator<Item = &'static str> {
    ALL_COMPONENTS
        .iter()
        .copied()
        .filter(|c| *c != EXCLUDED_COMPONENT)
}

/// External collaborator seam: reads one component table per call.
///
/// The core treats the source as opaque; how `(component, version)` maps to
/// bytes on disk (or over the network) is the implementor's business.
pub trait ComponentSource: Send + Sync {
    /// Read the table for `component` at `version` (`None` = latest).
    ///
    /// # Errors
    ///
    /// [`Error::ComponentNotFound`] when nothing exists at the resolved
    /// location; storage errors propagate unchanged.
    fn read_component(&self, component: &str, version: Option<&str>) -> Result<RecordBatch>;
}

/// Maps `(component, version)` to the Parquet file to read.
pub type PathResolver = Box<dyn Fn(&str, Option<&str>) -> PathBuf + Send + Sync>;

/// [`ComponentSource`] reading Parquet files through a path resolver.
pub struct ParquetSource {
    resolver: PathResolver,
}

impl ParquetSource {
    /// Create a source with a caller-supplied path resolver.
    #[must_use]
    pub fn new(resolver: impl Fn(&str, Option<&str>) -> PathBuf + Send + Sync + 'static) -> Self {
        Self {
            resolver: Box::new(resolver),
        }
    }

    /// Create a source over the conventional cache layout
    /// `<root>/<version>/<component>.parquet`, with `latest` standing in for
    /// an unspecified version.
    #[must_use]
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self::new(move |component, version| {
            root.join(version.unwrap_or("latest"))
                .join(format!("{component}.parquet"))
        })
    }

    /// Load a whole Parquet file as a single record batch.
    ///
    /// # Errors
    ///
    /// Returns a storage error when the file cannot be opened or parsed.
    pub fn load_parquet(path: &Path) -> Result<RecordBatch> {
        use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
        use std::fs::File;

        let file = File::open(path)
            .map_err(|e| Error::Storage(format!("failed to open {}: {e}", path.display())))?;
        let builder = ParquetRecordBatchReaderBuilder::try_new(file)
            .map_err(|e| Error::Storage(format!("failed to parse {}: {e}", path.display())))?;
        let schema = builder.schema().clone();
        let reader = builder
            .build()
            .map_err(|e| Error::Storage(format!("failed to read {}: {e}", path.display())))?;

        let mut batches = Vec::new();
        for batch in reader {
            batches
                .push(batch.map_err(|e| {
                    Error::Storage(format!("failed to read {}: {e}", path.display()))
                })?);
        }

        if batches.is_empty() {
            return Ok(RecordBatch::new_empty(schema));
        }
        Ok(compute::concat_batches(&schema, &batches)?)
    }
}

impl ComponentSource for ParquetSource {
    fn read_component(&self, component: &str, version: Option<&str>) -> Result<RecordBatch> {
        let path = (self.resolver)(component, version);
        if !path.exists() {
            return Err(Error::ComponentNotFound(format!(
                "{component} (no table at {})",
                path.display()
            )));
        }
        tracing::debug!(component, ?version, path = %path.display(), "reading component table");
        Self::load_parquet(&path)
    }
}

/// Entry point tying the component source, the tagger and the lazy cache
/// together.
///
/// # Example
///
/// ```rust,no_run
/// use dr_summary::{Catalog, KeywordStrategy, ParquetSource};
/// use std::sync::Arc;
///
/// let source = Arc::new(ParquetSource::with_root("/data/cache"));
/// let catalog = Catalog::new(source, KeywordStrategy);
///
/// let mut dfs = catalog.dataframes(Some("0.0.172"), true);
/// let performance = dfs.get("performance")?; // read + tagged on first access
/// println!("{} rows", performance.num_rows());
/// # Ok::<(), dr_summary::Error>(())
/// ```
pub struct Catalog {
    source: Arc<dyn ComponentSource>,
    tagger: Arc<SessionTagger>,
}

impl Catalog {
    /// Create a catalog over `source`, classifying sessions with `strategy`.
    pub fn new(source: Arc<dyn ComponentSource>, strategy: impl FlagStrategy + 'static) -> Self {
        let tagger = Arc::new(SessionTagger::new(Arc::clone(&source), strategy));
        Self { source, tagger }
    }

    /// The tagger backing this catalog.
    #[must_use]
    pub fn tagger(&self) -> &SessionTagger {
        &self.tagger
    }

    /// A lazy mapping from component name to its table, one entry per
    /// component in [`table_components`].
    ///
    /// Nothing is read until an entry is first accessed; on that access the
    /// component's table is loaded and, when `with_bool_columns` is set,
    /// routed through
    /// [`add_classification_columns`](SessionTagger::add_classification_columns).
    #[must_use]
    pub fn dataframes(
        &self,
        version: Option<&str>,
        with_bool_columns: bool,
    ) -> LazyCache<RecordBatch> {
        let mut cache = LazyCache::new();
        for component in table_components() {
            let source = Arc::clone(&self.source);
            let tagger = Arc::clone(&self.tagger);
            let version: Option<String> = version.map(str::to_string);
            cache.insert_pending(component, move || {
                let batch = source.read_component(component, version.as_deref())?;
                if with_bool_columns {
                    tagger.add_classification_columns(&batch, version.as_deref())
                } else {
                    Ok(batch)
                }
            });
        }
        cache
    }

    /// The per-session classification table for `version`.
    ///
    /// # Errors
    ///
    /// Propagates session read and classification failures.
    pub fn session_classification_table(&self, version: Option<&str>) -> Result<RecordBatch> {
        self.tagger.classification_table(version)
    }

    /// Attach the classification columns for `version` to `batch`.
    ///
    /// # Errors
    ///
    /// Propagates key-synthesis and classification failures.
    pub fn add_classification_columns(
        &self,
        batch: &RecordBatch,
        version: Option<&str>,
    ) -> Result<RecordBatch> {
        self.tagger.add_classification_columns(batch, version)
    }
}
