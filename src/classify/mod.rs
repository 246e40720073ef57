//! Session classification
//!
//! Derives the per-session boolean tags describing experimental conditions:
//!
//! - `is_ephys`: electrophysiology recording present
//! - `is_templeton`: alternate cohort/site
//! - `is_training`: training-only session
//! - `is_dynamic_routing`: main task-switching paradigm
//! - `is_opto`: optogenetic manipulation present
//!
//! Two derivation strategies sit behind the [`FlagStrategy`] trait: one
//! reads each session's keyword set, the other checks membership in
//! precomputed session-ID sets. The variants disagree on `is_training`
//! (independent keyword check vs `!is_ephys`); both are kept as written
//! rather than silently merged. `is_dynamic_routing = !is_templeton`
//! everywhere.

mod tagger;

pub use tagger::{FlagsTable, SessionTagger};

use crate::{Result, SessionId};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

/// Derived boolean classification flags for one session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionFlags {
    /// Electrophysiology recording present
    pub is_ephys: bool,
    /// Alternate cohort/site
    pub is_templeton: bool,
    /// Training-only session
    pub is_training: bool,
    /// Main task-switching paradigm
    pub is_dynamic_routing: bool,
    /// Optogenetic manipulation present
    pub is_opto: bool,
}

impl SessionFlags {
    /// Column names of the flags, in the order they are appended to tables.
    pub const COLUMNS: [&'static str; 5] = [
        "is_ephys",
        "is_templeton",
        "is_training",
        "is_dynamic_routing",
        "is_opto",
    ];

    /// Value of the flag named `column`, or `None` for unknown names.
    #[must_use]
    pub fn value(&self, column: &str) -> Option<bool> {
        match column {
            "is_ephys" => Some(self.is_ephys),
            "is_templeton" => Some(self.is_templeton),
            "is_training" => Some(self.is_training),
            "is_dynamic_routing" => Some(self.is_dynamic_routing),
            "is_opto" => Some(self.is_opto),
            _ => None,
        }
    }
}

/// A rule mapping one raw session record to its classification flags.
pub trait FlagStrategy: Send + Sync {
    /// Classify the session identified by `session_id` carrying `keywords`.
    ///
    /// # Errors
    ///
    /// Strategy-specific validation failures, e.g. a malformed identifier.
    fn classify(&self, session_id: &str, keywords: &[String]) -> Result<SessionFlags>;
}

/// Keyword-based classification: each flag is a membership test on the
/// session's keyword set, except `is_dynamic_routing = !is_templeton`.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordStrategy;

impl FlagStrategy for KeywordStrategy {
    fn classify(&self, _session_id: &str, keywords: &[String]) -> Result<SessionFlags> {
        let mut flags = SessionFlags::default();
        for keyword in keywords {
            match keyword.as_str() {
                "ephys" => flags.is_ephys = true,
                "Templeton" => flags.is_templeton = true,
                "training" => flags.is_training = true,
                "opto" => flags.is_opto = true,
                _ => {}
            }
        }
        flags.is_dynamic_routing = !flags.is_templeton;
        Ok(flags)
    }
}

/// Set-membership classification against precomputed ephys/templeton
/// session-ID sets (obtained from an external lookup service).
///
/// `is_training` and `is_dynamic_routing` are the complements of `is_ephys`
/// and `is_templeton`. The ID sets carry no opto information, so `is_opto`
/// is always false under this strategy.
#[derive(Debug, Clone, Default)]
pub struct MembershipStrategy {
    ephys_sessions: FxHashSet<String>,
    templeton_sessions: FxHashSet<String>,
}

impl MembershipStrategy {
    /// Build a strategy from the two precomputed session-ID sets.
    #[must_use]
    pub fn new(
        ephys_sessions: impl IntoIterator<Item = String>,
        templeton_sessions: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            ephys_sessions: ephys_sessions.into_iter().collect(),
            templeton_sessions: templeton_sessions.into_iter().collect(),
        }
    }
}

impl FlagStrategy for MembershipStrategy {
    fn classify(&self, session_id: &str, _keywords: &[String]) -> Result<SessionFlags> {
        // The identifier must decompose into subject/date/index before any
        // set lookup; a malformed id here is a data bug worth surfacing.
        SessionId::parse(session_id)?;

        let is_ephys = self.ephys_sessions.contains(session_id);
        let is_templeton = self.templeton_sessions.contains(session_id);
        Ok(SessionFlags {
            is_ephys,
            is_templeton,
            is_training: !is_ephys,
            is_dynamic_routing: !is_templeton,
            is_opto: false,
        })
    }
}
