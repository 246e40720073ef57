//! Session identifiers
//!
//! A session is one recorded experimental run, identified by subject, date
//! and an index disambiguating multiple runs per day. The composite key
//! joins the three components with `_`:
//!
//! ```text
//! 660023_2023-08-09_0
//! ```
//!
//! The `-` separators inside the date are part of the date component; only
//! `_` delimits components.

use crate::{Error, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Separator between the components of a session key.
pub const KEY_SEPARATOR: char = '_';

/// Synthesize the composite session key from its raw parts.
///
/// Deterministic: the same triple always yields the same key. No validation
/// is performed; use [`SessionId::parse`] when the parts come from an
/// untrusted identifier.
#[must_use]
pub fn session_key(subject_id: &str, date: &str, session_idx: u32) -> String {
    format!("{subject_id}{KEY_SEPARATOR}{date}{KEY_SEPARATOR}{session_idx}")
}

/// Validated composite session identifier.
///
/// Parsing requires exactly three `_`-separated components, a `YYYY-MM-DD`
/// date and an unsigned integer index.
///
/// # Example
///
/// ```rust
/// use dr_summary::SessionId;
///
/// let id: SessionId = "660023_2023-08-09_0".parse()?;
/// assert_eq!(id.subject_id(), "660023");
/// assert_eq!(id.session_idx(), 0);
/// assert_eq!(id.to_string(), "660023_2023-08-09_0");
/// # Ok::<(), dr_summary::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId {
    subject_id: String,
    date: NaiveDate,
    session_idx: u32,
}

impl SessionId {
    /// Build a session identifier from already-validated parts.
    #[must_use]
    pub fn new(subject_id: impl Into<String>, date: NaiveDate, session_idx: u32) -> Self {
        Self {
            subject_id: subject_id.into(),
            date,
            session_idx,
        }
    }

    /// Parse and validate a composite session identifier.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedSessionId`] naming the offending identifier
    /// when it does not split into exactly three components, the date is not
    /// `YYYY-MM-DD`, or the index is not an unsigned integer.
    pub fn parse(id: &str) -> Result<Self> {
        let malformed = |reason: String| Error::MalformedSessionId {
            id: id.to_string(),
            reason,
        };

        let parts: Vec<&str> = id.split(KEY_SEPARATOR).collect();
        if parts.len() != 3 {
            return Err(malformed(format!(
                "expected 3 '_'-separated components, found {}",
                parts.len()
            )));
        }

        let date = NaiveDate::parse_from_str(parts[1], "%Y-%m-%d")
            .map_err(|e| malformed(format!("invalid date {:?}: {e}", parts[1])))?;
        let session_idx: u32 = parts[2]
            .parse()
            .map_err(|e| malformed(format!("invalid session index {:?}: {e}", parts[2])))?;

        Ok(Self {
            subject_id: parts[0].to_string(),
            date,
            session_idx,
        })
    }

    /// Subject (mouse) identifier.
    #[must_use]
    pub fn subject_id(&self) -> &str {
        &self.subject_id
    }

    /// Date of the session.
    #[must_use]
    pub const fn date(&self) -> NaiveDate {
        self.date
    }

    /// Index disambiguating multiple sessions per subject per day.
    #[must_use]
    pub const fn session_idx(&self) -> u32 {
        self.session_idx
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}{KEY_SEPARATOR}{}{KEY_SEPARATOR}{}",
            self.subject_id,
            self.date.format("%Y-%m-%d"),
            self.session_idx
        )
    }
}

impl std::str::FromStr for SessionId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
