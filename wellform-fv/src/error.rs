//! Error types for the verification engine

use thiserror::Error;
use wellform_common::FieldValue;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Engine error type
///
/// `MergeConflict` is the loud one: two analyzers disagreeing on a field
/// neither declares important nor tolerated is a configuration defect, and
/// reconciliation of that file aborts rather than guessing a side.
#[derive(Debug, Error)]
pub enum Error {
    /// Unresolvable field conflict between two analyzer determinations
    #[error("conflicting values for field '{field}': '{current}' vs '{incoming}'")]
    MergeConflict {
        /// Field the analyzers disagree on
        field: String,
        /// Value already reconciled
        current: FieldValue,
        /// Value the losing analyzer produced
        incoming: FieldValue,
    },

    /// Final reconciled type is not covered by any registered analyzer
    #[error("no analyzer supports {mimetype} (version {version})")]
    UnsupportedType {
        /// Reconciled MIME type
        mimetype: String,
        /// Reconciled version (wire form)
        version: String,
    },

    /// Format detection failed outright
    #[error("Detection error: {0}")]
    Detection(String),

    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Shared error from wellform-common
    #[error("Common error: {0}")]
    Common(#[from] wellform_common::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
