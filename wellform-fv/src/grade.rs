//! Preservation grading
//!
//! Maps the final reconciled (mimetype, version[, charset]) of a file to a
//! suitability grade for long-term preservation. Grades come from two static
//! lookup tables: a generic one keyed by (mimetype, version), and a text one
//! that additionally constrains every stream's character encoding to a small
//! allow-list. A lookup miss is never an error; an unrecognized combination
//! grades as unacceptable.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::debug;
use wellform_common::FieldValue;

/// Ordered preservation suitability levels
///
/// Ordering is ascending suitability, so `max`/comparisons read naturally:
/// `Recommended` is the best outcome, `Unacceptable` the floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Grade {
    /// Not suitable for preservation
    Unacceptable,
    /// Acceptable for preservation
    Acceptable,
    /// Only bit-level preservation is possible
    BitLevel,
    /// Bit-level preservation with a recommended migration target
    BitLevelWithRecommended,
    /// Recommended preservation format
    Recommended,
}

/// Character encodings accepted for text formats
static ALLOWED_CHARSETS: Lazy<HashSet<&'static str>> =
    Lazy::new(|| ["UTF-8", "UTF-16", "UTF-32", "ISO-8859-15"].into());

/// Generic (mimetype, version) grade table
static GENERIC_GRADES: Lazy<HashMap<(&'static str, &'static str), Grade>> = Lazy::new(|| {
    use Grade::*;
    let mut t = HashMap::new();

    for profile in ["A-1a", "A-1b", "A-2a", "A-2b", "A-2u", "A-3a", "A-3b"] {
        t.insert(("application/pdf", profile), Recommended);
    }
    for version in ["1.2", "1.3", "1.4", "1.5", "1.6", "1.7"] {
        t.insert(("application/pdf", version), Acceptable);
    }

    t.insert(("audio/x-wav", "(:unap)"), Recommended);
    t.insert(("audio/x-wav", "2"), Recommended);
    t.insert(("audio/flac", "(:unap)"), Recommended);
    t.insert(("image/png", "1.2"), Recommended);
    t.insert(("image/tiff", "6.0"), Recommended);

    for version in ["1.00", "1.01", "1.02"] {
        t.insert(("image/jpeg", version), Acceptable);
    }
    t.insert(("video/mp4", "(:unap)"), Acceptable);
    t.insert(("audio/ogg", "(:unap)"), Acceptable);

    t.insert(("audio/mpeg", "1"), BitLevelWithRecommended);
    t.insert(("audio/mpeg", "2"), BitLevelWithRecommended);

    t.insert(("audio/x-ms-wma", "9"), BitLevel);
    t.insert(("video/x-ms-wmv", "9"), BitLevel);

    t
});

/// Text (mimetype, version) grade table; entries here additionally require
/// every stream charset to be in [`ALLOWED_CHARSETS`]
static TEXT_GRADES: Lazy<HashMap<(&'static str, &'static str), Grade>> = Lazy::new(|| {
    use Grade::*;
    let mut t = HashMap::new();

    t.insert(("text/plain", "(:unap)"), Recommended);
    t.insert(("text/csv", "(:unap)"), Recommended);
    t.insert(("text/xml", "1.0"), Recommended);
    t.insert(("text/xml", "1.1"), Recommended);
    t.insert(("application/xhtml+xml", "1.0"), Recommended);
    t.insert(("application/xhtml+xml", "1.1"), Recommended);
    for version in ["4.01", "5.0", "5.1", "5.2"] {
        t.insert(("text/html", version), Recommended);
    }

    t
});

/// Is `mimetype` graded through the text table (and thus charset-constrained)?
pub fn is_text_format(mimetype: &str) -> bool {
    TEXT_GRADES.keys().any(|(m, _)| *m == mimetype)
}

/// Is `charset` on the preservation allow-list?
pub fn charset_allowed(charset: &str) -> bool {
    ALLOWED_CHARSETS.contains(charset.to_ascii_uppercase().as_str())
}

/// Grade a reconciled file
///
/// `version` is the reconciled container version in field-value form, so the
/// sentinels participate in the lookup the same way they appear in reports.
/// `charsets` are the resolved charsets of every stream; they only matter for
/// text formats. An unknown (mimetype, version) pair grades `Unacceptable`.
pub fn grade(mimetype: &str, version: &FieldValue, charsets: &[FieldValue]) -> Grade {
    let version_key = version.as_wire();

    let graded = if is_text_format(mimetype) {
        let table_grade = TEXT_GRADES
            .get(&(mimetype, version_key))
            .copied()
            .unwrap_or(Grade::Unacceptable);

        let bad_charset = charsets.iter().any(|cs| match cs.as_text() {
            Some(name) => !charset_allowed(name),
            // A sentinel charset on a text stream is itself disqualifying.
            None => true,
        });

        if bad_charset {
            Grade::Unacceptable
        } else {
            table_grade
        }
    } else {
        GENERIC_GRADES
            .get(&(mimetype, version_key))
            .copied()
            .unwrap_or(Grade::Unacceptable)
    };

    debug!(
        mimetype = mimetype,
        version = version_key,
        grade = ?graded,
        "Graded file"
    );

    graded
}
