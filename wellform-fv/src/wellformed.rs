//! Well-formedness aggregation
//!
//! Each analyzer run contributes one tri-state signal; the file-level
//! verdict is the fold of all of them. A `Fail` from anyone is a file-level
//! `Fail`; `Pass` requires at least one positive assessment and no negative
//! one; a file nobody assessed stays `Unknown`.

use crate::types::WellFormed;

/// Fold per-analyzer signals into the file-level verdict
///
/// Skipped analyzers contribute nothing; callers simply leave them out of
/// the iterator, which is equivalent to `Unknown`.
pub fn aggregate(signals: impl IntoIterator<Item = WellFormed>) -> WellFormed {
    let mut verdict = WellFormed::Unknown;
    for signal in signals {
        match signal {
            WellFormed::Fail => return WellFormed::Fail,
            WellFormed::Pass => verdict = WellFormed::Pass,
            WellFormed::Unknown => {}
        }
    }
    verdict
}
