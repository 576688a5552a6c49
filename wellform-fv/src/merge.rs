//! Stream-record merging
//!
//! Folds the per-stream records independently produced by each analyzer into
//! one authoritative record per stream. The fold is serial and the merge is
//! pure: inputs are never mutated, and a conflict aborts the whole call
//! before any partial result becomes visible.
//!
//! Field conflict resolution, in order:
//! 1. An incoming field that is missing or unavailable leaves the current
//!    value alone.
//! 2. A current value in the tolerated ("lose") set is overwritten by the
//!    incoming value unconditionally.
//! 3. A field with a non-tolerated important declaration resolves to the
//!    important value.
//! 4. An incoming value equal to the current one, or itself tolerated,
//!    keeps the current value.
//! 5. Anything else is an unresolved conflict and fails the merge.

use std::collections::BTreeMap;
use tracing::trace;
use wellform_common::{FieldValue, MergedFile, StreamRecord, ToleratedValues};

use crate::error::{Error, Result};

/// Important-field declarations accumulated across analyzer runs
pub type ImportantFields = BTreeMap<String, FieldValue>;

/// Merge one analyzer's stream records into the accumulated per-file map
///
/// Returns a new [`MergedFile`]; `current` and `incoming` are left untouched.
/// Stream indices present in only one input are adopted as-is; indices
/// present in both are merged field by field.
///
/// # Errors
/// [`Error::MergeConflict`] on the first field with two different values that
/// neither the tolerated set nor an important declaration can resolve. No
/// partial merge is observable on failure.
pub fn merge(
    current: &MergedFile,
    incoming: &BTreeMap<u32, StreamRecord>,
    tolerated: &ToleratedValues,
    important: &ImportantFields,
) -> Result<MergedFile> {
    if current.is_empty() {
        return Ok(incoming.iter().map(|(i, r)| (*i, r.clone())).collect());
    }

    let mut result = MergedFile::new();

    for (index, record) in current.iter() {
        let merged = match incoming.get(index) {
            Some(inc) => merge_record(*index, record, inc, tolerated, important)?,
            None => record.clone(),
        };
        result.insert_stream(*index, merged);
    }

    for (index, record) in incoming {
        if current.stream(*index).is_none() {
            result.insert_stream(*index, record.clone());
        }
    }

    Ok(result)
}

/// Merge two records for the same stream index, field by field
fn merge_record(
    index: u32,
    current: &StreamRecord,
    incoming: &StreamRecord,
    tolerated: &ToleratedValues,
    important: &ImportantFields,
) -> Result<StreamRecord> {
    let mut result = StreamRecord::new();

    for (name, cur_val) in current.iter() {
        let resolved = match incoming.get(name) {
            None => cur_val.clone(),
            Some(inc_val) if inc_val.is_unavailable() => cur_val.clone(),
            Some(inc_val) => {
                if tolerated.contains(cur_val) {
                    trace!(stream = index, field = %name, "tolerated value overwritten");
                    inc_val.clone()
                } else if let Some(imp_val) =
                    important.get(name).filter(|v| !tolerated.contains(v))
                {
                    imp_val.clone()
                } else if inc_val == cur_val || tolerated.contains(inc_val) {
                    cur_val.clone()
                } else {
                    return Err(Error::MergeConflict {
                        field: name.clone(),
                        current: cur_val.clone(),
                        incoming: inc_val.clone(),
                    });
                }
            }
        };
        result.insert(name.clone(), resolved);
    }

    for (name, inc_val) in incoming.iter() {
        if !current.contains_field(name) {
            result.insert(name.clone(), inc_val.clone());
        }
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wellform_common::fields::field;

    fn streams(records: &[(u32, StreamRecord)]) -> BTreeMap<u32, StreamRecord> {
        records.iter().cloned().collect()
    }

    fn pdf_container(version: &str) -> StreamRecord {
        StreamRecord::new()
            .with(field::MIMETYPE, "application/pdf")
            .with(field::VERSION, version)
    }

    #[test]
    fn test_merge_into_empty_copies_incoming() {
        let incoming = streams(&[(0, pdf_container("1.4"))]);
        let merged = merge(
            &MergedFile::new(),
            &incoming,
            &ToleratedValues::default(),
            &ImportantFields::new(),
        )
        .unwrap();

        assert_eq!(merged.len(), 1);
        assert_eq!(merged.container(), incoming.get(&0));
    }

    #[test]
    fn test_merge_with_empty_is_identity() {
        let current: MergedFile = streams(&[(0, pdf_container("1.4"))]).into_iter().collect();
        let merged = merge(
            &current,
            &BTreeMap::new(),
            &ToleratedValues::default(),
            &ImportantFields::new(),
        )
        .unwrap();

        assert_eq!(merged, current);
    }

    #[test]
    fn test_union_of_stream_indices() {
        let current: MergedFile = streams(&[(0, pdf_container("1.4"))]).into_iter().collect();
        let incoming = streams(&[(1, StreamRecord::new().with(field::STREAM_TYPE, "image"))]);

        let merged = merge(
            &current,
            &incoming,
            &ToleratedValues::default(),
            &ImportantFields::new(),
        )
        .unwrap();

        assert_eq!(merged.len(), 2);
        assert!(merged.stream(0).is_some());
        assert!(merged.stream(1).is_some());
    }

    #[test]
    fn test_incoming_unavailable_never_overwrites() {
        let current: MergedFile = streams(&[(0, pdf_container("1.4"))]).into_iter().collect();
        let incoming = streams(&[(
            0,
            StreamRecord::new().with(field::VERSION, FieldValue::Unavailable),
        )]);

        let merged = merge(
            &current,
            &incoming,
            &ToleratedValues::default(),
            &ImportantFields::new(),
        )
        .unwrap();

        assert_eq!(
            merged.container().unwrap().get(field::VERSION),
            Some(&FieldValue::Text("1.4".to_string()))
        );
    }

    #[test]
    fn test_tolerated_current_adopts_incoming() {
        let current: MergedFile = streams(&[(
            0,
            StreamRecord::new().with(field::VERSION, FieldValue::Unavailable),
        )])
        .into_iter()
        .collect();
        let incoming = streams(&[(0, StreamRecord::new().with(field::VERSION, "1.4"))]);

        let merged = merge(
            &current,
            &incoming,
            &ToleratedValues::default(),
            &ImportantFields::new(),
        )
        .unwrap();

        assert_eq!(
            merged.container().unwrap().get(field::VERSION),
            Some(&FieldValue::Text("1.4".to_string()))
        );
    }

    #[test]
    fn test_tolerated_current_adopts_even_another_tolerated_value() {
        // Both values sit in the lose set; the incoming one still wins.
        let mut tolerated = ToleratedValues::default();
        tolerated.insert("application/octet-stream");

        let current: MergedFile = streams(&[(
            0,
            StreamRecord::new().with(field::MIMETYPE, "application/octet-stream"),
        )])
        .into_iter()
        .collect();
        let incoming = streams(&[(
            0,
            StreamRecord::new().with(field::MIMETYPE, FieldValue::Text(String::new())),
        )]);

        let merged = merge(&current, &incoming, &tolerated, &ImportantFields::new()).unwrap();
        assert_eq!(
            merged.container().unwrap().get(field::MIMETYPE),
            Some(&FieldValue::Text(String::new()))
        );
    }

    #[test]
    fn test_incoming_tolerated_keeps_current() {
        let current: MergedFile = streams(&[(0, pdf_container("1.4"))]).into_iter().collect();
        let incoming = streams(&[(
            0,
            StreamRecord::new().with(field::VERSION, FieldValue::Text(String::new())),
        )]);

        let merged = merge(
            &current,
            &incoming,
            &ToleratedValues::default(),
            &ImportantFields::new(),
        )
        .unwrap();

        assert_eq!(
            merged.container().unwrap().get(field::VERSION),
            Some(&FieldValue::Text("1.4".to_string()))
        );
    }

    #[test]
    fn test_important_value_wins_in_either_order() {
        let important: ImportantFields =
            [(field::VERSION.to_string(), FieldValue::Text("A-1a".into()))]
                .into_iter()
                .collect();
        let tolerated = ToleratedValues::default();

        let generic = streams(&[(0, pdf_container("1.4"))]);
        let authoritative = streams(&[(0, pdf_container("A-1a"))]);

        // Authoritative analyzer first
        let mut acc = merge(&MergedFile::new(), &authoritative, &tolerated, &important).unwrap();
        acc = merge(&acc, &generic, &tolerated, &important).unwrap();
        assert_eq!(
            acc.container().unwrap().get(field::VERSION),
            Some(&FieldValue::Text("A-1a".to_string()))
        );

        // Generic analyzer first
        let mut acc = merge(&MergedFile::new(), &generic, &tolerated, &important).unwrap();
        acc = merge(&acc, &authoritative, &tolerated, &important).unwrap();
        assert_eq!(
            acc.container().unwrap().get(field::VERSION),
            Some(&FieldValue::Text("A-1a".to_string()))
        );
    }

    #[test]
    fn test_tolerated_important_value_does_not_override() {
        // An important declaration whose value is itself a placeholder is
        // ignored; equal values then merge cleanly.
        let important: ImportantFields =
            [(field::VERSION.to_string(), FieldValue::Unavailable)]
                .into_iter()
                .collect();

        let current: MergedFile = streams(&[(0, pdf_container("1.4"))]).into_iter().collect();
        let incoming = streams(&[(0, pdf_container("1.4"))]);

        let merged = merge(&current, &incoming, &ToleratedValues::default(), &important).unwrap();
        assert_eq!(
            merged.container().unwrap().get(field::VERSION),
            Some(&FieldValue::Text("1.4".to_string()))
        );
    }

    #[test]
    fn test_order_independence_for_conflict_free_inputs() {
        let tolerated = ToleratedValues::default();
        let important = ImportantFields::new();

        let a = streams(&[(
            0,
            StreamRecord::new()
                .with(field::MIMETYPE, "audio/x-wav")
                .with(field::VERSION, FieldValue::Unavailable),
        )]);
        let b = streams(&[
            (
                0,
                StreamRecord::new()
                    .with(field::MIMETYPE, "audio/x-wav")
                    .with(field::VERSION, "2"),
            ),
            (1, StreamRecord::new().with(field::STREAM_TYPE, "audio")),
        ]);

        let ab = merge(
            &merge(&MergedFile::new(), &a, &tolerated, &important).unwrap(),
            &b,
            &tolerated,
            &important,
        )
        .unwrap();
        let ba = merge(
            &merge(&MergedFile::new(), &b, &tolerated, &important).unwrap(),
            &a,
            &tolerated,
            &important,
        )
        .unwrap();

        assert_eq!(ab, ba);
    }

    #[test]
    fn test_genuine_conflict_fails_loudly() {
        let current: MergedFile = streams(&[(0, pdf_container("1.4"))]).into_iter().collect();
        let incoming = streams(&[(0, pdf_container("1.7"))]);

        let err = merge(
            &current,
            &incoming,
            &ToleratedValues::default(),
            &ImportantFields::new(),
        )
        .unwrap_err();

        match err {
            Error::MergeConflict {
                field,
                current,
                incoming,
            } => {
                assert_eq!(field, "version");
                assert_eq!(current, FieldValue::Text("1.4".to_string()));
                assert_eq!(incoming, FieldValue::Text("1.7".to_string()));
            }
            other => panic!("expected MergeConflict, got {other:?}"),
        }
    }

    #[test]
    fn test_conflict_leaves_accumulator_untouched() {
        let current: MergedFile = streams(&[(0, pdf_container("1.4"))]).into_iter().collect();
        let snapshot = current.clone();
        let incoming = streams(&[(0, pdf_container("1.7"))]);

        let _ = merge(
            &current,
            &incoming,
            &ToleratedValues::default(),
            &ImportantFields::new(),
        );

        assert_eq!(current, snapshot);
    }

    #[test]
    fn test_unapplicable_agrees_with_unapplicable() {
        let current: MergedFile = streams(&[(
            0,
            StreamRecord::new().with(field::VERSION, FieldValue::Unapplicable),
        )])
        .into_iter()
        .collect();
        let incoming = streams(&[(
            0,
            StreamRecord::new().with(field::VERSION, FieldValue::Unapplicable),
        )]);

        let merged = merge(
            &current,
            &incoming,
            &ToleratedValues::default(),
            &ImportantFields::new(),
        )
        .unwrap();

        assert_eq!(
            merged.container().unwrap().get(field::VERSION),
            Some(&FieldValue::Unapplicable)
        );
    }

    #[test]
    fn test_fields_only_in_incoming_are_added() {
        let current: MergedFile = streams(&[(0, pdf_container("1.4"))]).into_iter().collect();
        let incoming = streams(&[(
            0,
            StreamRecord::new().with(field::CHARSET, "UTF-8"),
        )]);

        let merged = merge(
            &current,
            &incoming,
            &ToleratedValues::default(),
            &ImportantFields::new(),
        )
        .unwrap();

        let container = merged.container().unwrap();
        assert_eq!(container.len(), 3);
        assert_eq!(
            container.get(field::CHARSET),
            Some(&FieldValue::Text("UTF-8".to_string()))
        );
    }
}
