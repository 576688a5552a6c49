//! End-to-end scan tests
//!
//! Drive the full engine (detection, analyzer selection, reconciliation,
//! grading) over synthesized fixture files.

use std::io::Write;
use tempfile::NamedTempFile;

use wellform_common::fields::field;
use wellform_common::FieldValue;
use wellform_fv::analyzers::default_analyzers;
use wellform_fv::{Grade, Reconciler, WellFormed};

fn engine() -> Reconciler {
    Reconciler::new(default_analyzers())
}

fn fixture_with_suffix(suffix: &str, content: &[u8]) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content).unwrap();
    file.flush().unwrap();
    file
}

/// Synthesize a one-second mono WAV file
fn wav_fixture() -> NamedTempFile {
    let file = tempfile::Builder::new().suffix(".wav").tempfile().unwrap();
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 44100,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(file.path(), spec).unwrap();
    for t in 0..44100 {
        let sample = (t as f32 / 44100.0 * 440.0 * 2.0 * std::f32::consts::PI).sin();
        writer.write_sample((sample * i16::MAX as f32) as i16).unwrap();
    }
    writer.finalize().unwrap();
    file
}

#[tokio::test]
async fn test_wav_scan_is_recommended() {
    let file = wav_fixture();

    let report = engine().scan_file(file.path(), false).await.unwrap();

    assert_eq!(report.mimetype, "audio/x-wav");
    assert_eq!(report.version, FieldValue::Unapplicable);
    assert_eq!(report.well_formed, WellFormed::Pass);
    assert_eq!(report.grade, Grade::Recommended);

    // Container plus one audio track
    assert_eq!(report.streams.len(), 2);
    let track = report.streams.stream(1).unwrap();
    assert_eq!(
        track.get("sample_rate"),
        Some(&FieldValue::Text("44100".to_string()))
    );
    assert_eq!(
        track.get("channels"),
        Some(&FieldValue::Text("1".to_string()))
    );
}

#[tokio::test]
async fn test_utf8_csv_full_scan_is_recommended() {
    let file = fixture_with_suffix(".csv", b"name,year\nalpha,1999\nbeta,2004\n");

    let report = engine().scan_file(file.path(), true).await.unwrap();

    assert_eq!(report.mimetype, "text/csv");
    assert_eq!(report.well_formed, WellFormed::Pass);
    assert_eq!(report.grade, Grade::Recommended);

    let container = report.streams.container().unwrap();
    assert_eq!(
        container.get(field::CHARSET),
        Some(&FieldValue::Text("UTF-8".to_string()))
    );
    assert_eq!(
        container.get("delimiter"),
        Some(&FieldValue::Text(",".to_string()))
    );
}

#[tokio::test]
async fn test_ragged_csv_fails_full_verification() {
    let file = fixture_with_suffix(".csv", b"a,b,c\n1,2\n");

    let report = engine().scan_file(file.path(), true).await.unwrap();

    assert_eq!(report.well_formed, WellFormed::Fail);
    let csv_entry = report
        .analyzers
        .iter()
        .find(|a| a.name == "CsvAnalyzer")
        .unwrap();
    assert!(csv_entry.errors.iter().any(|e| e.contains("record 2")));
}

#[tokio::test]
async fn test_ragged_csv_passes_without_full_verification() {
    // The structural analyzer is full-only; a plain scan never sees the
    // inconsistency.
    let file = fixture_with_suffix(".csv", b"a,b,c\n1,2\n");

    let report = engine().scan_file(file.path(), false).await.unwrap();

    assert_eq!(report.well_formed, WellFormed::Pass);
}

#[tokio::test]
async fn test_legacy_encoding_text_grades_unacceptable() {
    let file = fixture_with_suffix(".txt", b"caf\xe9 au lait\n");

    let report = engine().scan_file(file.path(), false).await.unwrap();

    // Still a readable text file, but the charset cannot be named and text
    // grading requires an approved encoding.
    assert_eq!(report.mimetype, "text/plain");
    assert_eq!(report.well_formed, WellFormed::Pass);
    assert_eq!(report.grade, Grade::Unacceptable);
}

#[tokio::test]
async fn test_minimal_pdf_full_scan() {
    let pdf: &[u8] = b"%PDF-1.4\n\
        1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n\
        2 0 obj\n<< /Type /Pages /Kids [] /Count 0 >>\nendobj\n\
        xref\n0 3\n\
        trailer\n<< /Size 3 /Root 1 0 R >>\n\
        startxref\n9\n\
        %%EOF\n";
    let file = fixture_with_suffix(".pdf", pdf);

    let report = engine().scan_file(file.path(), true).await.unwrap();

    assert_eq!(report.mimetype, "application/pdf");
    assert_eq!(report.version, FieldValue::Text("1.4".to_string()));
    assert_eq!(report.well_formed, WellFormed::Pass);
    assert_eq!(report.grade, Grade::Acceptable);
}

#[tokio::test]
async fn test_pdf_without_full_verification_stays_unknown() {
    let file = fixture_with_suffix(".pdf", b"%PDF-1.4\nnot really checked\n");

    let report = engine().scan_file(file.path(), false).await.unwrap();

    // Only identifiers run outside full verification; nobody assessed
    // well-formedness.
    assert_eq!(report.well_formed, WellFormed::Unknown);
    assert_eq!(report.version, FieldValue::Text("1.4".to_string()));
}

#[tokio::test]
async fn test_unknown_binary_is_unsupported_and_fails() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(&[0x00, 0x01, 0x02, 0x03, 0x04]).unwrap();
    file.flush().unwrap();

    let report = engine().scan_file(file.path(), false).await.unwrap();

    assert_eq!(report.mimetype, "application/octet-stream");
    assert_eq!(report.well_formed, WellFormed::Fail);
    assert_eq!(report.grade, Grade::Unacceptable);
    assert!(report
        .errors
        .iter()
        .any(|e| e.contains("no analyzer supports")));
}

#[tokio::test]
async fn test_report_serializes_to_json() {
    let file = fixture_with_suffix(".csv", b"a,b\n1,2\n");

    let report = engine().scan_file(file.path(), false).await.unwrap();
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["mimetype"], "text/csv");
    assert_eq!(json["streams"]["0"]["version"], "(:unap)");
    assert_eq!(json["well_formed"], "pass");
}
