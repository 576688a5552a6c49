//! Per-file reconciliation
//!
//! Orchestrates one file's verification: detect the candidate type, select
//! the applicable analyzers, run them concurrently, then fold their outputs
//! serially: important-set union, record merge, post-hoc capability check,
//! well-formedness aggregation, grading. Analyzer runs share nothing and may
//! overlap freely; the accumulator is owned exclusively by the fold.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use tokio::io::AsyncReadExt;
use tracing::{debug, info, warn};
use uuid::Uuid;
use wellform_common::fields::field;
use wellform_common::{FieldValue, MergedFile, StreamRecord, ToleratedValues};

use crate::capability::CapabilityRegistry;
use crate::detect::{self, Detection};
use crate::error::{Error, Result};
use crate::grade;
use crate::merge::{merge, ImportantFields};
use crate::report::{self, AnalyzerReport, FileReport};
use crate::types::{Analyzer, AnalyzerOutput, AnalyzerRun, ScanContext, WellFormed};
use crate::wellformed;

/// The verification engine for one analyzer set
pub struct Reconciler {
    registry: CapabilityRegistry,
    tolerated: ToleratedValues,
}

impl Reconciler {
    /// Engine over `analyzers` with the default tolerated-value set
    pub fn new(analyzers: Vec<Arc<dyn Analyzer>>) -> Self {
        Self::with_tolerated(analyzers, ToleratedValues::default())
    }

    /// Engine with a custom tolerated ("lose") set
    pub fn with_tolerated(analyzers: Vec<Arc<dyn Analyzer>>, tolerated: ToleratedValues) -> Self {
        Self {
            registry: CapabilityRegistry::new(analyzers),
            tolerated,
        }
    }

    /// Verify one file and produce its report
    ///
    /// # Errors
    /// Fails on I/O problems reading the file itself and on an unresolved
    /// merge conflict (a configuration defect between analyzers). An
    /// unsupported file type is not an error: it yields a `Fail` verdict in
    /// the report.
    pub async fn scan_file(&self, path: &Path, full_check: bool) -> Result<FileReport> {
        let metadata = tokio::fs::metadata(path).await?;
        let header = read_header(path).await?;
        let detection = detect::detect(path, &header);

        info!(
            path = %path.display(),
            mimetype = %detection.mimetype,
            version = ?detection.version,
            full_check = full_check,
            "Scanning file"
        );

        let ctx = ScanContext {
            file_path: path.to_path_buf(),
            file_size: metadata.len(),
            mimetype: detection.mimetype.clone(),
            version: detection.version.clone(),
            full_check,
            header,
        };

        let selected = self.registry.select(
            &detection.mimetype,
            detection.version.as_deref(),
            full_check,
        );
        debug!(
            count = selected.len(),
            analyzers = ?selected.iter().map(|a| a.name()).collect::<Vec<_>>(),
            "Selected analyzers"
        );

        let runs = join_all(selected.iter().map(|a| run_analyzer(a.as_ref(), &ctx))).await;

        let important = self.union_important(&runs)?;

        // Serial fold; the accumulator is owned here and nowhere else.
        let mut merged = MergedFile::new();
        for run in &runs {
            merged = merge(&merged, &run.output.streams, &self.tolerated, &important)?;
        }
        fill_container_defaults(&mut merged, &detection);

        let (mimetype, version) = resolved_type(&merged, &detection);
        let mut errors = Vec::new();

        // Post-hoc capability check against the reconciled type: analyzers
        // that turned out not to cover it lose their vote.
        let mut signals = Vec::new();
        let mut analyzer_reports = Vec::new();
        for (analyzer, run) in selected.iter().zip(&runs) {
            let mut entry = AnalyzerReport::from_run(run);
            if analyzer
                .capabilities()
                .supports(&mimetype, version.as_text(), full_check)
            {
                signals.push(run.output.well_formed);
            } else {
                warn!(
                    analyzer = run.name,
                    mimetype = %mimetype,
                    "Analyzer does not support the reconciled type"
                );
                entry.errors.push(format!(
                    "MIME type {} not supported by this analyzer",
                    mimetype
                ));
            }
            analyzer_reports.push(entry);
        }

        let mut well_formed = wellformed::aggregate(signals);

        if !self.registry.any_supports(&mimetype, version.as_text()) {
            let unsupported = Error::UnsupportedType {
                mimetype: mimetype.clone(),
                version: version.as_wire().to_string(),
            };
            info!(path = %path.display(), "{unsupported}");
            errors.push(unsupported.to_string());
            well_formed = WellFormed::Fail;
        }

        let charsets: Vec<FieldValue> = merged
            .iter()
            .filter_map(|(_, record)| record.get(field::CHARSET).cloned())
            .collect();
        let graded = grade::grade(&mimetype, &version, &charsets);

        let sha256 = report::sha256_file(path)?;

        Ok(FileReport {
            scan_id: Uuid::new_v4(),
            path: path.display().to_string(),
            file_size: metadata.len(),
            sha256,
            scanned_at: Utc::now(),
            mimetype,
            version,
            well_formed,
            grade: graded,
            streams: merged,
            analyzers: analyzer_reports,
            errors,
        })
    }

    /// Union of the analyzers' important-field declarations
    ///
    /// Two runs declaring different non-tolerated values for the same field
    /// cannot be reconciled deterministically; that is a configuration
    /// defect and fails loudly before any merging happens.
    fn union_important(&self, runs: &[AnalyzerRun]) -> Result<ImportantFields> {
        let mut union = ImportantFields::new();
        for run in runs {
            for (name, value) in &run.output.important {
                let existing = union.get(name).cloned();
                match existing {
                    None => {
                        union.insert(name.clone(), value.clone());
                    }
                    Some(ref current) if current == value => {}
                    Some(_) if self.tolerated.contains(value) => {
                        debug!(field = %name, "Ignoring tolerated important value");
                    }
                    Some(ref current) if self.tolerated.contains(current) => {
                        union.insert(name.clone(), value.clone());
                    }
                    Some(current) => {
                        return Err(Error::MergeConflict {
                            field: name.clone(),
                            current,
                            incoming: value.clone(),
                        });
                    }
                }
            }
        }
        Ok(union)
    }
}

/// Run one analyzer, converting any internal failure at the boundary
///
/// A failed analyzer contributes an empty record set and an unknown signal
/// plus its error text, never a merge failure.
async fn run_analyzer(analyzer: &dyn Analyzer, ctx: &ScanContext) -> AnalyzerRun {
    let name = analyzer.name();
    match analyzer.analyze(ctx).await {
        Ok(output) => AnalyzerRun { name, output },
        Err(e) => {
            warn!(analyzer = name, error = %e, "Analyzer failed");
            let mut output = AnalyzerOutput::empty();
            output.errors.push(e.to_string());
            AnalyzerRun { name, output }
        }
    }
}

/// Read the leading bytes used for detection and header-based analyzers
async fn read_header(path: &Path) -> Result<Vec<u8>> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut buf = vec![0u8; ScanContext::HEADER_LEN];
    let mut filled = 0;
    loop {
        let n = file.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
        if filled == buf.len() {
            break;
        }
    }
    buf.truncate(filled);
    Ok(buf)
}

/// Fill stream 0 type fields from the detector where analyzers left gaps
///
/// The detector's guess is a fallback only: it fills absent or unavailable
/// values and never competes with an analyzer determination.
fn fill_container_defaults(merged: &mut MergedFile, detection: &Detection) {
    if merged.container().is_none() {
        merged.insert_stream(0, StreamRecord::new());
    }
    let Some(container) = merged.stream_mut(0) else {
        return;
    };

    let fill = |record: &mut StreamRecord, name: &str, value: Option<&str>| {
        let missing = match record.get(name) {
            None => true,
            Some(v) => v.is_unavailable(),
        };
        if missing {
            match value {
                Some(v) => record.insert(name, v),
                None => record.insert(name, FieldValue::Unavailable),
            }
        }
    };

    fill(container, field::MIMETYPE, Some(&detection.mimetype));
    fill(container, field::VERSION, detection.version.as_deref());
}

/// The reconciled (mimetype, version) of the container stream
fn resolved_type(merged: &MergedFile, detection: &Detection) -> (String, FieldValue) {
    let container = merged.container();
    let mimetype = container
        .and_then(|r| r.get(field::MIMETYPE))
        .and_then(|v| v.as_text())
        .unwrap_or(&detection.mimetype)
        .to_string();
    let version = container
        .and_then(|r| r.get(field::VERSION))
        .cloned()
        .unwrap_or(FieldValue::Unavailable);
    (mimetype, version)
}
