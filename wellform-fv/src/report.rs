//! Verification report model
//!
//! The machine-readable verdict handed to callers: one [`FileReport`] per
//! file with the reconciled per-stream records, the file-level
//! well-formedness verdict, the preservation grade, and per-analyzer
//! diagnostics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::Path;
use uuid::Uuid;
use wellform_common::{FieldValue, MergedFile};

use crate::grade::Grade;
use crate::types::{AnalyzerRun, ToolInfo, WellFormed};

/// Diagnostics for one analyzer that ran
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerReport {
    /// Analyzer name
    pub name: String,
    /// The signal this analyzer contributed
    pub well_formed: WellFormed,
    /// Informational messages
    pub messages: Vec<String>,
    /// Errors, including a post-hoc unsupported-type note when applicable
    pub errors: Vec<String>,
    /// Backing tool info, when the analyzer wraps one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool: Option<ToolInfo>,
}

impl AnalyzerReport {
    /// Diagnostics entry for a completed run
    pub fn from_run(run: &AnalyzerRun) -> Self {
        Self {
            name: run.name.to_string(),
            well_formed: run.output.well_formed,
            messages: run.output.messages.clone(),
            errors: run.output.errors.clone(),
            tool: run.output.tool.clone(),
        }
    }
}

/// Complete verification verdict for one file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileReport {
    /// Unique id of this scan
    pub scan_id: Uuid,
    /// Scanned path as given
    pub path: String,
    /// File size in bytes
    pub file_size: u64,
    /// SHA-256 of the file content, hex
    pub sha256: String,
    /// When the scan ran
    pub scanned_at: DateTime<Utc>,
    /// Reconciled container MIME type
    pub mimetype: String,
    /// Reconciled container version
    pub version: FieldValue,
    /// File-level well-formedness verdict
    pub well_formed: WellFormed,
    /// Preservation suitability grade
    pub grade: Grade,
    /// Reconciled records, one per stream
    pub streams: MergedFile,
    /// Per-analyzer diagnostics in run order
    pub analyzers: Vec<AnalyzerReport>,
    /// File-level errors (unsupported type and the like)
    pub errors: Vec<String>,
}

impl FileReport {
    /// True when nothing marked the file malformed
    pub fn is_sound(&self) -> bool {
        self.well_formed != WellFormed::Fail
    }

    /// One-line human summary
    pub fn summary(&self) -> String {
        format!(
            "{}: {} {} is {:?}, grade {:?}",
            self.path, self.mimetype, self.version, self.well_formed, self.grade
        )
    }
}

/// Hex SHA-256 of a file, read in chunks
pub fn sha256_file(path: &Path) -> std::io::Result<String> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 65536];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}
