//! Core types and trait definitions for the verification engine
//!
//! Defines the boundary between the reconciliation core and the format
//! analyzers: the [`Analyzer`] trait every analyzer implements, the
//! [`ScanContext`] handed to each run, and the [`AnalyzerOutput`] every run
//! yields. Analyzers are independent of each other; each receives the same
//! context and produces its own stream records, which the reconciler folds
//! into one authoritative record map afterwards.

use crate::capability::SupportMatrix;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;
use wellform_common::{FieldValue, StreamRecord};

/// Tri-state well-formedness signal
///
/// `Unknown` means "this analyzer does not assess well-formedness for this
/// file", not "assessment failed".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WellFormed {
    /// No assessment made
    Unknown,
    /// File conforms to the format grammar as far as this analyzer checks
    Pass,
    /// File violates the format grammar
    Fail,
}

impl Default for WellFormed {
    fn default() -> Self {
        WellFormed::Unknown
    }
}

/// Per-file context shared by every analyzer run
///
/// Carries the detector's best-guess type pair and a pre-read header slice so
/// cheap analyzers need not reopen the file.
#[derive(Debug, Clone)]
pub struct ScanContext {
    /// Path to the file under analysis
    pub file_path: PathBuf,
    /// File size in bytes
    pub file_size: u64,
    /// Detector's candidate MIME type (normalized)
    pub mimetype: String,
    /// Detector's candidate version, when it could determine one
    pub version: Option<String>,
    /// Whether full verification was requested for this scan
    pub full_check: bool,
    /// Leading bytes of the file (up to [`ScanContext::HEADER_LEN`])
    pub header: Vec<u8>,
}

impl ScanContext {
    /// Number of leading bytes read into [`ScanContext::header`]
    pub const HEADER_LEN: usize = 8192;
}

/// Version information for the machinery behind an analyzer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    /// Tool or library name
    pub name: String,
    /// Tool or library version
    pub version: String,
}

/// Everything one analyzer run produced for one file
#[derive(Debug, Clone, Default)]
pub struct AnalyzerOutput {
    /// Stream records keyed by stream index (0 = container)
    pub streams: BTreeMap<u32, StreamRecord>,
    /// Well-formedness signal for this run
    pub well_formed: WellFormed,
    /// Fields whose value this analyzer resolves authoritatively
    pub important: BTreeMap<String, FieldValue>,
    /// Free-text informational messages
    pub messages: Vec<String>,
    /// Free-text errors (non-fatal, surfaced in the report)
    pub errors: Vec<String>,
    /// Version info for the backing tool, when known
    pub tool: Option<ToolInfo>,
}

impl AnalyzerOutput {
    /// Output of an analyzer that produced nothing usable
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builder-style stream record insert
    pub fn with_stream(mut self, index: u32, record: StreamRecord) -> Self {
        self.streams.insert(index, record);
        self
    }

    /// Builder-style important-field declaration
    pub fn with_important(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.important.insert(name.into(), value.into());
        self
    }

    /// Builder-style signal assignment
    pub fn with_signal(mut self, signal: WellFormed) -> Self {
        self.well_formed = signal;
        self
    }
}

/// Analyzer-internal error
///
/// Never escapes the analyzer boundary: the reconciler converts a failed run
/// into an empty output with an `Unknown` signal and the error text attached.
#[derive(Debug, Error)]
pub enum AnalyzerError {
    /// I/O error while reading the file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// File content could not be parsed as the expected format
    #[error("Parse error: {0}")]
    Parse(String),

    /// Format is outside what this analyzer handles
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Internal processing error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A format analyzer
///
/// Each analyzer determines structural metadata and/or well-formedness for
/// one format family. Implementations must be side-effect free with respect
/// to each other so the reconciler can run them concurrently.
///
/// # Example
/// ```rust,ignore
/// pub struct PdfAnalyzer { capabilities: SupportMatrix }
///
/// #[async_trait::async_trait]
/// impl Analyzer for PdfAnalyzer {
///     fn name(&self) -> &'static str { "PdfAnalyzer" }
///     fn capabilities(&self) -> &SupportMatrix { &self.capabilities }
///
///     async fn analyze(&self, ctx: &ScanContext) -> Result<AnalyzerOutput, AnalyzerError> {
///         let version = read_header_version(&ctx.header)?;
///         Ok(AnalyzerOutput::empty()
///             .with_stream(0, StreamRecord::new().with("version", version)))
///     }
/// }
/// ```
#[async_trait::async_trait]
pub trait Analyzer: Send + Sync {
    /// Analyzer name for diagnostics and provenance
    fn name(&self) -> &'static str;

    /// Declared (MIME type, version) support of this analyzer
    fn capabilities(&self) -> &SupportMatrix;

    /// Analyze one file
    ///
    /// # Errors
    /// Returns `AnalyzerError` on any internal failure; the caller converts
    /// this into an empty output plus an error message, never a scan abort.
    async fn analyze(&self, ctx: &ScanContext) -> Result<AnalyzerOutput, AnalyzerError>;
}

/// One completed analyzer run, after boundary conversion
#[derive(Debug, Clone)]
pub struct AnalyzerRun {
    /// Name of the analyzer that ran
    pub name: &'static str,
    /// Its (possibly empty) output
    pub output: AnalyzerOutput,
}
