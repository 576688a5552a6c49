//! PDF analyzers
//!
//! Two units for the PDF family:
//!
//! - [`PdfAnalyzer`] reads the header version and nothing else; it is an
//!   identifier and leaves well-formedness unknown.
//! - [`PdfVerifyAnalyzer`] runs only under full verification and checks the
//!   document skeleton: header, object pairs, cross-reference information
//!   and the end-of-file marker.

use crate::capability::{SupportDecl, SupportMatrix};
use crate::detect::pdf_header_version;
use crate::types::{Analyzer, AnalyzerError, AnalyzerOutput, ScanContext, WellFormed};
use tokio::fs;
use tracing::debug;
use wellform_common::fields::field;
use wellform_common::{FieldValue, StreamRecord};

/// Versions the engine recognizes for PDF, plain and archival
const PDF_VERSIONS: [&str; 13] = [
    "1.2", "1.3", "1.4", "1.5", "1.6", "1.7", "A-1a", "A-1b", "A-2a", "A-2b", "A-2u", "A-3a",
    "A-3b",
];

fn pdf_support(full_only: bool) -> SupportMatrix {
    let mut decl = SupportDecl::new().mimetype("application/pdf", &PDF_VERSIONS);
    if full_only {
        decl = decl.full_only();
    }
    SupportMatrix::single(decl)
}

/// Container record shared by both PDF analyzers
fn pdf_container(header: &[u8]) -> StreamRecord {
    let version = match pdf_header_version(header) {
        Some(v) => FieldValue::Text(v),
        None => FieldValue::Unavailable,
    };
    StreamRecord::new()
        .with(field::MIMETYPE, "application/pdf")
        .with(field::VERSION, version)
        .with(field::STREAM_TYPE, "binary")
}

/// Header-only PDF identifier
pub struct PdfAnalyzer {
    capabilities: SupportMatrix,
}

impl PdfAnalyzer {
    pub fn new() -> Self {
        Self {
            capabilities: pdf_support(false),
        }
    }
}

impl Default for PdfAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Analyzer for PdfAnalyzer {
    fn name(&self) -> &'static str {
        "PdfAnalyzer"
    }

    fn capabilities(&self) -> &SupportMatrix {
        &self.capabilities
    }

    async fn analyze(&self, ctx: &ScanContext) -> Result<AnalyzerOutput, AnalyzerError> {
        let record = pdf_container(&ctx.header);
        let mut output = AnalyzerOutput::empty().with_stream(0, record);

        match pdf_header_version(&ctx.header) {
            Some(version) => output.messages.push(format!("header version {version}")),
            None => output.errors.push("missing %PDF header".to_string()),
        }
        output.well_formed = WellFormed::Unknown;
        Ok(output)
    }
}

/// Structural PDF verifier, full verification only
pub struct PdfVerifyAnalyzer {
    capabilities: SupportMatrix,
}

impl PdfVerifyAnalyzer {
    pub fn new() -> Self {
        Self {
            capabilities: pdf_support(true),
        }
    }
}

impl Default for PdfVerifyAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

/// Count non-overlapping occurrences of `needle` in `haystack`
fn count_occurrences(haystack: &[u8], needle: &[u8]) -> usize {
    if needle.is_empty() || haystack.len() < needle.len() {
        return 0;
    }
    let mut count = 0;
    let mut i = 0;
    while i + needle.len() <= haystack.len() {
        if &haystack[i..i + needle.len()] == needle {
            count += 1;
            i += needle.len();
        } else {
            i += 1;
        }
    }
    count
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    count_occurrences(haystack, needle) > 0
}

#[async_trait::async_trait]
impl Analyzer for PdfVerifyAnalyzer {
    fn name(&self) -> &'static str {
        "PdfVerifyAnalyzer"
    }

    fn capabilities(&self) -> &SupportMatrix {
        &self.capabilities
    }

    async fn analyze(&self, ctx: &ScanContext) -> Result<AnalyzerOutput, AnalyzerError> {
        let content = fs::read(&ctx.file_path).await?;
        let mut output = AnalyzerOutput::empty().with_stream(0, pdf_container(&ctx.header));
        let mut errors = Vec::new();

        if pdf_header_version(&content).is_none() {
            errors.push("missing %PDF header".to_string());
        }

        // The end-of-file marker must sit near the end of the document.
        let tail = &content[content.len().saturating_sub(1024)..];
        if !contains(tail, b"%%EOF") {
            errors.push("missing %%EOF marker".to_string());
        }

        if !contains(&content, b"startxref") {
            errors.push("missing startxref".to_string());
        }
        if !contains(&content, b"xref") && !contains(&content, b"/Type /XRef") {
            errors.push("missing cross-reference information".to_string());
        }

        // endobj occurrences also match inside "obj" counting, so count the
        // delimited forms.
        let obj_count = count_occurrences(&content, b" obj");
        let endobj_count = count_occurrences(&content, b"endobj");
        if obj_count == 0 {
            errors.push("no indirect objects".to_string());
        } else if obj_count != endobj_count {
            errors.push(format!(
                "unbalanced objects: {obj_count} obj / {endobj_count} endobj"
            ));
        }

        debug!(
            path = %ctx.file_path.display(),
            objects = obj_count,
            errors = errors.len(),
            "PDF structure check"
        );

        if errors.is_empty() {
            output.well_formed = WellFormed::Pass;
            output
                .messages
                .push(format!("{obj_count} indirect objects"));
        } else {
            output.well_formed = WellFormed::Fail;
            output.errors = errors;
        }
        Ok(output)
    }
}
