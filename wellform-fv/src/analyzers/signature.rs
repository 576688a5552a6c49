//! Signature (magic-byte) analyzer
//!
//! Identification only: confirms the container MIME type from the file's
//! leading bytes via `infer` and contributes nothing to well-formedness.
//! Its version field is always unavailable, which makes it a deliberately
//! weak contributor; any format-specific analyzer's version replaces it.

use crate::capability::{SupportDecl, SupportMatrix};
use crate::types::{Analyzer, AnalyzerError, AnalyzerOutput, ScanContext, ToolInfo, WellFormed};
use tracing::debug;
use wellform_common::fields::field;
use wellform_common::{mime, FieldValue, StreamRecord};

/// Magic-byte identification analyzer
pub struct SignatureAnalyzer {
    capabilities: SupportMatrix,
}

impl SignatureAnalyzer {
    pub fn new() -> Self {
        let decl = SupportDecl::new()
            .mimetype("application/pdf", &[])
            .mimetype("audio/x-wav", &[])
            .mimetype("audio/flac", &[])
            .mimetype("audio/ogg", &[])
            .mimetype("audio/mpeg", &[])
            .mimetype("image/png", &[])
            .mimetype("image/jpeg", &[])
            .mimetype("image/tiff", &[])
            .mimetype("video/mp4", &[])
            .any_version();
        Self {
            capabilities: SupportMatrix::single(decl),
        }
    }
}

impl Default for SignatureAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Analyzer for SignatureAnalyzer {
    fn name(&self) -> &'static str {
        "SignatureAnalyzer"
    }

    fn capabilities(&self) -> &SupportMatrix {
        &self.capabilities
    }

    async fn analyze(&self, ctx: &ScanContext) -> Result<AnalyzerOutput, AnalyzerError> {
        let mut output = AnalyzerOutput::empty();

        match infer::get(&ctx.header) {
            Some(kind) => {
                let mimetype = mime::canonical(kind.mime_type());
                debug!(path = %ctx.file_path.display(), mimetype = %mimetype, "Signature match");
                output.streams.insert(
                    0,
                    StreamRecord::new()
                        .with(field::MIMETYPE, mimetype.as_str())
                        .with(field::VERSION, FieldValue::Unavailable),
                );
                output
                    .messages
                    .push(format!("signature matched {mimetype}"));
            }
            None => {
                output.streams.insert(
                    0,
                    StreamRecord::new().with(field::MIMETYPE, FieldValue::Unavailable),
                );
                output.messages.push("no signature match".to_string());
            }
        }

        output.well_formed = WellFormed::Unknown;
        output.tool = Some(ToolInfo {
            name: "infer".to_string(),
            version: "0.16".to_string(),
        });
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn ctx(header: &[u8], mimetype: &str) -> ScanContext {
        ScanContext {
            file_path: PathBuf::from("fixture"),
            file_size: header.len() as u64,
            mimetype: mimetype.to_string(),
            version: None,
            full_check: false,
            header: header.to_vec(),
        }
    }

    #[tokio::test]
    async fn test_identifies_pdf_header() {
        let analyzer = SignatureAnalyzer::new();
        let output = analyzer
            .analyze(&ctx(b"%PDF-1.4 more bytes here", "application/pdf"))
            .await
            .unwrap();

        assert_eq!(
            output.streams[&0].get(field::MIMETYPE),
            Some(&FieldValue::Text("application/pdf".to_string()))
        );
        assert_eq!(output.well_formed, WellFormed::Unknown);
    }

    #[tokio::test]
    async fn test_no_match_emits_unavailable() {
        let analyzer = SignatureAnalyzer::new();
        let output = analyzer
            .analyze(&ctx(b"just prose, no magic", "text/plain"))
            .await
            .unwrap();

        assert_eq!(
            output.streams[&0].get(field::MIMETYPE),
            Some(&FieldValue::Unavailable)
        );
    }

    #[test]
    fn test_capabilities_cover_binary_formats_only() {
        let analyzer = SignatureAnalyzer::new();
        assert!(analyzer.capabilities().supports("application/pdf", Some("1.7"), false));
        assert!(analyzer.capabilities().supports("audio/mpeg", None, false));
        assert!(!analyzer.capabilities().supports("text/csv", None, false));
        assert!(!analyzer
            .capabilities()
            .supports("application/octet-stream", None, false));
    }
}
