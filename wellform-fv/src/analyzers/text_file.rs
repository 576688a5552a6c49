//! Text file analyzer
//!
//! Confirms that a file claimed to be text actually is text and determines
//! its character encoding: BOM first, then UTF-8 validation. The charset
//! determination is declared important; a generic analyzer has no business
//! overriding it.

use crate::capability::{SupportDecl, SupportMatrix};
use crate::detect::looks_like_text;
use crate::types::{Analyzer, AnalyzerError, AnalyzerOutput, ScanContext, WellFormed};
use tokio::fs;
use tracing::debug;
use wellform_common::fields::field;
use wellform_common::{FieldValue, StreamRecord};

/// Text content and encoding analyzer
pub struct TextAnalyzer {
    capabilities: SupportMatrix,
}

impl TextAnalyzer {
    pub fn new() -> Self {
        let decl = SupportDecl::new()
            .mimetype("text/plain", &[])
            .mimetype("text/csv", &[])
            .mimetype("text/html", &[])
            .mimetype("text/xml", &[])
            .mimetype("application/xhtml+xml", &[])
            .any_version();
        Self {
            capabilities: SupportMatrix::single(decl),
        }
    }
}

impl Default for TextAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

/// Charset detection outcome for a byte buffer
fn detect_charset(content: &[u8]) -> Option<&'static str> {
    if content.starts_with(&[0xef, 0xbb, 0xbf]) {
        return Some("UTF-8");
    }
    if content.starts_with(&[0xff, 0xfe, 0x00, 0x00]) || content.starts_with(&[0x00, 0x00, 0xfe, 0xff]) {
        return Some("UTF-32");
    }
    if content.starts_with(&[0xff, 0xfe]) || content.starts_with(&[0xfe, 0xff]) {
        return Some("UTF-16");
    }
    if std::str::from_utf8(content).is_ok() {
        return Some("UTF-8");
    }
    None
}

#[async_trait::async_trait]
impl Analyzer for TextAnalyzer {
    fn name(&self) -> &'static str {
        "TextAnalyzer"
    }

    fn capabilities(&self) -> &SupportMatrix {
        &self.capabilities
    }

    async fn analyze(&self, ctx: &ScanContext) -> Result<AnalyzerOutput, AnalyzerError> {
        let content = fs::read(&ctx.file_path).await?;
        let mut output = AnalyzerOutput::empty();

        // Plain and delimited text have no version; markup versions are left
        // for a markup-aware analyzer to determine.
        let version = match ctx.mimetype.as_str() {
            "text/plain" | "text/csv" => FieldValue::Unapplicable,
            _ => FieldValue::Unavailable,
        };

        let mut record = StreamRecord::new()
            .with(field::MIMETYPE, ctx.mimetype.as_str())
            .with(field::VERSION, version)
            .with(field::STREAM_TYPE, "text");

        match detect_charset(&content) {
            Some(charset) => {
                debug!(path = %ctx.file_path.display(), charset = charset, "Charset determined");
                record.insert(field::CHARSET, charset);
                output.important.insert(
                    field::CHARSET.to_string(),
                    FieldValue::Text(charset.to_string()),
                );
                output.well_formed = WellFormed::Pass;
                output.messages.push(format!("charset {charset}"));
            }
            None if looks_like_text(&content) => {
                // Text in some legacy eight-bit encoding; readable, but the
                // encoding cannot be named with confidence.
                record.insert(field::CHARSET, FieldValue::Unavailable);
                output.well_formed = WellFormed::Pass;
                output
                    .messages
                    .push("undetermined eight-bit charset".to_string());
            }
            None => {
                record.insert(field::CHARSET, FieldValue::Unavailable);
                output.well_formed = WellFormed::Fail;
                output
                    .errors
                    .push("binary content in a text file".to_string());
            }
        }

        output.streams.insert(0, record);
        Ok(output)
    }
}
