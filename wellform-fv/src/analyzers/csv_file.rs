//! CSV structure analyzer
//!
//! Full-verification only: walks every record of the file with a
//! quote-aware splitter and fails the file when records disagree on field
//! count. Cheap identification passes never pay for this.

use crate::capability::{SupportDecl, SupportMatrix};
use crate::types::{Analyzer, AnalyzerError, AnalyzerOutput, ScanContext, WellFormed};
use tokio::fs;
use tracing::debug;
use wellform_common::fields::field;
use wellform_common::{FieldValue, StreamRecord};

/// Candidate field delimiters, checked against the first record
const DELIMITERS: [char; 3] = [',', ';', '\t'];

/// Structural CSV analyzer
pub struct CsvAnalyzer {
    capabilities: SupportMatrix,
}

impl CsvAnalyzer {
    pub fn new() -> Self {
        let decl = SupportDecl::new()
            .mimetype("text/csv", &[])
            .any_version()
            .full_only();
        Self {
            capabilities: SupportMatrix::single(decl),
        }
    }
}

impl Default for CsvAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

/// Pick the delimiter occurring most often in the first record
fn sniff_delimiter(first_line: &str) -> char {
    DELIMITERS
        .into_iter()
        .max_by_key(|d| first_line.matches(*d).count())
        .unwrap_or(',')
}

/// Split one record on `delimiter`, honoring double-quote escaping
fn split_record(line: &str, delimiter: char) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for c in line.chars() {
        match c {
            '"' => in_quotes = !in_quotes,
            c if c == delimiter && !in_quotes => {
                fields.push(std::mem::take(&mut current));
            }
            c => current.push(c),
        }
    }
    fields.push(current);
    fields
}

#[async_trait::async_trait]
impl Analyzer for CsvAnalyzer {
    fn name(&self) -> &'static str {
        "CsvAnalyzer"
    }

    fn capabilities(&self) -> &SupportMatrix {
        &self.capabilities
    }

    async fn analyze(&self, ctx: &ScanContext) -> Result<AnalyzerOutput, AnalyzerError> {
        let bytes = fs::read(&ctx.file_path).await?;
        let content = String::from_utf8_lossy(&bytes);
        let mut output = AnalyzerOutput::empty();

        let separator = if content.contains("\r\n") { "CRLF" } else { "LF" };
        let mut lines = content.lines().filter(|l| !l.is_empty());

        let Some(first_line) = lines.next() else {
            output.well_formed = WellFormed::Fail;
            output.errors.push("empty CSV file".to_string());
            return Ok(output);
        };

        let delimiter = sniff_delimiter(first_line);
        let expected = split_record(first_line, delimiter).len();
        debug!(
            path = %ctx.file_path.display(),
            delimiter = %delimiter,
            fields = expected,
            "CSV structure check"
        );

        let mut well_formed = WellFormed::Pass;
        for (number, line) in lines.enumerate() {
            let count = split_record(line, delimiter).len();
            if count != expected {
                well_formed = WellFormed::Fail;
                output.errors.push(format!(
                    "record {} has {} fields, expected {}",
                    number + 2,
                    count,
                    expected
                ));
                break;
            }
        }

        output.streams.insert(
            0,
            StreamRecord::new()
                .with(field::MIMETYPE, "text/csv")
                .with(field::VERSION, FieldValue::Unapplicable)
                .with(field::STREAM_TYPE, "text")
                .with("delimiter", delimiter.to_string())
                .with("separator", separator)
                .with("first_line", first_line),
        );
        output.well_formed = well_formed;
        if well_formed == WellFormed::Pass {
            output
                .messages
                .push(format!("{expected} fields per record"));
        }
        Ok(output)
    }
}
