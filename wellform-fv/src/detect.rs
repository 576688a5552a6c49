//! Candidate format detection
//!
//! Produces the best-guess (mimetype, version) pair used to select analyzers
//! and as the stream-0 fallback when no analyzer can determine the type
//! independently. Signature (magic-byte) matching comes first, then a file
//! extension table, then a text sniff over the leading bytes. Detection
//! never fails a scan: a file nothing recognizes is reported as
//! `application/octet-stream`.

use std::path::Path;
use tracing::debug;
use wellform_common::mime;

/// Fallback MIME type for unrecognized content
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Detector best guess for one file
#[derive(Debug, Clone)]
pub struct Detection {
    /// Normalized candidate MIME type
    pub mimetype: String,
    /// Candidate version, when the signature carries one
    pub version: Option<String>,
}

/// Detect the candidate type of `path` from its leading bytes
pub fn detect(path: &Path, header: &[u8]) -> Detection {
    // Signature match first; magic bytes beat names.
    if let Some(kind) = infer::get(header) {
        let mimetype = mime::canonical(kind.mime_type());
        let version = sniff_version(&mimetype, header);
        debug!(
            path = %path.display(),
            mimetype = %mimetype,
            version = ?version,
            "Detected by signature"
        );
        return Detection { mimetype, version };
    }

    // Extension table for formats without a usable signature.
    if let Some(mimetype) = by_extension(path) {
        let version = sniff_version(mimetype, header);
        debug!(
            path = %path.display(),
            mimetype = %mimetype,
            version = ?version,
            "Detected by extension"
        );
        return Detection {
            mimetype: mimetype.to_string(),
            version,
        };
    }

    // Plain text has no signature at all: accept anything without control
    // bytes in the header window.
    if !header.is_empty() && looks_like_text(header) {
        debug!(path = %path.display(), "Detected as plain text");
        return Detection {
            mimetype: "text/plain".to_string(),
            version: None,
        };
    }

    debug!(path = %path.display(), "No match, falling back to octet-stream");
    Detection {
        mimetype: OCTET_STREAM.to_string(),
        version: None,
    }
}

/// Extension fallbacks for text formats `infer` cannot identify
fn by_extension(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "csv" => Some("text/csv"),
        "txt" | "log" => Some("text/plain"),
        "html" | "htm" => Some("text/html"),
        "xhtml" => Some("application/xhtml+xml"),
        "xml" => Some("text/xml"),
        _ => None,
    }
}

/// Version hints readable straight from the header bytes
fn sniff_version(mimetype: &str, header: &[u8]) -> Option<String> {
    match mimetype {
        "application/pdf" => pdf_header_version(header),
        _ => None,
    }
}

/// Extract `M.N` from a `%PDF-M.N` header
pub fn pdf_header_version(header: &[u8]) -> Option<String> {
    let rest = header.strip_prefix(b"%PDF-")?;
    let version: String = rest
        .iter()
        .take_while(|&&b| b.is_ascii_digit() || b == b'.')
        .map(|&b| b as char)
        .collect();
    if version.is_empty() {
        None
    } else {
        Some(version)
    }
}

/// Heuristic text check: no NUL or non-whitespace control bytes
pub fn looks_like_text(bytes: &[u8]) -> bool {
    !bytes
        .iter()
        .any(|&b| b == 0 || (b < 0x20 && !matches!(b, b'\t' | b'\n' | b'\r' | 0x0c)))
}
