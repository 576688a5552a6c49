//! MIME string helpers

/// Normalize a MIME type string: lowercase, trimmed, parameters stripped.
///
/// `"Text/CSV; charset=utf-8"` becomes `"text/csv"`.
pub fn normalize(mimetype: &str) -> String {
    mimetype
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase()
}

/// Normalize and map known aliases to their canonical preservation name
///
/// Identification libraries disagree on names for the same format
/// (`audio/x-flac` vs `audio/flac`, `audio/wav` vs `audio/x-wav`); analyzer
/// capabilities and grade tables use one canonical spelling.
pub fn canonical(mimetype: &str) -> String {
    let normalized = normalize(mimetype);
    match normalized.as_str() {
        "audio/x-flac" => "audio/flac".to_string(),
        "audio/wav" | "audio/wave" | "audio/vnd.wave" => "audio/x-wav".to_string(),
        "application/x-pdf" => "application/pdf".to_string(),
        _ => normalized,
    }
}

/// Major type of a normalized MIME string (`"text"` for `"text/csv"`)
pub fn major(mimetype: &str) -> &str {
    mimetype.split('/').next().unwrap_or("")
}

/// True when the MIME string belongs to the `text` major type
pub fn is_text(mimetype: &str) -> bool {
    major(mimetype) == "text"
}
