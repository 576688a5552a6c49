//! Built-in format analyzers
//!
//! Each analyzer is an independent unit behind the [`Analyzer`] trait: it
//! declares its capabilities up front, reads the file on its own, and
//! produces stream records plus a well-formedness signal. Analyzers never
//! see each other's output; the reconciler folds their records afterwards.

pub mod audio;
pub mod csv_file;
pub mod pdf;
pub mod signature;
pub mod text_file;

use crate::types::Analyzer;
use std::sync::Arc;

pub use audio::AudioAnalyzer;
pub use csv_file::CsvAnalyzer;
pub use pdf::{PdfAnalyzer, PdfVerifyAnalyzer};
pub use signature::SignatureAnalyzer;
pub use text_file::TextAnalyzer;

/// The full built-in analyzer set, constructed once at startup
pub fn default_analyzers() -> Vec<Arc<dyn Analyzer>> {
    vec![
        Arc::new(SignatureAnalyzer::new()),
        Arc::new(TextAnalyzer::new()),
        Arc::new(CsvAnalyzer::new()),
        Arc::new(AudioAnalyzer::new()),
        Arc::new(PdfAnalyzer::new()),
        Arc::new(PdfVerifyAnalyzer::new()),
    ]
}
