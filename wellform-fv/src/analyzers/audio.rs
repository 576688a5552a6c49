//! Audio container analyzer
//!
//! Probes audio files with lofty and reports two streams: the container
//! (stream 0) and the audio track (stream 1) with codec, sample rate,
//! channel count and duration. The container MIME type determination is
//! declared important; lofty's probe outranks signature guessing for the
//! WAV/MPEG family.

use crate::capability::{SupportDecl, SupportMatrix};
use crate::types::{Analyzer, AnalyzerError, AnalyzerOutput, ScanContext, ToolInfo, WellFormed};
use lofty::file::{FileType, TaggedFileExt};
use lofty::prelude::*;
use lofty::probe::Probe;
use tracing::debug;
use wellform_common::fields::field;
use wellform_common::{FieldValue, StreamRecord};

/// Audio format analyzer backed by lofty
pub struct AudioAnalyzer {
    capabilities: SupportMatrix,
}

impl AudioAnalyzer {
    pub fn new() -> Self {
        // Two record kinds: lossless/container formats accepted at any
        // version, MPEG audio only at the versions the grade tables know.
        let lossless = SupportDecl::new()
            .mimetype("audio/x-wav", &[])
            .mimetype("audio/flac", &[])
            .mimetype("audio/ogg", &[])
            .any_version();
        let mpeg = SupportDecl::new().mimetype("audio/mpeg", &["1", "2"]);
        Self {
            capabilities: SupportMatrix::new(vec![lossless, mpeg]),
        }
    }
}

impl Default for AudioAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

/// MIME type and codec name for a lofty file type, when we cover it
fn identify(file_type: FileType) -> Option<(&'static str, &'static str)> {
    match file_type {
        FileType::Wav => Some(("audio/x-wav", "PCM")),
        FileType::Flac => Some(("audio/flac", "FLAC")),
        FileType::Mpeg => Some(("audio/mpeg", "MP3")),
        FileType::Vorbis => Some(("audio/ogg", "Vorbis")),
        FileType::Opus => Some(("audio/ogg", "Opus")),
        _ => None,
    }
}

/// MPEG audio version ("1" or "2") from the first frame sync in `bytes`
///
/// Skips a leading ID3v2 tag when its size header says the tag extends past
/// the available window.
pub fn mpeg_version(bytes: &[u8]) -> Option<&'static str> {
    let mut start = 0;
    if bytes.starts_with(b"ID3") && bytes.len() >= 10 {
        // Syncsafe 28-bit tag size
        let size = bytes[6..10]
            .iter()
            .fold(0usize, |acc, &b| (acc << 7) | (b & 0x7f) as usize);
        start = (10 + size).min(bytes.len());
    }

    let window = &bytes[start..];
    for pair in window.windows(2) {
        if pair[0] == 0xff && (pair[1] & 0xe0) == 0xe0 {
            let version_bits = (pair[1] >> 3) & 0x03;
            let layer_bits = (pair[1] >> 1) & 0x03;
            if layer_bits == 0 {
                continue;
            }
            return match version_bits {
                0b11 => Some("1"),
                0b10 | 0b00 => Some("2"),
                _ => None,
            };
        }
    }
    None
}

#[async_trait::async_trait]
impl Analyzer for AudioAnalyzer {
    fn name(&self) -> &'static str {
        "AudioAnalyzer"
    }

    fn capabilities(&self) -> &SupportMatrix {
        &self.capabilities
    }

    async fn analyze(&self, ctx: &ScanContext) -> Result<AnalyzerOutput, AnalyzerError> {
        // Propagate plain I/O problems; a parse failure below is a verdict,
        // not an error.
        tokio::fs::metadata(&ctx.file_path).await?;

        let mut output = AnalyzerOutput::empty();
        output.tool = Some(ToolInfo {
            name: "lofty".to_string(),
            version: "0.19".to_string(),
        });

        let tagged_file = match Probe::open(&ctx.file_path)
            .map_err(|e| e.to_string())
            .and_then(|p| p.read().map_err(|e| e.to_string()))
        {
            Ok(f) => f,
            Err(e) => {
                output.well_formed = WellFormed::Fail;
                output.errors.push(format!("audio probe failed: {e}"));
                return Ok(output);
            }
        };

        let Some((mimetype, codec)) = identify(tagged_file.file_type()) else {
            output.well_formed = WellFormed::Fail;
            output.errors.push(format!(
                "unexpected audio container: {:?}",
                tagged_file.file_type()
            ));
            return Ok(output);
        };

        let version = if mimetype == "audio/mpeg" {
            match mpeg_version(&ctx.header) {
                Some(v) => FieldValue::Text(v.to_string()),
                None => FieldValue::Unavailable,
            }
        } else {
            FieldValue::Unapplicable
        };

        let properties = tagged_file.properties();
        let duration = properties.duration().as_secs_f64();

        debug!(
            path = %ctx.file_path.display(),
            mimetype = mimetype,
            codec = codec,
            duration_s = duration,
            "Audio probe complete"
        );

        let container = StreamRecord::new()
            .with(field::MIMETYPE, mimetype)
            .with(field::VERSION, version)
            .with(field::STREAM_TYPE, "container");

        let mut track = StreamRecord::new()
            .with(field::STREAM_TYPE, "audio")
            .with("codec", codec)
            .with("duration", format!("{duration:.2}"));
        match properties.sample_rate() {
            Some(rate) => track.insert("sample_rate", rate.to_string()),
            None => track.insert("sample_rate", FieldValue::Unavailable),
        }
        match properties.channels() {
            Some(channels) => track.insert("channels", channels.to_string()),
            None => track.insert("channels", FieldValue::Unavailable),
        }
        match properties.bit_depth() {
            Some(depth) => track.insert("bit_depth", depth.to_string()),
            None => track.insert("bit_depth", FieldValue::Unavailable),
        }

        output.streams.insert(0, container);
        output.streams.insert(1, track);
        output
            .important
            .insert(field::MIMETYPE.to_string(), FieldValue::Text(mimetype.into()));
        output.well_formed = WellFormed::Pass;
        output.messages.push(format!("{codec} audio, {duration:.2}s"));
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mpeg_version_from_frame_sync() {
        // MPEG-1 Layer III frame header: FF FB
        assert_eq!(mpeg_version(&[0xff, 0xfb, 0x90, 0x00]), Some("1"));
        // MPEG-2 Layer III frame header: FF F3
        assert_eq!(mpeg_version(&[0xff, 0xf3, 0x90, 0x00]), Some("2"));
        assert_eq!(mpeg_version(b"no sync here"), None);
    }

    #[test]
    fn test_mpeg_version_skips_id3_tag() {
        // ID3v2 header declaring a 4-byte tag body, then an MPEG-1 sync
        let mut bytes = vec![b'I', b'D', b'3', 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x04];
        bytes.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]);
        bytes.extend_from_slice(&[0xff, 0xfb, 0x90, 0x00]);
        assert_eq!(mpeg_version(&bytes), Some("1"));
    }

    #[test]
    fn test_composite_capabilities() {
        let analyzer = AudioAnalyzer::new();
        let caps = analyzer.capabilities();
        assert!(caps.supports("audio/x-wav", Some("2"), false));
        assert!(caps.supports("audio/flac", None, false));
        assert!(caps.supports("audio/mpeg", Some("2"), false));
        assert!(!caps.supports("audio/mpeg", Some("2.5"), false));
        assert!(!caps.supports("audio/aac", None, false));
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let analyzer = AudioAnalyzer::new();
        let ctx = ScanContext {
            file_path: "/nonexistent/audio.wav".into(),
            file_size: 0,
            mimetype: "audio/x-wav".to_string(),
            version: None,
            full_check: false,
            header: Vec::new(),
        };
        assert!(analyzer.analyze(&ctx).await.is_err());
    }
}
