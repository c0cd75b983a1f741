//! Data models for transcription.

use serde::{Deserialize, Serialize};

/// A complete transcript with segments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    /// Base name of the audio this transcript belongs to.
    pub media_id: String,
    /// Individual transcript segments with timestamps.
    pub segments: Vec<TranscriptSegment>,
}

impl Transcript {
    /// Create a new transcript from segments.
    pub fn new(media_id: String, segments: Vec<TranscriptSegment>) -> Self {
        Self { media_id, segments }
    }

    /// End of the last segment, in seconds.
    pub fn duration_seconds(&self) -> f64 {
        self.segments.last().map(|s| s.end_seconds).unwrap_or(0.0)
    }

    /// One `[start -> end] text` line per segment, the on-disk transcript format.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            out.push_str(&segment.to_line());
            out.push('\n');
        }
        out
    }
}

/// A single segment of a transcript with timestamp information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// Start time in seconds.
    pub start_seconds: f64,
    /// End time in seconds.
    pub end_seconds: f64,
    /// Transcribed text content.
    pub text: String,
}

impl TranscriptSegment {
    pub fn new(start_seconds: f64, end_seconds: f64, text: String) -> Self {
        Self {
            start_seconds,
            end_seconds,
            text,
        }
    }

    /// Shift both timestamps by `offset` seconds.
    pub fn shifted(mut self, offset: f64) -> Self {
        self.start_seconds += offset;
        self.end_seconds += offset;
        self
    }

    fn to_line(&self) -> String {
        format!(
            "[{:.2} -> {:.2}] {}",
            self.start_seconds, self.end_seconds, self.text
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transcript_creation() {
        let segments = vec![
            TranscriptSegment::new(0.0, 5.0, "こんにちは".to_string()),
            TranscriptSegment::new(5.0, 10.0, "This is a test".to_string()),
        ];

        let transcript = Transcript::new("1234".to_string(), segments);

        assert_eq!(transcript.media_id, "1234");
        assert_eq!(transcript.duration_seconds(), 10.0);
    }

    #[test]
    fn test_text_format() {
        let transcript = Transcript::new(
            "1234".to_string(),
            vec![
                TranscriptSegment::new(0.0, 4.5, "始めます".to_string()),
                TranscriptSegment::new(4.5, 9.123, "次へ".to_string()),
            ],
        );

        assert_eq!(
            transcript.to_text(),
            "[0.00 -> 4.50] 始めます\n[4.50 -> 9.12] 次へ\n"
        );
    }

    #[test]
    fn test_shifted_segment() {
        let segment = TranscriptSegment::new(1.0, 3.0, "x".to_string()).shifted(600.0);
        assert_eq!(segment.start_seconds, 601.0);
        assert_eq!(segment.end_seconds, 603.0);
    }

    #[test]
    fn test_empty_transcript() {
        let transcript = Transcript::new("empty".to_string(), Vec::new());
        assert_eq!(transcript.to_text(), "");
        assert_eq!(transcript.duration_seconds(), 0.0);
    }
}
