//! Queue task payload.

use serde::{Deserialize, Serialize};

/// Request to transcode one video.
///
/// Wire format is the UTF-8 JSON object `{"video_id": <u64>}`. Extra fields
/// are ignored; a missing or non-integer `video_id` is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscodeTask {
    pub video_id: u64,
}

impl TranscodeTask {
    pub fn new(video_id: u64) -> Self {
        Self { video_id }
    }

    /// Decode a raw message body.
    pub fn from_slice(payload: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(payload)
    }

    /// Encode as a message body.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_format() {
        let json = TranscodeTask::new(42).to_json().unwrap();
        assert_eq!(json, r#"{"video_id":42}"#);
    }

    #[test]
    fn test_extra_fields_ignored() {
        let task = TranscodeTask::from_slice(br#"{"video_id": 9, "priority": "high"}"#).unwrap();
        assert_eq!(task.video_id, 9);
    }

    #[test]
    fn test_malformed_payloads_rejected() {
        let payloads: [&[u8]; 6] = [
            b"not json",
            br#"{}"#,
            br#"{"video_id": "9"}"#,
            br#"{"video_id": -1}"#,
            br#"{"video_id": 1.5}"#,
            b"null",
        ];
        for payload in payloads {
            assert!(
                TranscodeTask::from_slice(payload).is_err(),
                "accepted {:?}",
                String::from_utf8_lossy(payload)
            );
        }
    }
}
