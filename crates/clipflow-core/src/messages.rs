//! Typed queue payloads.
//!
//! Validation happens at the ingress boundary: unknown fields are ignored,
//! missing required fields or an unparsable UUID surface as
//! [`AppError::Payload`] and the message is dropped as poison.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

/// Published by the external uploader once the raw blob landed in storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnprocessedVideoUploaded {
    pub user_id: i64,
    pub video_path: String,
}

/// Work command from the ingestion coordinator to the transcoder worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvertVideoToHls {
    pub uuid: Uuid,
    pub video_path: String,
}

/// Completion signal from the transcoder worker back to the coordinator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmVideoHlsConverting {
    pub uuid: Uuid,
}

/// Decode a JSON message body into a typed payload.
pub fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, AppError> {
    serde_json::from_slice(body).map_err(AppError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Disposition;

    #[test]
    fn decodes_upload_event() {
        let msg: UnprocessedVideoUploaded =
            decode(br#"{"user_id": 42, "video_path": "raw/a.mp4"}"#).unwrap();
        assert_eq!(msg.user_id, 42);
        assert_eq!(msg.video_path, "raw/a.mp4");
    }

    #[test]
    fn missing_video_path_is_a_data_error() {
        let err = decode::<UnprocessedVideoUploaded>(br#"{"user_id": 7}"#).unwrap_err();
        assert_eq!(err.disposition(), Disposition::Discard);
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let msg: ConfirmVideoHlsConverting = decode(
            br#"{"uuid": "11111111-1111-4111-8111-111111111111", "extra": true}"#,
        )
        .unwrap();
        assert_eq!(
            msg.uuid,
            "11111111-1111-4111-8111-111111111111".parse::<Uuid>().unwrap()
        );
    }

    #[test]
    fn bad_uuid_is_a_data_error() {
        let err =
            decode::<ConvertVideoToHls>(br#"{"uuid": "nope", "video_path": "raw/a.mp4"}"#)
                .unwrap_err();
        assert_eq!(err.disposition(), Disposition::Discard);
    }

    #[test]
    fn convert_command_round_trips() {
        let cmd = ConvertVideoToHls {
            uuid: Uuid::new_v4(),
            video_path: "raw/a.mp4".to_string(),
        };
        let body = serde_json::to_vec(&cmd).unwrap();
        let back: ConvertVideoToHls = decode(&body).unwrap();
        assert_eq!(back.uuid, cmd.uuid);
        assert_eq!(back.video_path, cmd.video_path);
    }
}
