//! Decoding of the `{ success, data, message }` response envelope.

use progress_core::model::{ChapterMarker, PreferenceRecord, ProgressRecord};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::repository::StoreError;

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: Option<bool>,
    data: Option<T>,
    #[serde(alias = "error")]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProgressData {
    pub progress: Option<ProgressRecord>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PreferencesData {
    pub preferences: PreferenceRecord,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChaptersData {
    #[serde(default)]
    pub chapters: Vec<ChapterMarker>,
}

fn rejection(message: Option<String>) -> StoreError {
    StoreError::Rejected(message.unwrap_or_else(|| "success: false".to_string()))
}

/// Decode an enveloped response body.
///
/// Non-2xx statuses and `success: false` are both failures; a missing
/// `success` flag is tolerated as long as `data` is present.
///
/// # Errors
///
/// Returns `StoreError::Status`, `StoreError::Rejected`, or `StoreError::Malformed`.
pub fn decode_envelope<T: DeserializeOwned>(status: u16, body: &[u8]) -> Result<T, StoreError> {
    if !(200..300).contains(&status) {
        return Err(StoreError::Status(status));
    }
    let envelope: Envelope<T> =
        serde_json::from_slice(body).map_err(|e| StoreError::Malformed(e.to_string()))?;
    if envelope.success == Some(false) {
        return Err(rejection(envelope.message));
    }
    envelope
        .data
        .ok_or_else(|| StoreError::Malformed("response has no data".to_string()))
}

/// Decode the dashboard listing, which some backends return without an envelope.
///
/// # Errors
///
/// Returns `StoreError::Status`, `StoreError::Rejected`, or `StoreError::Malformed`.
pub fn decode_listing(status: u16, body: &[u8]) -> Result<Value, StoreError> {
    if !(200..300).contains(&status) {
        return Err(StoreError::Status(status));
    }
    let root: Value =
        serde_json::from_slice(body).map_err(|e| StoreError::Malformed(e.to_string()))?;
    let Value::Object(map) = &root else {
        return Err(StoreError::Malformed("listing is not an object".to_string()));
    };
    if map.get("success").and_then(Value::as_bool) == Some(false) {
        let message = map
            .get("message")
            .or_else(|| map.get("error"))
            .and_then(Value::as_str)
            .map(str::to_string);
        return Err(rejection(message));
    }
    match map.get("data") {
        Some(data @ Value::Object(_)) if !map.contains_key("courses") => Ok(data.clone()),
        _ => Ok(root),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use progress_core::model::LessonId;

    #[test]
    fn decodes_progress_payload() {
        let body = br#"{"success":true,"data":{"progress":{"lessonId":3,"currentTime":12.5,"duration":100,"completionPercentage":12.5,"completed":false,"watchCount":1}}}"#;
        let data: ProgressData = decode_envelope(200, body).unwrap();
        let record = data.progress.unwrap();
        assert_eq!(record.lesson_id, LessonId::new(3));
        assert_eq!(record.current_time, 12.5);
    }

    #[test]
    fn null_progress_means_never_watched() {
        let data: ProgressData =
            decode_envelope(200, br#"{"success":true,"data":{"progress":null}}"#).unwrap();
        assert!(data.progress.is_none());
    }

    #[test]
    fn success_false_is_a_failure_even_with_200() {
        let err = decode_envelope::<ProgressData>(
            200,
            br#"{"success":false,"message":"lesson locked"}"#,
        )
        .unwrap_err();
        assert_eq!(err, StoreError::Rejected("lesson locked".into()));
    }

    #[test]
    fn non_2xx_is_a_status_failure() {
        let err = decode_envelope::<ChaptersData>(500, b"oops").unwrap_err();
        assert_eq!(err, StoreError::Status(500));
    }

    #[test]
    fn garbage_body_is_malformed() {
        let err = decode_envelope::<PreferencesData>(200, b"<html>").unwrap_err();
        assert!(matches!(err, StoreError::Malformed(_)));
    }

    #[test]
    fn missing_data_is_malformed() {
        let err = decode_envelope::<ChaptersData>(200, br#"{"success":true}"#).unwrap_err();
        assert!(matches!(err, StoreError::Malformed(_)));
    }

    #[test]
    fn listing_unwraps_data_envelope() {
        let listing =
            decode_listing(200, br#"{"success":true,"data":{"courses":[{"id":1}]}}"#).unwrap();
        assert_eq!(listing["courses"][0]["id"], 1);
    }

    #[test]
    fn listing_accepts_bare_payload() {
        let listing = decode_listing(200, br#"{"courses":[],"recentQuizzes":[]}"#).unwrap();
        assert!(listing["courses"].is_array());
    }

    #[test]
    fn listing_rejection_carries_message() {
        let err = decode_listing(200, br#"{"success":false,"error":"expired"}"#).unwrap_err();
        assert_eq!(err, StoreError::Rejected("expired".into()));
    }
}
