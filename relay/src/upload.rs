//! Decoding of browser frame uploads.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use bytes::Bytes;
use serde::Deserialize;
use tracing::warn;

/// Standard alphabet; canvas encoders always pad, hand-rolled clients may not.
const DATA_URL_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Body of `POST /upload_frame`.
#[derive(Debug, Deserialize)]
pub struct UploadFrame {
    /// `data:image/jpeg;base64,<payload>`
    pub frame: String,
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("invalid upload body: {1}")]
    Body(StatusCode, String),
    #[error("frame is not a data URL")]
    NotDataUrl,
    #[error("frame data URL is not base64-encoded")]
    NotBase64,
    #[error("unsupported frame type '{0}', expected image/jpeg")]
    UnsupportedType(String),
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("frame payload is empty")]
    Empty,
}

impl From<JsonRejection> for UploadError {
    fn from(rejection: JsonRejection) -> Self {
        let status = match rejection.status() {
            StatusCode::PAYLOAD_TOO_LARGE => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::BAD_REQUEST,
        };
        UploadError::Body(status, rejection.body_text())
    }
}

impl UploadError {
    pub fn status(&self) -> StatusCode {
        match self {
            UploadError::Body(status, _) => *status,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for UploadError {
    fn into_response(self) -> Response {
        warn!(error = %self, "rejected frame upload");
        (self.status(), self.to_string()).into_response()
    }
}

/// Strip the data-URL prefix and decode the JPEG bytes behind it.
pub fn decode_data_url(data_url: &str) -> Result<Bytes, UploadError> {
    let rest = data_url
        .trim()
        .strip_prefix("data:")
        .ok_or(UploadError::NotDataUrl)?;
    let (meta, payload) = rest.split_once(',').ok_or(UploadError::NotDataUrl)?;

    let mut params = meta.split(';');
    let mime = params.next().unwrap_or_default().trim();
    if !params.any(|p| p.trim().eq_ignore_ascii_case("base64")) {
        return Err(UploadError::NotBase64);
    }
    if !(mime.eq_ignore_ascii_case("image/jpeg") || mime.eq_ignore_ascii_case("image/jpg")) {
        return Err(UploadError::UnsupportedType(mime.to_string()));
    }

    let jpeg = DATA_URL_BASE64.decode(payload.trim())?;
    if jpeg.is_empty() {
        return Err(UploadError::Empty);
    }
    Ok(Bytes::from(jpeg))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_canvas_data_url() {
        let jpeg = decode_data_url("data:image/jpeg;base64,/9j/4AAQ").unwrap();
        assert_eq!(&jpeg[..], &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10]);
    }

    #[test]
    fn padding_is_optional() {
        let padded = decode_data_url("data:image/jpeg;base64,aGVsbG8=").unwrap();
        let bare = decode_data_url("data:image/jpeg;base64,aGVsbG8").unwrap();
        assert_eq!(&padded[..], b"hello");
        assert_eq!(padded, bare);
    }

    #[test]
    fn accepts_extra_params_and_case() {
        let jpeg = decode_data_url("  data:IMAGE/JPG;charset=binary;BASE64,aGk=\n").unwrap();
        assert_eq!(&jpeg[..], b"hi");
    }

    #[test]
    fn rejects_bad_input() {
        assert!(matches!(decode_data_url("aGVsbG8="), Err(UploadError::NotDataUrl)));
        assert!(matches!(
            decode_data_url("data:image/jpeg;base64"),
            Err(UploadError::NotDataUrl)
        ));
        assert!(matches!(
            decode_data_url("data:image/jpeg,rawtext"),
            Err(UploadError::NotBase64)
        ));
        assert!(matches!(
            decode_data_url("data:image/png;base64,aGVsbG8="),
            Err(UploadError::UnsupportedType(mime)) if mime == "image/png"
        ));
        assert!(matches!(
            decode_data_url("data:image/jpeg;base64,not*base64!"),
            Err(UploadError::Base64(_))
        ));
        assert!(matches!(
            decode_data_url("data:image/jpeg;base64,"),
            Err(UploadError::Empty)
        ));
    }

    #[test]
    fn errors_map_to_client_statuses() {
        assert_eq!(UploadError::NotDataUrl.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            UploadError::Body(StatusCode::PAYLOAD_TOO_LARGE, "too big".into()).status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
    }
}
