//! Error types shared by the storage adapters and the media service

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;

/// Failure reported by an object store or metadata store backend
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StoreError {
    /// Backend could not be reached or failed mid-operation; safe to retry
    #[error("backend unavailable: {0}")]
    Unavailable(String),
    /// Nothing is stored under the requested key
    #[error("not found: {0}")]
    NotFound(String),
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::NotFound {
            StoreError::NotFound(e.to_string())
        } else {
            StoreError::Unavailable(e.to_string())
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        match e {
            rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound(e.to_string()),
            other => StoreError::Unavailable(other.to_string()),
        }
    }
}

/// 500 body for a failed upload
pub const PROCESSING_FAILED: &str = "An error occurred while processing the media.";
/// 500 body for a failed download
pub const RETRIEVAL_FAILED: &str = "An error occurred while retrieving the media.";

/// Errors surfaced by the media service to its callers
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MediaError {
    /// Empty or missing payload
    #[error("No file uploaded.")]
    InvalidInput,
    /// Declared type not allowed, or content does not carry its signature
    #[error("Invalid media type or corrupted file.")]
    InvalidMediaType,
    /// Requested key is unknown
    #[error("Media not found.")]
    NotFound,
    /// Upload exceeded the configured payload limit
    #[error("Payload exceeds the limit of {limit} bytes.")]
    PayloadTooLarge { limit: u64 },
    #[error("An error occurred while processing the media: {0}")]
    BackendUnavailable(String),
}

impl MediaError {
    /// True when the caller may retry the whole operation unchanged
    pub fn is_retryable(&self) -> bool {
        matches!(self, MediaError::BackendUnavailable(_))
    }
}

impl From<StoreError> for MediaError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(_) => MediaError::NotFound,
            StoreError::Unavailable(msg) => MediaError::BackendUnavailable(msg),
        }
    }
}

impl ResponseError for MediaError {
    fn status_code(&self) -> StatusCode {
        match self {
            MediaError::InvalidInput | MediaError::InvalidMediaType => StatusCode::BAD_REQUEST,
            MediaError::NotFound => StatusCode::NOT_FOUND,
            MediaError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            MediaError::BackendUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        // Backend details stay in the logs
        let body = match self {
            MediaError::BackendUnavailable(_) => PROCESSING_FAILED.to_string(),
            other => other.to_string(),
        };
        plain_response(self.status_code(), body)
    }
}

impl MediaError {
    /// Error response for the download route
    pub fn download_response(&self) -> HttpResponse {
        match self {
            MediaError::BackendUnavailable(_) => plain_response(self.status_code(), RETRIEVAL_FAILED.to_string()),
            other => other.error_response(),
        }
    }
}

fn plain_response(status: StatusCode, body: String) -> HttpResponse {
    HttpResponse::build(status)
        .content_type("text/plain; charset=utf-8")
        .body(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_mapping() {
        let missing = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert!(matches!(StoreError::from(missing), StoreError::NotFound(_)));

        let denied = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope");
        assert!(matches!(StoreError::from(denied), StoreError::Unavailable(_)));
    }

    #[test]
    fn test_store_error_to_media_error() {
        assert_eq!(MediaError::from(StoreError::NotFound("k".into())), MediaError::NotFound);
        let err = MediaError::from(StoreError::Unavailable("timeout".into()));
        assert!(err.is_retryable());
        assert!(!MediaError::InvalidMediaType.is_retryable());
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(MediaError::InvalidInput.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(MediaError::InvalidMediaType.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(MediaError::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            MediaError::PayloadTooLarge { limit: 10 }.status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            MediaError::BackendUnavailable("disk".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[actix_web::test]
    async fn test_backend_failure_bodies() {
        let err = MediaError::BackendUnavailable("disk full at /srv".into());
        let upload = err.error_response();
        let download = err.download_response();
        assert_eq!(upload.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(download.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let upload_body = actix_web::body::to_bytes(upload.into_body()).await.unwrap();
        let download_body = actix_web::body::to_bytes(download.into_body()).await.unwrap();
        assert_eq!(upload_body, PROCESSING_FAILED.as_bytes());
        assert_eq!(download_body, RETRIEVAL_FAILED.as_bytes());

        assert_eq!(MediaError::NotFound.download_response().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_client_messages() {
        assert_eq!(MediaError::InvalidInput.to_string(), "No file uploaded.");
        assert_eq!(
            MediaError::InvalidMediaType.to_string(),
            "Invalid media type or corrupted file."
        );
    }
}
