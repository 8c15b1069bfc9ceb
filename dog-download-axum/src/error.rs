use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use dog_download::{DownloadError, ResponseHead};
use serde_json::json;

/// Error response of the download routes, rendered as a Feathers-style JSON body
#[derive(Debug)]
pub struct DownloadAxumError {
    status: StatusCode,
    message: String,
    content_range: Option<String>,
}

impl DownloadAxumError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            content_range: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn range_not_satisfiable(total_length: u64) -> Self {
        Self {
            content_range: Some(format!("bytes */{}", total_length)),
            ..Self::new(StatusCode::RANGE_NOT_SATISFIABLE, "Requested range not satisfiable")
        }
    }

    pub fn general_error(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    /// Error for a failed response head produced by the pipeline
    pub fn from_head(head: &ResponseHead, message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::from_u16(head.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            message: message.into(),
            content_range: head.content_range.clone(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    fn name(&self) -> &'static str {
        match self.status {
            StatusCode::BAD_REQUEST => "BadRequest",
            StatusCode::FORBIDDEN => "Forbidden",
            StatusCode::NOT_FOUND => "NotFound",
            StatusCode::RANGE_NOT_SATISFIABLE => "RangeNotSatisfiable",
            _ => "GeneralError",
        }
    }

    fn class_name(&self) -> &'static str {
        match self.status {
            StatusCode::BAD_REQUEST => "bad-request",
            StatusCode::FORBIDDEN => "forbidden",
            StatusCode::NOT_FOUND => "not-found",
            StatusCode::RANGE_NOT_SATISFIABLE => "range-not-satisfiable",
            _ => "general-error",
        }
    }
}

impl From<DownloadError> for DownloadAxumError {
    fn from(e: DownloadError) -> Self {
        match e {
            DownloadError::NotFound { .. } | DownloadError::InvalidLocator { .. } | DownloadError::InvalidUrl { .. } => {
                Self::not_found(e.to_string())
            }
            DownloadError::Forbidden { .. } => Self::forbidden(e.to_string()),
            DownloadError::RangeNotSatisfiable { total_length } => Self::range_not_satisfiable(total_length),
            DownloadError::Sink { .. } | DownloadError::Storage { .. } | DownloadError::Io { .. } => {
                Self::general_error(e.to_string())
            }
        }
    }
}

impl From<anyhow::Error> for DownloadAxumError {
    fn from(e: anyhow::Error) -> Self {
        match e.downcast::<DownloadError>() {
            Ok(download) => download.into(),
            Err(other) => Self::general_error(other.to_string()),
        }
    }
}

impl IntoResponse for DownloadAxumError {
    fn into_response(self) -> Response {
        let body = json!({
            "name": self.name(),
            "message": self.message,
            "code": self.status.as_u16(),
            "className": self.class_name(),
        });

        let mut response = (self.status, Json(body)).into_response();
        if let Some(range) = self.content_range.and_then(|r| HeaderValue::from_str(&r).ok()) {
            response.headers_mut().insert(header::CONTENT_RANGE, range);
        }
        if self.status == StatusCode::RANGE_NOT_SATISFIABLE {
            response
                .headers_mut()
                .insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
        }
        response
    }
}
