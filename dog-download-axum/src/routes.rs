use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode, Uri},
    response::Response,
    routing::get,
    Router,
};
use dog_download::{DownloadAttempt, DownloadError, DownloadReport, ExtendedInfo, ResponseHead};
use tokio::io::DuplexStream;
use tokio::sync::oneshot;
use tokio_util::io::ReaderStream;
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};

use crate::{DownloadAxumError, DownloadState};

/// Query parameters prefixed with this are copied into the attempt's extended info
pub const INFO_PARAM_PREFIX: &str = "info.";

/// Router serving `GET /<scheme>/<repository>/<entity id>/<locator>/<filename>`.
///
/// Mount it at the root or nest it under a prefix.
pub fn download_router(state: DownloadState) -> Router<()> {
    Router::new()
        .route("/{*path}", get(download))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
}

async fn download(
    State(state): State<DownloadState>,
    uri: Uri,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Response, DownloadAxumError> {
    let url = state.service.parse_url(uri.path())?;

    let entity = state
        .entities
        .entity(&url.repository, &url.entity_id)
        .await
        .map_err(DownloadError::storage)?;

    let mut attempt = DownloadAttempt::new(url.filename.clone())
        .with_locator(url.locator.clone())
        .with_reason(query.get("reason").cloned().unwrap_or_default())
        .with_extended_info(extended_info(&headers, &query))
        .with_info("url", url.to_path());
    if let Some(entity) = entity {
        attempt = attempt.with_entity(entity);
    }
    if let Some(inline) = query.get("inline").and_then(|v| v.parse::<bool>().ok()) {
        attempt = attempt.with_inline(inline);
    }
    let range = headers
        .get(header::RANGE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    debug!(scheme = %url.scheme, repository = %url.repository, id = %url.entity_id, range = ?range, "download.request");

    let (head_tx, head_rx) = oneshot::channel::<ResponseHead>();
    let (writer, reader) = tokio::io::duplex(state.service.config().chunk_size.max(1));
    let cancel = state.shutdown.child_token();
    let service = Arc::clone(&state.service);

    // The pipeline owns its task so a dropped response only breaks the pipe.
    let task = tokio::spawn(async move {
        let open_sink = move |head: &ResponseHead| {
            let _ = head_tx.send(head.clone());
            Ok(writer)
        };
        service.download(attempt, range.as_deref(), open_sink, &cancel).await
    });

    match head_rx.await {
        Ok(head) => Ok(streaming_response(&head, reader)),
        Err(_) => {
            let report = task
                .await
                .map_err(|e| DownloadAxumError::general_error(format!("download task failed: {}", e)))??;
            Err(failure_response(report))
        }
    }
}

fn extended_info(headers: &HeaderMap, query: &HashMap<String, String>) -> ExtendedInfo {
    let mut info: ExtendedInfo = query
        .iter()
        .filter_map(|(key, value)| {
            key.strip_prefix(INFO_PARAM_PREFIX)
                .filter(|name| !name.is_empty())
                .map(|name| (name.to_string(), value.clone()))
        })
        .collect();

    if let Some(id) = headers.get("x-request-id").and_then(|v| v.to_str().ok()) {
        info.insert("request_id".to_string(), id.to_string());
    }
    if let Some(agent) = headers.get(header::USER_AGENT).and_then(|v| v.to_str().ok()) {
        info.insert("user_agent".to_string(), agent.to_string());
    }
    info
}

fn streaming_response(head: &ResponseHead, body: DuplexStream) -> Response {
    let mut response = Response::new(Body::from_stream(ReaderStream::new(body)));
    *response.status_mut() = StatusCode::from_u16(head.status).unwrap_or(StatusCode::OK);

    let headers = response.headers_mut();
    if let Some(value) = head.content_type.as_deref().and_then(|v| HeaderValue::from_str(v).ok()) {
        headers.insert(header::CONTENT_TYPE, value);
    }
    if let Some(length) = head.content_length {
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
    }
    if let Some(value) = head.content_disposition.as_deref().and_then(|v| HeaderValue::from_str(v).ok()) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    if let Some(value) = head.content_range.as_deref().and_then(|v| HeaderValue::from_str(v).ok()) {
        headers.insert(header::CONTENT_RANGE, value);
    }
    if head.accept_ranges {
        headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    }
    response
}

fn failure_response(report: DownloadReport) -> DownloadAxumError {
    let message = report
        .error
        .as_ref()
        .map(ToString::to_string)
        .unwrap_or_else(|| report.outcome.to_string());

    match &report.response {
        Some(head) => DownloadAxumError::from_head(head, message),
        None => {
            warn!(attempt_id = %report.attempt_id, outcome = %report.outcome, "download aborted before a response was sent");
            DownloadAxumError::general_error(message)
        }
    }
}
