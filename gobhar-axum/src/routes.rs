use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use gobhar_blob::{GatewayError, ResolvedFile};
use serde_json::json;

use crate::{GatewayState, GobharAxumError};

const DEFAULT_STREAM_TYPE: &str = "video/mp4";
const DOWNLOAD_TYPE: &str = "application/octet-stream";

/// How a file is presented to the client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Played in place, e.g. by a `<video>` element
    Inline,
    /// Saved to disk
    Attachment,
}

impl Delivery {
    fn content_type(self, file: &ResolvedFile) -> String {
        match self {
            Delivery::Inline => file
                .handle
                .mime_type
                .clone()
                .unwrap_or_else(|| DEFAULT_STREAM_TYPE.to_string()),
            Delivery::Attachment => DOWNLOAD_TYPE.to_string(),
        }
    }

    fn disposition(self) -> &'static str {
        match self {
            Delivery::Inline => "inline",
            Delivery::Attachment => "attachment",
        }
    }
}

pub fn gateway_router(state: GatewayState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/stream/{file_id}", get(stream_file).head(stream_head))
        .route("/download/{file_id}", get(download_file).head(download_head))
        .with_state(state)
}

async fn root() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "message": "StreamGobhar API - file streaming gateway",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "stream": "/stream/{file_id}",
            "download": "/download/{file_id}",
            "health": "/health",
        }
    }))
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "healthy" }))
}

async fn stream_file(
    State(state): State<GatewayState>,
    Path(file_id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, GobharAxumError> {
    serve(&state, &file_id, &headers, Delivery::Inline).await
}

async fn stream_head(
    State(state): State<GatewayState>,
    Path(file_id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, GobharAxumError> {
    describe(&state, &file_id, &headers, Delivery::Inline).await
}

async fn download_file(
    State(state): State<GatewayState>,
    Path(file_id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, GobharAxumError> {
    serve(&state, &file_id, &headers, Delivery::Attachment).await
}

async fn download_head(
    State(state): State<GatewayState>,
    Path(file_id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, GobharAxumError> {
    describe(&state, &file_id, &headers, Delivery::Attachment).await
}

/// Full GET: resolve, validate, prime the first chunk and stream the rest
async fn serve(
    state: &GatewayState,
    raw_id: &str,
    headers: &HeaderMap,
    delivery: Delivery,
) -> Result<Response, GobharAxumError> {
    let id = state.file_id(raw_id)?;
    let range = range_header(headers)?;

    let opened = state.gateway.open(&id, range).await?;
    let (file, body) = opened.into_parts();

    Ok(file_response(&file, delivery, Body::from_stream(body)))
}

/// HEAD: same headers as GET, no content fetched
async fn describe(
    state: &GatewayState,
    raw_id: &str,
    headers: &HeaderMap,
    delivery: Delivery,
) -> Result<Response, GobharAxumError> {
    let id = state.file_id(raw_id)?;
    let range = range_header(headers)?;

    let file = state.gateway.describe(&id, range).await?;
    Ok(file_response(&file, delivery, Body::empty()))
}

fn range_header(headers: &HeaderMap) -> Result<Option<&str>, GatewayError> {
    headers
        .get(header::RANGE)
        .map(|value| {
            value
                .to_str()
                .map_err(|_| GatewayError::invalid_range("Range header is not ASCII"))
        })
        .transpose()
}

fn file_response(file: &ResolvedFile, delivery: Delivery, body: Body) -> Response {
    let status = if file.is_partial() {
        StatusCode::PARTIAL_CONTENT
    } else {
        StatusCode::OK
    };

    let mut res = (status, body).into_response();
    let headers = res.headers_mut();

    insert(headers, header::CONTENT_TYPE, &delivery.content_type(file));
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(file.content_length()));
    headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    if let Some(content_range) = file.content_range() {
        insert(headers, header::CONTENT_RANGE, &content_range);
    }
    insert(
        headers,
        header::CONTENT_DISPOSITION,
        &content_disposition(delivery, &file.handle.display_name()),
    );

    res
}

fn insert(headers: &mut HeaderMap, name: header::HeaderName, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(value) => {
            headers.insert(name, value);
        }
        Err(_) => tracing::warn!(header = %name, value, "dropping unrepresentable header"),
    }
}

/// `inline`/`attachment` with an ASCII `filename` and an RFC 5987 `filename*`
pub fn content_disposition(delivery: Delivery, filename: &str) -> String {
    let fallback: String = filename
        .chars()
        .map(|c| match c {
            ' '..='~' if c != '"' && c != '\\' => c,
            _ => '_',
        })
        .collect();

    if fallback == filename {
        format!("{}; filename=\"{}\"", delivery.disposition(), filename)
    } else {
        format!(
            "{}; filename=\"{}\"; filename*=UTF-8''{}",
            delivery.disposition(),
            fallback,
            urlencoding::encode(filename)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_names_are_quoted() {
        assert_eq!(
            content_disposition(Delivery::Attachment, "movie.mkv"),
            "attachment; filename=\"movie.mkv\""
        );
        assert_eq!(
            content_disposition(Delivery::Inline, "file_42"),
            "inline; filename=\"file_42\""
        );
    }

    #[test]
    fn unicode_names_get_extended_form() {
        let value = content_disposition(Delivery::Attachment, "фильм \"1\".mp4");
        assert_eq!(
            value,
            "attachment; filename=\"_____ _1_.mp4\"; filename*=UTF-8''%D1%84%D0%B8%D0%BB%D1%8C%D0%BC%20%221%22.mp4"
        );
    }
}
