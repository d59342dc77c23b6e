use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use gobhar_blob::{unsatisfied_range, ErrorKind, GatewayError};
use serde_json::{json, Value};

use crate::InvalidId;

#[derive(Debug)]
pub struct GobharAxumError(pub anyhow::Error);

impl From<anyhow::Error> for GobharAxumError {
    fn from(e: anyhow::Error) -> Self {
        Self(e)
    }
}

impl From<GatewayError> for GobharAxumError {
    fn from(e: GatewayError) -> Self {
        Self(e.into())
    }
}

impl From<InvalidId> for GobharAxumError {
    fn from(e: InvalidId) -> Self {
        Self(e.into())
    }
}

fn error_body(kind: ErrorKind, message: String, data: Option<Value>) -> Value {
    let mut body = json!({
        "name": kind.name(),
        "message": message,
        "code": kind.status_code(),
        "className": kind.class_name(),
    });
    if let Some(data) = data {
        body["data"] = data;
    }
    body
}

fn respond(kind: ErrorKind, message: String, data: Option<Value>) -> Response {
    let status =
        StatusCode::from_u16(kind.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(error_body(kind, message, data))).into_response()
}

fn gateway_response(err: &GatewayError) -> Response {
    let kind = err.kind();
    match err {
        GatewayError::RangeNotSatisfiable { total_size } => {
            let mut res = respond(
                kind,
                err.to_string(),
                Some(json!({ "totalSize": total_size })),
            );
            if let Ok(value) = HeaderValue::from_str(&unsatisfied_range(*total_size)) {
                res.headers_mut().insert(header::CONTENT_RANGE, value);
            }
            res
        }
        GatewayError::UpstreamUnavailable { .. } | GatewayError::UpstreamTimeout { .. } => {
            tracing::error!(error = %err, "upstream failed before first byte");
            respond(kind, err.to_string(), None)
        }
        // Local failures keep their details in the log only
        GatewayError::Io { .. } | GatewayError::Config { .. } => {
            tracing::error!(error = %err, "internal gateway error");
            respond(kind, "Internal server error".to_string(), None)
        }
        _ => {
            tracing::debug!(error = %err, status = kind.status_code(), "request rejected");
            respond(kind, err.to_string(), None)
        }
    }
}

impl IntoResponse for GobharAxumError {
    fn into_response(self) -> Response {
        // Gateway errors may be wrapped by anyhow contexts; find them anywhere in the chain
        if let Some(err) = self.0.chain().find_map(|e| e.downcast_ref::<GatewayError>()) {
            return gateway_response(err);
        }

        if let Some(err) = self.0.chain().find_map(|e| e.downcast_ref::<InvalidId>()) {
            tracing::debug!(error = %err, "rejected file id");
            return respond(
                ErrorKind::BadRequest,
                "Invalid ID".to_string(),
                Some(json!({ "details": err.to_string() })),
            );
        }

        tracing::error!(error = %self.0, "unhandled error");
        respond(
            ErrorKind::GeneralError,
            "Internal server error".to_string(),
            None,
        )
    }
}
