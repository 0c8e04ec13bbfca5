//! Middleware for logging requests and responses.

use axum::{
    body::{Body, Bytes},
    extract::Request,
    http::{HeaderMap, StatusCode, header::CONTENT_TYPE, request, response},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::{Error, routing::MAX_REQUEST_BODY_SIZE};

/// Bodies longer than this many characters are truncated in the `info` logs.
pub const LOG_BODY_LENGTH_LIMIT: usize = 64;

/// Form fields whose values never appear in the logs.
const REDACTED_FIELDS: [&str; 4] = ["password", "confirm_password", "new_password", "token"];

const REDACTED_VALUE: &str = "********";

/// Log the request and response for each request.
///
/// Both the request and response are logged at the `info` level.
/// If a body is longer than [LOG_BODY_LENGTH_LIMIT] characters, it is
/// truncated and the full body is logged at the `debug` level.
/// Passwords and two-factor codes in URL encoded forms are redacted.
///
/// Multipart forms and binary responses are passed through without being
/// read, so only their headers are logged. Other request bodies are read up
/// to [MAX_REQUEST_BODY_SIZE] bytes, and larger requests are rejected with
/// `413 Payload Too Large` before they reach the router.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let (parts, body) = request.into_parts();
    let content_type = header_text(&parts.headers);

    let request = if content_type.starts_with("multipart/form-data") {
        log_request(&parts, "<multipart form>");
        Request::from_parts(parts, body)
    } else {
        let body = match axum::body::to_bytes(body, MAX_REQUEST_BODY_SIZE).await {
            Ok(body) => body,
            Err(error) => {
                tracing::warn!("Rejecting request {} {}: {error}", parts.method, parts.uri);
                return (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response();
            }
        };

        if content_type.starts_with("application/x-www-form-urlencoded") {
            log_request(&parts, &redact_form(&String::from_utf8_lossy(&body)));
        } else {
            log_request(&parts, &String::from_utf8_lossy(&body));
        }

        Request::from_parts(parts, Body::from(body))
    };

    let response = next.run(request).await;

    let (parts, body) = response.into_parts();
    let content_type = header_text(&parts.headers);

    if !is_text(content_type) {
        log_response(&parts, &format!("<{content_type}>"));
        return Response::from_parts(parts, body);
    }

    let body = match read_body(body).await {
        Ok(body) => body,
        Err(error) => return error.into_response(),
    };
    log_response(&parts, &String::from_utf8_lossy(&body));

    Response::from_parts(parts, Body::from(body))
}

fn header_text(headers: &HeaderMap) -> &str {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
}

/// Whether a response body is worth logging. Bodies without a content type
/// are usually empty redirects.
fn is_text(content_type: &str) -> bool {
    content_type.is_empty()
        || content_type.starts_with("text/")
        || content_type.starts_with("application/json")
}

async fn read_body(body: Body) -> Result<Bytes, Error> {
    axum::body::to_bytes(body, usize::MAX)
        .await
        .inspect_err(|error| tracing::error!("Could not read body: {error}"))
        .map_err(|error| Error::SerializationError(error.to_string()))
}

/// Replace the values of [REDACTED_FIELDS] in a URL encoded form.
fn redact_form(form_text: &str) -> String {
    form_text
        .split('&')
        .map(|pair| match pair.split_once('=') {
            Some((key, _)) if REDACTED_FIELDS.contains(&key) => format!("{key}={REDACTED_VALUE}"),
            _ => pair.to_owned(),
        })
        .collect::<Vec<_>>()
        .join("&")
}

fn truncate(body: &str) -> Option<&str> {
    body.char_indices()
        .nth(LOG_BODY_LENGTH_LIMIT)
        .map(|(end, _)| &body[..end])
}

fn log_request(parts: &request::Parts, body: &str) {
    match truncate(body) {
        Some(truncated) => {
            tracing::info!("Received request: {parts:#?}\nbody: {truncated}...");
            tracing::debug!("Full request body: {body:?}");
        }
        None => tracing::info!("Received request: {parts:#?}\nbody: {body:?}"),
    }
}

fn log_response(parts: &response::Parts, body: &str) {
    match truncate(body) {
        Some(truncated) => {
            tracing::info!("Sending response: {parts:#?}\nbody: {truncated}...");
            tracing::debug!("Full response body: {body:?}");
        }
        None => tracing::info!("Sending response: {parts:#?}\nbody: {body:?}"),
    }
}
