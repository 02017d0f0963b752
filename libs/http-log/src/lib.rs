use std::time::Instant;

use axum::body::{Body, Bytes};
use axum::extract::Request;
use axum::http::{header, HeaderMap, HeaderValue};
use axum::middleware::Next;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use http_body_util::BodyExt;
use serde_json::Value;
use tracing::{error, info, trace, warn};

pub const REDACTED: &str = "***";

pub async fn print_request_response(
    req: Request,
    next: Next,
) -> std::result::Result<impl IntoResponse, (StatusCode, String)> {
    let start = Instant::now();
    let method = req.method().clone();
    let uri = req.uri().clone();

    let req_headers = req.headers().clone();
    let (parts, body) = req.into_parts();
    let bytes = buffer_and_print("request", req_headers, body).await?;
    let req = Request::from_parts(parts, Body::from(bytes));

    let res = next.run(req).await;

    // event streams never end, buffering them would stall the client
    if is_event_stream(res.headers()) {
        info!("[{} {}] [{}] stream", method, uri, res.status().as_u16());
        return Ok(res);
    }

    let res_headers = res.headers().clone();
    let (parts, body) = res.into_parts();
    let bytes = buffer_and_print("response", res_headers, body).await?;
    let res = Response::from_parts(parts, Body::from(bytes));

    let duration = start.elapsed();

    if res.status().is_success() {
        if duration.as_millis() > 500 {
            warn!(
                "[{} {}] [{}] {}ms",
                method,
                uri,
                res.status().as_u16(),
                duration.as_millis()
            );
        } else {
            info!(
                "[{} {}] [{}] {}ms",
                method,
                uri,
                res.status().as_u16(),
                duration.as_millis()
            );
        }
    } else {
        error!(
            "[{} {}] [{}] {}ms",
            method,
            uri,
            res.status().as_u16(),
            duration.as_millis()
        );
    }

    Ok(res)
}

fn is_event_stream(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("text/event-stream"))
}

pub async fn buffer_and_print<B>(
    direction: &str,
    headers: HeaderMap,
    body: B,
) -> std::result::Result<Bytes, (StatusCode, String)>
where
    B: axum::body::HttpBody<Data = Bytes>,
    B::Error: std::fmt::Display,
{
    let bytes = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(err) => {
            return Err((
                StatusCode::BAD_REQUEST,
                format!("failed to read {direction} body: {err}"),
            ));
        }
    };

    if tracing::enabled!(tracing::Level::TRACE) {
        if let Ok(body) = std::str::from_utf8(&bytes) {
            let headers = redact_headers(headers);
            let body = redact_body(body);
            trace!("{direction} headers = {headers:?} body = {body:?}");
        }
    }

    Ok(bytes)
}

pub fn redact_headers(mut headers: HeaderMap) -> HeaderMap {
    if headers.contains_key(header::AUTHORIZATION) {
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static(REDACTED));
    }
    headers
}

/// Ingest keys never reach the log, whatever the payload nesting
pub fn redact_body(body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(mut value) => {
            redact_value(&mut value);
            value.to_string()
        }
        Err(_) => body.to_string(),
    }
}

fn redact_value(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (k, v) in map.iter_mut() {
                match (k.as_str(), v) {
                    ("ingest", Value::Object(ingest)) => {
                        if let Some(key) = ingest.get_mut("key") {
                            *key = Value::String(REDACTED.to_string());
                        }
                    }
                    ("ingestKey", v) => *v = Value::String(REDACTED.to_string()),
                    (_, v) => redact_value(v),
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(redact_value),
        _ => {}
    }
}
