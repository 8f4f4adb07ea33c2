//! Request/response logging middleware
//!
//! Each logged exchange gets a correlation id (`req-xxxxxxxx`), echoed back
//! in the `x-correlation-id` response header. Bodies are buffered, masked and
//! truncated before they reach the log.

use axum::{
    body::{to_bytes, Body, Bytes},
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";

const MAX_LOGGED_BODY_CHARS: usize = 500;
const MAX_USER_AGENT_CHARS: usize = 100;
const MAX_BUFFERED_BODY_BYTES: usize = 2 * 1024 * 1024;
const MASK: &str = "***";
const SENSITIVE_KEYS: &[&str] = &["password", "api_key", "token", "secret"];

lazy_static! {
    /// `"key": "value"` pairs in text that is not valid JSON (e.g. cut off)
    static ref SENSITIVE_PAIR_RE: Regex =
        Regex::new(r#"(?i)"(password|api_key|token|secret)"\s*:\s*"[^"]*""#)
            .expect("sensitive pair pattern is valid");
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub excluded_paths: Vec<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            excluded_paths: vec!["/".to_string(), "/health".to_string()],
        }
    }
}

impl LoggingConfig {
    pub fn is_excluded(&self, path: &str) -> bool {
        self.excluded_paths.iter().any(|p| p == path)
    }
}

/// axum middleware; install with `from_fn_with_state(Arc<LoggingConfig>, log_requests)`
pub async fn log_requests(
    State(config): State<Arc<LoggingConfig>>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    if config.is_excluded(&path) {
        return next.run(request).await;
    }

    let correlation_id = correlation_id();
    let start = Instant::now();
    let method = request.method().clone();
    let query = request.uri().query().unwrap_or_default().to_string();
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let ip = client_ip(request.headers(), peer);
    let user_agent = request
        .headers()
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(|ua| truncate_body(ua, MAX_USER_AGENT_CHARS))
        .unwrap_or_default();

    let (parts, body) = request.into_parts();
    let request_body = match to_bytes(body, MAX_BUFFERED_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(correlation_id = %correlation_id, error = %e, "Failed to read request body");
            return (StatusCode::PAYLOAD_TOO_LARGE, "request body too large").into_response();
        }
    };

    let logged_body = if has_body(&method) {
        loggable_body(&request_body)
    } else {
        String::new()
    };

    info!(
        correlation_id = %correlation_id,
        method = %method,
        path = %path,
        query = %query,
        client_ip = %ip,
        user_agent = %user_agent,
        body = %logged_body,
        "request"
    );

    let response = next
        .run(Request::from_parts(parts, Body::from(request_body)))
        .await;

    let duration_ms = start.elapsed().as_millis() as u64;
    let (mut parts, body) = response.into_parts();
    let response_body = match to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            error!(correlation_id = %correlation_id, error = %e, "Failed to read response body");
            Bytes::new()
        }
    };

    let status = parts.status;
    let logged_body = loggable_body(&response_body);
    if status.as_u16() >= 400 {
        error!(
            correlation_id = %correlation_id,
            status = status.as_u16(),
            duration_ms,
            body = %logged_body,
            "response"
        );
    } else {
        info!(
            correlation_id = %correlation_id,
            status = status.as_u16(),
            duration_ms,
            body = %logged_body,
            "response"
        );
    }

    if let Ok(value) = HeaderValue::from_str(&correlation_id) {
        parts.headers.insert(CORRELATION_ID_HEADER, value);
    }
    Response::from_parts(parts, Body::from(response_body))
}

fn has_body(method: &Method) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::PATCH)
}

fn loggable_body(bytes: &[u8]) -> String {
    if bytes.is_empty() {
        return String::new();
    }
    let text = String::from_utf8_lossy(bytes);
    truncate_body(&filter_sensitive(&text), MAX_LOGGED_BODY_CHARS)
}

/// `req-` followed by the first 8 hex chars of a v4 UUID
pub fn correlation_id() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("req-{}", &id[..8])
}

/// Cut to `max_chars` characters, appending `...` when anything was dropped
pub fn truncate_body(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// Mask values of sensitive keys at any depth
pub fn filter_sensitive(text: &str) -> String {
    match serde_json::from_str::<Value>(text) {
        Ok(mut value) => {
            mask_value(&mut value);
            value.to_string()
        }
        Err(_) => SENSITIVE_PAIR_RE
            .replace_all(text, |caps: &regex::Captures| {
                format!("\"{}\": \"{}\"", &caps[1], MASK)
            })
            .into_owned(),
    }
}

fn mask_value(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, inner) in map.iter_mut() {
                let lowered = key.to_lowercase();
                if SENSITIVE_KEYS.contains(&lowered.as_str()) {
                    *inner = Value::String(MASK.to_string());
                } else {
                    mask_value(inner);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(mask_value),
        _ => {}
    }
}

/// x-forwarded-for (first hop), then x-real-ip, then the socket peer
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let header_value = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    if let Some(forwarded) = header_value("x-forwarded-for") {
        if let Some(first) = forwarded.split(',').map(str::trim).find(|s| !s.is_empty()) {
            return first.to_string();
        }
    }

    header_value("x-real-ip")
        .map(str::to_string)
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}
