//! HTTP transport to backend services
//!
//! One pooled client per backend. Failures are classified so callers can
//! tell an unreachable service from one that answered badly.

use crate::error::OrchestrationError;
use crate::Result;
use reqwest::{Client, Method};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// Send JSON, get JSON
#[async_trait::async_trait]
pub trait HttpTransport: Send + Sync {
    /// Service name used in error messages and logs
    fn service(&self) -> &str;

    async fn call(
        &self,
        method: Method,
        endpoint: &str,
        params: Option<&Value>,
        body: Option<&Value>,
    ) -> Result<Value>;

    async fn post_json(&self, endpoint: &str, body: &Value) -> Result<Value> {
        self.call(Method::POST, endpoint, None, Some(body)).await
    }
}

/// reqwest-backed transport bound to one base URL
#[derive(Clone)]
pub struct BackendClient {
    client: Client,
    service: String,
    base_url: String,
    timeout: Duration,
}

impl BackendClient {
    pub fn new(service: &str, base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(60))
            .pool_max_idle_per_host(8)
            .timeout(timeout)
            .build()
            .map_err(|e| {
                OrchestrationError::Config(format!("Failed to build {} HTTP client: {}", service, e))
            })?;

        Ok(Self {
            client,
            service: service.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn classify_send_error(&self, endpoint: &str, e: reqwest::Error) -> OrchestrationError {
        if e.is_timeout() {
            OrchestrationError::Timeout(format!(
                "{} API did not answer {} within {:?}",
                self.service, endpoint, self.timeout
            ))
        } else {
            OrchestrationError::BackendUnavailable {
                service: self.service.clone(),
                message: e.to_string(),
            }
        }
    }
}

#[async_trait::async_trait]
impl HttpTransport for BackendClient {
    fn service(&self) -> &str {
        &self.service
    }

    async fn call(
        &self,
        method: Method,
        endpoint: &str,
        params: Option<&Value>,
        body: Option<&Value>,
    ) -> Result<Value> {
        let url = format!("{}{}", self.base_url, endpoint);
        debug!(service = %self.service, %method, %url, "Calling backend");

        let mut request = self.client.request(method, url);
        if let Some(params) = params {
            request = request.query(params);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| self.classify_send_error(endpoint, e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| self.classify_send_error(endpoint, e))?;

        if !status.is_success() {
            warn!(
                service = %self.service,
                status = status.as_u16(),
                endpoint,
                "Backend returned error status"
            );
            return Err(OrchestrationError::backend_status(
                &self.service,
                status.as_u16(),
                &text,
            ));
        }

        serde_json::from_str(&text).map_err(|e| OrchestrationError::MalformedResponse {
            service: self.service.clone(),
            message: format!("Invalid JSON response from {}: {}", endpoint, e),
        })
    }
}

/// Recording fake used by adapter and router tests
#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    pub(crate) type Reply = Box<dyn Fn() -> Result<Value> + Send + Sync>;

    pub(crate) struct RecordingTransport {
        service: &'static str,
        reply: Reply,
        pub(crate) calls: Mutex<Vec<(Method, String, Option<Value>)>>,
    }

    impl RecordingTransport {
        pub(crate) fn replying(service: &'static str, reply: Reply) -> Self {
            Self {
                service,
                reply,
                calls: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn ok(service: &'static str, value: Value) -> Self {
            Self::replying(service, Box::new(move || Ok(value.clone())))
        }

        pub(crate) fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        pub(crate) fn last_call(&self) -> Option<(Method, String, Option<Value>)> {
            self.calls.lock().unwrap().last().cloned()
        }
    }

    #[async_trait::async_trait]
    impl HttpTransport for RecordingTransport {
        fn service(&self) -> &str {
            self.service
        }

        async fn call(
            &self,
            method: Method,
            endpoint: &str,
            _params: Option<&Value>,
            body: Option<&Value>,
        ) -> Result<Value> {
            self.calls
                .lock()
                .unwrap()
                .push((method, endpoint.to_string(), body.cloned()));
            (self.reply)()
        }
    }
}
