//! Request router
//!
//! INTENT → DISPATCH ENTRY → BUILD REQUEST → ONE BACKEND CALL → RESPONSE
//!
//! Parameter validation happens before any I/O, and at most one backend call
//! is made per routed request. Retries belong to the transport.

use crate::error::OrchestrationError;
use crate::models::{BackendResponse, IntentAnalysisResult};
use crate::Result;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub mod dispatch;

pub use dispatch::{create_default_dispatch_table, DispatchEntry, DispatchTable};

pub struct RequestRouter {
    table: DispatchTable,
}

impl RequestRouter {
    pub fn new(table: DispatchTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &DispatchTable {
        &self.table
    }

    /// Route an analyzed query to its backend
    pub async fn route(&self, analysis: &IntentAnalysisResult) -> Result<BackendResponse> {
        let intent = analysis.intent;

        let entry = self.table.get(intent).ok_or_else(|| {
            debug!(%intent, "No dispatch entry for intent");
            OrchestrationError::UnsupportedIntent(intent.to_string())
        })?;

        let request = entry.adapter().build_request(&analysis.entities)?;

        let start = Instant::now();
        let outcome = entry.adapter().execute(request).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match &outcome {
            Ok(response) => info!(
                %intent,
                operation = entry.operation,
                degraded = response.is_degraded(),
                elapsed_ms,
                "Backend call completed"
            ),
            Err(e) => warn!(
                %intent,
                operation = entry.operation,
                error = %e,
                elapsed_ms,
                "Backend call failed"
            ),
        }

        outcome
    }

    /// Like `route`, but abandons the in-flight call once `timeout` elapses
    pub async fn route_with_timeout(
        &self,
        analysis: &IntentAnalysisResult,
        timeout: Duration,
    ) -> Result<BackendResponse> {
        tokio::time::timeout(timeout, self.route(analysis))
            .await
            .map_err(|_| {
                OrchestrationError::Timeout(format!(
                    "{} request exceeded {:?}",
                    analysis.intent, timeout
                ))
            })?
    }
}
