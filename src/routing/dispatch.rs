//! Dispatch table
//!
//! Static intent → adapter mapping, built once at startup and only read
//! afterwards. Intents without an entry are unsupported. Each adapter owns
//! the parameter builder for its own request shape, so a builder can never
//! be paired with the wrong backend.

use crate::adapters::BackendAdapter;
use crate::error::OrchestrationError;
use crate::models::Intent;
use crate::Result;
use std::collections::HashMap;
use std::sync::Arc;

pub struct DispatchEntry {
    pub operation: &'static str,
    adapter: Arc<dyn BackendAdapter>,
}

impl DispatchEntry {
    pub fn adapter(&self) -> &Arc<dyn BackendAdapter> {
        &self.adapter
    }
}

#[derive(Default)]
pub struct DispatchTable {
    entries: HashMap<Intent, DispatchEntry>,
}

impl DispatchTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, intent: Intent, adapter: Arc<dyn BackendAdapter>) -> Result<()> {
        if intent == Intent::Unknown {
            return Err(OrchestrationError::Config(
                "the unknown intent cannot be dispatched".to_string(),
            ));
        }

        self.entries.insert(
            intent,
            DispatchEntry {
                operation: adapter.operation(),
                adapter,
            },
        );
        Ok(())
    }

    pub fn get(&self, intent: Intent) -> Option<&DispatchEntry> {
        self.entries.get(&intent)
    }

    /// Supported intents, in declaration order of `Intent`
    pub fn intents(&self) -> Vec<Intent> {
        let mut intents: Vec<Intent> = self.entries.keys().copied().collect();
        intents.sort();
        intents
    }
}

/// Default table: market analysis and strategy creation.
/// `backtest` and `strategy_execution` are recognised but not yet routed.
pub fn create_default_dispatch_table(
    market: Arc<dyn BackendAdapter>,
    trading: Arc<dyn BackendAdapter>,
) -> Result<DispatchTable> {
    let mut table = DispatchTable::new();
    table.register(Intent::MarketAnalysis, market)?;
    table.register(Intent::StrategyCreation, trading)?;
    Ok(table)
}
