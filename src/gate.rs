use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use crate::ledger::{AccountId, Ledger, LedgerError};

/// Upstream AI suggestion generation, out of this crate's hands
#[async_trait]
pub trait SuggestionProvider: Send + Sync {
    async fn suggest(&self, query: &str) -> Result<Value, Box<dyn std::error::Error + Send + Sync>>;
}

#[derive(Debug, thiserror::Error)]
pub enum GateError {
    #[error("query must not be empty")]
    EmptyQuery,
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error("suggestion service failed: {0}")]
    Upstream(String),
}

#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub suggestions: Value,
    pub credits: i64,
}

/// Debit-gated search: a credit is spent if and only if the upstream
/// suggestion call succeeded.
pub struct SearchGate {
    ledger: Arc<Ledger>,
    provider: Arc<dyn SuggestionProvider>,
}

impl SearchGate {
    pub fn new(ledger: Arc<Ledger>, provider: Arc<dyn SuggestionProvider>) -> Self {
        Self { ledger, provider }
    }

    pub async fn search(
        &self,
        account: AccountId,
        query: &str,
    ) -> Result<SearchOutcome, GateError> {
        if query.trim().is_empty() {
            return Err(GateError::EmptyQuery);
        }

        if self.ledger.balance(account)? <= 0 {
            return Err(GateError::Ledger(LedgerError::InsufficientCredit));
        }

        let suggestions = self
            .provider
            .suggest(query)
            .await
            .map_err(|e| GateError::Upstream(e.to_string()))?;

        let credits = self.ledger.debit(account).await?;

        Ok(SearchOutcome {
            suggestions,
            credits,
        })
    }
}
