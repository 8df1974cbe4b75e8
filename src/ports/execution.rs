use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::position::LegPositions;
use crate::domain::price_series::PairBar;
use crate::domain::signal::SignalAction;
use crate::domain::trade::Fill;

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("Order rejected: {0}")]
    Rejected(String),
    #[error("Insufficient cash: need {needed:.2}, have {available:.2}")]
    InsufficientCash { needed: f64, available: f64 },
    #[error("Entry refused, legs are not flat: A={units_a}, B={units_b}")]
    NotFlat { units_a: f64, units_b: f64 },
    #[error("Invalid order: {0}")]
    InvalidOrder(String),
}

/// Order for both legs of the pair, derived from one actionable decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairOrder {
    pub instrument_a: String,
    pub instrument_b: String,
    pub action: SignalAction,
    /// Units per leg for entries. Ignored for `Exit`, which closes both legs in full.
    pub units: f64,
    pub timestamp: DateTime<Utc>,
    /// Reference prices of the bar that produced the decision
    pub price_a: f64,
    pub price_b: f64,
}

/// Cash and equity of the account behind the execution port
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    pub cash: f64,
    pub equity: f64,
    pub legs: LegPositions,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ExecutionPort: Send + Sync {
    /// Update mark prices with the latest bar
    async fn mark(&self, bar: &PairBar) -> Result<(), ExecutionError>;

    /// Execute an order against both legs
    async fn submit(&self, order: &PairOrder) -> Result<Fill, ExecutionError>;

    /// Current account state, including the ledger used for reconciliation
    async fn account(&self) -> Result<AccountSnapshot, ExecutionError>;
}

/// Shared brokers: lets a caller keep a handle on the ledger while a session drives it
#[async_trait]
impl<T: ExecutionPort + ?Sized> ExecutionPort for std::sync::Arc<T> {
    async fn mark(&self, bar: &PairBar) -> Result<(), ExecutionError> {
        (**self).mark(bar).await
    }

    async fn submit(&self, order: &PairOrder) -> Result<Fill, ExecutionError> {
        (**self).submit(order).await
    }

    async fn account(&self) -> Result<AccountSnapshot, ExecutionError> {
        (**self).account().await
    }
}
