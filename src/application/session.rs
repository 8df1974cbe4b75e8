//! Trading Session
//!
//! Per-bar driver shared by the backtest and the streaming runner:
//! mark the broker, reconcile the position from its ledger, decide, execute.
//! The session is the single owner of the spread position between bars.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::BacktestSection;
use crate::domain::position::{PositionState, ReconcileError};
use crate::domain::price_series::PairBar;
use crate::domain::signal::{SignalAction, SignalDecision};
use crate::domain::trade::{Fill, PairTrade};
use crate::ports::execution::{ExecutionError, ExecutionPort, PairOrder};
use crate::strategy::pairs::{BarSignal, PairsSignal};
use crate::strategy::params::StrategyConfig;
use crate::strategy::spread_stats::SpreadError;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Spread(#[from] SpreadError),
    #[error("Broker ledger out of sync: {0}")]
    Reconcile(#[from] ReconcileError),
    #[error("Broker error: {0}")]
    Execution(#[from] ExecutionError),
}

/// Entry size from available cash: min(max_allocation, cash * cash_fraction)
/// spent at `unit_cost` per unit, never below `min_units`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionSizing {
    pub cash_fraction: f64,
    pub max_allocation: f64,
    pub min_units: u32,
    pub unit_cost: f64,
}

impl Default for PositionSizing {
    fn default() -> Self {
        Self::from(&BacktestSection::default())
    }
}

impl From<&BacktestSection> for PositionSizing {
    fn from(section: &BacktestSection) -> Self {
        Self {
            cash_fraction: section.cash_fraction,
            max_allocation: section.max_allocation,
            min_units: section.min_units,
            unit_cost: section.unit_cost,
        }
    }
}

impl PositionSizing {
    pub fn units(&self, cash: f64) -> f64 {
        let allocation = (cash * self.cash_fraction).min(self.max_allocation);
        (allocation / self.unit_cost).floor().max(self.min_units as f64)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: DateTime<Utc>,
    pub equity: f64,
}

#[derive(Debug, Clone, Copy)]
struct OpenEntry {
    side: PositionState,
    fill: Fill,
    z: f64,
}

/// What happened on one bar
#[derive(Debug, Clone)]
pub struct BarOutcome {
    pub signal: BarSignal,
    /// Position after the bar, as the session now holds it
    pub position: PositionState,
    pub fill: Option<Fill>,
    /// Broker refusal of an actionable decision; the position is left unchanged
    pub rejection: Option<String>,
    pub equity: f64,
}

impl BarOutcome {
    pub fn decision(&self) -> &SignalDecision {
        &self.signal.decision
    }
}

/// Everything a session accumulated, consumed by reporting
#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub instrument_a: String,
    pub instrument_b: String,
    pub trades: Vec<PairTrade>,
    pub equity_curve: Vec<EquityPoint>,
    pub bars: usize,
    pub signal_bars: usize,
    pub rejected_orders: usize,
    pub final_position: PositionState,
}

pub struct TradingSession<E: ExecutionPort> {
    instrument_a: String,
    instrument_b: String,
    signal: PairsSignal,
    broker: E,
    sizing: PositionSizing,
    reconcile: bool,
    position: PositionState,
    open_entry: Option<OpenEntry>,
    trades: Vec<PairTrade>,
    equity_curve: Vec<EquityPoint>,
    bars: usize,
    signal_bars: usize,
    rejected_orders: usize,
}

impl<E: ExecutionPort> TradingSession<E> {
    pub fn new(
        instrument_a: impl Into<String>,
        instrument_b: impl Into<String>,
        strategy: &StrategyConfig,
        broker: E,
    ) -> Result<Self, SessionError> {
        let instrument_a = instrument_a.into();
        let instrument_b = instrument_b.into();
        let signal = PairsSignal::new(instrument_a.clone(), instrument_b.clone(), strategy)?;

        Ok(Self {
            instrument_a,
            instrument_b,
            signal,
            broker,
            sizing: PositionSizing::default(),
            reconcile: true,
            position: PositionState::Flat,
            open_entry: None,
            trades: Vec::new(),
            equity_curve: Vec::new(),
            bars: 0,
            signal_bars: 0,
            rejected_orders: 0,
        })
    }

    pub fn with_sizing(mut self, sizing: PositionSizing) -> Self {
        self.sizing = sizing;
        self
    }

    /// Derive the position from the broker ledger before each decision
    pub fn with_reconciliation(mut self, enabled: bool) -> Self {
        self.reconcile = enabled;
        self
    }

    pub fn position(&self) -> PositionState {
        self.position
    }

    pub fn trades(&self) -> &[PairTrade] {
        &self.trades
    }

    /// Process one bar. Bars must arrive once each, in timestamp order.
    pub async fn on_bar(&mut self, bar: &PairBar) -> Result<BarOutcome, SessionError> {
        self.broker.mark(bar).await?;

        let adopted = self.reconcile && self.reconcile_position(bar).await?;

        let signal = self.signal.on_bar(bar, self.position)?;
        if adopted {
            if let (Some(entry), Some(z)) = (self.open_entry.as_mut(), signal.point.z_score) {
                entry.z = z;
            }
        }
        self.bars += 1;
        if signal.point.z_score.is_some() {
            self.signal_bars += 1;
        }

        let decision = signal.decision;
        let mut fill = None;
        let mut rejection = None;

        if decision.action.is_actionable() {
            let z = signal.point.z_score.unwrap_or(f64::NAN);
            match self.execute(bar, &decision, z).await {
                Ok(f) => fill = Some(f),
                Err(e) => {
                    tracing::warn!("Order {} rejected at z={:.2}: {}", decision.action, z, e);
                    self.rejected_orders += 1;
                    rejection = Some(e.to_string());
                }
            }
        } else if let Some(z) = signal.point.z_score {
            tracing::debug!("{} z={:.2} position={} HOLD", bar.timestamp, z, self.position);
        }

        let equity = self.broker.account().await?.equity;
        self.equity_curve.push(EquityPoint {
            timestamp: bar.timestamp,
            equity,
        });

        Ok(BarOutcome {
            signal,
            position: self.position,
            fill,
            rejection,
            equity,
        })
    }

    /// Returns true when an open position was taken over from the ledger.
    ///
    /// An adopted position is booked as if entered at this bar's marks, so its
    /// round trip is still recorded when it exits. Its entry z is this bar's
    /// z-score, or NaN while the window is warming up.
    async fn reconcile_position(&mut self, bar: &PairBar) -> Result<bool, SessionError> {
        let legs = self.broker.account().await?.legs;
        let ledger = legs.reconcile()?;
        if ledger == self.position {
            return Ok(false);
        }

        tracing::warn!(
            "Position reconciled from broker ledger: {} -> {}",
            self.position,
            ledger
        );
        self.position = ledger;
        if ledger.is_flat() {
            self.open_entry = None;
            return Ok(false);
        }

        self.open_entry = Some(OpenEntry {
            side: ledger,
            fill: Fill {
                timestamp: bar.timestamp,
                units_a: legs.units_a,
                units_b: legs.units_b,
                price_a: bar.price_a,
                price_b: bar.price_b,
                commission: 0.0,
            },
            z: f64::NAN,
        });
        Ok(true)
    }

    async fn execute(
        &mut self,
        bar: &PairBar,
        decision: &SignalDecision,
        z: f64,
    ) -> Result<Fill, ExecutionError> {
        let units = match decision.action {
            SignalAction::EnterLong | SignalAction::EnterShort => {
                let cash = self.broker.account().await?.cash;
                self.sizing.units(cash)
            }
            _ => self.open_entry.map(|e| e.fill.units_a.abs()).unwrap_or(0.0),
        };

        let order = PairOrder {
            instrument_a: self.instrument_a.clone(),
            instrument_b: self.instrument_b.clone(),
            action: decision.action,
            units,
            timestamp: bar.timestamp,
            price_a: bar.price_a,
            price_b: bar.price_b,
        };
        let fill = self.broker.submit(&order).await?;

        match decision.action {
            SignalAction::EnterLong | SignalAction::EnterShort => {
                tracing::info!(
                    "{}: ENTER {}: Z={:.2}, Size={}",
                    bar.timestamp,
                    decision.position,
                    z,
                    units
                );
                self.open_entry = Some(OpenEntry {
                    side: decision.position,
                    fill,
                    z,
                });
            }
            SignalAction::Exit => {
                let reason = decision
                    .exit_reason
                    .unwrap_or(crate::domain::signal::ExitReason::MeanReversion);
                tracing::info!("{}: EXIT SPREAD: Z={:.2}, Reason: {}", bar.timestamp, z, reason);
                if let Some(entry) = self.open_entry.take() {
                    let trade = PairTrade::from_fills(entry.side, &entry.fill, &fill, entry.z, z, reason);
                    tracing::info!("TRADE CLOSED: P&L: {:.2}", trade.pnl);
                    self.trades.push(trade);
                }
            }
            SignalAction::None => {}
        }

        self.position = decision.position;
        Ok(fill)
    }

    pub fn finish(self) -> SessionSummary {
        SessionSummary {
            instrument_a: self.instrument_a,
            instrument_b: self.instrument_b,
            trades: self.trades,
            equity_curve: self.equity_curve,
            bars: self.bars,
            signal_bars: self.signal_bars,
            rejected_orders: self.rejected_orders,
            final_position: self.position,
        }
    }
}
