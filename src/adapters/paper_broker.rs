//! Paper Broker
//!
//! Simulated execution for backtests and replays. Fills both legs at the
//! order's reference prices moved against us by a fixed slippage fraction,
//! charges commission on traded notional and marks the legs to each bar.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::portfolio::Portfolio;
use crate::domain::price_series::PairBar;
use crate::domain::signal::SignalAction;
use crate::domain::trade::Fill;
use crate::ports::execution::{AccountSnapshot, ExecutionError, ExecutionPort, PairOrder};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaperBrokerConfig {
    pub initial_cash: f64,
    /// Fraction of price paid on buys and given up on sells
    pub slippage: f64,
    /// Fraction of traded notional
    pub commission: f64,
}

impl Default for PaperBrokerConfig {
    fn default() -> Self {
        Self {
            initial_cash: 500.0,
            slippage: 0.0002,
            commission: 0.0,
        }
    }
}

impl From<&crate::config::BacktestSection> for PaperBrokerConfig {
    fn from(section: &crate::config::BacktestSection) -> Self {
        Self {
            initial_cash: section.initial_cash,
            slippage: section.slippage,
            commission: section.commission,
        }
    }
}

#[derive(Debug)]
pub struct PaperBroker {
    config: PaperBrokerConfig,
    portfolio: RwLock<Portfolio>,
}

impl PaperBroker {
    pub fn new(instrument_a: &str, instrument_b: &str, config: PaperBrokerConfig) -> Self {
        Self {
            config,
            portfolio: RwLock::new(Portfolio::new(
                instrument_a.to_string(),
                instrument_b.to_string(),
                config.initial_cash,
            )),
        }
    }

    fn slipped(&self, price: f64, units: f64) -> f64 {
        if units > 0.0 {
            price * (1.0 + self.config.slippage)
        } else {
            price * (1.0 - self.config.slippage)
        }
    }

    fn build_fill(&self, order: &PairOrder, units_a: f64, units_b: f64) -> Fill {
        let price_a = self.slipped(order.price_a, units_a);
        let price_b = self.slipped(order.price_b, units_b);
        let notional = units_a.abs() * price_a + units_b.abs() * price_b;
        Fill {
            timestamp: order.timestamp,
            units_a,
            units_b,
            price_a,
            price_b,
            commission: notional * self.config.commission,
        }
    }
}

#[async_trait]
impl ExecutionPort for PaperBroker {
    async fn mark(&self, bar: &PairBar) -> Result<(), ExecutionError> {
        self.portfolio.write().await.mark(bar.price_a, bar.price_b);
        Ok(())
    }

    async fn submit(&self, order: &PairOrder) -> Result<Fill, ExecutionError> {
        let mut portfolio = self.portfolio.write().await;
        let legs = portfolio.legs();

        let (units_a, units_b) = match order.action {
            SignalAction::EnterLong | SignalAction::EnterShort => {
                if !(order.units.is_finite() && order.units > 0.0) {
                    return Err(ExecutionError::InvalidOrder(format!(
                        "entry size must be > 0, got {}",
                        order.units
                    )));
                }
                // Only enter if flat
                if !legs.is_flat() {
                    return Err(ExecutionError::NotFlat {
                        units_a: legs.units_a,
                        units_b: legs.units_b,
                    });
                }
                if order.action == SignalAction::EnterLong {
                    (order.units, -order.units)
                } else {
                    (-order.units, order.units)
                }
            }
            SignalAction::Exit => {
                if legs.is_flat() {
                    return Err(ExecutionError::Rejected("no open legs to close".to_string()));
                }
                (-legs.units_a, -legs.units_b)
            }
            SignalAction::None => {
                return Err(ExecutionError::InvalidOrder("order carries no action".to_string()));
            }
        };

        let fill = self.build_fill(order, units_a, units_b);

        if order.action != SignalAction::Exit {
            let buy_cost = fill.units_a.max(0.0) * fill.price_a + fill.units_b.max(0.0) * fill.price_b;
            let needed = buy_cost + fill.commission;
            if needed > portfolio.cash {
                return Err(ExecutionError::InsufficientCash {
                    needed,
                    available: portfolio.cash,
                });
            }
        }

        portfolio.apply_fill(&fill);
        tracing::debug!(
            "Filled {}: {} {:+} @ {:.4}, {} {:+} @ {:.4}, cash {:.2}",
            order.action,
            portfolio.leg_a.symbol,
            fill.units_a,
            fill.price_a,
            portfolio.leg_b.symbol,
            fill.units_b,
            fill.price_b,
            portfolio.cash
        );
        Ok(fill)
    }

    async fn account(&self) -> Result<AccountSnapshot, ExecutionError> {
        let portfolio = self.portfolio.read().await;
        Ok(AccountSnapshot {
            cash: portfolio.cash,
            equity: portfolio.equity(),
            legs: portfolio.legs(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::position::LegPositions;
    use approx::assert_relative_eq;
    use chrono::{TimeZone, Utc};

    fn order(action: SignalAction, units: f64, price_a: f64, price_b: f64) -> PairOrder {
        PairOrder {
            instrument_a: "SHEL.L".to_string(),
            instrument_b: "BP.L".to_string(),
            action,
            units,
            timestamp: Utc.with_ymd_and_hms(2025, 3, 3, 9, 0, 0).unwrap(),
            price_a,
            price_b,
        }
    }

    fn frictionless() -> PaperBroker {
        PaperBroker::new(
            "SHEL.L",
            "BP.L",
            PaperBrokerConfig {
                initial_cash: 500.0,
                slippage: 0.0,
                commission: 0.0,
            },
        )
    }

    #[tokio::test]
    async fn test_enter_long_and_exit() {
        let broker = frictionless();

        let fill = broker.submit(&order(SignalAction::EnterLong, 20.0, 10.0, 5.0)).await.unwrap();
        assert_eq!(fill.units_a, 20.0);
        assert_eq!(fill.units_b, -20.0);

        let account = broker.account().await.unwrap();
        assert_eq!(account.legs, LegPositions::new(20.0, -20.0));
        assert_eq!(account.cash, 400.0);

        let exit = broker.submit(&order(SignalAction::Exit, 0.0, 11.0, 5.0)).await.unwrap();
        assert_eq!(exit.units_a, -20.0);
        assert_eq!(exit.units_b, 20.0);

        let account = broker.account().await.unwrap();
        assert!(account.legs.is_flat());
        assert_eq!(account.cash, 520.0);
    }

    #[tokio::test]
    async fn test_enter_short_directions() {
        let broker = frictionless();
        let fill = broker.submit(&order(SignalAction::EnterShort, 10.0, 10.0, 5.0)).await.unwrap();
        assert_eq!(fill.units_a, -10.0);
        assert_eq!(fill.units_b, 10.0);
    }

    #[tokio::test]
    async fn test_slippage_and_commission() {
        let broker = PaperBroker::new(
            "A",
            "B",
            PaperBrokerConfig {
                initial_cash: 1000.0,
                slippage: 0.01,
                commission: 0.001,
            },
        );
        let fill = broker.submit(&order(SignalAction::EnterLong, 10.0, 10.0, 5.0)).await.unwrap();
        assert_relative_eq!(fill.price_a, 10.1, epsilon = 1e-12);
        assert_relative_eq!(fill.price_b, 4.95, epsilon = 1e-12);
        assert_relative_eq!(fill.commission, (101.0 + 49.5) * 0.001, epsilon = 1e-12);
    }

    #[tokio::test]
    async fn test_entry_refused_when_not_flat() {
        let broker = frictionless();
        broker.submit(&order(SignalAction::EnterLong, 5.0, 10.0, 5.0)).await.unwrap();
        let result = broker.submit(&order(SignalAction::EnterShort, 5.0, 10.0, 5.0)).await;
        assert!(matches!(result, Err(ExecutionError::NotFlat { .. })));
    }

    #[tokio::test]
    async fn test_insufficient_cash() {
        let broker = frictionless();
        let result = broker.submit(&order(SignalAction::EnterLong, 100.0, 10.0, 5.0)).await;
        assert!(matches!(result, Err(ExecutionError::InsufficientCash { .. })));
        assert!(broker.account().await.unwrap().legs.is_flat());
    }

    #[tokio::test]
    async fn test_exit_when_flat_rejected() {
        let broker = frictionless();
        let result = broker.submit(&order(SignalAction::Exit, 0.0, 10.0, 5.0)).await;
        assert!(matches!(result, Err(ExecutionError::Rejected(_))));

        let result = broker.submit(&order(SignalAction::None, 1.0, 10.0, 5.0)).await;
        assert!(matches!(result, Err(ExecutionError::InvalidOrder(_))));
    }

    #[tokio::test]
    async fn test_mark_to_market() {
        let broker = frictionless();
        let bar = PairBar::new(Utc.with_ymd_and_hms(2025, 3, 3, 9, 0, 0).unwrap(), 10.0, 5.0);
        broker.mark(&bar).await.unwrap();
        broker.submit(&order(SignalAction::EnterShort, 10.0, 10.0, 5.0)).await.unwrap();
        assert_eq!(broker.account().await.unwrap().equity, 500.0);

        // Spread narrows: short A gains
        let bar = PairBar::new(Utc.with_ymd_and_hms(2025, 3, 3, 9, 5, 0).unwrap(), 9.0, 5.0);
        broker.mark(&bar).await.unwrap();
        assert_eq!(broker.account().await.unwrap().equity, 510.0);
    }
}
