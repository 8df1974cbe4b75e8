//! Spreadwatch - Pairs-Trading Signal Generator Library
//!
//! Rolling z-score of the log-price spread ln(A) - ln(B) between two
//! instruments, a three-state signal machine on top of it, and a paper-traded
//! backtest harness.
//!
//! # Modules
//!
//! - `domain`: Core types (PriceSeries, PairBar, PositionState, SignalDecision, Portfolio)
//! - `ports`: Trait abstractions (MarketDataPort, ExecutionPort)
//! - `strategy`: Signal generation (SpreadStatistics, RollingSpread, SignalStateMachine)
//! - `adapters`: External implementations (CSV data, replay feed, paper broker, CLI)
//! - `config`: Configuration loading and validation
//! - `application`: Trading session, backtest, report and streaming runner

pub mod domain;
pub mod ports;
pub mod strategy;
pub mod adapters;
pub mod config;
pub mod application;
