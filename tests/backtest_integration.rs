//! Pairs Backtest Integration Tests
//!
//! End-to-end checks across the crate's layers:
//! 1. CSV files -> alignment -> batch z-scores
//! 2. Batch vs incremental z-scores on gapped data
//! 3. Synthetic pair -> trading session -> paper broker -> report
//! 4. Streaming replay through the signal runner
//!
//! All tests are deterministic (seeded data, no network).

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use spreadwatch::adapters::market_data::{
    write_price_csv, CsvMarketData, ReplayFeed, SyntheticPair,
};
use spreadwatch::adapters::paper_broker::{PaperBroker, PaperBrokerConfig};
use spreadwatch::application::{
    run_backtest, BacktestReport, BacktestSettings, SignalRunner, TradingSession,
};
use spreadwatch::domain::{align, AlignedPair, ExitReason, PositionState, PriceSeries};
use spreadwatch::ports::{ExecutionPort, MarketDataPort};
use spreadwatch::strategy::{RollingSpread, SignalThresholds, SpreadStatistics, StrategyConfig};

// ============================================================================
// Test Fixtures
// ============================================================================

const INITIAL_CASH: f64 = 5_000.0;

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 2, 8, 0, 0).unwrap()
}

/// Seeded synthetic legs, optionally with missing bars on either side
fn synthetic_legs(bars: usize, gaps: f64) -> (PriceSeries, PriceSeries) {
    SyntheticPair::new("SHEL.L", "BP.L", start())
        .with_seed(11)
        .with_gaps(gaps)
        .generate(bars)
        .unwrap()
}

fn synthetic_pair(bars: usize) -> AlignedPair {
    let (a, b) = synthetic_legs(bars, 0.0);
    align(&a, &b).unwrap()
}

fn settings() -> BacktestSettings {
    BacktestSettings {
        strategy: StrategyConfig::default(),
        initial_cash: INITIAL_CASH,
        ..BacktestSettings::default()
    }
}

fn broker() -> PaperBroker {
    PaperBroker::new(
        "SHEL.L",
        "BP.L",
        PaperBrokerConfig {
            initial_cash: INITIAL_CASH,
            ..PaperBrokerConfig::default()
        },
    )
}

// ============================================================================
// Test Module: CSV -> Alignment -> Z-Scores
// ============================================================================

mod csv_to_zscores {
    use super::*;

    /// Test: Files written by the exporter load back into the same z-scores
    #[tokio::test]
    async fn test_csv_history_matches_in_memory() {
        let (a, b) = synthetic_legs(600, 0.05);
        let dir = tempfile::tempdir().unwrap();
        let source = CsvMarketData::new(dir.path());
        write_price_csv(&source.path_for("SHEL.L"), &a).unwrap();
        write_price_csv(&source.path_for("BP.L"), &b).unwrap();

        let (loaded_a, loaded_b) = source.fetch_pair("SHEL.L", "BP.L").await.unwrap();
        assert_eq!(loaded_a.len(), a.len());
        assert_eq!(loaded_b.len(), b.len());

        let from_files = SpreadStatistics::compute(&loaded_a, &loaded_b, 60).unwrap();
        let in_memory = SpreadStatistics::compute(&a, &b, 60).unwrap();
        assert_eq!(from_files.z_scores(), in_memory.z_scores());
    }

    /// Test: Unknown instruments surface as errors, not empty series
    #[tokio::test]
    async fn test_missing_file_is_unknown_instrument() {
        let dir = tempfile::tempdir().unwrap();
        let source = CsvMarketData::new(dir.path());
        assert!(source.fetch_history("NOPE").await.is_err());
    }

    /// Test: The first window-1 aligned bars have no z-score, every later bar does
    #[test]
    fn test_warm_up_prefix_on_gapped_data() {
        let (a, b) = synthetic_legs(400, 0.1);
        let series = SpreadStatistics::compute(&a, &b, 30).unwrap();
        let aligned = align(&a, &b).unwrap();

        assert_eq!(series.len(), aligned.len());
        assert!(series.points[..29].iter().all(|p| p.z_score.is_none()));
        assert_eq!(series.defined_count(), aligned.len() - 29);
    }
}

// ============================================================================
// Test Module: Batch vs Incremental
// ============================================================================

mod batch_vs_incremental {
    use super::*;

    /// Test: Streaming the aligned bars reproduces the batch output exactly
    #[test]
    fn test_incremental_equals_batch() {
        let (a, b) = synthetic_legs(1500, 0.05);
        let aligned = align(&a, &b).unwrap();
        let batch = SpreadStatistics::compute_aligned(&aligned, 60).unwrap();

        let mut rolling = RollingSpread::new("SHEL.L", "BP.L", 60).unwrap();
        let streamed: Vec<_> = aligned
            .bars
            .iter()
            .map(|bar| rolling.push(bar).unwrap())
            .collect();

        assert_eq!(streamed, batch.points);
    }
}

// ============================================================================
// Test Module: Session -> Paper Broker -> Report
// ============================================================================

mod backtest_flow {
    use super::*;

    fn run(pair: &AlignedPair, broker: impl ExecutionPort) -> BacktestReport {
        tokio_test::block_on(run_backtest(&settings(), pair, broker)).unwrap()
    }

    /// Test: Every closed trade obeys the entry and exit thresholds
    #[test]
    fn test_trades_respect_thresholds() {
        let report = run(&synthetic_pair(3000), broker());
        let thresholds = SignalThresholds::default();

        assert!(report.trades.total > 0, "expected at least one round trip");
        for trade in &report.trade_log {
            match trade.side {
                PositionState::LongSpread => assert!(trade.entry_z < -thresholds.entry),
                PositionState::ShortSpread => assert!(trade.entry_z > thresholds.entry),
                PositionState::Flat => panic!("trade recorded from a flat position"),
            }
            match trade.exit_reason {
                ExitReason::MeanReversion => assert!(trade.exit_z.abs() < thresholds.exit),
                ExitReason::StopLoss => assert!(trade.exit_z.abs() > thresholds.max),
            }
            assert!(trade.exit_time > trade.entry_time);
        }
    }

    /// Test: Trades never overlap in time
    #[test]
    fn test_round_trips_are_sequential() {
        let report = run(&synthetic_pair(3000), broker());
        for pair in report.trade_log.windows(2) {
            assert!(pair[1].entry_time > pair[0].exit_time);
        }
    }

    /// Test: The session's final position agrees with the broker ledger
    #[tokio::test]
    async fn test_final_position_matches_ledger() {
        let broker = Arc::new(broker());
        let report = run_backtest(&settings(), &synthetic_pair(3000), Arc::clone(&broker))
            .await
            .unwrap();

        let account = broker.account().await.unwrap();
        assert_eq!(account.legs.reconcile().unwrap(), report.final_position);
        assert!((account.equity - report.final_value).abs() < 1e-9);
    }

    /// Test: Same data, same settings, same report
    #[test]
    fn test_backtest_is_deterministic() {
        let pair = synthetic_pair(2000);
        let first = run(&pair, broker());
        let second = run(&pair, broker());

        assert_eq!(first.trade_log, second.trade_log);
        assert_eq!(first.final_value, second.final_value);
    }

    /// Test: History shorter than the window produces no signals at all
    #[test]
    fn test_short_history_is_quiet() {
        let report = run(&synthetic_pair(59), broker());
        assert_eq!(report.signal_bars, 0);
        assert_eq!(report.trades.total, 0);
        assert_eq!(report.final_value, INITIAL_CASH);
    }
}

// ============================================================================
// Test Module: Streaming Replay
// ============================================================================

mod replay_flow {
    use super::*;

    /// Test: Replaying bars over a channel trades exactly like the backtest
    #[tokio::test]
    async fn test_replay_matches_backtest() {
        let pair = synthetic_pair(2000);
        let settings = settings();
        let backtest = run_backtest(&settings, &pair, broker()).await.unwrap();

        let session = TradingSession::new("SHEL.L", "BP.L", &settings.strategy, broker())
            .unwrap()
            .with_sizing(settings.sizing)
            .with_reconciliation(settings.reconcile_positions);
        let runner = SignalRunner::new(session);

        let (bars, feed) = ReplayFeed::new(&pair).spawn();
        let processed = runner.run(bars).await.unwrap();
        assert_eq!(processed, pair.len());
        assert_eq!(feed.await.unwrap(), pair.len());

        let summary = runner.into_summary().unwrap();
        assert_eq!(summary.trades, backtest.trade_log);
        assert_eq!(summary.final_position, backtest.final_position);
    }
}
