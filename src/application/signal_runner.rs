//! Signal Runner
//!
//! Streaming counterpart of the backtest: drains a bar channel into a shared
//! trading session until the feed ends or a stop is requested.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex, Notify, RwLock};

use crate::application::session::{SessionError, SessionSummary, TradingSession};
use crate::domain::position::PositionState;
use crate::domain::price_series::PairBar;
use crate::ports::execution::ExecutionPort;

/// Status snapshot of the runner
#[derive(Debug, Clone)]
pub struct RunnerStatus {
    pub is_running: bool,
    pub position: PositionState,
    pub bars_processed: usize,
    pub trades: usize,
    pub current_zscore: Option<f64>,
}

#[derive(Debug, Default)]
struct Progress {
    bars: usize,
    last_z: Option<f64>,
}

pub struct SignalRunner<E: ExecutionPort> {
    session: Arc<Mutex<TradingSession<E>>>,
    progress: Arc<RwLock<Progress>>,
    is_running: Arc<RwLock<bool>>,
    shutdown: Arc<Notify>,
}

impl<E: ExecutionPort> SignalRunner<E> {
    pub fn new(session: TradingSession<E>) -> Self {
        Self {
            session: Arc::new(Mutex::new(session)),
            progress: Arc::new(RwLock::new(Progress::default())),
            is_running: Arc::new(RwLock::new(false)),
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Process bars until the channel closes or `stop` is called.
    ///
    /// A stop requested before `run` starts makes it return at once. Returns
    /// the number of bars processed by this call. Session errors stop the loop
    /// and are returned.
    pub async fn run(&self, mut bars: mpsc::Receiver<PairBar>) -> Result<usize, SessionError> {
        *self.is_running.write().await = true;
        tracing::info!("Starting signal runner");

        let mut processed = 0usize;
        loop {
            let bar = tokio::select! {
                biased;
                _ = self.shutdown.notified() => {
                    tracing::info!("Stop requested after {} bars", processed);
                    break;
                }
                bar = bars.recv() => match bar {
                    Some(bar) => bar,
                    None => {
                        tracing::info!("Bar feed closed after {} bars", processed);
                        break;
                    }
                },
            };

            let outcome = {
                let mut session = self.session.lock().await;
                session.on_bar(&bar).await
            };
            let outcome = match outcome {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::error!("Session error at {}: {}", bar.timestamp, e);
                    *self.is_running.write().await = false;
                    return Err(e);
                }
            };

            processed += 1;
            let mut progress = self.progress.write().await;
            progress.bars += 1;
            progress.last_z = outcome.signal.point.z_score;

            match outcome.signal.point.z_score {
                Some(z) => tracing::info!(
                    "{} | spread {:.5} | Z-score: {:.2} | {}",
                    bar.timestamp,
                    outcome.signal.point.spread,
                    z,
                    outcome.decision()
                ),
                None => tracing::info!("{} | Warming up...", bar.timestamp),
            }
        }

        *self.is_running.write().await = false;
        tracing::info!("Signal runner stopped");
        Ok(processed)
    }

    /// Stop after the bar currently being processed, or while waiting for one
    pub async fn stop(&self) {
        // Stored as a permit when no run is waiting yet
        self.shutdown.notify_one();
        *self.is_running.write().await = false;
        tracing::info!("Stop signal sent to signal runner");
    }

    pub async fn status(&self) -> RunnerStatus {
        let session = self.session.lock().await;
        let progress = self.progress.read().await;
        RunnerStatus {
            is_running: *self.is_running.read().await,
            position: session.position(),
            bars_processed: progress.bars,
            trades: session.trades().len(),
            current_zscore: progress.last_z,
        }
    }

    /// Consume the runner and close out its session.
    ///
    /// Returns `None` while another clone still shares the session.
    pub fn into_summary(self) -> Option<SessionSummary> {
        Arc::try_unwrap(self.session)
            .ok()
            .map(|session| session.into_inner().finish())
    }
}

// Clones share the session and the running flag
impl<E: ExecutionPort> Clone for SignalRunner<E> {
    fn clone(&self) -> Self {
        Self {
            session: Arc::clone(&self.session),
            progress: Arc::clone(&self.progress),
            is_running: Arc::clone(&self.is_running),
            shutdown: Arc::clone(&self.shutdown),
        }
    }
}
