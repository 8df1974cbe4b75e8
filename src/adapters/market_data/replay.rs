//! Replay Feed
//!
//! Streams aligned history bar by bar over a channel, standing in for a live
//! bar subscription.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::domain::price_series::{AlignedPair, PairBar};

const CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
pub struct ReplayFeed {
    bars: Vec<PairBar>,
    delay: Duration,
}

impl ReplayFeed {
    pub fn new(pair: &AlignedPair) -> Self {
        Self {
            bars: pair.bars.clone(),
            delay: Duration::ZERO,
        }
    }

    /// Pause between bars
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Start sending bars in timestamp order. The channel closes after the last bar
    /// or as soon as the receiver is dropped.
    pub fn spawn(self) -> (mpsc::Receiver<PairBar>, JoinHandle<usize>) {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let handle = tokio::spawn(async move {
            let mut sent = 0usize;
            for bar in self.bars {
                if tx.send(bar).await.is_err() {
                    tracing::debug!("Replay receiver dropped after {} bars", sent);
                    break;
                }
                sent += 1;
                if !self.delay.is_zero() {
                    tokio::time::sleep(self.delay).await;
                }
            }
            sent
        });
        (rx, handle)
    }
}
