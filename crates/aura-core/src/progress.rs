//! Simulated progress for in-flight generation requests.
//!
//! The percentage is cosmetic: it climbs by `step` every `tick_ms` up to
//! `cap`, jumps to 100 when the request settles successfully, and drops back
//! to 0 afterwards. Every ticket stops its timer when settled or dropped.

use crate::config::ProgressConfig;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

pub struct ProgressSimulator;

impl ProgressSimulator {
    /// Start ticking. Must be called inside a tokio runtime.
    pub fn start(config: &ProgressConfig) -> ProgressTicket {
        let (tx, rx) = watch::channel(0u8);
        let tx = Arc::new(tx);
        let step = config.step;
        let cap = config.effective_cap();
        let period = config.tick();

        let ticker = {
            let tx = tx.clone();
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(period);
                interval.tick().await;
                loop {
                    interval.tick().await;
                    tx.send_modify(|v| *v = v.saturating_add(step).min(cap));
                }
            })
        };

        ProgressTicket {
            tx,
            rx,
            ticker: Some(ticker),
            reset_delay: config.reset_delay(),
        }
    }
}

/// Handle to one running simulation.
pub struct ProgressTicket {
    tx: Arc<watch::Sender<u8>>,
    rx: watch::Receiver<u8>,
    ticker: Option<JoinHandle<()>>,
    reset_delay: Duration,
}

impl ProgressTicket {
    pub fn value(&self) -> u8 {
        *self.rx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<u8> {
        self.tx.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.ticker.is_some()
    }

    /// Stop the timer, leaving the value where it is.
    pub fn cancel(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
    }

    /// Jump to 100, then reset to 0 after the configured delay.
    pub fn finish(mut self) {
        self.cancel();
        self.tx.send_replace(100);
        let tx = self.tx.clone();
        let delay = self.reset_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            tx.send_replace(0);
        });
    }

    pub fn fail(mut self) {
        self.cancel();
        self.tx.send_replace(0);
    }
}

impl Drop for ProgressTicket {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Run `fut` under a fresh ticket.
pub async fn track<F, T, E>(config: &ProgressConfig, fut: F) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
{
    track_with(ProgressSimulator::start(config), fut).await
}

/// Run `fut` under `ticket`, settling the ticket whichever way it ends.
pub async fn track_with<F, T, E>(ticket: ProgressTicket, fut: F) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
{
    let out = fut.await;
    match &out {
        Ok(_) => ticket.finish(),
        Err(_) => ticket.fail(),
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
