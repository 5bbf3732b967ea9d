//! Run-wide cancellation
//!
//! One `CancellationToken` per crawl run. Triggering it closes the frontier
//! so idle workers wake up, and every blocking call in a worker races
//! against the token so busy workers return promptly too.

use crate::crawler::frontier::Frontier;
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Clone)]
pub struct ShutdownController {
    token: CancellationToken,
    frontier: Arc<Frontier>,
}

impl ShutdownController {
    pub fn new(token: CancellationToken, frontier: Arc<Frontier>) -> Self {
        Self { token, frontier }
    }

    /// Fires the cancellation signal and closes the frontier
    ///
    /// Safe to call more than once; only the first call has an effect.
    pub fn trigger(&self) {
        if self.token.is_cancelled() {
            return;
        }
        info!("Shutdown requested, stopping workers");
        self.token.cancel();
        self.frontier.close();
    }

    pub fn is_triggered(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Triggers shutdown on the first Ctrl+C; a second Ctrl+C exits at once
    pub fn listen_for_interrupt(&self) -> JoinHandle<()> {
        let controller = self.clone();

        tokio::spawn(async move {
            tokio::select! {
                _ = controller.token.cancelled() => {}
                signal = tokio::signal::ctrl_c() => {
                    if signal.is_err() {
                        warn!("Could not listen for Ctrl+C");
                        return;
                    }
                    info!("Received Ctrl+C, press again to force quit");
                    controller.trigger();

                    if tokio::signal::ctrl_c().await.is_ok() {
                        warn!("Force quit requested, exiting immediately");
                        std::process::exit(130);
                    }
                }
            }
        })
    }
}

/// Runs `future` unless `token` fires first; `None` means cancelled
pub async fn until_cancelled<F: Future>(token: &CancellationToken, future: F) -> Option<F::Output> {
    tokio::select! {
        biased;
        _ = token.cancelled() => None,
        output = future => Some(output),
    }
}
