//! Suspension points of a running tour. Each wait resolves on whichever of
//! {timer, continue signal, abort} comes first; an abort that is already
//! pending wins before anything is awaited.

use log::debug;
use std::time::Duration;
use tokio::sync::{Notify, watch};

/// Outcome of a suspension cut short by the user stopping the tour.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Aborted;

/// Owner side of the cancellation token.
#[derive(Debug)]
pub struct AbortHandle {
    tx: watch::Sender<bool>,
}

/// Shared, cloneable cancellation token observed by every suspension.
#[derive(Clone, Debug)]
pub struct AbortSignal {
    rx: watch::Receiver<bool>,
}

pub fn abort_pair() -> (AbortHandle, AbortSignal) {
    let (tx, rx) = watch::channel(false);
    (AbortHandle { tx }, AbortSignal { rx })
}

impl AbortHandle {
    pub fn abort(&self) {
        self.tx.send_replace(true);
    }
}

impl AbortSignal {
    /// A dropped handle counts as an abort.
    pub fn is_aborted(&self) -> bool {
        *self.rx.borrow() || self.rx.has_changed().is_err()
    }

    pub fn check(&self) -> Result<(), Aborted> {
        if self.is_aborted() {
            debug!("abort detected");
            return Err(Aborted);
        }
        Ok(())
    }

    /// Resolves once the token fires.
    pub async fn aborted(&mut self) {
        let _ = self.rx.wait_for(|aborted| *aborted).await;
    }
}

pub async fn sleep(duration: Duration, signal: &mut AbortSignal) -> Result<(), Aborted> {
    signal.check()?;
    tokio::select! {
        biased;
        _ = signal.aborted() => Err(Aborted),
        _ = tokio::time::sleep(duration) => Ok(()),
    }
}

/// Waits for [`Notify::notify_waiters`] on `resume`.
pub async fn until_resumed(resume: &Notify, signal: &mut AbortSignal) -> Result<(), Aborted> {
    signal.check()?;
    let resumed = resume.notified();
    tokio::select! {
        biased;
        _ = signal.aborted() => Err(Aborted),
        _ = resumed => Ok(()),
    }
}
