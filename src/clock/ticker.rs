//! Once-a-second display clock for the clock panel. Purely presentational.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::models::ActiveShift;

#[derive(Debug, Clone, PartialEq)]
pub struct Tick {
    pub now: DateTime<Utc>,
    /// Present only while a shift is open.
    pub elapsed: Option<chrono::Duration>,
    pub earnings: Option<f64>,
}

impl Tick {
    fn at(now: DateTime<Utc>, shift: Option<&ActiveShift>) -> Self {
        Self { now, elapsed: shift.map(|s| s.elapsed(now)), earnings: shift.map(|s| s.earnings(now)) }
    }
}

/// Publishes a [`Tick`] every period until dropped.
#[derive(Debug)]
pub struct ShiftTicker {
    rx: watch::Receiver<Tick>,
    handle: JoinHandle<()>,
}

impl ShiftTicker {
    pub fn spawn(shift: Option<ActiveShift>) -> Self { Self::with_period(shift, Duration::from_secs(1)) }

    pub fn with_period(shift: Option<ActiveShift>, period: Duration) -> Self {
        let (tx, rx) = watch::channel(Tick::at(Utc::now(), shift.as_ref()));
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                if tx.send(Tick::at(Utc::now(), shift.as_ref())).is_err() {
                    break;
                }
            }
        });
        Self { rx, handle }
    }

    pub fn current(&self) -> Tick { self.rx.borrow().clone() }

    pub fn subscribe(&self) -> watch::Receiver<Tick> { self.rx.clone() }

    pub fn is_running(&self) -> bool { !self.handle.is_finished() }
}

impl Drop for ShiftTicker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
