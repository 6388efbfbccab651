//! Per-viewer live feed loop.
//!
//! A session registers a listener with the [`Broadcaster`], then forwards
//! every delivered event (and a periodic keepalive) to an output channel
//! until the viewer goes away or the server shuts down.

use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::broadcaster::{Broadcaster, Listener, ListenerId};
use crate::event::Event;

/// Default interval between keepalive frames.
pub const DEFAULT_KEEPALIVE: Duration = Duration::from_secs(5);

/// Shortest keepalive interval a session will use.
pub const MIN_KEEPALIVE: Duration = Duration::from_millis(10);

/// Turns events and keepalives into wire frames.
///
/// Encoders may keep scratch buffers between calls; they are released when
/// the session ends.
pub trait FrameEncoder {
    fn event(&mut self, event: &Event) -> String;
    fn keepalive(&mut self) -> String;
}

/// Why a session loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The viewer dropped the output stream.
    PeerClosed,
    /// The server is shutting down.
    Shutdown,
    /// The listener was removed from the registry by someone else.
    BroadcasterClosed,
}

/// One connected viewer.
pub struct LiveFeedSession {
    // Field order is drop order: the ticker stops before the listener
    // leaves the registry.
    ticker: Interval,
    listener: Listener,
}

impl LiveFeedSession {
    /// Register a new listener and start the keepalive ticker.
    ///
    /// The first keepalive fires one full interval after opening. Intervals
    /// shorter than [`MIN_KEEPALIVE`] are raised to it.
    pub fn open(broadcaster: &Broadcaster, keepalive: Duration) -> Self {
        let keepalive = keepalive.max(MIN_KEEPALIVE);
        let mut ticker = interval_at(Instant::now() + keepalive, keepalive);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let listener = broadcaster.add_listener();
        info!(listener_id = %listener.id(), "Live feed opened");

        Self { ticker, listener }
    }

    pub fn id(&self) -> ListenerId {
        self.listener.id()
    }

    /// Forward frames to `out` until the viewer disconnects, `shutdown`
    /// resolves, or the listener is deregistered.
    ///
    /// The listener is removed from the registry on every exit path,
    /// including when the future running this loop is dropped.
    pub async fn run<E, F>(
        mut self,
        mut encoder: E,
        out: mpsc::Sender<String>,
        shutdown: F,
    ) -> CloseReason
    where
        E: FrameEncoder,
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let id = self.id();

        let reason = loop {
            let frame = tokio::select! {
                _ = &mut shutdown => break CloseReason::Shutdown,
                _ = out.closed() => break CloseReason::PeerClosed,
                received = self.listener.recv() => match received {
                    Some(event) => encoder.event(&event),
                    None => break CloseReason::BroadcasterClosed,
                },
                _ = self.ticker.tick() => {
                    debug!(listener_id = %id, "Keepalive");
                    encoder.keepalive()
                }
            };

            // A stalled viewer must not hold up shutdown.
            tokio::select! {
                _ = &mut shutdown => break CloseReason::Shutdown,
                sent = out.send(frame) => {
                    if sent.is_err() {
                        break CloseReason::PeerClosed;
                    }
                }
            }
        };

        info!(listener_id = %id, reason = ?reason, "Live feed closed");

        // ticker and listener go first, then the encoder's buffers
        drop(self);
        drop(encoder);
        reason
    }
}
