//! Session event stream.
//!
//! The reconciliation loop publishes here and any number of consumers
//! (a UI, a test harness) subscribe. Events are advisory notifications
//! layered on top of the authoritative snapshot; missing one is safe
//! because the next poll republishes current state.

use game_core::{Outcome, Phase, SessionSnapshot};
use tokio::sync::broadcast;

use client_blockchain_core::VerifyOutcome;

/// Events emitted while a session is being reconciled.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// The locally derived phase changed.
    PhaseChanged { previous: Phase, current: Phase },

    /// A fresh snapshot was fetched, whether or not the phase moved.
    SnapshotRefreshed(SessionSnapshot),

    /// The loop registered the stored secret's commitment on our behalf.
    CommitmentRegistered,

    /// A proof was accepted by the ledger.
    ProofSubmitted,

    /// A verify call completed with the given outcome.
    VerifyAttempted(VerifyOutcome),

    /// The phase has not moved within the configured patience window.
    /// Informational only; the session keeps polling.
    StillWaiting { phase: Phase },

    /// The session reached its final outcome.
    Resolved(Outcome),

    /// The session cannot make progress and the loop has stopped.
    /// Manual recovery required, typically starting a new session; the
    /// reason is the rendered error that ended the loop.
    Unrecoverable { reason: String },
}

/// Broadcast channel for session events.
///
/// Publishing is best-effort: with no subscribers the event is dropped,
/// which is the normal state for headless use.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SessionEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(64)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn publish(&self, event: SessionEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("no subscribers for session event");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();

        bus.publish(SessionEvent::ProofSubmitted);

        let event = rx.recv().await.unwrap();
        assert!(matches!(event, SessionEvent::ProofSubmitted));
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_a_no_op() {
        let bus = EventBus::new();
        bus.publish(SessionEvent::CommitmentRegistered);
    }
}
