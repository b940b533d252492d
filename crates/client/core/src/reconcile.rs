//! Reconciliation loop: the session's only background worker.
//!
//! Polls the ledger on a fixed interval, re-derives the phase from each
//! fresh snapshot, and drives the two side effects that need no user
//! input: registering a stored secret's commitment once the session is
//! live, and proving/verifying once guesses are in. Everything else
//! stays user-initiated through the handle.

use std::sync::Arc;
use std::time::Instant;

use rand::Rng;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use game_core::Phase;

use crate::error::ClientError;
use crate::events::SessionEvent;
use crate::handle::SessionHandle;

pub struct ReconciliationLoop;

impl ReconciliationLoop {
    /// Spawn the loop for a session. It runs until the session resolves,
    /// the handle's phase turns terminal, or [`LoopHandle::stop`] is
    /// called.
    pub fn spawn(handle: Arc<SessionHandle>) -> LoopHandle {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let task = tokio::spawn(run(handle, cancel_rx));
        LoopHandle {
            cancel: cancel_tx,
            task,
        }
    }
}

/// Control handle for a spawned reconciliation loop.
pub struct LoopHandle {
    cancel: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl LoopHandle {
    /// Request shutdown and wait for the loop to exit.
    pub async fn stop(self) {
        let _ = self.cancel.send(true);
        let _ = self.task.await;
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

async fn run(handle: Arc<SessionHandle>, mut cancel: watch::Receiver<bool>) {
    let config = handle.config().clone();
    let mut interval = time::interval(config.poll_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut last_phase = handle.phase();
    let mut last_progress = Instant::now();

    tracing::debug!(session = %handle.session_id(), "reconciliation loop started");

    loop {
        tokio::select! {
            _ = cancel.changed() => break,
            _ = interval.tick() => {}
        }

        let phase = match handle.refresh().await {
            Ok(phase) => phase,
            Err(err) if err.is_wait() => {
                tracing::debug!(session = %handle.session_id(), error = %err, "poll failed; retrying");
                continue;
            }
            Err(err) => {
                tracing::warn!(session = %handle.session_id(), error = %err, "poll failed; retrying");
                continue;
            }
        };

        if phase != last_phase {
            last_phase = phase;
            last_progress = Instant::now();
        } else if last_progress.elapsed() >= config.max_wait {
            // Informational only; the counterparty may simply be away.
            handle.events().publish(SessionEvent::StillWaiting { phase });
            last_progress = Instant::now();
        }

        if phase.is_terminal() {
            if let Phase::Resolved(outcome) = phase {
                handle.events().publish(SessionEvent::Resolved(outcome));
            }
            tracing::info!(session = %handle.session_id(), ?phase, "session resolved; loop exiting");
            break;
        }

        let step = match phase {
            Phase::SecretSetup => handle.auto_register().await.map(|_| ()),
            Phase::AwaitingProofs => {
                // Jitter only the tick that will actually call `verify`,
                // spreading the two clients apart inside the poll window;
                // our own proof submission goes out without delay.
                if handle.verify_ready() {
                    let jitter = jitter_delay(&config);
                    if !jitter.is_zero() {
                        tokio::select! {
                            _ = cancel.changed() => break,
                            _ = time::sleep(jitter) => {}
                        }
                    }
                }
                handle.auto_advance_round().await
            }
            _ => Ok(()),
        };

        match step {
            Ok(()) => {}
            Err(ClientError::Prover(err)) if err.is_fatal() => {
                // The stored secret no longer matches the registered
                // commitment; retrying every tick cannot fix it.
                tracing::error!(
                    session = %handle.session_id(),
                    error = %err,
                    "unrecoverable proving failure; loop exiting"
                );
                handle.events().publish(SessionEvent::Unrecoverable {
                    reason: err.to_string(),
                });
                break;
            }
            Err(err) if err.is_wait() => {
                tracing::trace!(session = %handle.session_id(), error = %err, "waiting on counterparty");
            }
            Err(err) => {
                tracing::warn!(session = %handle.session_id(), error = %err, "reconciliation step failed");
            }
        }
    }
}

fn jitter_delay(config: &crate::config::ClientConfig) -> std::time::Duration {
    let max_ms = config.verify_jitter_max.as_millis() as u64;
    if max_ms == 0 {
        return std::time::Duration::ZERO;
    }
    std::time::Duration::from_millis(rand::thread_rng().gen_range(0..=max_ms))
}
