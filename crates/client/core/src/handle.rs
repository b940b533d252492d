//! Per-session client handle.
//!
//! One handle represents one local identity inside one session. All
//! user-initiated operations go through here and are gated twice: a
//! local phase check against the freshest derived phase, then the
//! ledger's own authority. The handle never trusts its cached phase for
//! anything but gating; the snapshot is always re-fetched on demand.

use std::sync::{Arc, Mutex};

use tokio::task;

use client_blockchain_core::{LedgerError, SessionLedger, VerifyOutcome};
use game_core::{
    Guess, Phase, PlayerAddress, Secret, SessionId, SessionSnapshot, derive_phase, score_opt,
};
use zk::{CommitmentBuilder, ProverError, SecretProver};

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::events::{EventBus, SessionEvent};
use crate::invitation::{Invitation, InvitationError};
use crate::vault::SecretStore;

/// Shared dependencies a handle is built from.
///
/// Cloned per session; everything inside is reference-counted.
#[derive(Clone)]
pub struct ClientContext {
    pub ledger: Arc<dyn SessionLedger>,
    pub prover: Arc<dyn SecretProver>,
    pub commitments: CommitmentBuilder,
    pub vault: Arc<dyn SecretStore>,
    pub config: ClientConfig,
}

/// Locally cached view of the session.
///
/// Cache only: re-derived from every fetched snapshot and never used as
/// ground truth for anything beyond phase gating and display.
struct LocalState {
    snapshot: Option<SessionSnapshot>,
    phase: Phase,
    /// Commitment registration issued this session; stops the
    /// reconciliation loop from re-submitting every tick while the
    /// write is still landing.
    commit_attempted: bool,
}

pub struct SessionHandle {
    session_id: SessionId,
    identity: PlayerAddress,
    ctx: ClientContext,
    events: EventBus,
    state: Mutex<LocalState>,
    /// Serializes user-initiated writes. `try_lock` rather than `lock`:
    /// a second action while one is in flight is a bug in the caller,
    /// not something to queue.
    inflight: tokio::sync::Mutex<()>,
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("session_id", &self.session_id)
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}

impl SessionHandle {
    /// Propose a new session as Player 1.
    ///
    /// Nothing touches the ledger yet; the returned invitation carries
    /// everything the counterparty needs to finalize while we are
    /// offline. The handle starts out waiting for that to happen.
    pub fn propose(
        ctx: ClientContext,
        identity: PlayerAddress,
        stake: i128,
        authorization: impl Into<String>,
    ) -> (Arc<Self>, Invitation) {
        let session_id = SessionId::random();
        let invitation = Invitation::new(session_id, identity.clone(), stake, authorization);

        tracing::info!(session = %session_id, player = %identity, "proposed session");

        let handle = Arc::new(Self::from_parts(
            ctx,
            session_id,
            identity,
            None,
            Phase::WaitingForCounterparty,
        ));
        (handle, invitation)
    }

    /// Finalize a received invitation as Player 2, creating the remote
    /// session with both players and both stakes in one call.
    pub async fn finalize_invitation(
        ctx: ClientContext,
        invitation: Invitation,
        identity: PlayerAddress,
        stake: i128,
    ) -> Result<Arc<Self>, ClientError> {
        // Decode already rejects self-play, but invitations can also be
        // constructed directly; check again before spending anything.
        if invitation.proposer == identity {
            return Err(InvitationError::SelfPlay.into());
        }

        ctx.ledger
            .create_session(
                invitation.session_id,
                invitation.proposer.clone(),
                identity.clone(),
                invitation.proposer_stake,
                stake,
            )
            .await?;

        tracing::info!(
            session = %invitation.session_id,
            player = %identity,
            "finalized invitation"
        );

        let handle = Arc::new(Self::from_parts(
            ctx,
            invitation.session_id,
            identity,
            None,
            Phase::SecretSetup,
        ));
        handle.refresh().await?;
        Ok(handle)
    }

    /// Attach to an existing session, e.g. after a restart. The identity
    /// must be one of the session's two players.
    pub async fn attach(
        ctx: ClientContext,
        session_id: SessionId,
        identity: PlayerAddress,
    ) -> Result<Arc<Self>, ClientError> {
        let snapshot = ctx.ledger.get_snapshot(session_id).await?;
        if snapshot.slot_of(&identity).is_none() {
            return Err(LedgerError::NotAParticipant.into());
        }

        let phase = derive_phase(&snapshot);
        Ok(Arc::new(Self::from_parts(
            ctx,
            session_id,
            identity,
            Some(snapshot),
            phase,
        )))
    }

    fn from_parts(
        ctx: ClientContext,
        session_id: SessionId,
        identity: PlayerAddress,
        snapshot: Option<SessionSnapshot>,
        phase: Phase,
    ) -> Self {
        Self {
            session_id,
            identity,
            ctx,
            events: EventBus::new(),
            state: Mutex::new(LocalState {
                snapshot,
                phase,
                commit_attempted: false,
            }),
            inflight: tokio::sync::Mutex::new(()),
        }
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub fn identity(&self) -> &PlayerAddress {
        &self.identity
    }

    pub fn phase(&self) -> Phase {
        self.state.lock().unwrap().phase
    }

    pub fn last_snapshot(&self) -> Option<SessionSnapshot> {
        self.state.lock().unwrap().snapshot.clone()
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub(crate) fn events(&self) -> &EventBus {
        &self.events
    }

    pub(crate) fn config(&self) -> &ClientConfig {
        &self.ctx.config
    }

    /// Fetch a fresh snapshot and re-derive the phase.
    ///
    /// `SessionNotFound` before the counterparty has finalized is the
    /// normal waiting state, not an error.
    pub async fn refresh(&self) -> Result<Phase, ClientError> {
        let snapshot = match self.ctx.ledger.get_snapshot(self.session_id).await {
            Ok(snapshot) => snapshot,
            Err(LedgerError::SessionNotFound(_))
                if self.state.lock().unwrap().snapshot.is_none() =>
            {
                return Ok(Phase::WaitingForCounterparty);
            }
            Err(err) => return Err(err.into()),
        };
        Ok(self.apply_snapshot(snapshot))
    }

    fn apply_snapshot(&self, snapshot: SessionSnapshot) -> Phase {
        let derived = derive_phase(&snapshot);
        let previous = {
            let mut state = self.state.lock().unwrap();
            let previous = state.phase;
            // Acknowledged sessions stay terminal regardless of what the
            // snapshot derives to.
            if previous != Phase::Terminal {
                state.phase = derived;
            }
            state.snapshot = Some(snapshot.clone());
            previous
        };

        self.events.publish(SessionEvent::SnapshotRefreshed(snapshot));
        let current = self.phase();
        if previous != current {
            tracing::debug!(
                session = %self.session_id,
                ?previous,
                ?current,
                "phase changed"
            );
            self.events
                .publish(SessionEvent::PhaseChanged { previous, current });
        }
        current
    }

    /// Choose and register the local secret.
    ///
    /// The plaintext is persisted to the vault before the commitment is
    /// sent, so a crash between the two never strands a registered
    /// commitment without its secret. If the remote session does not
    /// exist yet the secret is stored and the reconciliation loop
    /// registers the commitment once the counterparty finalizes.
    pub async fn register_secret(&self, secret: Secret) -> Result<(), ClientError> {
        let _guard = self.inflight.try_lock().map_err(|_| ClientError::Busy)?;

        let phase = self.refresh().await?;
        if let Some(snapshot) = self.last_snapshot() {
            let slot = snapshot
                .slot_of(&self.identity)
                .ok_or(LedgerError::NotAParticipant)?;
            if snapshot.player(slot).commitment.is_some() {
                return Err(ClientError::SecretLocked);
            }
        }
        if !matches!(phase, Phase::WaitingForCounterparty | Phase::SecretSetup) {
            return Err(ClientError::PhaseGate(phase));
        }

        self.ctx.vault.put(self.session_id, &self.identity, secret)?;

        if phase == Phase::SecretSetup {
            self.register_stored_commitment(secret).await?;
        }
        Ok(())
    }

    async fn register_stored_commitment(&self, secret: Secret) -> Result<(), ClientError> {
        let commitment = self.ctx.commitments.commit(secret)?;
        self.state.lock().unwrap().commit_attempted = true;

        match self
            .ctx
            .ledger
            .register_commitment(self.session_id, &self.identity, commitment)
            .await
        {
            Ok(()) => {
                self.events.publish(SessionEvent::CommitmentRegistered);
                self.refresh().await?;
                Ok(())
            }
            // Commitment already landed, e.g. a retry after a lost
            // response. The remote one wins; nothing to do.
            Err(LedgerError::AlreadyActed) => {
                self.refresh().await?;
                Ok(())
            }
            Err(err) => {
                self.state.lock().unwrap().commit_attempted = false;
                Err(err.into())
            }
        }
    }

    /// Submit a guess at the opponent's secret for the current round.
    pub async fn submit_guess(&self, guess: Guess) -> Result<(), ClientError> {
        let _guard = self.inflight.try_lock().map_err(|_| ClientError::Busy)?;

        let phase = self.refresh().await?;
        if phase != Phase::Guessing {
            return Err(ClientError::PhaseGate(phase));
        }
        if let Some(snapshot) = self.last_snapshot() {
            let slot = snapshot
                .slot_of(&self.identity)
                .ok_or(LedgerError::NotAParticipant)?;
            if snapshot.player(slot).last_guess.is_some() {
                return Err(LedgerError::AlreadyActed.into());
            }
        }

        match self
            .ctx
            .ledger
            .submit_guess(self.session_id, &self.identity, guess)
            .await
        {
            Ok(()) => {
                self.refresh().await?;
                Ok(())
            }
            Err(err) => self.resync_on_wrong_phase(err).await,
        }
    }

    /// Score the opponent's guess against the local secret and submit
    /// the proof.
    ///
    /// Proving is CPU-bound and runs on the blocking pool so it never
    /// stalls the reconciliation timer.
    pub async fn submit_proof(&self) -> Result<(), ClientError> {
        let _guard = self.inflight.try_lock().map_err(|_| ClientError::Busy)?;

        let phase = self.refresh().await?;
        if phase != Phase::AwaitingProofs {
            return Err(ClientError::PhaseGate(phase));
        }
        self.prove_and_submit().await
    }

    async fn prove_and_submit(&self) -> Result<(), ClientError> {
        let snapshot = self
            .last_snapshot()
            .ok_or(ClientError::PhaseGate(Phase::WaitingForCounterparty))?;
        let slot = snapshot
            .slot_of(&self.identity)
            .ok_or(LedgerError::NotAParticipant)?;

        let secret = self
            .ctx
            .vault
            .get(self.session_id, &self.identity)?
            .ok_or(ClientError::SecretMissing)?;
        let registered = snapshot
            .player(slot)
            .commitment
            .ok_or(ClientError::PhaseGate(Phase::SecretSetup))?;

        // The proof covers the opponent's guess against our secret.
        let opponent_guess = snapshot.player(slot.opponent()).last_guess;
        let stats =
            score_opt(secret, opponent_guess).ok_or(ClientError::OpponentNotReady)?;
        let guess = opponent_guess.ok_or(ClientError::OpponentNotReady)?;

        let prover = Arc::clone(&self.ctx.prover);
        let artifact = task::spawn_blocking(move || prover.prove(secret, guess, stats, &registered))
            .await
            .map_err(|e| ProverError::Backend(format!("proving task failed: {e}")))??;

        match self
            .ctx
            .ledger
            .submit_proof(self.session_id, &self.identity, stats, artifact)
            .await
        {
            Ok(()) => {
                tracing::info!(session = %self.session_id, ?stats, "proof submitted");
                self.events.publish(SessionEvent::ProofSubmitted);
                self.refresh().await?;
                Ok(())
            }
            Err(err) => self.resync_on_wrong_phase(err).await,
        }
    }

    /// Ask the ledger to resolve the round.
    ///
    /// Safe to race with the counterparty: a second call after
    /// resolution reports [`VerifyOutcome::AlreadyResolved`].
    pub async fn verify(&self) -> Result<VerifyOutcome, ClientError> {
        let outcome = self
            .ctx
            .ledger
            .verify(self.session_id, &self.identity)
            .await?;
        self.events
            .publish(SessionEvent::VerifyAttempted(outcome.clone()));
        self.refresh().await?;
        Ok(outcome)
    }

    /// Acknowledge a resolved session, wiping its local secret.
    pub async fn acknowledge_resolution(&self) -> Result<(), ClientError> {
        let phase = self.phase();
        let Phase::Resolved(_) = phase else {
            return Err(ClientError::PhaseGate(phase));
        };

        self.ctx.vault.clear(self.session_id)?;
        let previous = {
            let mut state = self.state.lock().unwrap();
            let previous = state.phase;
            state.phase = Phase::Terminal;
            previous
        };
        self.events.publish(SessionEvent::PhaseChanged {
            previous,
            current: Phase::Terminal,
        });
        Ok(())
    }

    /// Register the stored secret's commitment if the session has
    /// reached setup and we have not committed yet. Driven by the
    /// reconciliation loop; returns whether a registration was sent.
    pub(crate) async fn auto_register(&self) -> Result<bool, ClientError> {
        {
            let state = self.state.lock().unwrap();
            if state.phase != Phase::SecretSetup || state.commit_attempted {
                return Ok(false);
            }
            let Some(snapshot) = &state.snapshot else {
                return Ok(false);
            };
            match snapshot.slot_of(&self.identity) {
                Some(slot) if snapshot.player(slot).commitment.is_none() => {}
                _ => return Ok(false),
            }
        }
        let Some(secret) = self.ctx.vault.get(self.session_id, &self.identity)? else {
            return Ok(false);
        };

        self.register_stored_commitment(secret).await?;
        Ok(true)
    }

    /// True when the next reconciliation step would be a `verify` call:
    /// both proof stats, our own included, are on the ledger.
    pub(crate) fn verify_ready(&self) -> bool {
        self.state
            .lock()
            .unwrap()
            .snapshot
            .as_ref()
            .is_some_and(|snapshot| snapshot.both_proved())
    }

    /// Submit our proof and, once both stats are on the ledger, attempt
    /// resolution. Driven by the reconciliation loop.
    pub(crate) async fn auto_advance_round(&self) -> Result<(), ClientError> {
        let Some(snapshot) = self.last_snapshot() else {
            return Ok(());
        };
        let Some(slot) = snapshot.slot_of(&self.identity) else {
            return Ok(());
        };

        if self.phase() != Phase::AwaitingProofs {
            return Ok(());
        }

        if snapshot.player(slot).proof_stats.is_none() {
            // Our proof first; verification waits for the next tick so
            // the fresh snapshot confirms it landed.
            return match self.prove_and_submit().await {
                Ok(()) | Err(ClientError::Ledger(LedgerError::AlreadyActed)) => Ok(()),
                Err(err) => Err(err),
            };
        }

        if snapshot.both_proved() {
            match self.verify().await {
                Ok(_) => Ok(()),
                Err(err) if err.is_wait() => Ok(()),
                Err(err) => Err(err),
            }
        } else {
            Ok(())
        }
    }

    /// A stale local phase caused a remote rejection: re-derive from a
    /// fresh snapshot before handing the error back, so the caller's
    /// next look at the phase is already correct.
    async fn resync_on_wrong_phase<T>(&self, err: LedgerError) -> Result<T, ClientError> {
        if matches!(err, LedgerError::WrongPhase) {
            if let Err(refresh_err) = self.refresh().await {
                tracing::debug!(
                    session = %self.session_id,
                    error = %refresh_err,
                    "resync after phase rejection failed"
                );
            }
        }
        Err(err.into())
    }
}
