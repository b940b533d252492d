//! End-to-end games between two independent clients.
//!
//! Both clients share nothing but the ledger: separate vaults, separate
//! handles, separate reconciliation loops. The tests drive only the
//! user-visible operations (invite, register a secret, guess) and let
//! the loops converge on the outcome.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};

use client_blockchain_core::{MockLedger, SessionLedger};
use client_core::{ClientConfig, ClientContext, Invitation, ReconciliationLoop, SessionHandle};
use client_core::{ClientError, InvitationError, MemoryVault, SecretStore, SessionEvent};
use game_core::{Guess, Outcome, Phase, PlayerAddress, PlayerSlot, RemoteStatus, Secret};
use zk::{CommitmentBuilder, StubProver};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn context(ledger: Arc<MockLedger>) -> ClientContext {
    context_with_vault(ledger, Arc::new(MemoryVault::new()))
}

fn context_with_vault(ledger: Arc<MockLedger>, vault: Arc<MemoryVault>) -> ClientContext {
    ClientContext {
        ledger,
        prover: Arc::new(StubProver::default()),
        commitments: CommitmentBuilder::default(),
        vault,
        config: ClientConfig {
            poll_interval: Duration::from_millis(10),
            verify_jitter_max: Duration::from_millis(2),
            max_wait: Duration::from_secs(60),
        },
    }
}

async fn wait_for_phase<F>(handle: &SessionHandle, what: &str, pred: F) -> Result<Phase>
where
    F: Fn(Phase) -> bool,
{
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let phase = handle.phase();
            if pred(phase) {
                return phase;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .map_err(|_| anyhow!("timed out waiting for {what}; stuck in {:?}", handle.phase()))
}

struct Duel {
    ledger: Arc<MockLedger>,
    alice: Arc<SessionHandle>,
    bob: Arc<SessionHandle>,
}

/// Handshake through the invitation token, then both secrets registered.
async fn start_duel(alice_secret: u32, bob_secret: u32) -> Result<Duel> {
    init_tracing();
    let ledger = Arc::new(MockLedger::new());

    let (alice, invitation) = SessionHandle::propose(
        context(Arc::clone(&ledger)),
        PlayerAddress::new("alice"),
        10,
        "alice-auth",
    );

    // The token travels out of band; Bob decodes the raw string.
    let decoded = Invitation::decode(&invitation.encode(), &PlayerAddress::new("bob"))?;
    let bob = SessionHandle::finalize_invitation(
        context(Arc::clone(&ledger)),
        decoded,
        PlayerAddress::new("bob"),
        10,
    )
    .await?;

    alice
        .register_secret(Secret::new(alice_secret)?)
        .await
        .context("alice register")?;
    bob.register_secret(Secret::new(bob_secret)?)
        .await
        .context("bob register")?;

    Ok(Duel { ledger, alice, bob })
}

#[tokio::test]
async fn full_game_with_a_winner() -> Result<()> {
    let duel = start_duel(42, 123).await?;
    let alice_loop = ReconciliationLoop::spawn(Arc::clone(&duel.alice));
    let bob_loop = ReconciliationLoop::spawn(Arc::clone(&duel.bob));

    wait_for_phase(&duel.alice, "guessing", |p| p == Phase::Guessing).await?;
    wait_for_phase(&duel.bob, "guessing", |p| p == Phase::Guessing).await?;

    // Bob cracks Alice's secret; Alice misses.
    duel.alice.submit_guess(Guess::new(999)?).await?;
    duel.bob.submit_guess(Guess::new(42)?).await?;

    let resolved = wait_for_phase(&duel.alice, "resolution", |p| {
        matches!(p, Phase::Resolved(_))
    })
    .await?;
    assert_eq!(resolved, Phase::Resolved(Outcome::Winner(PlayerSlot::Player2)));

    wait_for_phase(&duel.bob, "resolution", |p| {
        p == Phase::Resolved(Outcome::Winner(PlayerSlot::Player2))
    })
    .await?;

    let snapshot = duel.ledger.get_snapshot(duel.alice.session_id()).await?;
    assert_eq!(snapshot.status, RemoteStatus::Finished);
    assert_eq!(snapshot.winner, Some(PlayerAddress::new("bob")));

    alice_loop.stop().await;
    bob_loop.stop().await;
    Ok(())
}

#[tokio::test]
async fn simultaneous_cracks_resolve_as_a_draw() -> Result<()> {
    let duel = start_duel(42, 123).await?;
    let alice_loop = ReconciliationLoop::spawn(Arc::clone(&duel.alice));
    let bob_loop = ReconciliationLoop::spawn(Arc::clone(&duel.bob));

    wait_for_phase(&duel.alice, "guessing", |p| p == Phase::Guessing).await?;
    duel.alice.submit_guess(Guess::new(123)?).await?;
    duel.bob.submit_guess(Guess::new(42)?).await?;

    let resolved = wait_for_phase(&duel.alice, "resolution", |p| {
        matches!(p, Phase::Resolved(_))
    })
    .await?;
    assert_eq!(resolved, Phase::Resolved(Outcome::Draw));

    let snapshot = duel.ledger.get_snapshot(duel.alice.session_id()).await?;
    assert_eq!(snapshot.status, RemoteStatus::Finished);
    assert_eq!(snapshot.winner, None);

    alice_loop.stop().await;
    bob_loop.stop().await;
    Ok(())
}

#[tokio::test]
async fn missed_round_loops_back_to_guessing() -> Result<()> {
    let duel = start_duel(42, 123).await?;
    let alice_loop = ReconciliationLoop::spawn(Arc::clone(&duel.alice));
    let bob_loop = ReconciliationLoop::spawn(Arc::clone(&duel.bob));

    wait_for_phase(&duel.alice, "guessing", |p| p == Phase::Guessing).await?;

    // Round one: both miss. The ledger clears the round and the clients
    // land back in Guessing with guesses wiped.
    duel.alice.submit_guess(Guess::new(777)?).await?;
    duel.bob.submit_guess(Guess::new(888)?).await?;

    wait_for_phase(&duel.alice, "round two", |p| p == Phase::Guessing).await?;
    let snapshot = duel
        .alice
        .last_snapshot()
        .ok_or_else(|| anyhow!("no snapshot after round one"))?;
    assert!(snapshot.player1.last_guess.is_none());
    assert!(snapshot.player2.last_guess.is_none());

    // Round two: Alice cracks it.
    wait_for_phase(&duel.bob, "round two", |p| p == Phase::Guessing).await?;
    duel.alice.submit_guess(Guess::new(123)?).await?;
    duel.bob.submit_guess(Guess::new(999)?).await?;

    let resolved = wait_for_phase(&duel.bob, "resolution", |p| {
        matches!(p, Phase::Resolved(_))
    })
    .await?;
    assert_eq!(resolved, Phase::Resolved(Outcome::Winner(PlayerSlot::Player1)));

    alice_loop.stop().await;
    bob_loop.stop().await;
    Ok(())
}

#[tokio::test]
async fn racing_verify_calls_converge_on_one_outcome() -> Result<()> {
    // Both loops run with near-zero jitter, so both clients race the
    // verify call; the ledger resolves once and the loser of the race
    // observes an already-resolved session instead of a double payout.
    let duel = start_duel(42, 123).await?;
    let alice_loop = ReconciliationLoop::spawn(Arc::clone(&duel.alice));
    let bob_loop = ReconciliationLoop::spawn(Arc::clone(&duel.bob));

    wait_for_phase(&duel.alice, "guessing", |p| p == Phase::Guessing).await?;
    duel.alice.submit_guess(Guess::new(999)?).await?;
    duel.bob.submit_guess(Guess::new(42)?).await?;

    let expected = Phase::Resolved(Outcome::Winner(PlayerSlot::Player2));
    wait_for_phase(&duel.alice, "resolution", |p| p == expected).await?;
    wait_for_phase(&duel.bob, "resolution", |p| p == expected).await?;

    let snapshot = duel.ledger.get_snapshot(duel.alice.session_id()).await?;
    assert_eq!(snapshot.winner, Some(PlayerAddress::new("bob")));

    alice_loop.stop().await;
    bob_loop.stop().await;
    Ok(())
}

#[tokio::test]
async fn acknowledging_resolution_clears_the_vault() -> Result<()> {
    let duel = start_duel(42, 123).await?;
    let alice_loop = ReconciliationLoop::spawn(Arc::clone(&duel.alice));
    let bob_loop = ReconciliationLoop::spawn(Arc::clone(&duel.bob));

    wait_for_phase(&duel.alice, "guessing", |p| p == Phase::Guessing).await?;
    duel.alice.submit_guess(Guess::new(123)?).await?;
    duel.bob.submit_guess(Guess::new(999)?).await?;

    wait_for_phase(&duel.alice, "resolution", |p| matches!(p, Phase::Resolved(_))).await?;

    duel.alice.acknowledge_resolution().await?;
    assert_eq!(duel.alice.phase(), Phase::Terminal);

    // The secret is gone; a repeat acknowledgement is rejected as a
    // phase error rather than silently succeeding.
    let err = duel.alice.acknowledge_resolution().await.unwrap_err();
    assert!(matches!(err, ClientError::PhaseGate(Phase::Terminal)));

    alice_loop.stop().await;
    bob_loop.stop().await;
    Ok(())
}

#[tokio::test]
async fn corrupted_secret_surfaces_as_unrecoverable() -> Result<()> {
    init_tracing();
    let ledger = Arc::new(MockLedger::new());
    let alice_vault = Arc::new(MemoryVault::new());

    let (alice, invitation) = SessionHandle::propose(
        context_with_vault(Arc::clone(&ledger), Arc::clone(&alice_vault)),
        PlayerAddress::new("alice"),
        10,
        "alice-auth",
    );
    let bob = SessionHandle::finalize_invitation(
        context(Arc::clone(&ledger)),
        Invitation::decode(&invitation.encode(), &PlayerAddress::new("bob"))?,
        PlayerAddress::new("bob"),
        10,
    )
    .await?;

    alice.register_secret(Secret::new(42)?).await?;
    bob.register_secret(Secret::new(123)?).await?;

    // Overwrite the stored plaintext after the commitment landed; every
    // later proof attempt now fails its constraints.
    alice_vault.put(
        alice.session_id(),
        &PlayerAddress::new("alice"),
        Secret::new(999)?,
    )?;

    let mut events = alice.subscribe();
    let alice_loop = ReconciliationLoop::spawn(Arc::clone(&alice));
    let bob_loop = ReconciliationLoop::spawn(Arc::clone(&bob));

    wait_for_phase(&alice, "guessing", |p| p == Phase::Guessing).await?;
    alice.submit_guess(Guess::new(111)?).await?;
    bob.submit_guess(Guess::new(222)?).await?;

    // The failure must reach subscribers, not just the log.
    let reason = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if let Ok(SessionEvent::Unrecoverable { reason }) = events.recv().await {
                return reason;
            }
        }
    })
    .await
    .map_err(|_| anyhow!("no unrecoverable event was published"))?;
    assert!(reason.contains("commitment"), "unexpected reason: {reason}");

    // And the loop must have stopped rather than hot-retrying.
    tokio::time::timeout(Duration::from_secs(2), async {
        while !alice_loop.is_finished() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .map_err(|_| anyhow!("loop kept running after a fatal proving failure"))?;

    bob_loop.stop().await;
    alice_loop.stop().await;
    Ok(())
}

#[tokio::test]
async fn proof_submission_is_not_delayed_by_verify_jitter() -> Result<()> {
    init_tracing();
    let ledger = Arc::new(MockLedger::new());
    let slow_verify = |ledger| {
        let mut ctx = context(ledger);
        ctx.config.verify_jitter_max = Duration::from_secs(10);
        ctx
    };

    let (alice, invitation) = SessionHandle::propose(
        slow_verify(Arc::clone(&ledger)),
        PlayerAddress::new("alice"),
        10,
        "alice-auth",
    );
    let bob = SessionHandle::finalize_invitation(
        slow_verify(Arc::clone(&ledger)),
        Invitation::decode(&invitation.encode(), &PlayerAddress::new("bob"))?,
        PlayerAddress::new("bob"),
        10,
    )
    .await?;

    alice.register_secret(Secret::new(42)?).await?;
    bob.register_secret(Secret::new(123)?).await?;

    let alice_loop = ReconciliationLoop::spawn(Arc::clone(&alice));
    let bob_loop = ReconciliationLoop::spawn(Arc::clone(&bob));

    wait_for_phase(&alice, "guessing", |p| p == Phase::Guessing).await?;
    alice.submit_guess(Guess::new(111)?).await?;
    bob.submit_guess(Guess::new(222)?).await?;

    // Only the verify call is jittered: both proofs must land promptly
    // even with a ten-second jitter ceiling.
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            let snap = ledger.get_snapshot(alice.session_id()).await.unwrap();
            if snap.both_proved() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .map_err(|_| anyhow!("proof submission was held up by the verify jitter"))?;

    alice_loop.stop().await;
    bob_loop.stop().await;
    Ok(())
}

#[tokio::test]
async fn attach_restores_a_session_after_restart() -> Result<()> {
    let duel = start_duel(42, 123).await?;

    // A "restarted" Alice client attaches to the live session.
    let restored = SessionHandle::attach(
        context(Arc::clone(&duel.ledger)),
        duel.alice.session_id(),
        PlayerAddress::new("alice"),
    )
    .await?;
    assert_eq!(restored.phase(), Phase::Guessing);

    // An outsider cannot attach at all.
    let err = SessionHandle::attach(
        context(Arc::clone(&duel.ledger)),
        duel.alice.session_id(),
        PlayerAddress::new("mallory"),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ClientError::Ledger(_)));
    Ok(())
}

#[tokio::test]
async fn proposer_cannot_finalize_own_invitation() -> Result<()> {
    let ledger = Arc::new(MockLedger::new());
    let (_alice, invitation) = SessionHandle::propose(
        context(Arc::clone(&ledger)),
        PlayerAddress::new("alice"),
        10,
        "alice-auth",
    );

    // Decode-time rejection happens before any ledger call.
    let err = Invitation::decode(&invitation.encode(), &PlayerAddress::new("alice")).unwrap_err();
    assert_eq!(err, InvitationError::SelfPlay);

    // Even a hand-built invitation is rejected at finalize time.
    let err = SessionHandle::finalize_invitation(
        context(Arc::clone(&ledger)),
        invitation,
        PlayerAddress::new("alice"),
        10,
    )
    .await
    .unwrap_err();
    assert!(matches!(
        err,
        ClientError::Invitation(InvitationError::SelfPlay)
    ));
    Ok(())
}

#[tokio::test]
async fn committed_secret_cannot_be_replaced() -> Result<()> {
    let duel = start_duel(42, 123).await?;

    let err = duel
        .alice
        .register_secret(Secret::new(777)?)
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::SecretLocked));
    Ok(())
}

#[tokio::test]
async fn guessing_is_phase_gated() -> Result<()> {
    let ledger = Arc::new(MockLedger::new());
    let (alice, invitation) = SessionHandle::propose(
        context(Arc::clone(&ledger)),
        PlayerAddress::new("alice"),
        10,
        "alice-auth",
    );
    let _bob = SessionHandle::finalize_invitation(
        context(Arc::clone(&ledger)),
        Invitation::decode(&invitation.encode(), &PlayerAddress::new("bob"))?,
        PlayerAddress::new("bob"),
        10,
    )
    .await?;

    // Session is live but no commitments yet: guessing must be refused
    // locally with the derived phase in the error.
    let err = alice.submit_guess(Guess::new(1)?).await.unwrap_err();
    assert!(matches!(err, ClientError::PhaseGate(Phase::SecretSetup)));
    Ok(())
}
