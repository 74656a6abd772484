mod common;

use std::error::Error;
use std::sync::atomic::Ordering;

use common::{GAME, ghin, individual_config, open, players, scheduled, seat, team_config};
use rusty_pairings::controller::pipeline::{SaveStage, StageStatus};
use rusty_pairings::error::{PairingError, ValidationError};
use rusty_pairings::model::{FlightId, FlightSide, GroupRef, PairingId, Player, Selection};

fn select(ids: &[usize]) -> Selection {
    ids.iter().map(|&i| ghin(i)).collect()
}

fn stage_status(outcome: &rusty_pairings::SaveOutcome, stage: SaveStage) -> Option<&StageStatus> {
    outcome
        .stages
        .iter()
        .find(|s| s.stage == stage)
        .map(|s| &s.status)
}

/// Team game with one full flight: pairing 1 on side A, pairing 2 on side B,
/// scheduled on hole 1.
fn flighted_roster() -> Vec<Player> {
    let mut roster = players(4);
    for (i, p) in roster.iter_mut().enumerate() {
        let (pairing, side) = if i < 2 { (1, FlightSide::A) } else { (2, FlightSide::B) };
        #[allow(clippy::cast_possible_truncation)]
        let pos = (i % 2) as u32 + 1;
        seat(p, pairing, pos, Some((1, side)));
        scheduled(p, "09:00", "1", Some("A"));
        p.course_handicap = Some(5);
        p.playing_handicap = Some(5);
    }
    roster
}

#[tokio::test]
async fn saving_nothing_touches_nothing() -> Result<(), Box<dyn Error>> {
    let (mut session, store, rating) = open(individual_config(), players(4)).await?;

    let outcome = session.save().await;
    assert!(outcome.ok);
    assert_eq!(outcome.saved, 0);
    assert!(outcome.stages.is_empty());
    assert_eq!(store.saves(), 0);
    assert_eq!(store.handicap_calls.load(Ordering::SeqCst), 0);
    assert_eq!(rating.calls(), (0, 0));
    Ok(())
}

#[tokio::test]
async fn save_writes_groupings_and_recomputes_handicaps() -> Result<(), Box<dyn Error>> {
    let (mut session, store, rating) = open(individual_config(), players(4)).await?;
    session.assign(&select(&[1, 2]), None)?;

    let outcome = session.save().await;
    assert!(outcome.ok, "{:?}", outcome.errors);
    assert_eq!(outcome.saved, 2);
    for stage in [
        SaveStage::Validate,
        SaveStage::Persist,
        SaveStage::Resync,
        SaveStage::BaselineHandicaps,
        SaveStage::PlayingHandicaps,
        SaveStage::StoreHandicaps,
        SaveStage::Reload,
    ] {
        assert_eq!(stage_status(&outcome, stage), Some(&StageStatus::Done), "{stage:?}");
    }
    assert!(session.dirty().is_empty());
    assert!(session.pending().is_empty());

    assert_eq!(rating.calls(), (1, 1));
    assert_eq!(rating.groups_seen(), vec![vec![ghin(1), ghin(2)]]);

    let stored = store.player(GAME, &ghin(2)).unwrap();
    assert_eq!(stored.pairing_id, Some(PairingId(1)));
    assert_eq!(stored.pairing_pos, Some(2));
    assert_eq!(stored.course_handicap, Some(4));
    assert_eq!(stored.playing_handicap, Some(4));
    assert_eq!(stored.shots_off, Some(2));
    assert_eq!(store.player(GAME, &ghin(1)).unwrap().shots_off, Some(0));
    assert_eq!(outcome.recalc.players_updated, 2);
    Ok(())
}

#[tokio::test]
async fn invalid_roster_is_never_written() -> Result<(), Box<dyn Error>> {
    let mut roster = players(4);
    for (i, p) in roster.iter_mut().take(3).enumerate() {
        #[allow(clippy::cast_possible_truncation)]
        seat(p, 1, i as u32 + 1, None);
    }
    let (mut session, store, rating) = open(team_config(), roster).await?;
    session.assign(&select(&[4]), None)?;

    let outcome = session.save().await;
    assert!(!outcome.ok);
    assert!(matches!(
        outcome.failure,
        Some(PairingError::Validation(ValidationError::TooManyInPairing { size: 3, max: 2, .. }))
    ));
    assert!(matches!(
        stage_status(&outcome, SaveStage::Validate),
        Some(StageStatus::Failed(_))
    ));
    assert_eq!(stage_status(&outcome, SaveStage::Persist), None);
    assert_eq!(store.saves(), 0);
    assert_eq!(rating.calls(), (0, 0));
    assert!(session.dirty().contains(&ghin(4)));
    Ok(())
}

#[tokio::test]
async fn failed_write_keeps_changes_for_a_retry() -> Result<(), Box<dyn Error>> {
    let (mut session, store, rating) = open(individual_config(), players(4)).await?;
    session.assign(&select(&[1, 2, 3]), None)?;
    store.fail_saves.store(true, Ordering::SeqCst);

    let outcome = session.save().await;
    assert!(!outcome.ok);
    assert!(matches!(outcome.failure, Some(PairingError::Persistence(_))));
    assert_eq!(outcome.saved, 0);
    assert_eq!(session.dirty().len(), 3);
    assert!(!session.pending().is_empty());
    assert_eq!(rating.calls(), (0, 0));
    assert_eq!(store.player(GAME, &ghin(1)).unwrap().pairing_id, None);

    store.fail_saves.store(false, Ordering::SeqCst);
    let retry = session.save().await;
    assert!(retry.ok);
    assert_eq!(retry.saved, 3);
    assert!(session.dirty().is_empty());
    assert_eq!(store.saves(), 2);
    assert_eq!(store.player(GAME, &ghin(3)).unwrap().pairing_pos, Some(3));
    Ok(())
}

#[tokio::test]
async fn handicaps_left_pending_run_on_the_next_save() -> Result<(), Box<dyn Error>> {
    let (mut session, store, rating) = open(individual_config(), players(4)).await?;
    session.assign(&select(&[1, 2]), None)?;
    store.echo_duplicate.store(true, Ordering::SeqCst);

    let outcome = session.save().await;
    assert!(!outcome.ok);
    assert!(matches!(
        stage_status(&outcome, SaveStage::Resync),
        Some(StageStatus::Failed(_))
    ));
    // the rows were written, only the handicaps are still owed
    assert!(session.dirty().is_empty());
    assert!(!session.pending().is_empty());
    assert_eq!(rating.calls(), (0, 0));

    store.echo_duplicate.store(false, Ordering::SeqCst);
    let retry = session.save().await;
    assert!(retry.ok, "{:?}", retry.errors);
    assert_eq!(retry.saved, 0);
    assert_eq!(stage_status(&retry, SaveStage::Persist), Some(&StageStatus::Skipped));
    assert_eq!(
        stage_status(&retry, SaveStage::StoreHandicaps),
        Some(&StageStatus::Done)
    );
    assert_eq!(store.saves(), 1);
    assert_eq!(rating.calls(), (1, 1));
    assert!(session.pending().is_empty());
    assert_eq!(store.player(GAME, &ghin(2)).unwrap().shots_off, Some(2));
    Ok(())
}

#[tokio::test]
async fn rating_failures_only_warn() -> Result<(), Box<dyn Error>> {
    let (mut session, store, rating) = open(individual_config(), players(4)).await?;
    rating.fail_baseline.store(true, Ordering::SeqCst);
    session.assign(&select(&[1, 2]), None)?;

    let outcome = session.save().await;
    assert!(outcome.ok);
    assert!(matches!(
        stage_status(&outcome, SaveStage::BaselineHandicaps),
        Some(StageStatus::Warned(_))
    ));
    assert_eq!(outcome.warnings.len(), 1);
    assert_eq!(store.player(GAME, &ghin(1)).unwrap().pairing_id, Some(PairingId(1)));
    Ok(())
}

#[tokio::test]
async fn dissolving_a_flighted_pairing_breaks_the_flight() -> Result<(), Box<dyn Error>> {
    let (mut session, store, rating) = open(team_config(), flighted_roster()).await?;

    let removal = session.dissolve_group(GroupRef::Pairing(PairingId(2)))?;
    assert_eq!(
        removal.dissolved,
        vec![GroupRef::Pairing(PairingId(2)), GroupRef::Flight(FlightId(1))]
    );
    assert_eq!(removal.remaining, Some(GroupRef::Pairing(PairingId(1))));
    assert_eq!(session.dirty().len(), 4);

    let survivor = session.model().player(&ghin(1)).unwrap();
    assert_eq!(survivor.pairing_id, Some(PairingId(1)));
    assert_eq!(survivor.flight_id, None);
    assert!(survivor.schedule.is_empty());

    let outcome = session.save().await;
    assert!(outcome.ok);
    assert_eq!(rating.groups_seen(), vec![vec![ghin(1), ghin(2)]]);

    let left = store.player(GAME, &ghin(3)).unwrap();
    assert_eq!(left.pairing_id, None);
    assert_eq!(left.flight_id, None);
    assert_eq!(left.playing_handicap, None);
    let kept = store.player(GAME, &ghin(2)).unwrap();
    assert_eq!(kept.pairing_id, Some(PairingId(1)));
    assert_eq!(kept.flight_id, None);
    assert_eq!(kept.schedule.tee_time, None);
    Ok(())
}

#[tokio::test]
async fn removing_a_player_deletes_from_the_store_first() -> Result<(), Box<dyn Error>> {
    let (mut session, store, _rating) = open(individual_config(), players(4)).await?;
    session.assign(&select(&[1, 2, 3]), None)?;

    store.fail_removes.store(true, Ordering::SeqCst);
    let err = session.remove_player(&ghin(2)).await.unwrap_err();
    assert!(matches!(err, PairingError::Persistence(_)));
    assert!(session.model().player(&ghin(2)).is_some());

    store.fail_removes.store(false, Ordering::SeqCst);
    let removal = session.remove_player(&ghin(2)).await?;
    assert_eq!(removal.remaining, Some(GroupRef::Pairing(PairingId(1))));
    assert!(session.model().player(&ghin(2)).is_none());
    assert!(!session.dirty().contains(&ghin(2)));
    assert!(!session.pending().players.contains(&ghin(2)));
    assert!(store.player(GAME, &ghin(2)).is_none());
    assert_eq!(session.model().pairing_size(PairingId(1)), 2);

    assert!(matches!(
        session.remove_player("nobody").await,
        Err(PairingError::Validation(ValidationError::UnknownPlayer(_)))
    ));
    assert_eq!(store.remove_calls.load(Ordering::SeqCst), 2);
    Ok(())
}

#[tokio::test]
async fn discarding_reloads_the_stored_roster() -> Result<(), Box<dyn Error>> {
    let (mut session, store, _rating) = open(individual_config(), players(4)).await?;
    session.assign(&select(&[1, 2]), None)?;
    assert!(!session.dirty().is_empty());

    session.discard_changes().await?;
    assert!(session.dirty().is_empty());
    assert!(session.pending().is_empty());
    assert_eq!(session.model().unassigned().len(), 4);
    assert_eq!(store.load_calls.load(Ordering::SeqCst), 2);
    assert_eq!(store.saves(), 0);
    Ok(())
}
