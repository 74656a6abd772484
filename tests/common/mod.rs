#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use rusty_pairings::GroupingSession;
use rusty_pairings::error::PairingError;
use rusty_pairings::model::{
    CompetitionType, FlightId, FlightSide, GameConfig, PairingId, Player, Schedule, TeeOffMethod,
};
use rusty_pairings::rating::{
    CourseHandicapResult, GolferEntry, PlayingHandicapResult, RatingService,
};
use rusty_pairings::storage::{
    AssignmentRow, HandicapUpdate, RosterRow, RosterStore, StorageError, normalize_row,
};

pub const GAME: &str = "g1";

/// Roster store kept in memory. Counts calls and can be told to fail.
#[derive(Default)]
pub struct MemoryStore {
    rosters: Mutex<HashMap<String, Vec<Player>>>,
    pub load_calls: AtomicUsize,
    pub save_calls: AtomicUsize,
    pub remove_calls: AtomicUsize,
    pub handicap_calls: AtomicUsize,
    pub fail_saves: AtomicBool,
    pub fail_removes: AtomicBool,
    pub fail_handicaps: AtomicBool,
    /// Writes go through but the roster handed back repeats its first player.
    pub echo_duplicate: AtomicBool,
}

impl MemoryStore {
    pub fn with_roster(game_id: &str, players: Vec<Player>) -> Arc<Self> {
        let store = Self::default();
        store
            .rosters
            .lock()
            .unwrap()
            .insert(game_id.to_string(), players);
        Arc::new(store)
    }

    pub fn roster(&self, game_id: &str) -> Vec<Player> {
        self.rosters
            .lock()
            .unwrap()
            .get(game_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn player(&self, game_id: &str, ghin: &str) -> Option<Player> {
        self.roster(game_id).into_iter().find(|p| p.ghin == ghin)
    }

    pub fn saves(&self) -> usize {
        self.save_calls.load(Ordering::SeqCst)
    }
}

fn apply_row(player: &Player, row: &AssignmentRow) -> Result<Player, StorageError> {
    let mut updated = normalize_row(RosterRow {
        ghin: row.ghin.clone(),
        name: player.name.clone(),
        handicap_index: player.handicap_index.map(f64::from),
        course_handicap: player.course_handicap.map(i64::from),
        playing_handicap: player.playing_handicap.map(i64::from),
        shots_off: player.shots_off.map(i64::from),
        pairing_id: Some(row.pairing_id.clone()),
        pairing_pos: Some(row.pairing_pos.clone()),
        flight_id: Some(row.flight_id.clone()),
        flight_pos: Some(row.flight_pos.clone()),
        tee_time: Some(row.tee_time.clone()),
        start_hole: Some(row.start_hole.clone()),
        start_hole_suffix: Some(row.start_hole_suffix.clone()),
    })?;
    updated.handicap_index = player.handicap_index;
    Ok(updated)
}

#[async_trait]
impl RosterStore for MemoryStore {
    async fn load_roster(&self, game_id: &str) -> Result<Vec<Player>, StorageError> {
        self.load_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.roster(game_id))
    }

    async fn save_assignments(
        &self,
        game_id: &str,
        rows: &[AssignmentRow],
    ) -> Result<Vec<Player>, StorageError> {
        self.save_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StorageError::new("connection reset"));
        }
        let mut rosters = self.rosters.lock().unwrap();
        let roster = rosters.entry(game_id.to_string()).or_default();
        for row in rows {
            if let Some(p) = roster.iter_mut().find(|p| p.ghin == row.ghin) {
                *p = apply_row(p, row)?;
            }
        }
        let mut canonical = roster.clone();
        if self.echo_duplicate.load(Ordering::SeqCst) {
            if let Some(first) = canonical.first().cloned() {
                canonical.push(first);
            }
        }
        Ok(canonical)
    }

    async fn remove_player(&self, game_id: &str, ghin: &str) -> Result<(), StorageError> {
        self.remove_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_removes.load(Ordering::SeqCst) {
            return Err(StorageError::new("delete refused"));
        }
        let mut rosters = self.rosters.lock().unwrap();
        if let Some(roster) = rosters.get_mut(game_id) {
            roster.retain(|p| p.ghin != ghin);
        }
        Ok(())
    }

    async fn store_handicaps(
        &self,
        game_id: &str,
        updates: &[HandicapUpdate],
    ) -> Result<(), StorageError> {
        self.handicap_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_handicaps.load(Ordering::SeqCst) {
            return Err(StorageError::new("disk full"));
        }
        let mut rosters = self.rosters.lock().unwrap();
        if let Some(roster) = rosters.get_mut(game_id) {
            for u in updates {
                if let Some(p) = roster.iter_mut().find(|p| p.ghin == u.ghin) {
                    p.course_handicap = u.course_handicap;
                    p.playing_handicap = u.playing_handicap;
                    p.shots_off = u.shots_off;
                }
            }
        }
        Ok(())
    }
}

/// Rating service that rounds the index for the course handicap and uses
/// it unchanged as playing handicap. Records every call.
#[derive(Default)]
pub struct FakeRating {
    pub course_calls: AtomicUsize,
    pub playing_calls: AtomicUsize,
    pub baseline_sizes: Mutex<Vec<usize>>,
    pub group_calls: Mutex<Vec<Vec<String>>>,
    pub fail_baseline: AtomicBool,
    pub fail_group_with: Mutex<Option<String>>,
}

impl FakeRating {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing_group_with(ghin: &str) -> Arc<Self> {
        let rating = Self::default();
        *rating.fail_group_with.lock().unwrap() = Some(ghin.to_string());
        Arc::new(rating)
    }

    pub fn calls(&self) -> (usize, usize) {
        (
            self.course_calls.load(Ordering::SeqCst),
            self.playing_calls.load(Ordering::SeqCst),
        )
    }

    /// Member lists of the Pass-B calls, each sorted, in sorted order.
    pub fn groups_seen(&self) -> Vec<Vec<String>> {
        let mut groups: Vec<Vec<String>> = self
            .group_calls
            .lock()
            .unwrap()
            .iter()
            .map(|g| {
                let mut g = g.clone();
                g.sort();
                g
            })
            .collect();
        groups.sort();
        groups
    }
}

#[async_trait]
impl RatingService for FakeRating {
    async fn course_handicaps(
        &self,
        _tee_set: &rusty_pairings::model::TeeSetContext,
        golfers: &[GolferEntry],
    ) -> Result<Vec<CourseHandicapResult>, PairingError> {
        self.course_calls.fetch_add(1, Ordering::SeqCst);
        self.baseline_sizes.lock().unwrap().push(golfers.len());
        if self.fail_baseline.load(Ordering::SeqCst) {
            return Err(PairingError::ExternalService("rating service down".into()));
        }
        Ok(golfers
            .iter()
            .map(|g| CourseHandicapResult {
                ghin: g.ghin.clone(),
                course_handicap: g.handicap_index.map(|hi| hi.round() as i32),
            })
            .collect())
    }

    async fn playing_handicaps(
        &self,
        _tee_set: &rusty_pairings::model::TeeSetContext,
        group: &[GolferEntry],
    ) -> Result<Vec<PlayingHandicapResult>, PairingError> {
        self.playing_calls.fetch_add(1, Ordering::SeqCst);
        self.group_calls
            .lock()
            .unwrap()
            .push(group.iter().map(|g| g.ghin.clone()).collect());
        let fail_with = self.fail_group_with.lock().unwrap().clone();
        if let Some(ghin) = fail_with {
            if group.iter().any(|g| g.ghin == ghin) {
                return Err(PairingError::ExternalService(format!("group with {ghin} timed out")));
            }
        }
        let low = group.iter().filter_map(|g| g.course_handicap).min();
        Ok(group
            .iter()
            .map(|g| PlayingHandicapResult {
                ghin: g.ghin.clone(),
                playing_handicap: g.course_handicap,
                shots_off: g.course_handicap.zip(low).map(|(ch, low)| ch - low),
            })
            .collect())
    }
}

pub fn individual_config() -> GameConfig {
    let mut config = GameConfig::new(GAME, CompetitionType::Individual);
    config.tee_times = vec!["08:00".into(), "08:10".into(), "08:20".into()];
    config
}

pub fn team_config() -> GameConfig {
    let mut config = GameConfig::new(GAME, CompetitionType::Team);
    config.tee_times = vec!["09:00".into()];
    config.holes = vec!["1".into(), "5".into(), "10".into()];
    config.tee_off = TeeOffMethod::Shotgun;
    config
}

/// `p01`..`pNN`, index rising with the number.
pub fn players(n: usize) -> Vec<Player> {
    (1..=n)
        .map(|i| {
            #[allow(clippy::cast_precision_loss)]
            let hi = i as f32 * 2.0;
            Player::new(ghin(i), format!("Player {i}"), Some(hi))
        })
        .collect()
}

pub fn ghin(i: usize) -> String {
    format!("p{i:02}")
}

/// Put a stored player into a pairing, and optionally a flight.
pub fn seat(player: &mut Player, pairing: u32, pos: u32, flight: Option<(u32, FlightSide)>) {
    player.pairing_id = Some(PairingId(pairing));
    player.pairing_pos = Some(pos);
    if let Some((id, side)) = flight {
        player.flight_id = Some(FlightId(id));
        player.flight_pos = Some(side);
    }
}

pub fn scheduled(player: &mut Player, tee_time: &str, hole: &str, suffix: Option<&str>) {
    player.schedule = Schedule::new(tee_time, hole, suffix);
}

pub async fn open(
    config: GameConfig,
    roster: Vec<Player>,
) -> Result<(GroupingSession, Arc<MemoryStore>, Arc<FakeRating>), PairingError> {
    let store = MemoryStore::with_roster(&config.game_id, roster);
    let rating = FakeRating::new();
    let session = GroupingSession::open(config, store.clone(), rating.clone()).await?;
    Ok((session, store, rating))
}
