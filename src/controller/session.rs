use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::controller::auto_pair::{AutoPairConfig, AutoPairEngine, GroupMix, ProposedGroup};
use crate::controller::handicap::{
    HandicapOrchestrator, RecalcPlan, RecalcReport, handicap_updates, restore_handicaps,
};
use crate::controller::pipeline::{Deps, SaveModel, StageReport, run_save};
use crate::controller::shotgun::ShotgunSlotAssigner;
use crate::controller::slots::{next_flight_position, next_pairing_positions};
use crate::controller::tee_schedule::{inherited_schedule, schedule_of};
use crate::error::{PairingError, ValidationError};
use crate::model::{
    FlightId, FlightSide, GameConfig, GroupModel, GroupRef, PairingId, Player, RecalcScope,
    Removal, Schedule, Selection,
};
use crate::rating::RatingService;
use crate::storage::RosterStore;

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct AssignOutcome {
    pub pairing_id: PairingId,
    pub created: bool,
    /// Seat given to each newly placed player, in selection order.
    pub positions: Vec<(String, u32)>,
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct FlightAssignOutcome {
    pub flight_id: FlightId,
    pub side: FlightSide,
    pub created: bool,
}

#[derive(Serialize, Clone, Debug)]
pub struct SaveOutcome {
    pub ok: bool,
    pub roster: Vec<Player>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub saved: usize,
    pub stages: Vec<StageReport>,
    pub recalc: RecalcReport,
    #[serde(skip)]
    pub failure: Option<PairingError>,
}

/// Editing session of one game: the roster, the players with unsaved
/// grouping changes, and the groups waiting for a handicap recompute.
///
/// Saving and recalculating take `&mut self`, so one session never runs two
/// at once. Callers sharing a session across requests hold it behind a lock
/// and answer [`PairingError::Busy`] while it is taken, as
/// [`SessionRegistry`](crate::controller::http_handlers::SessionRegistry) does.
pub struct GroupingSession {
    config: GameConfig,
    model: GroupModel,
    dirty: BTreeSet<String>,
    pending: RecalcPlan,
    store: Arc<dyn RosterStore>,
    rating: Arc<dyn RatingService>,
}

impl GroupingSession {
    /// Load the roster of `config.game_id` and start a clean session.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the config is invalid, the store cannot be read,
    /// or the stored roster repeats a ghin.
    pub async fn open(
        config: GameConfig,
        store: Arc<dyn RosterStore>,
        rating: Arc<dyn RatingService>,
    ) -> Result<Self, PairingError> {
        config.validate()?;
        let players = store.load_roster(&config.game_id).await?;
        let model = GroupModel::new(config.game_id.clone(), config.competition, players)?;
        info!(
            game_id = %config.game_id,
            players = model.players().len(),
            "session opened"
        );
        Ok(Self {
            config,
            model,
            dirty: BTreeSet::new(),
            pending: RecalcPlan::default(),
            store,
            rating,
        })
    }

    #[must_use]
    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    #[must_use]
    pub fn model(&self) -> &GroupModel {
        &self.model
    }

    #[must_use]
    pub fn dirty(&self) -> &BTreeSet<String> {
        &self.dirty
    }

    #[must_use]
    pub fn pending(&self) -> &RecalcPlan {
        &self.pending
    }

    fn mark_dirty<'a>(&mut self, ghins: impl IntoIterator<Item = &'a String>) {
        self.dirty.extend(ghins.into_iter().cloned());
    }

    fn absorb_removal(&mut self, removal: &Removal) {
        self.mark_dirty(&removal.affected);
        self.pending.forget_groups(&removal.dissolved);
        for ghin in &removal.affected {
            self.pending.touch_player(&self.model, ghin);
        }
        if let Some(group) = removal.remaining {
            self.pending.touch_group(&self.model, group);
        }
    }

    fn known_unique<'a>(
        &self,
        ghins: impl IntoIterator<Item = &'a str>,
    ) -> Result<(), ValidationError> {
        let mut seen = BTreeSet::new();
        for ghin in ghins {
            if !seen.insert(ghin) {
                return Err(ValidationError::DuplicatePlayer(ghin.to_string()));
            }
            if self.model.player(ghin).is_none() {
                return Err(ValidationError::UnknownPlayer(ghin.to_string()));
            }
        }
        Ok(())
    }

    /// Put the selected players into `target`, or into a new pairing. Players
    /// already in another pairing move, dissolving what they leave behind if
    /// it empties. Newcomers inherit the pairing's flight and schedule.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the selection is empty, repeats or names an
    /// unknown player, the target id is outside `001` to `999`, no pairing
    /// id is free, or the pairing would overfill. The roster is untouched
    /// then.
    pub fn assign(
        &mut self,
        selection: &Selection,
        target: Option<PairingId>,
    ) -> Result<AssignOutcome, PairingError> {
        if selection.is_empty() {
            return Err(ValidationError::EmptySelection.into());
        }
        self.known_unique(selection.iter())?;

        let pairing_id = match target {
            Some(id) if !id.in_range() => {
                return Err(ValidationError::GroupIdOutOfRange(id.0.to_string()).into());
            }
            Some(id) => id,
            None => self.model.next_pairing_id()?,
        };
        let created = !self.model.group_exists(GroupRef::Pairing(pairing_id));
        let joining: Vec<String> = selection
            .iter()
            .filter(|g| {
                self.model
                    .player(g)
                    .is_some_and(|p| p.pairing_id != Some(pairing_id))
            })
            .map(str::to_string)
            .collect();

        let current = self.model.pairing_size(pairing_id);
        let max = self.config.max_pairing_size();
        if current + joining.len() > max {
            return Err(ValidationError::PairingFull {
                pairing_id: pairing_id.to_string(),
                current,
                adding: joining.len(),
                max,
            }
            .into());
        }

        for ghin in &joining {
            let removal = self.model.unassign(ghin);
            if !removal.affected.is_empty() {
                debug!(ghin = %ghin, from = ?removal.dissolved, "moving player between pairings");
                self.absorb_removal(&removal);
            }
        }

        let positions = next_pairing_positions(&self.model, pairing_id, joining.len());
        let flight = self.model.flight_of(pairing_id);
        let schedule = inherited_schedule(&self.model, GroupRef::Pairing(pairing_id));
        for (ghin, pos) in joining.iter().zip(&positions) {
            self.model.place(ghin, pairing_id, *pos, flight, &schedule);
        }
        self.model.refresh_score_keys();

        self.mark_dirty(&joining);
        for ghin in &joining {
            self.pending.touch_player(&self.model, ghin);
        }
        debug!(
            game_id = %self.config.game_id,
            pairing = %pairing_id,
            added = joining.len(),
            created,
            "assigned"
        );
        Ok(AssignOutcome {
            pairing_id,
            created,
            positions: joining.into_iter().zip(positions).collect(),
        })
    }

    /// Put a pairing into a flight (team games). With no target a new flight
    /// is opened on side A.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the game is not a team game, the pairing does not
    /// exist or is already flighted, the target flight is full, or no flight
    /// id between `001` and `999` is available.
    pub fn assign_to_flight(
        &mut self,
        pairing_id: PairingId,
        target: Option<FlightId>,
    ) -> Result<FlightAssignOutcome, PairingError> {
        if !self.config.is_team() {
            return Err(ValidationError::NotTeamFormat.into());
        }
        let pairing = GroupRef::Pairing(pairing_id);
        if !self.model.group_exists(pairing) {
            return Err(PairingError::NotFound(pairing.to_string()));
        }
        if let Some((flight, _)) = self.model.flight_of(pairing_id) {
            return Err(
                ValidationError::AlreadyFlighted(pairing_id.to_string(), flight.to_string()).into(),
            );
        }

        let flight_id = match target {
            Some(id) if !id.in_range() => {
                return Err(ValidationError::GroupIdOutOfRange(id.0.to_string()).into());
            }
            Some(id) => id,
            None => self.model.next_flight_id()?,
        };
        let flight = GroupRef::Flight(flight_id);
        let created = !self.model.group_exists(flight);
        let side = next_flight_position(&self.model, flight_id)?;

        let mut schedule = schedule_of(&self.model, flight);
        if schedule.is_empty() {
            schedule = schedule_of(&self.model, pairing);
        }
        let mut touched = self.model.set_flight(pairing_id, flight_id, side, &schedule);
        touched.extend(self.model.set_schedule(flight, &schedule));
        self.model.refresh_score_keys();

        self.mark_dirty(&touched);
        self.pending.forget_groups(&[pairing]);
        self.pending.touch_group(&self.model, flight);
        for ghin in &touched {
            self.pending.touch_player(&self.model, ghin);
        }
        Ok(FlightAssignOutcome {
            flight_id,
            side,
            created,
        })
    }

    /// # Errors
    ///
    /// Will return `Err` if the player is not on the roster.
    pub fn unassign(&mut self, ghin: &str) -> Result<Removal, PairingError> {
        if self.model.player(ghin).is_none() {
            return Err(ValidationError::UnknownPlayer(ghin.to_string()).into());
        }
        let removal = self.model.unassign(ghin);
        self.absorb_removal(&removal);
        Ok(removal)
    }

    /// Break up a pairing or a flight.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the group does not exist.
    pub fn dissolve_group(&mut self, group: GroupRef) -> Result<Removal, PairingError> {
        if !self.model.group_exists(group) {
            return Err(PairingError::NotFound(group.to_string()));
        }
        let removal = match group {
            GroupRef::Pairing(id) => self.model.dissolve_pairing(id),
            GroupRef::Flight(id) => self.model.dissolve_flight(id),
        };
        info!(
            game_id = %self.config.game_id,
            %group,
            players = removal.affected.len(),
            "group dissolved"
        );
        self.absorb_removal(&removal);
        Ok(removal)
    }

    /// Schedule the unit that owns `group` (its flight when flighted). In
    /// shotgun games the suffix goes through the slot assigner; timed games
    /// carry no suffix.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the group does not exist, the tee time or hole is
    /// not on the tee sheet, the suffix is not in the alphabet, or every slot
    /// at that time and hole is taken.
    pub fn set_schedule(
        &mut self,
        group: GroupRef,
        tee_time: &str,
        start_hole: &str,
        suffix: Option<&str>,
    ) -> Result<Schedule, PairingError> {
        if !self.model.group_exists(group) {
            return Err(PairingError::NotFound(group.to_string()));
        }
        if !self.config.tee_times.is_empty() && !self.config.tee_times.iter().any(|t| t == tee_time)
        {
            return Err(ValidationError::UnknownTeeTime(tee_time.to_string()).into());
        }
        if !self.config.holes.iter().any(|h| h == start_hole) {
            return Err(ValidationError::UnknownHole(start_hole.to_string()).into());
        }

        let owner = self.model.schedule_owner(group);
        let suffix = if self.config.is_shotgun() {
            let assigner = ShotgunSlotAssigner::new(&self.config.suffix_alphabet);
            Some(assigner.assign(&self.model, tee_time, start_hole, suffix, Some(owner))?)
        } else {
            None
        };

        let schedule = Schedule::new(tee_time, start_hole, suffix.as_deref());
        let touched = self.model.set_schedule(owner, &schedule);
        self.model.refresh_score_keys();
        self.mark_dirty(&touched);
        debug!(
            game_id = %self.config.game_id,
            group = %owner,
            tee_time,
            start_hole,
            suffix = ?schedule.start_hole_suffix,
            "scheduled"
        );
        Ok(schedule)
    }

    /// # Errors
    ///
    /// Will return `Err` if the group does not exist.
    pub fn clear_schedule(&mut self, group: GroupRef) -> Result<(), PairingError> {
        if !self.model.group_exists(group) {
            return Err(PairingError::NotFound(group.to_string()));
        }
        let owner = self.model.schedule_owner(group);
        let touched = self.model.set_schedule(owner, &Schedule::default());
        self.model.refresh_score_keys();
        self.mark_dirty(&touched);
        Ok(())
    }

    #[must_use]
    pub fn suggested_mixes(&self) -> Vec<GroupMix> {
        AutoPairEngine::new(&self.config).suggested_mixes(&self.model)
    }

    /// Preview groupings of the unassigned players. Changes nothing.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the request does not fit the unassigned players
    /// or the tee sheet.
    pub fn auto_pair(&self, request: &AutoPairConfig) -> Result<Vec<ProposedGroup>, PairingError> {
        AutoPairEngine::new(&self.config).propose(&self.model, request)
    }

    /// Turn proposed groups into pairings numbered on from the highest
    /// existing id, seating members in the order given. All groups are
    /// checked before any is applied.
    ///
    /// # Errors
    ///
    /// Will return `Err` if a group has the wrong size for the format or a
    /// member is unknown, repeated or already paired, or there are not
    /// enough free pairing ids.
    pub fn apply_auto_pair(
        &mut self,
        groups: &[ProposedGroup],
    ) -> Result<Vec<PairingId>, PairingError> {
        for group in groups {
            let size = group.members.len();
            if self.config.is_team() {
                if size != 2 {
                    return Err(ValidationError::TeamGroupSize(size).into());
                }
            } else if !(2..=self.config.max_pairing_size()).contains(&size) {
                return Err(ValidationError::GroupSize(size).into());
            }
        }
        self.known_unique(groups.iter().flat_map(|g| g.members.iter().map(String::as_str)))?;
        if let Some(p) = groups
            .iter()
            .flat_map(|g| &g.members)
            .find_map(|g| self.model.player(g).filter(|p| p.is_assigned()))
        {
            return Err(ValidationError::PlayerNotUnassigned(p.ghin.clone()).into());
        }

        let ids = self.model.free_pairing_ids(groups.len())?;
        for (&pairing_id, group) in ids.iter().zip(groups) {
            for (pos, ghin) in (1..).zip(&group.members) {
                self.model.place(ghin, pairing_id, pos, None, &Schedule::default());
            }
        }
        self.model.refresh_score_keys();

        for ghin in groups.iter().flat_map(|g| &g.members) {
            self.dirty.insert(ghin.clone());
            self.pending.touch_player(&self.model, ghin);
        }
        info!(
            game_id = %self.config.game_id,
            pairings = ids.len(),
            "auto pairings applied"
        );
        Ok(ids)
    }

    fn unchanged_outcome(&self) -> SaveOutcome {
        SaveOutcome {
            ok: true,
            roster: self.model.players().to_vec(),
            errors: Vec::new(),
            warnings: Vec::new(),
            saved: 0,
            stages: Vec::new(),
            recalc: RecalcReport::default(),
            failure: None,
        }
    }

    /// Validate, write the dirty players, resync from the stored roster, then
    /// recompute handicaps for the pending groups. A failed stage leaves the
    /// dirty set in place so the save can be retried; stage failures are
    /// reported in the outcome. Groups still pending after a written save
    /// are recomputed on the next one.
    pub async fn save(&mut self) -> SaveOutcome {
        if self.dirty.is_empty() && self.pending.is_empty() {
            debug!(game_id = %self.config.game_id, "nothing to save");
            return self.unchanged_outcome();
        }

        let mut run = SaveModel::new(self.dirty.clone(), self.pending.clone());
        let deps = Deps {
            config: &self.config,
            store: self.store.as_ref(),
            rating: self.rating.as_ref(),
        };
        let result = run_save(&mut run, &mut self.model, deps).await;

        if run.persisted() {
            self.dirty.clear();
        }
        if result.is_ok() {
            self.pending.clear();
        }

        let warnings: Vec<String> = run
            .recalc
            .warnings
            .iter()
            .map(|w| format!("{w:?}"))
            .collect();
        match &result {
            Ok(()) => info!(
                game_id = %self.config.game_id,
                saved = run.rows.len(),
                warnings = warnings.len(),
                "save complete"
            ),
            Err(e) => warn!(game_id = %self.config.game_id, error = %e, "save stopped"),
        }
        SaveOutcome {
            ok: result.is_ok(),
            roster: self.model.players().to_vec(),
            errors: result.as_ref().err().map(ToString::to_string).into_iter().collect(),
            warnings,
            saved: if run.persisted() { run.rows.len() } else { 0 },
            stages: run.stages,
            recalc: run.recalc,
            failure: result.err(),
        }
    }

    /// Recompute handicaps for `scope` right away and store them. If the
    /// store rejects the figures the model goes back to what it held before.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the scope names something not on the roster or
    /// the figures cannot be stored.
    pub async fn recalculate(&mut self, scope: &RecalcScope) -> Result<RecalcReport, PairingError> {
        let plan = RecalcPlan::for_scope(&self.model, scope)?;
        let everyone: BTreeSet<String> =
            self.model.players().iter().map(|p| p.ghin.clone()).collect();
        let before = handicap_updates(&self.model, &everyone);

        let orchestrator = HandicapOrchestrator::new(self.rating.as_ref(), &self.config);
        let report = orchestrator.run(&mut self.model, &plan).await;
        let updates = handicap_updates(&self.model, &report.updated);
        if let Err(e) = self
            .store
            .store_handicaps(&self.config.game_id, &updates)
            .await
        {
            restore_handicaps(&mut self.model, &before);
            warn!(game_id = %self.config.game_id, error = %e, "recalculated figures not stored");
            return Err(e.into());
        }

        info!(
            game_id = %self.config.game_id,
            ?scope,
            players = report.players_updated,
            groups_ok = report.groups_succeeded,
            groups_warned = report.groups_warned,
            "recalculated"
        );
        Ok(report)
    }

    /// Delete a player from the game. The store goes first; the local roster
    /// only changes once the delete has gone through.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the player is unknown or the store delete fails.
    pub async fn remove_player(&mut self, ghin: &str) -> Result<Removal, PairingError> {
        if self.model.player(ghin).is_none() {
            return Err(ValidationError::UnknownPlayer(ghin.to_string()).into());
        }
        self.store.remove_player(&self.config.game_id, ghin).await?;

        let removal = self.model.unassign(ghin);
        self.model.remove_player(ghin);
        self.model.refresh_score_keys();
        self.absorb_removal(&removal);
        self.dirty.remove(ghin);
        self.pending.forget_player(ghin);
        info!(game_id = %self.config.game_id, ghin, "player removed");
        Ok(removal)
    }

    /// Throw away unsaved changes and reload the stored roster.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the store cannot be read; the session is
    /// unchanged then.
    pub async fn discard_changes(&mut self) -> Result<(), PairingError> {
        let players = self.store.load_roster(&self.config.game_id).await?;
        self.model.replace_all(players)?;
        let dropped = self.dirty.len();
        self.dirty.clear();
        self.pending.clear();
        info!(game_id = %self.config.game_id, dropped, "changes discarded");
        Ok(())
    }
}
