use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

use crate::error::PairingError;
use crate::model::{GameConfig, GroupModel, GroupRef, Player, RecalcScope, ScoringBasis};
use crate::rating::{GolferEntry, RatingService};
use crate::storage::HandicapUpdate;

/// Players and groups whose handicaps need recomputing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecalcPlan {
    pub players: BTreeSet<String>,
    pub groups: BTreeSet<GroupRef>,
}

impl RecalcPlan {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.players.is_empty() && self.groups.is_empty()
    }

    pub fn clear(&mut self) {
        self.players.clear();
        self.groups.clear();
    }

    /// Record a player and the group their playing handicap depends on.
    pub fn touch_player(&mut self, model: &GroupModel, ghin: &str) {
        self.players.insert(ghin.to_string());
        if let Some(group) = model.player(ghin).and_then(|p| scope_group(model, p)) {
            self.groups.insert(group);
        }
    }

    pub fn touch_group(&mut self, model: &GroupModel, group: GroupRef) {
        self.groups.insert(model.schedule_owner(group));
    }

    /// Drop groups that no longer exist, e.g. after a dissolve.
    pub fn forget_groups<'a>(&mut self, groups: impl IntoIterator<Item = &'a GroupRef>) {
        for g in groups {
            self.groups.remove(g);
        }
    }

    pub fn forget_player(&mut self, ghin: &str) {
        self.players.remove(ghin);
    }

    /// Plan for an explicit recalculation request.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the scope names a player or group that is not in
    /// the roster.
    pub fn for_scope(model: &GroupModel, scope: &RecalcScope) -> Result<Self, PairingError> {
        let mut plan = Self::default();
        match scope {
            RecalcScope::Player(ghin) => {
                if model.player(ghin).is_none() {
                    return Err(PairingError::NotFound(format!("player {ghin}")));
                }
                plan.touch_player(model, ghin);
            }
            RecalcScope::Pairing(id) => plan.add_existing(model, GroupRef::Pairing(*id))?,
            RecalcScope::Flight(id) => plan.add_existing(model, GroupRef::Flight(*id))?,
            RecalcScope::All => {
                for p in model.players() {
                    plan.touch_player(model, &p.ghin);
                }
            }
        }
        Ok(plan)
    }

    fn add_existing(&mut self, model: &GroupModel, group: GroupRef) -> Result<(), PairingError> {
        if !model.group_exists(group) {
            return Err(PairingError::NotFound(group.to_string()));
        }
        let owner = model.schedule_owner(group);
        self.players
            .extend(model.group_members(owner).iter().map(|p| p.ghin.clone()));
        self.groups.insert(owner);
        Ok(())
    }
}

/// Group whose members share a playing-handicap computation with `player`.
/// Team players sit with their flight once flighted, otherwise with their
/// pairing.
#[must_use]
pub fn scope_group(model: &GroupModel, player: &Player) -> Option<GroupRef> {
    model.schedule_unit(player)
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecalcWarning {
    BaselineFailed { players: usize, message: String },
    GroupFailed { group: GroupRef, message: String },
    StaleGroup { group: GroupRef },
    MissingResult { ghin: String },
}

/// Result of one pass, folded into a [`RecalcReport`].
#[derive(Debug, Clone, Default)]
pub struct PassOutcome {
    pub touched: BTreeSet<String>,
    pub groups_succeeded: usize,
    pub groups_warned: usize,
    pub warnings: Vec<RecalcWarning>,
}

#[derive(Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct RecalcReport {
    pub players_updated: usize,
    pub groups_succeeded: usize,
    pub groups_warned: usize,
    pub pass_b_skipped: bool,
    pub warnings: Vec<RecalcWarning>,
    #[serde(skip)]
    pub updated: BTreeSet<String>,
}

impl RecalcReport {
    pub fn absorb(&mut self, outcome: PassOutcome) {
        self.updated.extend(outcome.touched);
        self.players_updated = self.updated.len();
        self.groups_succeeded += outcome.groups_succeeded;
        self.groups_warned += outcome.groups_warned;
        self.warnings.extend(outcome.warnings);
    }
}

/// Stored handicap figures of the given players, as they are in the model now.
#[must_use]
pub fn handicap_updates(model: &GroupModel, ghins: &BTreeSet<String>) -> Vec<HandicapUpdate> {
    ghins
        .iter()
        .filter_map(|g| model.player(g))
        .map(|p| HandicapUpdate {
            ghin: p.ghin.clone(),
            course_handicap: p.course_handicap,
            playing_handicap: p.playing_handicap,
            shots_off: p.shots_off,
        })
        .collect()
}

/// Put saved figures back onto the model.
pub fn restore_handicaps(model: &mut GroupModel, saved: &[HandicapUpdate]) {
    for u in saved {
        if let Some(p) = model.player_mut(&u.ghin) {
            p.course_handicap = u.course_handicap;
            p.playing_handicap = u.playing_handicap;
            p.shots_off = u.shots_off;
        }
    }
}

/// Two-pass handicap recomputation. Pass A asks for baseline course
/// handicaps, Pass B for playing handicaps and shots-off per group.
pub struct HandicapOrchestrator<'a> {
    rating: &'a dyn RatingService,
    config: &'a GameConfig,
}

impl<'a> HandicapOrchestrator<'a> {
    #[must_use]
    pub fn new(rating: &'a dyn RatingService, config: &'a GameConfig) -> Self {
        Self { rating, config }
    }

    #[must_use]
    pub fn skips_pass_b(&self) -> bool {
        self.config.scoring == ScoringBasis::Gross
    }

    /// Plan players plus every member of a live plan group, sorted.
    fn baseline_players(model: &GroupModel, plan: &RecalcPlan) -> Vec<String> {
        let mut ghins: BTreeSet<String> = plan
            .players
            .iter()
            .filter(|g| model.player(g).is_some())
            .cloned()
            .collect();
        for group in &plan.groups {
            ghins.extend(model.group_members(*group).iter().map(|p| p.ghin.clone()));
        }
        ghins.into_iter().collect()
    }

    /// Pass A: one batch call for every affected player. A failed call
    /// leaves the old course handicaps in place and is reported as a warning.
    pub async fn pass_a(&self, model: &mut GroupModel, plan: &RecalcPlan) -> PassOutcome {
        let mut outcome = PassOutcome::default();
        let ghins = Self::baseline_players(model, plan);
        if ghins.is_empty() {
            return outcome;
        }
        let entries: Vec<GolferEntry> = ghins
            .iter()
            .filter_map(|g| model.player(g))
            .map(GolferEntry::from)
            .collect();

        match self.rating.course_handicaps(&self.config.tee_set, &entries).await {
            Ok(results) => {
                let mut by_ghin: BTreeMap<String, Option<i32>> = results
                    .into_iter()
                    .map(|r| (r.ghin, r.course_handicap))
                    .collect();
                for ghin in ghins {
                    match by_ghin.remove(&ghin) {
                        Some(ch) => {
                            if let Some(p) = model.player_mut(&ghin) {
                                p.course_handicap = ch;
                            }
                            outcome.touched.insert(ghin);
                        }
                        None => outcome.warnings.push(RecalcWarning::MissingResult { ghin }),
                    }
                }
            }
            Err(e) => {
                warn!(game_id = model.game_id(), error = %e, "baseline handicaps failed");
                outcome.warnings.push(RecalcWarning::BaselineFailed {
                    players: entries.len(),
                    message: e.to_string(),
                });
            }
        }
        debug!(
            game_id = model.game_id(),
            updated = outcome.touched.len(),
            "pass A done"
        );
        outcome
    }

    /// Pass B: one call per affected group, run concurrently. A failing group
    /// is a warning and does not stop the others. Plan players left without a
    /// group lose their playing handicap.
    pub async fn pass_b(&self, model: &mut GroupModel, plan: &RecalcPlan) -> PassOutcome {
        let mut outcome = PassOutcome::default();

        let mut groups = BTreeSet::new();
        for group in &plan.groups {
            if model.group_exists(*group) {
                groups.insert(model.schedule_owner(*group));
            } else {
                warn!(game_id = model.game_id(), %group, "scoped group no longer exists");
                outcome.warnings.push(RecalcWarning::StaleGroup { group: *group });
            }
        }

        let calls = groups.iter().map(|group| {
            let entries: Vec<GolferEntry> = model
                .group_members(*group)
                .into_iter()
                .map(GolferEntry::from)
                .collect();
            async move {
                let res = self
                    .rating
                    .playing_handicaps(&self.config.tee_set, &entries)
                    .await;
                (*group, entries, res)
            }
        });
        let results = futures::future::join_all(calls).await;

        for (group, entries, res) in results {
            match res {
                Ok(results) => {
                    let mut by_ghin: BTreeMap<String, (Option<i32>, Option<i32>)> = results
                        .into_iter()
                        .map(|r| (r.ghin, (r.playing_handicap, r.shots_off)))
                        .collect();
                    for entry in entries {
                        match by_ghin.remove(&entry.ghin) {
                            Some((ph, so)) => {
                                if let Some(p) = model.player_mut(&entry.ghin) {
                                    p.playing_handicap = ph;
                                    p.shots_off = so;
                                }
                                outcome.touched.insert(entry.ghin);
                            }
                            None => outcome
                                .warnings
                                .push(RecalcWarning::MissingResult { ghin: entry.ghin }),
                        }
                    }
                    outcome.groups_succeeded += 1;
                }
                Err(e) => {
                    warn!(
                        game_id = model.game_id(),
                        %group,
                        error = %e,
                        "playing handicaps failed"
                    );
                    outcome.groups_warned += 1;
                    outcome.warnings.push(RecalcWarning::GroupFailed {
                        group,
                        message: e.to_string(),
                    });
                }
            }
        }

        for ghin in &plan.players {
            if let Some(p) = model.player_mut(ghin) {
                if !p.is_assigned() && (p.playing_handicap.is_some() || p.shots_off.is_some()) {
                    p.playing_handicap = None;
                    p.shots_off = None;
                    outcome.touched.insert(ghin.clone());
                }
            }
        }
        outcome
    }

    /// Both passes, skipping Pass B for gross games.
    pub async fn run(&self, model: &mut GroupModel, plan: &RecalcPlan) -> RecalcReport {
        let mut report = RecalcReport::default();
        report.absorb(self.pass_a(model, plan).await);
        if self.skips_pass_b() {
            report.pass_b_skipped = true;
        } else {
            report.absorb(self.pass_b(model, plan).await);
        }
        report
    }
}
