use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

use crate::controller::handicap::{
    HandicapOrchestrator, PassOutcome, RecalcPlan, RecalcReport, handicap_updates,
};
use crate::controller::persistence::{build_dirty_payload, validate};
use crate::error::PairingError;
use crate::model::{GameConfig, GroupModel, Player};
use crate::rating::RatingService;
use crate::storage::{AssignmentRow, RosterStore};

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SaveStage {
    Validate,
    Persist,
    Resync,
    BaselineHandicaps,
    PlayingHandicaps,
    StoreHandicaps,
    Reload,
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum StageStatus {
    Done,
    Skipped,
    Warned(String),
    Failed(String),
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct StageReport {
    pub stage: SaveStage,
    #[serde(flatten)]
    pub status: StageStatus,
}

/// State of one save run. `update` folds stage results into it and decides
/// what runs next.
#[derive(Debug, Clone)]
pub struct SaveModel {
    pub dirty: BTreeSet<String>,
    pub plan: RecalcPlan,
    pub rows: Vec<AssignmentRow>,
    pub recalc: RecalcReport,
    pub stages: Vec<StageReport>,
    pub error: Option<PairingError>,
}

impl SaveModel {
    #[must_use]
    pub fn new(dirty: BTreeSet<String>, plan: RecalcPlan) -> Self {
        Self {
            dirty,
            plan,
            rows: Vec::new(),
            recalc: RecalcReport::default(),
            stages: Vec::new(),
            error: None,
        }
    }

    /// Whether the structural write reached the store.
    #[must_use]
    pub fn persisted(&self) -> bool {
        self.stages
            .iter()
            .any(|s| s.stage == SaveStage::Persist && s.status == StageStatus::Done)
    }

    fn record(&mut self, stage: SaveStage, status: StageStatus) {
        debug!(?stage, ?status, "save stage");
        self.stages.push(StageReport { stage, status });
    }

    fn skip(&mut self, stages: &[SaveStage]) {
        for stage in stages {
            self.record(*stage, StageStatus::Skipped);
        }
    }
}

#[derive(Debug, Clone)]
pub enum Msg {
    Start,
    Validated(Vec<AssignmentRow>),
    Persisted(Vec<Player>),
    Resynced,
    BaselineComputed(PassOutcome),
    PlayingComputed(PassOutcome),
    PlayingSkipped,
    HandicapsStored,
    HandicapsNotStored(String),
    Reloaded,
    ReloadFailed(String),
    Failed(SaveStage, PairingError),
}

#[derive(Debug, Clone)]
pub enum Effect {
    Validate,
    Persist,
    Resync(Vec<Player>),
    BaselineHandicaps,
    PlayingHandicaps,
    StoreHandicaps,
    Reload,
}

fn pass_status(outcome: &PassOutcome) -> StageStatus {
    if outcome.warnings.is_empty() {
        StageStatus::Done
    } else {
        StageStatus::Warned(format!("{} warning(s)", outcome.warnings.len()))
    }
}

pub fn update(model: &mut SaveModel, msg: Msg) -> Vec<Effect> {
    use SaveStage::{
        BaselineHandicaps, Persist, PlayingHandicaps, Reload, Resync, StoreHandicaps, Validate,
    };
    match msg {
        Msg::Start => vec![Effect::Validate],
        Msg::Validated(rows) => {
            model.record(Validate, StageStatus::Done);
            if rows.is_empty() {
                // handicaps left pending by an earlier save still run
                model.skip(&[Persist, Resync]);
                if model.plan.is_empty() {
                    model.skip(&[BaselineHandicaps, PlayingHandicaps, StoreHandicaps, Reload]);
                    vec![]
                } else {
                    vec![Effect::BaselineHandicaps]
                }
            } else {
                model.rows = rows;
                vec![Effect::Persist]
            }
        }
        Msg::Persisted(canonical) => {
            model.record(Persist, StageStatus::Done);
            vec![Effect::Resync(canonical)]
        }
        Msg::Resynced => {
            model.record(Resync, StageStatus::Done);
            if model.plan.is_empty() {
                model.skip(&[BaselineHandicaps, PlayingHandicaps, StoreHandicaps, Reload]);
                vec![]
            } else {
                vec![Effect::BaselineHandicaps]
            }
        }
        Msg::BaselineComputed(outcome) => {
            model.record(BaselineHandicaps, pass_status(&outcome));
            model.recalc.absorb(outcome);
            vec![Effect::PlayingHandicaps]
        }
        Msg::PlayingSkipped => {
            model.record(PlayingHandicaps, StageStatus::Skipped);
            model.recalc.pass_b_skipped = true;
            vec![Effect::StoreHandicaps]
        }
        Msg::PlayingComputed(outcome) => {
            model.record(PlayingHandicaps, pass_status(&outcome));
            model.recalc.absorb(outcome);
            vec![Effect::StoreHandicaps]
        }
        Msg::HandicapsStored => {
            model.record(StoreHandicaps, StageStatus::Done);
            vec![Effect::Reload]
        }
        Msg::HandicapsNotStored(e) => {
            model.record(StoreHandicaps, StageStatus::Warned(e));
            model.skip(&[Reload]);
            vec![]
        }
        Msg::Reloaded => {
            model.record(Reload, StageStatus::Done);
            vec![]
        }
        Msg::ReloadFailed(e) => {
            model.record(Reload, StageStatus::Warned(e));
            vec![]
        }
        Msg::Failed(stage, e) => {
            model.record(stage, StageStatus::Failed(e.to_string()));
            model.error = Some(e);
            vec![]
        }
    }
}

#[derive(Clone, Copy)]
pub struct Deps<'a> {
    pub config: &'a GameConfig,
    pub store: &'a dyn RosterStore,
    pub rating: &'a dyn RatingService,
}

pub async fn run_effect(
    effect: Effect,
    model: &SaveModel,
    roster: &mut GroupModel,
    deps: Deps<'_>,
) -> Msg {
    let game_id = roster.game_id().to_string();
    match effect {
        Effect::Validate => match validate(roster, deps.config) {
            Ok(()) => Msg::Validated(build_dirty_payload(roster, &model.dirty)),
            Err(e) => Msg::Failed(SaveStage::Validate, e.into()),
        },
        Effect::Persist => match deps.store.save_assignments(&game_id, &model.rows).await {
            Ok(canonical) => {
                info!(game_id = %game_id, rows = model.rows.len(), "assignments persisted");
                Msg::Persisted(canonical)
            }
            Err(e) => {
                warn!(game_id = %game_id, error = %e, "save failed, keeping pending changes");
                Msg::Failed(SaveStage::Persist, e.into())
            }
        },
        Effect::Resync(canonical) => match roster.replace_all(canonical) {
            Ok(()) => Msg::Resynced,
            Err(e) => Msg::Failed(SaveStage::Resync, e.into()),
        },
        Effect::BaselineHandicaps => {
            let orchestrator = HandicapOrchestrator::new(deps.rating, deps.config);
            Msg::BaselineComputed(orchestrator.pass_a(roster, &model.plan).await)
        }
        Effect::PlayingHandicaps => {
            let orchestrator = HandicapOrchestrator::new(deps.rating, deps.config);
            if orchestrator.skips_pass_b() {
                Msg::PlayingSkipped
            } else {
                Msg::PlayingComputed(orchestrator.pass_b(roster, &model.plan).await)
            }
        }
        Effect::StoreHandicaps => {
            let updates = handicap_updates(roster, &model.recalc.updated);
            match deps.store.store_handicaps(&game_id, &updates).await {
                Ok(()) => Msg::HandicapsStored,
                Err(e) => {
                    warn!(game_id = %game_id, error = %e, "handicaps not stored");
                    Msg::HandicapsNotStored(e.to_string())
                }
            }
        }
        Effect::Reload => match deps.store.load_roster(&game_id).await {
            Ok(players) => match roster.replace_all(players) {
                Ok(()) => Msg::Reloaded,
                Err(e) => Msg::ReloadFailed(e.to_string()),
            },
            Err(e) => Msg::ReloadFailed(e.to_string()),
        },
    }
}

/// Drive a save from validation through reload. Stops at the first failed
/// stage and hands its error back; later stages never run then.
///
/// # Errors
///
/// Will return `Err` if validation, the structural write or the resync fails.
pub async fn run_save(
    model: &mut SaveModel,
    roster: &mut GroupModel,
    deps: Deps<'_>,
) -> Result<(), PairingError> {
    let mut effects = update(model, Msg::Start);
    while let Some(effect) = effects.pop() {
        match run_effect(effect, model, roster, deps).await {
            Msg::Failed(stage, e) => {
                update(model, Msg::Failed(stage, e.clone()));
                return Err(e);
            }
            msg => effects.extend(update(model, msg)),
        }
    }
    Ok(())
}
