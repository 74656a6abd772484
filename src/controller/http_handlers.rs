use actix_web::web::{self, Data};
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, Responder};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::warn;

use crate::controller::auto_pair::{AutoPairConfig, ProposedGroup};
use crate::controller::session::GroupingSession;
use crate::error::PairingError;
use crate::model::{FlightId, GameConfig, GroupRef, PairingId, RecalcScope, Selection};
use crate::rating::RatingService;
use crate::storage::RosterStore;

/// Open sessions keyed by game id. A session is opened on first use from the
/// configured games.
pub struct SessionRegistry {
    configs: HashMap<String, GameConfig>,
    store: Arc<dyn RosterStore>,
    rating: Arc<dyn RatingService>,
    sessions: Mutex<HashMap<String, Arc<Mutex<GroupingSession>>>>,
}

impl SessionRegistry {
    #[must_use]
    pub fn new(
        configs: Vec<GameConfig>,
        store: Arc<dyn RosterStore>,
        rating: Arc<dyn RatingService>,
    ) -> Self {
        Self {
            configs: configs.into_iter().map(|c| (c.game_id.clone(), c)).collect(),
            store,
            rating,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn game_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.configs.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// # Errors
    ///
    /// Will return `Err` if the game is not configured or its roster cannot
    /// be loaded.
    pub async fn session(
        &self,
        game_id: &str,
    ) -> Result<Arc<Mutex<GroupingSession>>, PairingError> {
        let mut sessions = self.sessions.lock().await;
        if let Some(s) = sessions.get(game_id) {
            return Ok(Arc::clone(s));
        }
        let config = self
            .configs
            .get(game_id)
            .cloned()
            .ok_or_else(|| PairingError::NotFound(format!("game {game_id}")))?;
        let session =
            GroupingSession::open(config, Arc::clone(&self.store), Arc::clone(&self.rating))
                .await?;
        let session = Arc::new(Mutex::new(session));
        sessions.insert(game_id.to_string(), Arc::clone(&session));
        Ok(session)
    }
}

fn status_for(err: &PairingError) -> StatusCode {
    match err {
        PairingError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        PairingError::SlotExhausted { .. } | PairingError::Busy => StatusCode::CONFLICT,
        PairingError::NotFound(_) => StatusCode::NOT_FOUND,
        PairingError::Persistence(_) => StatusCode::SERVICE_UNAVAILABLE,
        PairingError::ExternalService(_) => StatusCode::BAD_GATEWAY,
        PairingError::Config(_) => StatusCode::BAD_REQUEST,
    }
}

#[must_use]
pub fn error_response(err: &PairingError) -> HttpResponse {
    let status = status_for(err);
    if let PairingError::Persistence(detail) = err {
        warn!(error = %detail, "roster store unavailable");
        return HttpResponse::build(status).json(json!({
            "error": "the roster store could not be reached; your changes are kept, try saving again"
        }));
    }
    HttpResponse::build(status).json(json!({"error": err.to_string()}))
}

/// Lock the game's session without waiting. A held lock means a save or
/// recalculation is running.
async fn lock_session(
    registry: &SessionRegistry,
    game_id: &str,
) -> Result<OwnedMutexGuard<GroupingSession>, HttpResponse> {
    let session = registry
        .session(game_id)
        .await
        .map_err(|e| error_response(&e))?;
    session.try_lock_owned().map_err(|_| {
        warn!(game_id, "session busy");
        error_response(&PairingError::Busy)
    })
}

macro_rules! session_or_return {
    ($registry:expr, $game_id:expr) => {
        match lock_session(&$registry, &$game_id).await {
            Ok(s) => s,
            Err(resp) => return resp,
        }
    };
}

fn respond<T: serde::Serialize>(result: Result<T, PairingError>) -> HttpResponse {
    match result {
        Ok(value) => HttpResponse::Ok().json(value),
        Err(e) => error_response(&e),
    }
}

#[derive(Deserialize)]
pub struct AssignRequest {
    pub ghins: Vec<String>,
    #[serde(default)]
    pub pairing_id: Option<PairingId>,
}

#[derive(Deserialize)]
pub struct UnassignRequest {
    pub ghin: String,
}

#[derive(Deserialize)]
pub struct FlightRequest {
    pub pairing_id: PairingId,
    #[serde(default)]
    pub flight_id: Option<FlightId>,
}

/// Both `tee_time` and `start_hole` set a schedule; both absent clear it.
#[derive(Deserialize)]
pub struct ScheduleRequest {
    pub group: GroupRef,
    #[serde(default)]
    pub tee_time: Option<String>,
    #[serde(default)]
    pub start_hole: Option<String>,
    #[serde(default)]
    pub suffix: Option<String>,
}

#[derive(Deserialize)]
pub struct ApplyRequest {
    pub groups: Vec<ProposedGroup>,
}

pub async fn health() -> impl Responder {
    HttpResponse::Ok().json(json!({"status": "ok"}))
}

pub async fn roster(path: web::Path<String>, registry: Data<SessionRegistry>) -> HttpResponse {
    let game_id = path.into_inner();
    let session = session_or_return!(registry, game_id);
    HttpResponse::Ok().json(json!({
        "game_id": game_id,
        "players": session.model().players(),
        "dirty": session.dirty(),
        "mixes": session.suggested_mixes(),
    }))
}

pub async fn assign(
    path: web::Path<String>,
    body: web::Json<AssignRequest>,
    registry: Data<SessionRegistry>,
) -> HttpResponse {
    let game_id = path.into_inner();
    let mut session = session_or_return!(registry, game_id);
    let req = body.into_inner();
    let selection: Selection = req.ghins.into_iter().collect();
    respond(session.assign(&selection, req.pairing_id))
}

pub async fn unassign(
    path: web::Path<String>,
    body: web::Json<UnassignRequest>,
    registry: Data<SessionRegistry>,
) -> HttpResponse {
    let game_id = path.into_inner();
    let mut session = session_or_return!(registry, game_id);
    respond(session.unassign(&body.ghin).map(|r| json!({
        "affected": r.affected,
        "dissolved": r.dissolved,
        "remaining": r.remaining,
    })))
}

pub async fn dissolve(
    path: web::Path<String>,
    body: web::Json<GroupRef>,
    registry: Data<SessionRegistry>,
) -> HttpResponse {
    let game_id = path.into_inner();
    let mut session = session_or_return!(registry, game_id);
    respond(session.dissolve_group(body.into_inner()).map(|r| json!({
        "affected": r.affected,
        "dissolved": r.dissolved,
        "remaining": r.remaining,
    })))
}

pub async fn assign_flight(
    path: web::Path<String>,
    body: web::Json<FlightRequest>,
    registry: Data<SessionRegistry>,
) -> HttpResponse {
    let game_id = path.into_inner();
    let mut session = session_or_return!(registry, game_id);
    respond(session.assign_to_flight(body.pairing_id, body.flight_id))
}

pub async fn schedule(
    path: web::Path<String>,
    body: web::Json<ScheduleRequest>,
    registry: Data<SessionRegistry>,
) -> HttpResponse {
    let game_id = path.into_inner();
    let mut session = session_or_return!(registry, game_id);
    let req = body.into_inner();
    match (req.tee_time.as_deref(), req.start_hole.as_deref()) {
        (Some(tee_time), Some(start_hole)) => respond(session.set_schedule(
            req.group,
            tee_time,
            start_hole,
            req.suffix.as_deref(),
        )),
        (None, None) => {
            respond(session.clear_schedule(req.group).map(|()| json!({"cleared": true})))
        }
        _ => HttpResponse::BadRequest()
            .json(json!({"error": "tee_time and start_hole must be given together"})),
    }
}

pub async fn autopair_preview(
    path: web::Path<String>,
    body: web::Json<AutoPairConfig>,
    registry: Data<SessionRegistry>,
) -> HttpResponse {
    let game_id = path.into_inner();
    let session = session_or_return!(registry, game_id);
    respond(session.auto_pair(&body).map(|groups| json!({"groups": groups})))
}

pub async fn autopair_apply(
    path: web::Path<String>,
    body: web::Json<ApplyRequest>,
    registry: Data<SessionRegistry>,
) -> HttpResponse {
    let game_id = path.into_inner();
    let mut session = session_or_return!(registry, game_id);
    respond(session.apply_auto_pair(&body.groups).map(|ids| json!({"pairing_ids": ids})))
}

pub async fn save(path: web::Path<String>, registry: Data<SessionRegistry>) -> HttpResponse {
    let game_id = path.into_inner();
    let mut session = session_or_return!(registry, game_id);
    let outcome = session.save().await;
    let status = outcome.failure.as_ref().map_or(StatusCode::OK, status_for);
    HttpResponse::build(status).json(&outcome)
}

pub async fn recalculate(
    path: web::Path<String>,
    body: web::Json<RecalcScope>,
    registry: Data<SessionRegistry>,
) -> HttpResponse {
    let game_id = path.into_inner();
    let mut session = session_or_return!(registry, game_id);
    respond(session.recalculate(&body).await)
}

pub async fn remove_player(
    path: web::Path<(String, String)>,
    registry: Data<SessionRegistry>,
) -> HttpResponse {
    let (game_id, ghin) = path.into_inner();
    let mut session = session_or_return!(registry, game_id);
    respond(session.remove_player(&ghin).await.map(|r| json!({
        "removed": ghin,
        "affected": r.affected,
        "dissolved": r.dissolved,
    })))
}

pub async fn discard(path: web::Path<String>, registry: Data<SessionRegistry>) -> HttpResponse {
    let game_id = path.into_inner();
    let mut session = session_or_return!(registry, game_id);
    respond(session.discard_changes().await.map(|()| json!({"discarded": true})))
}

/// Mount the game routes. Shared by the server and the tests.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health)).service(
        web::scope("/games/{game_id}")
            .route("/roster", web::get().to(roster))
            .route("/assign", web::post().to(assign))
            .route("/unassign", web::post().to(unassign))
            .route("/dissolve", web::post().to(dissolve))
            .route("/flights/assign", web::post().to(assign_flight))
            .route("/schedule", web::post().to(schedule))
            .route("/autopair/preview", web::post().to(autopair_preview))
            .route("/autopair/apply", web::post().to(autopair_apply))
            .route("/save", web::post().to(save))
            .route("/discard", web::post().to(discard))
            .route("/recalculate", web::post().to(recalculate))
            .route("/players/{ghin}", web::delete().to(remove_player)),
    );
}
