use std::sync::Arc;

use dashmap::Entry;
use nanoid::nanoid;
use rocket::{State, get, http::Status, post, serde::json::Json};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::{
    error::GameError,
    model::{
        BoardSettings, Pos,
        api::{CreateResponse, FlagResponse, RevealResponse, SettingsResponse, TimeResponse},
    },
    rate_limit::{ClientIp, RateLimiter},
    session::{GameSession, Sessions},
};

impl From<GameError> for Status {
    fn from(err: GameError) -> Self {
        match err {
            GameError::InvalidConfiguration | GameError::InvalidCoordinate => {
                Status::UnprocessableEntity
            }
            GameError::SessionTerminated => Status::Conflict,
        }
    }
}

#[instrument(level = "trace", skip(sessions, session))]
fn add_session(sessions: &State<Sessions>, session: GameSession) -> String {
    let mut id_length = 5;
    let max_attempts_per_length = 10;

    loop {
        for _ in 0..max_attempts_per_length {
            let id = nanoid!(id_length);
            match sessions.entry(id.clone()) {
                Entry::Occupied(_) => {
                    debug!("session id collision, retrying: {}", id);
                    continue;
                }
                Entry::Vacant(entry) => {
                    entry.insert(Arc::new(Mutex::new(session)));
                    return id;
                }
            }
        }

        id_length += 1;
    }
}

fn lookup(sessions: &State<Sessions>, id: &str) -> Result<Arc<Mutex<GameSession>>, Status> {
    match sessions.get(id) {
        Some(entry) => Ok(entry.value().clone()),
        None => {
            warn!("request for unknown session: {}", id);
            Err(Status::NotFound)
        }
    }
}

#[post("/session", data = "<settings>")]
#[instrument(level = "trace", skip(sessions, rate_limiter), fields(client_ip = %client_ip.0))]
pub fn create_session(
    settings: Json<BoardSettings>,
    sessions: &State<Sessions>,
    rate_limiter: &State<RateLimiter>,
    client_ip: ClientIp,
) -> Result<Json<CreateResponse>, Status> {
    if let Err(status) = rate_limiter.check(&client_ip) {
        warn!("session creation rate limit hit for {}", client_ip.0);
        return Err(status);
    }

    let session = GameSession::new(&settings)?;
    let applied = session.settings();
    let id = add_session(sessions, session);

    info!(
        "created session {} for {}: {}x{} with {} mines",
        id, client_ip.0, applied.rows, applied.cols, applied.mines
    );
    Ok(Json(CreateResponse {
        id,
        rows: applied.rows,
        cols: applied.cols,
        mines: applied.mines,
    }))
}

#[post("/session/<id>/settings", data = "<settings>")]
pub async fn apply_settings(
    id: &str,
    settings: Json<BoardSettings>,
    sessions: &State<Sessions>,
) -> Result<Json<SettingsResponse>, Status> {
    let session = lookup(sessions, id)?;
    let mut session = session.lock().await;

    session.reconfigure(&settings)?;
    let applied = session.settings();

    Ok(Json(SettingsResponse {
        success: true,
        rows: applied.rows,
        cols: applied.cols,
        mines: applied.mines,
    }))
}

#[post("/session/<id>/reveal", data = "<target>")]
pub async fn reveal_cell(
    id: &str,
    target: Json<Pos>,
    sessions: &State<Sessions>,
) -> Result<Json<RevealResponse>, Status> {
    let session = lookup(sessions, id)?;
    let mut session = session.lock().await;

    let outcome = session.reveal(target.0)?;

    Ok(Json(RevealResponse {
        success: !outcome.lost,
        field: outcome.field,
        won: outcome.won,
        lost: outcome.lost,
        time: outcome.elapsed,
    }))
}

#[post("/session/<id>/flag", data = "<target>")]
pub async fn flag_cell(
    id: &str,
    target: Json<Pos>,
    sessions: &State<Sessions>,
) -> Result<Json<FlagResponse>, Status> {
    let session = lookup(sessions, id)?;
    let mut session = session.lock().await;

    let outcome = session.toggle_flag(target.0)?;

    Ok(Json(FlagResponse {
        flags: outcome.flags,
        mines_remaining: outcome.mines_remaining,
        won: outcome.won,
    }))
}

#[get("/session/<id>/time")]
pub async fn read_timer(
    id: &str,
    sessions: &State<Sessions>,
) -> Result<Json<TimeResponse>, Status> {
    let session = lookup(sessions, id)?;
    let session = session.lock().await;

    Ok(Json(TimeResponse {
        time: session.elapsed_seconds(),
    }))
}

#[post("/session/<id>/timer/start")]
pub async fn start_timer(
    id: &str,
    sessions: &State<Sessions>,
) -> Result<Json<TimeResponse>, Status> {
    let session = lookup(sessions, id)?;
    let mut session = session.lock().await;

    session.start_timer();

    Ok(Json(TimeResponse {
        time: session.elapsed_seconds(),
    }))
}
