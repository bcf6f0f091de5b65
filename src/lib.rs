pub mod board;
pub mod cleanup;
pub mod cors;
pub mod error;
pub mod model;
pub mod rate_limit;
pub mod routes;
pub mod session;

use std::sync::Arc;

use dashmap::DashMap;
use rocket::{Build, Rocket, routes};

use crate::{rate_limit::RateLimiter, session::Sessions};

/// Assemble the rocket instance: managed state, CORS, and all routes. The
/// binary attaches the cleanup fairing on top; tests ignite this directly.
pub fn build() -> Rocket<Build> {
    let sessions: Sessions = Arc::new(DashMap::new());

    rocket::build()
        .attach(cors::create_cors())
        .manage(sessions)
        .manage(RateLimiter::from_env())
        .mount(
            "/",
            routes![
                routes::create_session,
                routes::apply_settings,
                routes::reveal_cell,
                routes::flag_cell,
                routes::read_timer,
                routes::start_timer,
            ],
        )
}
