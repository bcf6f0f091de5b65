use minefield_server::{cleanup::start_cleanup_task, session::Sessions};
use rocket::{
    Build, Rocket,
    fairing::{Fairing, Info, Kind},
};
use tracing::{info, warn};

struct CleanupFairing;

#[rocket::async_trait]
impl Fairing for CleanupFairing {
    fn info(&self) -> Info {
        Info {
            name: "Session Cleanup",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        if let Some(sessions) = rocket.state::<Sessions>() {
            let sessions = sessions.clone();
            tokio::spawn(async move {
                start_cleanup_task(sessions).await;
            });
        } else {
            warn!("sessions state missing, cleanup task not started");
        }
        Ok(rocket)
    }
}

#[rocket::launch]
fn rocket() -> Rocket<Build> {
    tracing_subscriber::fmt::init();
    info!("starting minefield server");

    minefield_server::build().attach(CleanupFairing)
}
