#[macro_use]
extern crate rocket;

mod activity;
mod api;
mod auth;
mod db;
mod env;
mod error;
mod generator;
mod models;
mod stats;
mod telemetry;
#[cfg(test)]
mod test;
mod validation;

use api::{
    api_dashboard_activity, api_dashboard_roadmaps, api_dashboard_stats, api_generate_roadmap,
    api_get_progress, api_get_roadmap, api_login, api_logout, api_me, api_me_unauthorized,
    api_register, api_toggle_progress, health,
};
use auth::unauthorized_api;
use db::clean_expired_sessions;
use error::AppError;
use generator::RoadmapGenerator;
use once_cell::sync::Lazy;
use rocket::{Build, Rocket, tokio};
use std::sync::Mutex;
use telemetry::{OtelGuard, TelemetryFairing, init_tracing};
use thiserror::Error;

use sqlx::SqlitePool;
use tracing::{error, info};

static TELEMETRY_GUARD: Lazy<Mutex<Option<OtelGuard>>> = Lazy::new(|| Mutex::new(None));

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Anyhow(anyhow::Error),
    #[error("{0}")]
    Figment(rocket::figment::Error),
    #[error("{0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("Application error: {0}")]
    App(#[from] AppError),
}

impl From<anyhow::Error> for Error {
    fn from(value: anyhow::Error) -> Self {
        Error::Anyhow(value)
    }
}

impl From<rocket::figment::Error> for Error {
    fn from(value: rocket::figment::Error) -> Self {
        Error::Figment(value)
    }
}

#[launch]
async fn rocket() -> _ {
    if let Err(e) = env::load_environment() {
        eprintln!("Failed to load environment files: {}", e);
    }

    *TELEMETRY_GUARD.lock().unwrap() = init_tracing();

    let database_url = std::env::var("DATABASE_URL").unwrap_or_default();

    let pool = SqlitePool::connect(&database_url)
        .await
        .expect("Failed to connect to SQLite database");

    let pool_clone = pool.clone();

    tokio::spawn(async move {
        tokio::time::sleep(tokio::time::Duration::from_secs(5)).await;

        loop {
            match clean_expired_sessions(&pool_clone).await {
                Ok(count) => {
                    if count > 0 {
                        info!("Cleaned up {} expired sessions", count);
                    }
                }
                Err(e) => {
                    error!("Failed to clean expired sessions: {}", e);
                }
            }

            tokio::time::sleep(tokio::time::Duration::from_secs(3600)).await;
        }
    });

    info!("Running database migrations...");
    match sqlx::migrate!("./migrations").run(&pool).await {
        Ok(_) => info!("Migrations completed successfully"),
        Err(e) => {
            error!("Failed to run migrations: {}", e);
            panic!("Database migration failed: {}", e);
        }
    }

    let generator = RoadmapGenerator::from_env().expect("Roadmap generator not configured");

    init_rocket(pool, generator).await
}

pub async fn init_rocket(pool: SqlitePool, generator: RoadmapGenerator) -> Rocket<Build> {
    info!("Starting PathPilot");

    rocket::build()
        .manage(pool)
        .manage(generator)
        .mount(
            "/api",
            routes![
                api_register,
                api_login,
                api_logout,
                api_me,
                api_me_unauthorized,
                api_generate_roadmap,
                api_get_roadmap,
                api_dashboard_roadmaps,
                api_get_progress,
                api_toggle_progress,
                api_dashboard_stats,
                api_dashboard_activity,
            ],
        )
        .register("/api", catchers![unauthorized_api])
        .mount("/api", routes![health])
        .attach(TelemetryFairing)
}
