use std::sync::Arc;

use rocket::config::SecretKey;
use rocket::figment::Figment;
use rocket::*;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use crate::config::{Backend, ConfigError, Settings};
use crate::cors::Cors;
use crate::external::{MemoryService, ServiceError, SharedService, SupabaseClient};
use crate::requests::ScoresTable;
use crate::session::{MemorySessionStore, SharedSessions};

mod config;
mod cors;
mod external;
mod requests;
mod score;
mod session;
mod telemetry;
#[cfg(test)]
mod tests;

#[derive(Error, Debug)]
enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to set up the external service client: {0}")]
    Service(#[from] ServiceError),
    #[error(transparent)]
    Launch(#[from] Box<rocket::Error>),
}

#[rocket::main]
async fn main() -> Result<(), StartupError> {
    if let Err(err) = telemetry::init_tracing() {
        eprintln!("failed to initialize logging: {}", err);
    }

    let settings = Settings::from_env()?;
    let service = connect(&settings)?;

    let _ = build(&settings, service).launch().await.map_err(Box::new)?;
    Ok(())
}

/// Creates the external service client the settings ask for.
fn connect(settings: &Settings) -> Result<SharedService, ServiceError> {
    match &settings.backend {
        Backend::Supabase { url, key } => {
            tracing::info!(%url, "using the supabase backend");
            let key = SecretString::from(key.expose_secret().to_owned());
            let client = SupabaseClient::new(url, key, settings.external_timeout)?;
            Ok(Arc::new(client))
        }
        Backend::Memory { accounts } => {
            let service = MemoryService::from_accounts(accounts);
            tracing::warn!(
                accounts = service.account_count(),
                "using the in-memory backend, nothing is persisted"
            );
            Ok(Arc::new(service))
        }
    }
}

/// Uses the key derived from `SECRET_KEY` unless Rocket's own configuration
/// (`ROCKET_SECRET_KEY` or `Rocket.toml`) already provides a non-zero one.
fn with_cookie_key(figment: Figment, settings: &Settings) -> Figment {
    let configured = figment
        .extract_inner::<SecretKey>("secret_key")
        .map(|key| !key.is_zero())
        .unwrap_or(false);
    if configured {
        tracing::info!("using the secret key from the rocket configuration");
        figment
    } else {
        figment.merge(("secret_key", settings.cookie_key_hex()))
    }
}

/// Builds the rocket around an external service.
pub fn build(settings: &Settings, service: SharedService) -> Rocket<Build> {
    let figment = with_cookie_key(Config::figment(), settings);
    let sessions: SharedSessions = Arc::new(MemorySessionStore::new(settings.session_policy));

    rocket::custom(figment)
        .mount(
            "/",
            routes![
                requests::index,
                requests::login,
                requests::logout,
                requests::submit_score,
                requests::get_scores,
                cors::preflight,
            ],
        )
        .register("/", requests::json_catchers())
        .attach(Cors::new(settings.cors_allow_origin.clone()))
        .manage::<SharedService>(service)
        .manage::<SharedSessions>(sessions)
        .manage(settings.read_policy)
        .manage(ScoresTable(settings.scores_table.clone()))
}
