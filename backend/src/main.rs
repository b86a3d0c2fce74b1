//! Backend entry-point: loads settings, selects adapters and serves the
//! report registry.

mod server;

use std::sync::Arc;

use actix_web::web;
use mockable::{DefaultClock, DefaultEnv};
use ortho_config::OrthoConfig;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use inspectorate::config::AppSettings;
use inspectorate::inbound::http::health::HealthState;
use inspectorate::inbound::http::session_config::{BuildMode, session_settings_from_env};
use inspectorate::inbound::http::state::AdminSecret;
use server::{ServerConfig, build_http_state, create_server, read_secret_file};

/// Application bootstrap.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings =
        AppSettings::load_from_iter(std::env::args_os()).map_err(std::io::Error::other)?;
    let session = session_settings_from_env(&DefaultEnv::new(), BuildMode::from_debug_assertions())
        .map_err(std::io::Error::other)?;
    let bind_addr = settings.bind_addr().map_err(std::io::Error::other)?;

    let admin_secret = settings
        .admin_secret_file
        .as_deref()
        .and_then(read_secret_file)
        .and_then(AdminSecret::from_plaintext);
    if admin_secret.is_none() {
        warn!("no admin secret configured; POST /set-admin-claim rejects every call");
    }

    let http_state = build_http_state(&settings, admin_secret, Arc::new(DefaultClock)).await?;
    info!(
        %bind_addr,
        write_mode = %http_state.writer.mode(),
        "starting server"
    );

    let config = ServerConfig::new(session.key, session.cookie_secure, session.same_site, bind_addr)
        .with_http_state(http_state);
    let health_state = web::Data::new(HealthState::new());
    create_server(health_state, config)?.await
}
