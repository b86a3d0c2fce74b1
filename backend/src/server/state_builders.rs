//! Builders for HTTP state: adapter selection from the process settings.
//!
//! The write path is decided once here. Elevated credentials are probed with
//! a cheap authenticated read; a failed probe demotes the process to the
//! local fallback (or to no write path at all) instead of failing startup.

use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use mockable::Clock;
use tracing::{info, warn};
use url::Url;
use zeroize::Zeroizing;

use inspectorate::config::AppSettings;
use inspectorate::domain::ports::{
    ClaimsGateway, FixtureIdentityProvider, IdentityProvider, ReportRepository,
    UnavailableClaimsGateway, UserRepository,
};
use inspectorate::domain::{
    AccountService, AdminAllowList, ReportLocator, ReportWriter, WriteCapability, WriteMode,
};
use inspectorate::inbound::http::state::{AdminSecret, HttpState};
use inspectorate::outbound::firestore::{
    FirestoreAuth, FirestoreClient, FirestoreReportRepository, FirestoreUserRepository,
};
use inspectorate::outbound::identity::{IdentityToolkitClaimsGateway, IdentityToolkitProvider};
use inspectorate::outbound::local_store::JsonFileReportStore;
use inspectorate::outbound::memory::{InMemoryClaimsGateway, InMemoryDocumentStore};

/// Write mode for a process with or without working elevated credentials.
pub(crate) fn select_write_mode(elevated: bool, local_fallback: bool) -> WriteMode {
    match (elevated, local_fallback) {
        (true, _) => WriteMode::Privileged,
        (false, true) => WriteMode::LocalFallback,
        (false, false) => WriteMode::Unavailable,
    }
}

/// Development state: every port served from one in-memory store.
pub(crate) fn in_memory_state(
    clock: Arc<dyn Clock>,
    admins: AdminAllowList,
    identity: Arc<dyn IdentityProvider>,
) -> HttpState {
    let store = Arc::new(InMemoryDocumentStore::new(clock));
    let accounts = AccountService::new(
        identity,
        store.clone(),
        Arc::new(InMemoryClaimsGateway::new()),
        admins,
    );
    HttpState::new(
        Arc::new(ReportLocator::new(store.clone())),
        Arc::new(ReportWriter::new(WriteCapability::Privileged(store))),
        Arc::new(accounts),
    )
}

/// Build handler state from `settings`.
///
/// # Errors
///
/// Returns an error for unparsable URLs, HTTP clients that cannot be built,
/// an unusable fallback directory, or a project configured without any
/// credential.
pub(crate) async fn build_http_state(
    settings: &AppSettings,
    admin_secret: Option<AdminSecret>,
    clock: Arc<dyn Clock>,
) -> io::Result<HttpState> {
    let timeout = settings.http_timeout();
    let identity_url = settings.identity_base_url().map_err(io::Error::other)?;
    let identity = build_identity_provider(settings, &identity_url, timeout)?;

    let Some(project) = settings.project_id() else {
        warn!("no document store project configured; using the in-memory store");
        return Ok(
            in_memory_state(clock, settings.admin_allow_list(), identity)
                .with_admin_secret(admin_secret),
        );
    };

    let base_url = settings.firestore_base_url().map_err(io::Error::other)?;
    let token = settings
        .firestore_token_file
        .as_deref()
        .and_then(read_secret_file);
    let elevated = match token.clone() {
        Some(token) => probe_elevated(base_url.clone(), project, token, timeout).await?,
        None => None,
    };
    let read_client = match (&elevated, settings.api_key()) {
        (Some(client), _) => client.clone(),
        (None, Some(key)) => FirestoreClient::new(
            base_url,
            project,
            FirestoreAuth::ApiKey(key.to_owned()),
            timeout,
        )
        .map_err(io::Error::other)?,
        (None, None) => {
            return Err(io::Error::other(format!(
                "project {project} needs a working token file or an API key"
            )));
        }
    };

    let reports: Arc<dyn ReportRepository> =
        Arc::new(FirestoreReportRepository::new(read_client.clone()));
    let users: Arc<dyn UserRepository> = Arc::new(FirestoreUserRepository::new(read_client));

    let mode = select_write_mode(elevated.is_some(), settings.local_fallback());
    let capability = match mode {
        WriteMode::Privileged => WriteCapability::Privileged(reports.clone()),
        WriteMode::LocalFallback => {
            let store = JsonFileReportStore::open(&settings.data_dir(), clock)?;
            info!(path = %store.location().display(), "local fallback store opened");
            WriteCapability::LocalFallback(Arc::new(store))
        }
        WriteMode::Unavailable => WriteCapability::Unavailable,
    };
    info!(%mode, project, "report write path selected");

    let claims: Arc<dyn ClaimsGateway> = match (elevated.is_some(), token) {
        (true, Some(token)) => Arc::new(IdentityToolkitClaimsGateway::new(
            &identity_url,
            project,
            token,
            timeout,
        )?),
        _ => {
            warn!("credential claims cannot be written without elevated credentials");
            Arc::new(UnavailableClaimsGateway)
        }
    };

    let accounts = AccountService::new(identity, users, claims, settings.admin_allow_list());
    Ok(HttpState::new(
        Arc::new(ReportLocator::new(reports)),
        Arc::new(ReportWriter::new(capability)),
        Arc::new(accounts),
    )
    .with_admin_secret(admin_secret))
}

fn build_identity_provider(
    settings: &AppSettings,
    identity_url: &Url,
    timeout: Duration,
) -> io::Result<Arc<dyn IdentityProvider>> {
    match settings.api_key() {
        Some(key) => {
            let provider = IdentityToolkitProvider::new(
                identity_url.clone(),
                Zeroizing::new(key.to_owned()),
                timeout,
            )
            .map_err(io::Error::other)?;
            Ok(Arc::new(provider))
        }
        None => {
            warn!("no identity API key configured; fixture sign-in is active");
            Ok(Arc::new(FixtureIdentityProvider))
        }
    }
}

/// Read a trimmed secret from `path`; `None` when unreadable or blank.
pub(crate) fn read_secret_file(path: &Path) -> Option<Zeroizing<String>> {
    match std::fs::read_to_string(path) {
        Ok(raw) => {
            let raw = Zeroizing::new(raw);
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                warn!(path = %path.display(), "secret file is empty");
                None
            } else {
                Some(Zeroizing::new(trimmed.to_owned()))
            }
        }
        Err(error) => {
            warn!(path = %path.display(), %error, "secret file unreadable");
            None
        }
    }
}

async fn probe_elevated(
    base_url: Url,
    project: &str,
    token: Zeroizing<String>,
    timeout: Duration,
) -> io::Result<Option<FirestoreClient>> {
    let client = FirestoreClient::new(base_url, project, FirestoreAuth::Bearer(token), timeout)
        .map_err(io::Error::other)?;
    match client.probe().await {
        Ok(()) => {
            info!(project, "elevated credentials verified");
            Ok(Some(client))
        }
        Err(error) => {
            warn!(project, %error, "elevated credentials rejected; writes fall back");
            Ok(None)
        }
    }
}
