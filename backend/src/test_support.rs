//! Test utilities shared by unit tests (in `src/`) and integration tests
//! (in `tests/`). Compiled for tests and behind the `test-support` feature.

pub mod cap_fs {
    //! Capability-safe file helpers for inspecting stores written by tests.

    use std::ffi::OsString;
    use std::io;
    use std::path::Path;

    use cap_std::{ambient_authority, fs::Dir};

    /// Read a UTF-8 text file through `cap_std`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use inspectorate::test_support::cap_fs::{read_file_to_string, write_file};
    ///
    /// let path = std::env::temp_dir().join("inspectorate-cap-fs-read.txt");
    /// write_file(&path, b"{}\n")?;
    /// assert_eq!(read_file_to_string(&path)?, "{}\n");
    /// # Ok::<(), std::io::Error>(())
    /// ```
    pub fn read_file_to_string(path: &Path) -> io::Result<String> {
        let (parent, file_name) = split(path)?;
        Dir::open_ambient_dir(parent, ambient_authority())?.read_to_string(Path::new(&file_name))
    }

    /// Write bytes to a file through `cap_std`, replacing any previous content.
    pub fn write_file(path: &Path, contents: &[u8]) -> io::Result<()> {
        let (parent, file_name) = split(path)?;
        Dir::open_ambient_dir(parent, ambient_authority())?.write(Path::new(&file_name), contents)
    }

    fn split(path: &Path) -> io::Result<(&Path, OsString)> {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        let file_name = path.file_name().ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "path must include a file name")
        })?;
        Ok((parent, file_name.to_os_string()))
    }
}

pub mod clock {
    //! Deterministic clocks for stores that stamp `createdAt`.

    use std::sync::Mutex;

    use chrono::{DateTime, Local, TimeDelta, TimeZone, Utc};
    use mockable::Clock;

    /// Timestamp used by fixtures that do not care about the exact value.
    pub fn fixture_timestamp() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 14, 9, 30, 0)
            .single()
            .unwrap_or_else(|| panic!("valid fixture timestamp"))
    }

    /// Clock that only moves when told to.
    pub struct MutableClock(Mutex<DateTime<Utc>>);

    impl MutableClock {
        pub fn new(now: DateTime<Utc>) -> Self {
            Self(Mutex::new(now))
        }

        pub fn advance_seconds(&self, seconds: i64) {
            *self.lock() += TimeDelta::seconds(seconds);
        }

        fn lock(&self) -> std::sync::MutexGuard<'_, DateTime<Utc>> {
            match self.0.lock() {
                Ok(guard) => guard,
                Err(_) => panic!("clock mutex"),
            }
        }
    }

    impl Default for MutableClock {
        fn default() -> Self {
            Self::new(fixture_timestamp())
        }
    }

    impl Clock for MutableClock {
        fn local(&self) -> DateTime<Local> {
            self.utc().with_timezone(&Local)
        }

        fn utc(&self) -> DateTime<Utc> {
            *self.lock()
        }
    }
}

pub mod backend {
    //! In-memory wiring of the domain services for handler tests.

    use std::sync::Arc;

    use crate::domain::ports::FixtureIdentityProvider;
    use crate::domain::{AccountService, AdminAllowList, ReportLocator, ReportWriter, WriteCapability};
    use crate::inbound::http::state::{AdminSecret, HttpState};
    use crate::outbound::memory::{InMemoryClaimsGateway, InMemoryDocumentStore};

    use super::clock::MutableClock;

    /// Email placed on the admin allow-list of every test backend.
    pub const ADMIN_EMAIL: &str = "chief.inspector@rei.gov.in";
    /// Shared secret accepted by `POST /set-admin-claim` in tests.
    pub const ADMIN_SECRET: &str = "test-admin-secret";

    /// Adapters behind a test [`HttpState`], kept for assertions.
    pub struct TestBackend {
        pub store: Arc<InMemoryDocumentStore>,
        pub claims: Arc<InMemoryClaimsGateway>,
        pub clock: Arc<MutableClock>,
    }

    impl Default for TestBackend {
        fn default() -> Self {
            let clock = Arc::new(MutableClock::default());
            Self {
                store: Arc::new(InMemoryDocumentStore::new(clock.clone())),
                claims: Arc::new(InMemoryClaimsGateway::new()),
                clock,
            }
        }
    }

    impl TestBackend {
        pub fn new() -> Self {
            Self::default()
        }

        /// Privileged capability writing to the in-memory store.
        pub fn privileged(&self) -> WriteCapability {
            WriteCapability::Privileged(self.store.clone())
        }

        /// Handler state over this backend with the given write path.
        pub fn state(&self, capability: WriteCapability) -> HttpState {
            let accounts = AccountService::new(
                Arc::new(FixtureIdentityProvider),
                self.store.clone(),
                self.claims.clone(),
                AdminAllowList::parse(ADMIN_EMAIL),
            );
            HttpState::new(
                Arc::new(ReportLocator::new(self.store.clone())),
                Arc::new(ReportWriter::new(capability)),
                Arc::new(accounts),
            )
            .with_admin_secret(AdminSecret::from_plaintext(ADMIN_SECRET.to_owned().into()))
        }
    }
}

pub mod http {
    //! Actix app assembly for handler and integration tests.

    use actix_session::{SessionMiddleware, storage::CookieSessionStore};
    use actix_web::body::MessageBody;
    use actix_web::cookie::{Cookie, Key};
    use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
    use actix_web::{App, web};

    use crate::Trace;
    use crate::inbound::http::health::{HealthState, live, ready};
    use crate::inbound::http::state::HttpState;
    use crate::inbound::http::{api_routes, public_routes};

    /// Session middleware with a fresh key and an insecure cookie named
    /// `session`, suitable for plain-HTTP tests.
    pub fn test_session_middleware() -> SessionMiddleware<CookieSessionStore> {
        SessionMiddleware::builder(CookieSessionStore::default(), Key::generate())
            .cookie_name("session".to_owned())
            .cookie_secure(false)
            .build()
    }

    /// The `session` cookie set by `response`.
    pub fn session_cookie<B>(response: &ServiceResponse<B>) -> Cookie<'static> {
        response
            .response()
            .cookies()
            .find(|cookie| cookie.name() == "session")
            .map(Cookie::into_owned)
            .expect("session cookie set")
    }

    /// Full application over `state`, wired like the server binary.
    pub fn test_app(
        state: HttpState,
    ) -> App<
        impl ServiceFactory<
            ServiceRequest,
            Config = (),
            Response = ServiceResponse<impl MessageBody>,
            Error = actix_web::Error,
            InitError = (),
        >,
    > {
        let health = web::Data::new(HealthState::new());
        health.mark_ready();
        App::new()
            .app_data(web::Data::new(state))
            .app_data(health)
            .wrap(test_session_middleware())
            .wrap(Trace)
            .configure(public_routes)
            .service(web::scope("/api/v1").configure(api_routes))
            .service(ready)
            .service(live)
    }
}
