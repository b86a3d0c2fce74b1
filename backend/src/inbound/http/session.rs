//! Session helpers to keep HTTP handlers free of framework-specific logic.
//!
//! The cookie carries the signed-in uid and the profile role observed at
//! login. Handlers ask for an identity or an admin and get a domain error
//! otherwise.

use actix_session::Session;
use actix_web::{FromRequest, HttpRequest, dev::Payload};
use futures_util::future::LocalBoxFuture;

use crate::domain::{Error, Role, UserId};

pub(crate) const USER_ID_KEY: &str = "user_id";
pub(crate) const ROLE_KEY: &str = "role";

/// Who the session belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUser {
    pub uid: UserId,
    pub role: Role,
}

/// Newtype wrapper that exposes higher-level session operations.
#[derive(Clone)]
pub struct SessionContext(Session);

impl SessionContext {
    pub fn new(session: Session) -> Self {
        Self(session)
    }

    /// Persist the signed-in user and their current role.
    pub fn persist_login(&self, uid: &UserId, role: Role) -> Result<(), Error> {
        self.0.renew();
        self.0
            .insert(USER_ID_KEY, uid.as_ref())
            .and_then(|()| self.0.insert(ROLE_KEY, role.as_str()))
            .map_err(|error| Error::internal(format!("failed to persist session: {error}")))
    }

    /// Drop everything stored in the session cookie.
    pub fn clear(&self) {
        self.0.purge();
    }

    /// Current user, if the cookie carries a well-formed one.
    pub fn user(&self) -> Result<Option<SessionUser>, Error> {
        let read = |key: &str| {
            self.0
                .get::<String>(key)
                .map_err(|error| Error::internal(format!("failed to read session: {error}")))
        };
        let (Some(raw_uid), Some(raw_role)) = (read(USER_ID_KEY)?, read(ROLE_KEY)?) else {
            return Ok(None);
        };
        match (UserId::new(raw_uid), raw_role.parse::<Role>()) {
            (Ok(uid), Ok(role)) => Ok(Some(SessionUser { uid, role })),
            _ => {
                tracing::warn!("discarding malformed session cookie");
                Ok(None)
            }
        }
    }

    /// Require a signed-in user or return `401 Unauthorized`.
    pub fn require_user(&self) -> Result<SessionUser, Error> {
        self.user()?
            .ok_or_else(|| Error::unauthorized("login required"))
    }

    /// Require a signed-in admin or return `401 Unauthorized`.
    pub fn require_admin(&self) -> Result<SessionUser, Error> {
        let user = self.require_user()?;
        if user.role.is_admin() {
            Ok(user)
        } else {
            Err(Error::unauthorized("admin session required"))
        }
    }
}

impl FromRequest for SessionContext {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let fut = Session::from_request(req, payload);
        Box::pin(async move { fut.await.map(SessionContext::new) })
    }
}
