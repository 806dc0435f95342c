//! Session helpers to keep HTTP handlers free of framework-specific logic.
//!
//! A thin wrapper around Actix sessions so handlers only deal with the
//! authenticated user id the engine consumes. Token parsing and login flows
//! belong to the identity collaborator, not this crate.

use actix_session::Session;
use actix_web::{dev::Payload, FromRequest, HttpRequest};
use futures_util::future::LocalBoxFuture;

use crate::domain::error::WorkspaceError;

pub(crate) const USER_ID_KEY: &str = "user_id";

/// Newtype wrapper exposing higher-level session operations.
#[derive(Clone)]
pub struct SessionContext(Session);

impl SessionContext {
    /// Construct a new wrapper from the underlying Actix session.
    pub fn new(session: Session) -> Self {
        Self(session)
    }

    /// Persist the authenticated user's id in the session cookie.
    pub fn persist_user(&self, user_id: &str) -> Result<(), WorkspaceError> {
        self.0
            .insert(USER_ID_KEY, user_id)
            .map_err(|err| WorkspaceError::internal(format!("failed to persist session: {err}")))
    }

    /// Fetch the current user id from the session, if present.
    pub fn user_id(&self) -> Result<Option<String>, WorkspaceError> {
        let id = self
            .0
            .get::<String>(USER_ID_KEY)
            .map_err(|err| WorkspaceError::internal(format!("failed to read session: {err}")))?;
        Ok(id.map(|raw| raw.trim().to_owned()).filter(|id| !id.is_empty()))
    }

    /// Require an authenticated user id or return `401 Unauthorized`.
    pub fn require_user_id(&self) -> Result<String, WorkspaceError> {
        self.user_id()?.ok_or(WorkspaceError::Unauthorized)
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
