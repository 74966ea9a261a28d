//! Request-scoped context
//!
//! Every use case and service call receives a [`RequestContext`] explicitly.
//! It carries the authenticated user and a correlation ID for log lines.

use uuid::Uuid;

use super::{errors::FolioError, newtypes::UserId};

/// Identity and correlation data for a single inbound request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    user_id: UserId,
    request_id: Uuid,
}

impl RequestContext {
    /// Creates a context for an already-validated user
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            request_id: Uuid::new_v4(),
        }
    }

    /// Builds a context from the session's user identifier
    ///
    /// # Errors
    /// Returns `FolioError::Unauthenticated` when the session carries no user
    /// or a blank one.
    pub fn from_session(session_user: Option<&str>) -> Result<Self, FolioError> {
        let raw = session_user.ok_or(FolioError::Unauthenticated)?;
        let user_id = UserId::new(raw).map_err(|_| FolioError::Unauthenticated)?;
        Ok(Self::new(user_id))
    }

    /// The authenticated user
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Correlation ID for log lines
    pub fn request_id(&self) -> Uuid {
        self.request_id
    }
}
