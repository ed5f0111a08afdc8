//! # Caller Identity
//!
//! Who is asking. The services never authenticate anyone themselves: a
//! transport layer validates the bearer token (see
//! [`TokenIssuer::validate`](crate::auth::TokenIssuer::validate)) and hands
//! the result in as a [`CallerContext`].

use fcg_core::Role;

use crate::error::{ServiceError, ServiceResult};

/// An already-authenticated (user id, role) pair, or nobody.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CallerContext {
    #[default]
    Anonymous,
    Authenticated { user_id: String, role: Role },
}

impl CallerContext {
    pub fn authenticated(user_id: impl Into<String>, role: Role) -> Self {
        CallerContext::Authenticated {
            user_id: user_id.into(),
            role,
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        match self {
            CallerContext::Anonymous => None,
            CallerContext::Authenticated { user_id, .. } => Some(user_id),
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, CallerContext::Authenticated { role, .. } if role.is_admin())
    }

    /// Any signed-in caller. Anonymous → `Unauthenticated`.
    pub fn require_user(&self) -> ServiceResult<&str> {
        self.user_id().ok_or(ServiceError::Unauthenticated)
    }

    /// Anonymous → `Unauthenticated`, standard user → `Forbidden`.
    pub fn require_admin(&self) -> ServiceResult<&str> {
        let user_id = self.require_user()?;
        if !self.is_admin() {
            return Err(ServiceError::Forbidden);
        }
        Ok(user_id)
    }

    /// The caller must be `user_id` itself or an administrator.
    pub fn require_self_or_admin(&self, user_id: &str) -> ServiceResult<()> {
        let caller = self.require_user()?;
        if caller == user_id || self.is_admin() {
            Ok(())
        } else {
            Err(ServiceError::Forbidden)
        }
    }
}
