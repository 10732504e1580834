//! Explicit credentials.
//!
//! Every authenticated call takes a [`Credential`] argument. The only
//! process-level auth state is the [`AuthSession`], with a defined start
//! (`login`/`restore`) and end (`logout`/`expire`).

use crate::error::ApiError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Bearer token issued by the auth endpoint.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn authorization_header(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// Exchanges email/password for a credential.
pub trait Authenticator {
    fn login(&self, email: &str, password: &str) -> Result<Credential, ApiError>;
}

#[derive(Debug, Default)]
pub struct AuthSession {
    credential: Option<Credential>,
}

impl AuthSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume with a credential persisted by an earlier login.
    pub fn restore(credential: Credential) -> Self {
        Self { credential: Some(credential) }
    }

    pub fn login(
        &mut self,
        authenticator: &impl Authenticator,
        email: &str,
        password: &str,
    ) -> Result<&Credential, ApiError> {
        let credential = authenticator.login(email, password)?;
        tracing::info!("signed in");
        Ok(self.credential.insert(credential))
    }

    pub fn logout(&mut self) -> Option<Credential> {
        self.credential.take()
    }

    pub fn credential(&self) -> Result<&Credential, ApiError> {
        self.credential.as_ref().ok_or(ApiError::Unauthorized)
    }

    pub fn is_active(&self) -> bool {
        self.credential.is_some()
    }

    /// Pass a call result through, ending the session on `401`.
    pub fn observe<T>(&mut self, result: Result<T, ApiError>) -> Result<T, ApiError> {
        if matches!(result, Err(ApiError::Unauthorized)) && self.credential.take().is_some() {
            tracing::warn!("session expired, credential dropped");
        }
        result
    }
}
