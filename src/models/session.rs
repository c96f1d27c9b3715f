use sha2::{Digest, Sha256};
use std::fmt::Display;

use crate::error::{AppError, AppResult};

/// Bearer credential for the user's streaming library. Never logged.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> AppResult<Self> {
        let token = token.into().trim().to_string();
        if token.is_empty() {
            return Err(AppError::Unauthorized(
                "Missing Spotify access token.".to_string(),
            ));
        }
        Ok(Self(token))
    }

    /// Parses an `Authorization: Bearer <token>` header value
    pub fn from_authorization(header: Option<&str>) -> AppResult<Self> {
        let header = header.ok_or_else(|| {
            AppError::Unauthorized("Missing Spotify access token.".to_string())
        })?;

        let (scheme, token) = header.trim().split_once(' ').ok_or_else(|| {
            AppError::Unauthorized("Malformed Authorization header.".to_string())
        })?;

        if !scheme.eq_ignore_ascii_case("bearer") {
            return Err(AppError::Unauthorized(
                "Authorization scheme must be Bearer.".to_string(),
            ));
        }

        Self::new(token)
    }

    pub fn secret(&self) -> &str {
        &self.0
    }

    /// Derived identifier safe to use as a storage key
    pub fn session_id(&self) -> SessionId {
        SessionId::derive(self)
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

/// Opaque per-user key derived from the access token
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    fn derive(token: &AccessToken) -> Self {
        let digest = Sha256::digest(token.secret().as_bytes());
        Self(format!("{:x}", digest))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
