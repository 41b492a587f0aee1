//! Bearer token roles
//!
//! Tokens are static and come from the service settings. Handlers only
//! ever pass `is_admin` on to the core.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use secrecy::{ExposeSecret, SecretString};

use crate::server::error::ApiError;
use crate::server::state::ServerState;
use crate::storage::settings::AuthSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    ReadOnly,
}

/// Configured tokens
#[derive(Debug, Default)]
pub struct AccessTokens {
    admin: Option<SecretString>,
    readonly: Option<SecretString>,
}

impl AccessTokens {
    pub fn new(admin: Option<SecretString>, readonly: Option<SecretString>) -> Self {
        Self { admin, readonly }
    }

    pub fn from_settings(auth: AuthSettings) -> Self {
        Self::new(auth.admin_token, auth.readonly_token)
    }

    pub fn role_for_token(&self, token: &str) -> Option<Role> {
        let matches = |secret: &Option<SecretString>| {
            secret
                .as_ref()
                .is_some_and(|s| !token.is_empty() && s.expose_secret() == token)
        };

        if matches(&self.admin) {
            Some(Role::Admin)
        } else if matches(&self.readonly) {
            Some(Role::ReadOnly)
        } else {
            None
        }
    }

    pub fn role_for_headers(&self, headers: &HeaderMap) -> Option<Role> {
        let token = headers
            .get(AUTHORIZATION)?
            .to_str()
            .ok()?
            .strip_prefix("Bearer ")?
            .trim();
        self.role_for_token(token)
    }
}

/// Authenticated caller
#[derive(Debug, Clone, Copy)]
pub struct Caller(pub Role);

impl Caller {
    pub fn is_admin(&self) -> bool {
        self.0 == Role::Admin
    }
}

impl FromRequestParts<Arc<ServerState>> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<ServerState>,
    ) -> Result<Self, Self::Rejection> {
        state
            .tokens
            .role_for_headers(&parts.headers)
            .map(Caller)
            .ok_or_else(|| ApiError::Unauthorized("A valid bearer token is required".to_string()))
    }
}
