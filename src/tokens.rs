// ABOUTME: HS256 token codec for stateless bearer access tokens and session cookies
// ABOUTME: Verification rejects malformed, bad-signature and expired tokens uniformly
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Tollgate Project

//! Access-token codec
//!
//! Access tokens are self-contained signed JWTs; nothing is stored server
//! side and validation is a signature plus expiry check. Session cookies for
//! the authorize endpoint use the same codec with a distinct audience so the
//! two token kinds never validate as each other.

use crate::errors::{AppError, AppResult};
use crate::models::AuthenticatedSession;
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

/// Audience marker for host-application session cookies
const SESSION_AUDIENCE: &str = "tollgate:session";

/// Default session cookie lifetime in seconds
const SESSION_TTL_SECS: i64 = 86_400;

/// Claims carried by a bearer access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// User id the token was issued for
    pub sub: String,
    /// Client the token was issued to
    pub client_id: String,
    /// Granted scope (space-separated, possibly empty)
    pub scope: String,
    /// Issued-at (unix seconds)
    pub iat: i64,
    /// Expiry (unix seconds)
    pub exp: i64,
}

/// Claims carried by a session cookie
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SessionClaims {
    sub: String,
    aud: String,
    iat: i64,
    exp: i64,
}

/// Signs and verifies access tokens and session cookies
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl_secs: i64,
}

impl TokenCodec {
    /// Create a codec keyed by the shared signing secret
    #[must_use]
    pub fn new(secret: &str, access_ttl_secs: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            access_ttl_secs,
        }
    }

    /// Access-token lifetime in seconds, echoed as `expires_in`
    #[must_use]
    pub const fn access_ttl_secs(&self) -> i64 {
        self.access_ttl_secs
    }

    /// Issue a signed access token for (user, client, scope)
    ///
    /// # Errors
    ///
    /// Returns an internal error when signing fails
    pub fn issue_access_token(
        &self,
        user_id: Uuid,
        client_id: &str,
        scope: &str,
    ) -> AppResult<String> {
        let now = Utc::now().timestamp();
        let claims = AccessTokenClaims {
            sub: user_id.to_string(),
            client_id: client_id.to_owned(),
            scope: scope.to_owned(),
            iat: now,
            exp: now + self.access_ttl_secs,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::internal(format!("failed to sign access token: {e}")))
    }

    /// Verify an access token's signature and expiry
    ///
    /// All failure modes collapse into one invalid-credentials error so the
    /// response does not reveal whether a token was malformed, forged or
    /// expired.
    ///
    /// # Errors
    ///
    /// Returns an authentication error for any invalid token
    pub fn verify_access_token(&self, token: &str) -> AppResult<AccessTokenClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;

        match decode::<AccessTokenClaims>(token, &self.decoding_key, &validation) {
            Ok(data) => Ok(data.claims),
            Err(e) => {
                debug!("access token rejected: {e}");
                Err(AppError::auth_invalid("invalid or expired access token"))
            }
        }
    }

    /// Issue a signed session cookie value for a logged-in user
    ///
    /// # Errors
    ///
    /// Returns an internal error when signing fails
    pub fn issue_session_token(&self, user_id: Uuid) -> AppResult<String> {
        let now = Utc::now().timestamp();
        let claims = SessionClaims {
            sub: user_id.to_string(),
            aud: SESSION_AUDIENCE.to_owned(),
            iat: now,
            exp: now + SESSION_TTL_SECS,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::internal(format!("failed to sign session token: {e}")))
    }

    /// Resolve a session cookie value into an authenticated session
    ///
    /// Invalid cookies yield `None`; the authorize endpoint treats that as
    /// "not logged in" and redirects to the login flow.
    #[must_use]
    pub fn verify_session_token(&self, token: &str) -> Option<AuthenticatedSession> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.set_audience(&[SESSION_AUDIENCE]);

        let data = match decode::<SessionClaims>(token, &self.decoding_key, &validation) {
            Ok(data) => data,
            Err(e) => {
                debug!("session token rejected: {e}");
                return None;
            }
        };

        match Uuid::parse_str(&data.claims.sub) {
            Ok(user_id) => Some(AuthenticatedSession { user_id }),
            Err(e) => {
                debug!("session token carried malformed sub: {e}");
                None
            }
        }
    }
}
