// ABOUTME: Authorization server service layer - authorize, token and userinfo operations
// ABOUTME: Codes are consumed atomically before PKCE verification; detail is erased to RFC codes
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Tollgate Project

//! OAuth 2.0 endpoint implementations
//!
//! The route layer parses HTTP and delegates here. All grant refusal causes
//! collapse into a single `invalid_grant` at the boundary; the specific cause
//! is logged server side only.

use crate::database::Database;
use crate::errors::AppResult;
use crate::models::{
    AuthenticatedSession, AuthorizationCode, ConsentPolicy, OAuthClient, RefreshToken,
};
use crate::oauth2::models::{
    AuthorizeRequest, OAuth2Error, TokenRequest, TokenResponse, UserInfoResponse,
};
use crate::tokens::TokenCodec;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{Duration, Utc};
use ring::rand::{SecureRandom, SystemRandom};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Length in bytes of generated codes and refresh tokens
const TOKEN_ENTROPY_BYTES: usize = 32;

/// Outcome of a valid-enough authorization request
#[derive(Debug)]
pub enum AuthorizeOutcome {
    /// Approved; redirect back to the client with a fresh code
    Granted {
        /// Verified client redirect URI
        redirect_uri: String,
        /// Single-use authorization code
        code: String,
        /// Client state to echo back
        state: Option<String>,
    },
    /// Refused for a redirect-safe reason; redirect back with an error
    Denied {
        /// Verified client redirect URI
        redirect_uri: String,
        /// Protocol error to place in the redirect query
        error: OAuth2Error,
        /// Client state to echo back
        state: Option<String>,
    },
    /// No authenticated session; send the user through the login flow
    LoginRequired,
}

/// Why a token grant was refused
///
/// Never serialized; erased to a generic `invalid_grant` before leaving the
/// server so callers cannot probe which condition failed.
#[derive(Debug)]
enum GrantRefusal {
    UnknownOrSpentCode,
    VerifierMissing,
    VerifierMalformed,
    VerifierWithoutChallenge,
    PkceMismatch,
    UnknownRefreshToken,
}

impl GrantRefusal {
    fn erase(self) -> OAuth2Error {
        warn!("token grant refused: {self:?}");
        OAuth2Error::invalid_grant("The grant is invalid, expired, or already used")
    }
}

/// OAuth 2.0 authorization server service
pub struct AuthorizationServer {
    database: Arc<Database>,
    codec: Arc<TokenCodec>,
    auth_code_ttl: Duration,
    consent_policy: ConsentPolicy,
}

impl AuthorizationServer {
    /// Create the service over its stores and codec
    #[must_use]
    pub fn new(
        database: Arc<Database>,
        codec: Arc<TokenCodec>,
        auth_code_ttl_secs: i64,
        consent_policy: ConsentPolicy,
    ) -> Self {
        Self {
            database,
            codec,
            auth_code_ttl: Duration::seconds(auth_code_ttl_secs),
            consent_policy,
        }
    }

    /// Handle an authorization request (RFC 6749 Section 4.1.1)
    ///
    /// Validation order matters: nothing redirects until the redirect URI has
    /// been verified against the registry, so an attacker cannot use this
    /// endpoint as an open redirector.
    ///
    /// # Errors
    ///
    /// Returns a protocol error for failures that must not redirect
    /// (unknown client, unverified redirect URI, bad response type)
    pub async fn authorize(
        &self,
        request: AuthorizeRequest,
        session: Option<AuthenticatedSession>,
    ) -> Result<AuthorizeOutcome, OAuth2Error> {
        if request.response_type != "code" {
            warn!(
                client_id = %request.client_id,
                response_type = %request.response_type,
                "authorize rejected: unsupported response type"
            );
            return Err(OAuth2Error::unsupported_response_type());
        }

        let client = self.load_client(&request.client_id).await?;
        let Some(client) = client else {
            warn!(client_id = %request.client_id, "authorize rejected: unknown client");
            return Err(OAuth2Error::invalid_client());
        };

        if !client.allows_redirect_uri(&request.redirect_uri) {
            warn!(
                client_id = %client.client_id,
                redirect_uri = %request.redirect_uri,
                "authorize rejected: unregistered redirect URI"
            );
            return Err(OAuth2Error::invalid_request(
                "redirect_uri is not registered for this client",
            ));
        }

        // From here every refusal is redirect-safe
        let scope = request.scope.clone().unwrap_or_default();
        if !client.allows_scope(&scope) {
            warn!(client_id = %client.client_id, scope = %scope, "authorize rejected: scope not allowed");
            return Ok(AuthorizeOutcome::Denied {
                redirect_uri: request.redirect_uri,
                error: OAuth2Error::invalid_scope("Requested scope exceeds client registration"),
                state: request.state,
            });
        }

        let challenge_method = match normalize_challenge_method(&request) {
            Ok(method) => method,
            Err(error) => {
                return Ok(AuthorizeOutcome::Denied {
                    redirect_uri: request.redirect_uri,
                    error,
                    state: request.state,
                })
            }
        };

        let Some(session) = session else {
            info!(client_id = %client.client_id, "authorize: no session, login required");
            return Ok(AuthorizeOutcome::LoginRequired);
        };

        if self.consent_policy == ConsentPolicy::RequireConsent && !client.is_trusted {
            warn!(client_id = %client.client_id, "authorize rejected: consent step not available");
            return Err(OAuth2Error::temporarily_unavailable(
                "User consent is required but no consent flow is available",
            ));
        }

        let code = self.mint_auth_code(&client, session.user_id, &request, scope, challenge_method)
            .await?;

        info!(
            client_id = %client.client_id,
            user_id = %session.user_id,
            "authorization code issued"
        );

        Ok(AuthorizeOutcome::Granted {
            redirect_uri: request.redirect_uri,
            code,
            state: request.state,
        })
    }

    /// Handle a token request (RFC 6749 Section 4.1.3 / 6)
    ///
    /// # Errors
    ///
    /// Returns a protocol error when the grant type is unsupported, client
    /// authentication fails, or the grant is refused
    pub async fn token(&self, request: TokenRequest) -> Result<TokenResponse, OAuth2Error> {
        if request.grant_type != "authorization_code" && request.grant_type != "refresh_token" {
            warn!(grant_type = %request.grant_type, "token rejected: unsupported grant type");
            return Err(OAuth2Error::unsupported_grant_type());
        }

        let client = self.load_client(&request.client_id).await?;
        let Some(client) = client else {
            warn!(client_id = %request.client_id, "token rejected: unknown client");
            return Err(OAuth2Error::invalid_client());
        };

        if !client_secret_matches(&client, request.client_secret.as_deref()) {
            warn!(client_id = %client.client_id, "token rejected: client authentication failed");
            return Err(OAuth2Error::invalid_client());
        }

        if request.grant_type == "authorization_code" {
            self.handle_authorization_code_grant(&client, &request).await
        } else {
            self.handle_refresh_token_grant(&client, &request).await
        }
    }

    /// Handle the `authorization_code` grant
    async fn handle_authorization_code_grant(
        &self,
        client: &OAuthClient,
        request: &TokenRequest,
    ) -> Result<TokenResponse, OAuth2Error> {
        let Some(code) = request.code.as_deref() else {
            return Err(OAuth2Error::invalid_request("Missing code parameter"));
        };
        let Some(redirect_uri) = request.redirect_uri.as_deref() else {
            return Err(OAuth2Error::invalid_request(
                "Missing redirect_uri parameter",
            ));
        };

        // Consume first: the code is burned even if PKCE fails afterwards,
        // and concurrent redemptions see at most one success
        let auth_code = self
            .database
            .consume_auth_code(code, &client.client_id, redirect_uri, Utc::now())
            .await
            .map_err(|e| {
                error!("auth code redemption query failed: {e}");
                OAuth2Error::server_error()
            })?;

        let Some(auth_code) = auth_code else {
            return Err(GrantRefusal::UnknownOrSpentCode.erase());
        };

        if let Err(refusal) = verify_pkce(&auth_code, request.code_verifier.as_deref()) {
            return Err(refusal.erase());
        }

        let access_token = self
            .codec
            .issue_access_token(auth_code.user_id, &client.client_id, &auth_code.scope)
            .map_err(|e| {
                error!("access token signing failed: {e}");
                OAuth2Error::server_error()
            })?;

        let refresh_token = generate_random_string(TOKEN_ENTROPY_BYTES).map_err(|e| {
            error!("refresh token generation failed: {e}");
            OAuth2Error::server_error()
        })?;

        self.database
            .store_refresh_token(&RefreshToken {
                token: refresh_token.clone(),
                client_id: client.client_id.clone(),
                user_id: auth_code.user_id,
                scope: auth_code.scope.clone(),
                issued_at: Utc::now(),
                revoked: false,
            })
            .await
            .map_err(|e| {
                error!("refresh token storage failed: {e}");
                OAuth2Error::server_error()
            })?;

        info!(
            client_id = %client.client_id,
            user_id = %auth_code.user_id,
            "authorization code redeemed, tokens issued"
        );

        Ok(TokenResponse {
            access_token,
            token_type: "Bearer".to_owned(),
            expires_in: self.codec.access_ttl_secs(),
            refresh_token: Some(refresh_token),
            scope: auth_code.scope,
        })
    }

    /// Handle the `refresh_token` grant
    ///
    /// The refresh token is not rotated: the response carries a new access
    /// token only and the presented refresh token stays live.
    async fn handle_refresh_token_grant(
        &self,
        client: &OAuthClient,
        request: &TokenRequest,
    ) -> Result<TokenResponse, OAuth2Error> {
        let Some(refresh_token) = request.refresh_token.as_deref() else {
            return Err(OAuth2Error::invalid_request(
                "Missing refresh_token parameter",
            ));
        };

        let stored = self
            .database
            .get_valid_refresh_token(refresh_token, &client.client_id)
            .await
            .map_err(|e| {
                error!("refresh token lookup failed: {e}");
                OAuth2Error::server_error()
            })?;

        let Some(stored) = stored else {
            return Err(GrantRefusal::UnknownRefreshToken.erase());
        };

        let access_token = self
            .codec
            .issue_access_token(stored.user_id, &client.client_id, &stored.scope)
            .map_err(|e| {
                error!("access token signing failed: {e}");
                OAuth2Error::server_error()
            })?;

        info!(
            client_id = %client.client_id,
            user_id = %stored.user_id,
            "refresh token exchanged for new access token"
        );

        Ok(TokenResponse {
            access_token,
            token_type: "Bearer".to_owned(),
            expires_in: self.codec.access_ttl_secs(),
            refresh_token: None,
            scope: stored.scope,
        })
    }

    /// Handle a userinfo request (bearer access token to standard claims)
    ///
    /// # Errors
    ///
    /// Returns `invalid_token` for any unacceptable token and
    /// `user_not_found` when the subject no longer exists
    pub async fn userinfo(&self, bearer_token: &str) -> Result<UserInfoResponse, OAuth2Error> {
        let claims = self
            .codec
            .verify_access_token(bearer_token)
            .map_err(|_| OAuth2Error::invalid_token())?;

        let user_id = Uuid::parse_str(&claims.sub).map_err(|e| {
            warn!("access token carried malformed sub: {e}");
            OAuth2Error::invalid_token()
        })?;

        let profile = self
            .database
            .get_user_profile(user_id)
            .await
            .map_err(|e| {
                error!("user profile lookup failed: {e}");
                OAuth2Error::server_error()
            })?;

        let Some(profile) = profile else {
            warn!(user_id = %user_id, "userinfo rejected: subject no longer exists");
            return Err(OAuth2Error::user_not_found());
        };

        Ok(UserInfoResponse {
            sub: profile.id.to_string(),
            username: profile.username,
            name: profile.full_name,
            email: profile.email,
            picture: profile.avatar_url,
            profile: profile.profile_url,
            bio: profile.bio,
            website: profile.website_url,
            twitter: profile.twitter_url,
        })
    }

    async fn load_client(&self, client_id: &str) -> Result<Option<OAuthClient>, OAuth2Error> {
        self.database.get_oauth_client(client_id).await.map_err(|e| {
            error!("client registry lookup failed: {e}");
            OAuth2Error::server_error()
        })
    }

    async fn mint_auth_code(
        &self,
        client: &OAuthClient,
        user_id: Uuid,
        request: &AuthorizeRequest,
        scope: String,
        challenge_method: Option<String>,
    ) -> Result<String, OAuth2Error> {
        let code = generate_random_string(TOKEN_ENTROPY_BYTES).map_err(|e| {
            error!("authorization code generation failed: {e}");
            OAuth2Error::server_error()
        })?;

        let now = Utc::now();
        self.database
            .store_auth_code(&AuthorizationCode {
                code: code.clone(),
                client_id: client.client_id.clone(),
                user_id,
                redirect_uri: request.redirect_uri.clone(),
                scope,
                code_challenge: request.code_challenge.clone(),
                code_challenge_method: challenge_method,
                issued_at: now,
                expires_at: now + self.auth_code_ttl,
                consumed: false,
            })
            .await
            .map_err(|e| {
                error!("authorization code storage failed: {e}");
                OAuth2Error::server_error()
            })?;

        Ok(code)
    }
}

/// Resolve the effective PKCE challenge method for an authorize request
///
/// Absent method with a challenge present defaults to `S256`. A method
/// without a challenge, or an unknown method, is a redirect-safe
/// `invalid_request`.
fn normalize_challenge_method(request: &AuthorizeRequest) -> Result<Option<String>, OAuth2Error> {
    match (&request.code_challenge, &request.code_challenge_method) {
        (None, None) => Ok(None),
        (None, Some(_)) => Err(OAuth2Error::invalid_request(
            "code_challenge_method without code_challenge",
        )),
        (Some(_), None) => Ok(Some("S256".to_owned())),
        (Some(_), Some(method)) if method == "S256" || method == "plain" => {
            Ok(Some(method.clone()))
        }
        (Some(_), Some(_)) => Err(OAuth2Error::invalid_request(
            "code_challenge_method must be S256 or plain",
        )),
    }
}

/// Verify the PKCE code verifier against the challenge stored with the code
fn verify_pkce(auth_code: &AuthorizationCode, verifier: Option<&str>) -> Result<(), GrantRefusal> {
    let Some(challenge) = auth_code.code_challenge.as_deref() else {
        // No challenge was bound at authorize time; a stray verifier is a
        // client bug and gets refused rather than ignored
        return match verifier {
            None => Ok(()),
            Some(_) => Err(GrantRefusal::VerifierWithoutChallenge),
        };
    };

    let Some(verifier) = verifier else {
        return Err(GrantRefusal::VerifierMissing);
    };

    if !verifier_is_well_formed(verifier) {
        return Err(GrantRefusal::VerifierMalformed);
    }

    let computed = match auth_code.code_challenge_method.as_deref() {
        Some("plain") => verifier.to_owned(),
        // S256 is the stored default
        _ => URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes())),
    };

    if computed.as_bytes().ct_eq(challenge.as_bytes()).into() {
        Ok(())
    } else {
        Err(GrantRefusal::PkceMismatch)
    }
}

/// RFC 7636 Section 4.1: 43-128 characters from the unreserved set
fn verifier_is_well_formed(verifier: &str) -> bool {
    (43..=128).contains(&verifier.len())
        && verifier
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~'))
}

/// Generate a base64url-encoded random string from `length` bytes of entropy
fn generate_random_string(length: usize) -> AppResult<String> {
    let rng = SystemRandom::new();
    let mut bytes = vec![0u8; length];
    rng.fill(&mut bytes)
        .map_err(|_| crate::errors::AppError::internal("system RNG failure"))?;
    Ok(URL_SAFE_NO_PAD.encode(&bytes))
}

/// Constant-time client secret check; public clients have no secret to check
fn client_secret_matches(client: &OAuthClient, presented: Option<&str>) -> bool {
    match (client.client_secret.as_deref(), presented) {
        (None, _) => true,
        (Some(_), None) => false,
        (Some(stored), Some(presented)) => stored.as_bytes().ct_eq(presented.as_bytes()).into(),
    }
}
