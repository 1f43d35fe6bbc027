// ABOUTME: Domain records for the authorization server core
// ABOUTME: Clients, authorization codes, refresh tokens, user profiles and session values
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Tollgate Project

//! Common data models shared by the store and endpoint layers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered OAuth client application
///
/// Registration happens out of band; this server only reads the registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthClient {
    /// Public client identifier
    pub client_id: String,
    /// Shared secret; `None` for public clients
    pub client_secret: Option<String>,
    /// Exact-match redirect URI allowlist
    pub redirect_uris: Vec<String>,
    /// Scopes this client may request
    pub allowed_scopes: Vec<String>,
    /// Trusted clients skip the consent step
    pub is_trusted: bool,
    /// Display name
    pub client_name: Option<String>,
    /// Registration time
    pub created_at: DateTime<Utc>,
}

impl OAuthClient {
    /// Whether every space-separated scope token in `requested` is allowed
    /// for this client. An empty request is trivially contained.
    #[must_use]
    pub fn allows_scope(&self, requested: &str) -> bool {
        requested
            .split_whitespace()
            .all(|token| self.allowed_scopes.iter().any(|allowed| allowed == token))
    }

    /// Whether `redirect_uri` is exactly one of the registered URIs
    #[must_use]
    pub fn allows_redirect_uri(&self, redirect_uri: &str) -> bool {
        self.redirect_uris.iter().any(|uri| uri == redirect_uri)
    }
}

/// A short-lived single-use authorization code
#[derive(Debug, Clone)]
pub struct AuthorizationCode {
    /// Opaque code value
    pub code: String,
    /// Client the code was issued to
    pub client_id: String,
    /// Resource owner who approved the request
    pub user_id: Uuid,
    /// Redirect URI the code is bound to
    pub redirect_uri: String,
    /// Granted scope (space-separated, possibly empty)
    pub scope: String,
    /// PKCE challenge, when the client supplied one
    pub code_challenge: Option<String>,
    /// PKCE challenge method (`S256` or `plain`)
    pub code_challenge_method: Option<String>,
    /// Issuance time
    pub issued_at: DateTime<Utc>,
    /// Expiry time
    pub expires_at: DateTime<Utc>,
    /// Whether the code has been redeemed
    pub consumed: bool,
}

/// A longer-lived refresh token bound to (client, user, scope)
#[derive(Debug, Clone)]
pub struct RefreshToken {
    /// Opaque token value
    pub token: String,
    /// Client the token was issued to
    pub client_id: String,
    /// Resource owner
    pub user_id: Uuid,
    /// Scope granted at issuance
    pub scope: String,
    /// Issuance time
    pub issued_at: DateTime<Utc>,
    /// Whether the token has been revoked
    pub revoked: bool,
}

/// User profile owned by the host application; this server reads it only
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    /// Stable user identifier
    pub id: Uuid,
    /// Login name
    pub username: String,
    /// Display name
    pub full_name: Option<String>,
    /// Email address
    pub email: Option<String>,
    /// Avatar image URL
    pub avatar_url: Option<String>,
    /// Free-form biography
    pub bio: Option<String>,
    /// Public profile page URL
    pub profile_url: Option<String>,
    /// Website URL
    pub website_url: Option<String>,
    /// Twitter profile URL
    pub twitter_url: Option<String>,
}

/// An authenticated host-application session, resolved by the route layer
/// and passed into the authorization endpoint as an explicit value
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedSession {
    /// The logged-in user
    pub user_id: Uuid,
}

/// How authorization requests obtain user approval
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsentPolicy {
    /// Every valid authenticated request is approved without a consent step
    AutoApprove,
    /// A consent step is required; until a consent UI exists, untrusted
    /// clients are refused
    RequireConsent,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_with_scopes(scopes: &[&str]) -> OAuthClient {
        OAuthClient {
            client_id: "client-1".into(),
            client_secret: None,
            redirect_uris: vec!["https://app.example.com/cb".into()],
            allowed_scopes: scopes.iter().map(|s| (*s).to_owned()).collect(),
            is_trusted: false,
            client_name: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_scope_containment() {
        let client = client_with_scopes(&["read", "write"]);
        assert!(client.allows_scope("read"));
        assert!(client.allows_scope("read write"));
        assert!(client.allows_scope(""));
        assert!(!client.allows_scope("read admin"));
    }

    #[test]
    fn test_redirect_uri_exact_match() {
        let client = client_with_scopes(&["read"]);
        assert!(client.allows_redirect_uri("https://app.example.com/cb"));
        assert!(!client.allows_redirect_uri("https://app.example.com/cb/"));
        assert!(!client.allows_redirect_uri("https://app.example.com"));
    }
}
