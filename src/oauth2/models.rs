// ABOUTME: Wire types for the OAuth 2.0 endpoints - requests, responses and protocol errors
// ABOUTME: OAuth2Error has one constructor per RFC 6749 error code
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Tollgate Project

//! Request and response models for the authorization server endpoints

use http::StatusCode;
use serde::{Deserialize, Serialize};

/// Authorization request (RFC 6749 Section 4.1.1)
#[derive(Debug, Clone, Deserialize)]
pub struct AuthorizeRequest {
    /// Must be `code`
    pub response_type: String,
    /// Client identifier
    pub client_id: String,
    /// Redirect URI, matched exactly against the registry
    pub redirect_uri: String,
    /// Requested scope (space-separated)
    pub scope: Option<String>,
    /// Opaque client state, echoed back on the redirect
    pub state: Option<String>,
    /// PKCE code challenge
    pub code_challenge: Option<String>,
    /// PKCE challenge method (`S256` or `plain`, default `S256`)
    pub code_challenge_method: Option<String>,
}

/// Token request (RFC 6749 Section 4.1.3 / 6)
#[derive(Debug, Clone, Deserialize)]
pub struct TokenRequest {
    /// `authorization_code` or `refresh_token`
    pub grant_type: String,
    /// Authorization code (authorization_code grant)
    pub code: Option<String>,
    /// Redirect URI used on the authorize request (authorization_code grant)
    pub redirect_uri: Option<String>,
    /// Client identifier
    pub client_id: String,
    /// Client secret; absent for public clients
    pub client_secret: Option<String>,
    /// PKCE code verifier
    pub code_verifier: Option<String>,
    /// Refresh token (refresh_token grant)
    pub refresh_token: Option<String>,
}

/// Token response (RFC 6749 Section 5.1)
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    /// Signed bearer access token
    pub access_token: String,
    /// Always `Bearer`
    pub token_type: String,
    /// Access-token lifetime in seconds
    pub expires_in: i64,
    /// Refresh token; only present on authorization_code grants
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Granted scope
    pub scope: String,
}

/// UserInfo response with standard claims projected from the user profile
#[derive(Debug, Serialize)]
pub struct UserInfoResponse {
    /// Stable user identifier
    pub sub: String,
    /// Login name
    pub username: String,
    /// Display name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Email address
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Avatar image URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    /// Public profile page URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
    /// Free-form biography
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    /// Website URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    /// Twitter profile URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub twitter: Option<String>,
}

/// OAuth 2.0 Error Response
#[derive(Debug, Serialize)]
pub struct OAuth2Error {
    /// Error code
    pub error: String,
    /// Human-readable error description
    pub error_description: Option<String>,
    /// URI for error information
    pub error_uri: Option<String>,
}

impl OAuth2Error {
    /// Create an `invalid_request` error
    #[must_use]
    pub fn invalid_request(description: &str) -> Self {
        Self {
            error: "invalid_request".to_owned(),
            error_description: Some(description.to_owned()),
            error_uri: Some(
                "https://datatracker.ietf.org/doc/html/rfc6749#section-4.1.2.1".to_owned(),
            ),
        }
    }

    /// Create an `invalid_client` error
    #[must_use]
    pub fn invalid_client() -> Self {
        Self {
            error: "invalid_client".to_owned(),
            error_description: Some("Client authentication failed".to_owned()),
            error_uri: Some("https://datatracker.ietf.org/doc/html/rfc6749#section-5.2".to_owned()),
        }
    }

    /// Create an `invalid_grant` error
    #[must_use]
    pub fn invalid_grant(description: &str) -> Self {
        Self {
            error: "invalid_grant".to_owned(),
            error_description: Some(description.to_owned()),
            error_uri: Some("https://datatracker.ietf.org/doc/html/rfc6749#section-5.2".to_owned()),
        }
    }

    /// Create an `invalid_scope` error (RFC 6749 Section 4.1.2.1)
    /// Used when a client requests scopes beyond what it was registered for
    #[must_use]
    pub fn invalid_scope(description: &str) -> Self {
        Self {
            error: "invalid_scope".to_owned(),
            error_description: Some(description.to_owned()),
            error_uri: Some(
                "https://datatracker.ietf.org/doc/html/rfc6749#section-4.1.2.1".to_owned(),
            ),
        }
    }

    /// Create an `unsupported_response_type` error
    #[must_use]
    pub fn unsupported_response_type() -> Self {
        Self {
            error: "unsupported_response_type".to_owned(),
            error_description: Some("Only the 'code' response type is supported".to_owned()),
            error_uri: Some(
                "https://datatracker.ietf.org/doc/html/rfc6749#section-4.1.2.1".to_owned(),
            ),
        }
    }

    /// Create an `unsupported_grant_type` error
    #[must_use]
    pub fn unsupported_grant_type() -> Self {
        Self {
            error: "unsupported_grant_type".to_owned(),
            error_description: Some("Grant type not supported".to_owned()),
            error_uri: Some("https://datatracker.ietf.org/doc/html/rfc6749#section-5.2".to_owned()),
        }
    }

    /// Create a `temporarily_unavailable` error
    #[must_use]
    pub fn temporarily_unavailable(description: &str) -> Self {
        Self {
            error: "temporarily_unavailable".to_owned(),
            error_description: Some(description.to_owned()),
            error_uri: Some(
                "https://datatracker.ietf.org/doc/html/rfc6749#section-4.1.2.1".to_owned(),
            ),
        }
    }

    /// Create an `invalid_token` error (RFC 6750 Section 3.1)
    #[must_use]
    pub fn invalid_token() -> Self {
        Self {
            error: "invalid_token".to_owned(),
            error_description: Some("The access token is invalid or expired".to_owned()),
            error_uri: Some("https://datatracker.ietf.org/doc/html/rfc6750#section-3.1".to_owned()),
        }
    }

    /// Create a `user_not_found` error for tokens whose subject no longer exists
    #[must_use]
    pub fn user_not_found() -> Self {
        Self {
            error: "user_not_found".to_owned(),
            error_description: Some("The token subject no longer exists".to_owned()),
            error_uri: None,
        }
    }

    /// Create a `server_error` error
    #[must_use]
    pub fn server_error() -> Self {
        Self {
            error: "server_error".to_owned(),
            error_description: Some("An internal error occurred".to_owned()),
            error_uri: Some(
                "https://datatracker.ietf.org/doc/html/rfc6749#section-4.1.2.1".to_owned(),
            ),
        }
    }

    /// HTTP status for this error when returned as a direct response
    #[must_use]
    pub fn http_status(&self) -> StatusCode {
        match self.error.as_str() {
            "invalid_client" | "invalid_token" => StatusCode::UNAUTHORIZED,
            "user_not_found" => StatusCode::NOT_FOUND,
            "server_error" => StatusCode::INTERNAL_SERVER_ERROR,
            "temporarily_unavailable" => StatusCode::NOT_IMPLEMENTED,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}
