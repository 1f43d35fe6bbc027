// ABOUTME: Axum route handlers for the OAuth 2.0 endpoints
// ABOUTME: Parses HTTP, resolves session cookies, maps outcomes to redirects or JSON
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Tollgate Project

//! HTTP layer for the authorization server
//!
//! Handlers stay thin: parse the request, resolve the session cookie, call
//! the service, and turn the outcome into a redirect or a JSON response.

use crate::models::AuthenticatedSession;
use crate::oauth2::endpoints::AuthorizeOutcome;
use crate::oauth2::models::{AuthorizeRequest, OAuth2Error, TokenRequest};
use crate::server::ServerResources;
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use http::{header, HeaderMap, StatusCode};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Name of the host-application session cookie
pub const SESSION_COOKIE: &str = "tg_session";

/// Build the OAuth endpoint router
pub fn router(resources: Arc<ServerResources>) -> Router {
    Router::new()
        .route("/api/oauth/authorize", get(authorize_handler))
        .route("/api/oauth/token", post(token_handler))
        .route("/api/oauth/userinfo", get(userinfo_handler))
        .with_state(resources)
}

/// GET /api/oauth/authorize
async fn authorize_handler(
    State(resources): State<Arc<ServerResources>>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let request = match parse_authorize_request(&params) {
        Ok(request) => request,
        Err(error) => return oauth_error_response(error),
    };

    let session = extract_session(&resources, &headers);

    match resources.oauth.authorize(request, session).await {
        Ok(AuthorizeOutcome::Granted {
            redirect_uri,
            code,
            state,
        }) => {
            let mut query = vec![("code", code)];
            if let Some(state) = state {
                query.push(("state", state));
            }
            redirect_response(&append_query(&redirect_uri, &query))
        }
        Ok(AuthorizeOutcome::Denied {
            redirect_uri,
            error,
            state,
        }) => {
            let mut query = vec![("error", error.error)];
            if let Some(description) = error.error_description {
                query.push(("error_description", description));
            }
            if let Some(state) = state {
                query.push(("state", state));
            }
            redirect_response(&append_query(&redirect_uri, &query))
        }
        Ok(AuthorizeOutcome::LoginRequired) => {
            redirect_response(&build_login_url(&resources.config.login_path, &params))
        }
        Err(error) => oauth_error_response(error),
    }
}

/// POST /api/oauth/token (application/x-www-form-urlencoded)
async fn token_handler(
    State(resources): State<Arc<ServerResources>>,
    Form(params): Form<HashMap<String, String>>,
) -> Response {
    let request = match parse_token_request(&params) {
        Ok(request) => request,
        Err(error) => return oauth_error_response(error),
    };

    match resources.oauth.token(request).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(error) => oauth_error_response(error),
    }
}

/// GET /api/oauth/userinfo (Authorization: Bearer)
async fn userinfo_handler(
    State(resources): State<Arc<ServerResources>>,
    headers: HeaderMap,
) -> Response {
    let Some(bearer_token) = extract_bearer_token(&headers) else {
        return oauth_error_response(OAuth2Error::invalid_token());
    };

    match resources.oauth.userinfo(bearer_token).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(error) => oauth_error_response(error),
    }
}

/// Parse authorize query parameters, requiring the mandatory ones
fn parse_authorize_request(
    params: &HashMap<String, String>,
) -> Result<AuthorizeRequest, OAuth2Error> {
    Ok(AuthorizeRequest {
        response_type: required_param(params, "response_type")?,
        client_id: required_param(params, "client_id")?,
        redirect_uri: required_param(params, "redirect_uri")?,
        scope: params.get("scope").cloned(),
        state: params.get("state").cloned(),
        code_challenge: params.get("code_challenge").cloned(),
        code_challenge_method: params.get("code_challenge_method").cloned(),
    })
}

/// Parse token form parameters, requiring the mandatory ones
fn parse_token_request(params: &HashMap<String, String>) -> Result<TokenRequest, OAuth2Error> {
    Ok(TokenRequest {
        grant_type: required_param(params, "grant_type")?,
        code: params.get("code").cloned(),
        redirect_uri: params.get("redirect_uri").cloned(),
        client_id: required_param(params, "client_id")?,
        client_secret: params.get("client_secret").cloned(),
        code_verifier: params.get("code_verifier").cloned(),
        refresh_token: params.get("refresh_token").cloned(),
    })
}

fn required_param(params: &HashMap<String, String>, name: &str) -> Result<String, OAuth2Error> {
    params
        .get(name)
        .cloned()
        .ok_or_else(|| OAuth2Error::invalid_request(&format!("Missing {name} parameter")))
}

/// Resolve the session cookie into an authenticated session, if any
fn extract_session(
    resources: &ServerResources,
    headers: &HeaderMap,
) -> Option<AuthenticatedSession> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;

    let token = cookies.split(';').find_map(|cookie| {
        cookie
            .trim()
            .strip_prefix(SESSION_COOKIE)
            .and_then(|rest| rest.strip_prefix('='))
    })?;

    resources.codec.verify_session_token(token)
}

/// Pull the token out of an `Authorization: Bearer` header
fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Build the login redirect, preserving the complete authorize request as
/// query parameters so the flow can be replayed after login
fn build_login_url(login_path: &str, params: &HashMap<String, String>) -> String {
    let pairs: Vec<(&str, String)> = [
        "response_type",
        "client_id",
        "redirect_uri",
        "scope",
        "state",
        "code_challenge",
        "code_challenge_method",
    ]
    .iter()
    .filter_map(|name| params.get(*name).map(|value| (*name, value.clone())))
    .collect();

    info!("redirecting unauthenticated authorize request to login");
    append_query(login_path, &pairs)
}

/// Append URL-encoded query pairs, respecting an existing query string
fn append_query<S: AsRef<str>>(base: &str, pairs: &[(&str, S)]) -> String {
    let mut url = base.to_owned();
    let mut separator = if base.contains('?') { '&' } else { '?' };

    for (name, value) in pairs {
        url.push(separator);
        url.push_str(name);
        url.push('=');
        url.push_str(&urlencoding::encode(value.as_ref()));
        separator = '&';
    }

    url
}

/// 302 redirect with a Location header
fn redirect_response(location: &str) -> Response {
    (
        StatusCode::FOUND,
        [(header::LOCATION, location.to_owned())],
    )
        .into_response()
}

/// Map a protocol error to a direct JSON response
fn oauth_error_response(error: OAuth2Error) -> Response {
    (error.http_status(), Json(error)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_query_handles_existing_query() {
        assert_eq!(
            append_query("https://x/cb", &[("code", "abc")]),
            "https://x/cb?code=abc"
        );
        assert_eq!(
            append_query("https://x/cb?k=v", &[("code", "abc"), ("state", "s 1")]),
            "https://x/cb?k=v&code=abc&state=s%201"
        );
    }

    #[test]
    fn test_parse_authorize_request_requires_client_id() {
        let mut params = HashMap::new();
        params.insert("response_type".to_owned(), "code".to_owned());
        params.insert("redirect_uri".to_owned(), "https://x/cb".to_owned());

        let error = parse_authorize_request(&params).unwrap_err();
        assert_eq!(error.error, "invalid_request");
    }

    #[test]
    fn test_build_login_url_preserves_request() {
        let mut params = HashMap::new();
        params.insert("response_type".to_owned(), "code".to_owned());
        params.insert("client_id".to_owned(), "client-1".to_owned());
        params.insert("redirect_uri".to_owned(), "https://x/cb".to_owned());
        params.insert("state".to_owned(), "xyz".to_owned());

        let url = build_login_url("/login", &params);
        assert!(url.starts_with("/login?"));
        assert!(url.contains("client_id=client-1"));
        assert!(url.contains("redirect_uri=https%3A%2F%2Fx%2Fcb"));
        assert!(url.contains("state=xyz"));
    }

    #[test]
    fn test_extract_bearer_token() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Bearer abc.def.ghi".parse().unwrap());
        assert_eq!(extract_bearer_token(&headers), Some("abc.def.ghi"));

        headers.insert(header::AUTHORIZATION, "Basic dXNlcg==".parse().unwrap());
        assert_eq!(extract_bearer_token(&headers), None);
    }
}
