// ABOUTME: Integration tests for POST /api/oauth/token
// ABOUTME: Covers client auth, code redemption, PKCE, refresh grants and the redemption race
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Tollgate Project

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use axum::body::{to_bytes, Body};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{Duration, Utc};
use common::{harness, seed_client, Harness, CLIENT_ID, CLIENT_SECRET, REDIRECT_URI};
use http::{header, Request, StatusCode};
use sha2::{Digest, Sha256};
use tollgate::models::{AuthenticatedSession, AuthorizationCode};
use tollgate::oauth2::models::{AuthorizeRequest, TokenRequest};
use tollgate::oauth2::AuthorizeOutcome;
use tollgate::server;
use tower::ServiceExt;

const VERIFIER: &str = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";

fn s256_challenge(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

/// Run the authorize step and unwrap the issued code
async fn issue_code(h: &Harness, challenge: Option<(&str, &str)>) -> String {
    let request = AuthorizeRequest {
        response_type: "code".into(),
        client_id: CLIENT_ID.into(),
        redirect_uri: REDIRECT_URI.into(),
        scope: Some("read write".into()),
        state: Some("xyz".into()),
        code_challenge: challenge.map(|(c, _)| c.to_owned()),
        code_challenge_method: challenge.map(|(_, m)| m.to_owned()),
    };
    let session = AuthenticatedSession { user_id: h.user.id };

    match h.resources.oauth.authorize(request, Some(session)).await {
        Ok(AuthorizeOutcome::Granted { code, .. }) => code,
        other => panic!("expected granted outcome, got {other:?}"),
    }
}

fn code_request(code: &str, verifier: Option<&str>) -> TokenRequest {
    TokenRequest {
        grant_type: "authorization_code".into(),
        code: Some(code.to_owned()),
        redirect_uri: Some(REDIRECT_URI.to_owned()),
        client_id: CLIENT_ID.into(),
        client_secret: Some(CLIENT_SECRET.into()),
        code_verifier: verifier.map(str::to_owned),
        refresh_token: None,
    }
}

fn refresh_request(refresh_token: &str) -> TokenRequest {
    TokenRequest {
        grant_type: "refresh_token".into(),
        code: None,
        redirect_uri: None,
        client_id: CLIENT_ID.into(),
        client_secret: Some(CLIENT_SECRET.into()),
        code_verifier: None,
        refresh_token: Some(refresh_token.to_owned()),
    }
}

// ===== Grant type and client authentication =====

#[tokio::test]
async fn test_unknown_grant_type_rejected() {
    let h = harness().await;
    let mut request = code_request("whatever", None);
    request.grant_type = "client_credentials".into();

    let error = h.resources.oauth.token(request).await.unwrap_err();
    assert_eq!(error.error, "unsupported_grant_type");
}

#[tokio::test]
async fn test_unknown_client_rejected() {
    let h = harness().await;
    let mut request = code_request("whatever", None);
    request.client_id = "no-such-client".into();

    let error = h.resources.oauth.token(request).await.unwrap_err();
    assert_eq!(error.error, "invalid_client");
}

#[tokio::test]
async fn test_wrong_client_secret_rejected() {
    let h = harness().await;
    let code = issue_code(&h, None).await;
    let mut request = code_request(&code, None);
    request.client_secret = Some("not-the-secret".into());

    let error = h.resources.oauth.token(request).await.unwrap_err();
    assert_eq!(error.error, "invalid_client");
}

#[tokio::test]
async fn test_missing_client_secret_rejected() {
    let h = harness().await;
    let code = issue_code(&h, None).await;
    let mut request = code_request(&code, None);
    request.client_secret = None;

    let error = h.resources.oauth.token(request).await.unwrap_err();
    assert_eq!(error.error, "invalid_client");
}

#[tokio::test]
async fn test_public_client_needs_no_secret() {
    let h = harness().await;
    seed_client(&h.resources.database, "public-client", None).await;

    let request = AuthorizeRequest {
        response_type: "code".into(),
        client_id: "public-client".into(),
        redirect_uri: REDIRECT_URI.into(),
        scope: Some("read".into()),
        state: None,
        code_challenge: Some(s256_challenge(VERIFIER)),
        code_challenge_method: Some("S256".into()),
    };
    let session = AuthenticatedSession { user_id: h.user.id };
    let Ok(AuthorizeOutcome::Granted { code, .. }) =
        h.resources.oauth.authorize(request, Some(session)).await
    else {
        panic!("authorize failed for public client");
    };

    let token_request = TokenRequest {
        grant_type: "authorization_code".into(),
        code: Some(code),
        redirect_uri: Some(REDIRECT_URI.to_owned()),
        client_id: "public-client".into(),
        client_secret: None,
        code_verifier: Some(VERIFIER.into()),
        refresh_token: None,
    };

    let response = h.resources.oauth.token(token_request).await.unwrap();
    assert_eq!(response.scope, "read");
}

// ===== Authorization code grant =====

#[tokio::test]
async fn test_code_exchanges_for_tokens() {
    let h = harness().await;
    let code = issue_code(&h, Some((&s256_challenge(VERIFIER), "S256"))).await;

    let response = h
        .resources
        .oauth
        .token(code_request(&code, Some(VERIFIER)))
        .await
        .unwrap();

    assert_eq!(response.token_type, "Bearer");
    assert_eq!(response.expires_in, 3600);
    assert_eq!(response.scope, "read write");
    assert!(response.refresh_token.is_some());

    let claims = h
        .resources
        .codec
        .verify_access_token(&response.access_token)
        .unwrap();
    assert_eq!(claims.sub, h.user.id.to_string());
    assert_eq!(claims.client_id, CLIENT_ID);
    assert_eq!(claims.scope, "read write");
}

#[tokio::test]
async fn test_code_replay_rejected() {
    let h = harness().await;
    let code = issue_code(&h, None).await;

    h.resources
        .oauth
        .token(code_request(&code, None))
        .await
        .unwrap();

    let error = h
        .resources
        .oauth
        .token(code_request(&code, None))
        .await
        .unwrap_err();
    assert_eq!(error.error, "invalid_grant");
}

#[tokio::test]
async fn test_redirect_uri_mismatch_rejected() {
    let h = harness().await;
    let code = issue_code(&h, None).await;
    let mut request = code_request(&code, None);
    request.redirect_uri = Some("https://app.example.com/other".into());

    let error = h.resources.oauth.token(request).await.unwrap_err();
    assert_eq!(error.error, "invalid_grant");
}

#[tokio::test]
async fn test_missing_code_parameter_rejected() {
    let h = harness().await;
    let mut request = code_request("x", None);
    request.code = None;

    let error = h.resources.oauth.token(request).await.unwrap_err();
    assert_eq!(error.error, "invalid_request");
}

#[tokio::test]
async fn test_expired_code_rejected() {
    let h = harness().await;
    let now = Utc::now();
    let stale = AuthorizationCode {
        code: "stale-code".into(),
        client_id: CLIENT_ID.into(),
        user_id: h.user.id,
        redirect_uri: REDIRECT_URI.into(),
        scope: "read".into(),
        code_challenge: None,
        code_challenge_method: None,
        issued_at: now - Duration::seconds(300),
        expires_at: now - Duration::seconds(180),
        consumed: false,
    };
    h.resources.database.store_auth_code(&stale).await.unwrap();

    let error = h
        .resources
        .oauth
        .token(code_request("stale-code", None))
        .await
        .unwrap_err();
    assert_eq!(error.error, "invalid_grant");
}

// ===== PKCE =====

#[tokio::test]
async fn test_pkce_wrong_verifier_burns_the_code() {
    let h = harness().await;
    let code = issue_code(&h, Some((&s256_challenge(VERIFIER), "S256"))).await;

    let wrong = "wrongwrongwrongwrongwrongwrongwrongwrongwro";
    let error = h
        .resources
        .oauth
        .token(code_request(&code, Some(wrong)))
        .await
        .unwrap_err();
    assert_eq!(error.error, "invalid_grant");

    // The code was consumed before PKCE ran; the correct verifier is too late
    let error = h
        .resources
        .oauth
        .token(code_request(&code, Some(VERIFIER)))
        .await
        .unwrap_err();
    assert_eq!(error.error, "invalid_grant");
}

#[tokio::test]
async fn test_pkce_missing_verifier_rejected() {
    let h = harness().await;
    let code = issue_code(&h, Some((&s256_challenge(VERIFIER), "S256"))).await;

    let error = h
        .resources
        .oauth
        .token(code_request(&code, None))
        .await
        .unwrap_err();
    assert_eq!(error.error, "invalid_grant");
}

#[tokio::test]
async fn test_pkce_plain_method() {
    let h = harness().await;
    let code = issue_code(&h, Some((VERIFIER, "plain"))).await;

    let response = h
        .resources
        .oauth
        .token(code_request(&code, Some(VERIFIER)))
        .await
        .unwrap();
    assert_eq!(response.scope, "read write");
}

// ===== Refresh token grant =====

#[tokio::test]
async fn test_refresh_grant_does_not_rotate() {
    let h = harness().await;
    let code = issue_code(&h, None).await;
    let initial = h
        .resources
        .oauth
        .token(code_request(&code, None))
        .await
        .unwrap();
    let refresh_token = initial.refresh_token.unwrap();

    let refreshed = h
        .resources
        .oauth
        .token(refresh_request(&refresh_token))
        .await
        .unwrap();
    assert!(refreshed.refresh_token.is_none());
    assert_eq!(refreshed.scope, "read write");

    let claims = h
        .resources
        .codec
        .verify_access_token(&refreshed.access_token)
        .unwrap();
    assert_eq!(claims.sub, h.user.id.to_string());

    // The same refresh token keeps working
    let again = h
        .resources
        .oauth
        .token(refresh_request(&refresh_token))
        .await
        .unwrap();
    assert!(again.refresh_token.is_none());
}

#[tokio::test]
async fn test_refresh_token_bound_to_client() {
    let h = harness().await;
    seed_client(&h.resources.database, "other-client", Some("other-secret")).await;

    let code = issue_code(&h, None).await;
    let initial = h
        .resources
        .oauth
        .token(code_request(&code, None))
        .await
        .unwrap();
    let refresh_token = initial.refresh_token.unwrap();

    let mut request = refresh_request(&refresh_token);
    request.client_id = "other-client".into();
    request.client_secret = Some("other-secret".into());

    let error = h.resources.oauth.token(request).await.unwrap_err();
    assert_eq!(error.error, "invalid_grant");
}

#[tokio::test]
async fn test_revoked_refresh_token_rejected() {
    let h = harness().await;
    let code = issue_code(&h, None).await;
    let initial = h
        .resources
        .oauth
        .token(code_request(&code, None))
        .await
        .unwrap();
    let refresh_token = initial.refresh_token.unwrap();

    assert!(h
        .resources
        .database
        .revoke_refresh_token(&refresh_token)
        .await
        .unwrap());

    let error = h
        .resources
        .oauth
        .token(refresh_request(&refresh_token))
        .await
        .unwrap_err();
    assert_eq!(error.error, "invalid_grant");
}

#[tokio::test]
async fn test_missing_refresh_token_parameter_rejected() {
    let h = harness().await;
    let mut request = refresh_request("x");
    request.refresh_token = None;

    let error = h.resources.oauth.token(request).await.unwrap_err();
    assert_eq!(error.error, "invalid_request");
}

// ===== Concurrency =====

#[tokio::test]
async fn test_concurrent_redemption_yields_one_success() {
    let h = harness().await;
    let code = issue_code(&h, None).await;

    let r1 = h.resources.clone();
    let r2 = h.resources.clone();
    let request1 = code_request(&code, None);
    let request2 = code_request(&code, None);

    let (a, b) = tokio::join!(
        tokio::spawn(async move { r1.oauth.token(request1).await }),
        tokio::spawn(async move { r2.oauth.token(request2).await }),
    );

    let results = [a.unwrap(), b.unwrap()];
    let successes = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1);

    let failure = results.iter().find(|r| r.is_err()).unwrap();
    assert_eq!(
        failure.as_ref().unwrap_err().error,
        "invalid_grant"
    );
}

// ===== HTTP form encoding =====

#[tokio::test]
async fn test_token_endpoint_accepts_form_body() {
    let h = harness().await;
    let code = issue_code(&h, None).await;

    let body = serde_urlencoded::to_string([
        ("grant_type", "authorization_code"),
        ("code", code.as_str()),
        ("redirect_uri", REDIRECT_URI),
        ("client_id", CLIENT_ID),
        ("client_secret", CLIENT_SECRET),
    ])
    .unwrap();

    let request = Request::builder()
        .method("POST")
        .uri("/api/oauth/token")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .unwrap();

    let response = server::router(h.resources.clone())
        .oneshot(request)
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["token_type"], "Bearer");
    assert!(json["access_token"].as_str().is_some());
    assert!(json["refresh_token"].as_str().is_some());
}

#[tokio::test]
async fn test_token_endpoint_error_statuses() {
    let h = harness().await;

    let body = serde_urlencoded::to_string([
        ("grant_type", "authorization_code"),
        ("code", "bogus"),
        ("redirect_uri", REDIRECT_URI),
        ("client_id", CLIENT_ID),
        ("client_secret", "wrong"),
    ])
    .unwrap();

    let request = Request::builder()
        .method("POST")
        .uri("/api/oauth/token")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .unwrap();

    let response = server::router(h.resources.clone())
        .oneshot(request)
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["error"], "invalid_client");
}
