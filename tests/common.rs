// ABOUTME: Shared test harness - file-backed SQLite database with a seeded client and user
// ABOUTME: Used by the authorize, token and userinfo integration tests
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Tollgate Project

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs, dead_code)]

use chrono::Utc;
use std::sync::Arc;
use tempfile::TempDir;
use tollgate::config::environment::{DEFAULT_ACCESS_TOKEN_TTL_SECS, DEFAULT_AUTH_CODE_TTL_SECS};
use tollgate::config::ServerConfig;
use tollgate::database::Database;
use tollgate::models::{ConsentPolicy, OAuthClient, UserProfile};
use tollgate::server::ServerResources;
use uuid::Uuid;

pub const CLIENT_ID: &str = "test-client";
pub const CLIENT_SECRET: &str = "test-client-secret";
pub const REDIRECT_URI: &str = "https://app.example.com/callback";
pub const SIGNING_SECRET: &str = "integration-test-signing-secret";

/// Everything a test needs: wired resources plus the seeded fixtures.
/// The temp dir must outlive the harness so the database file survives.
pub struct Harness {
    pub resources: Arc<ServerResources>,
    pub client: OAuthClient,
    pub user: UserProfile,
    _tmp: TempDir,
}

pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".into(),
        http_port: 0,
        database_url: "sqlite::memory:".into(),
        base_url: "http://localhost:8081".into(),
        login_path: "/login".into(),
        token_signing_secret: SIGNING_SECRET.into(),
        access_token_ttl_secs: DEFAULT_ACCESS_TOKEN_TTL_SECS,
        auth_code_ttl_secs: DEFAULT_AUTH_CODE_TTL_SECS,
        consent_policy: ConsentPolicy::AutoApprove,
    }
}

/// File-backed database so every pool connection sees the same data
pub async fn test_database() -> (Database, TempDir) {
    let tmp = tempfile::tempdir().unwrap();
    let url = format!("sqlite:{}", tmp.path().join("tollgate-test.db").display());
    let database = Database::new(&url).await.unwrap();
    (database, tmp)
}

pub async fn seed_client(database: &Database, client_id: &str, secret: Option<&str>) -> OAuthClient {
    let client = OAuthClient {
        client_id: client_id.to_owned(),
        client_secret: secret.map(str::to_owned),
        redirect_uris: vec![REDIRECT_URI.to_owned()],
        allowed_scopes: vec!["read".to_owned(), "write".to_owned()],
        is_trusted: false,
        client_name: Some("Test Client".to_owned()),
        created_at: Utc::now(),
    };
    database.store_oauth_client(&client).await.unwrap();
    client
}

pub async fn seed_user(database: &Database) -> UserProfile {
    let profile = UserProfile {
        id: Uuid::new_v4(),
        username: "testuser".into(),
        full_name: Some("Test User".into()),
        email: Some("test@example.com".into()),
        avatar_url: Some("https://cdn.example.com/avatar.png".into()),
        bio: Some("Just testing".into()),
        profile_url: Some("https://example.com/testuser".into()),
        website_url: None,
        twitter_url: None,
    };
    database.store_user_profile(&profile).await.unwrap();
    profile
}

pub async fn harness() -> Harness {
    harness_with_policy(ConsentPolicy::AutoApprove).await
}

pub async fn harness_with_policy(policy: ConsentPolicy) -> Harness {
    let (database, tmp) = test_database().await;
    let client = seed_client(&database, CLIENT_ID, Some(CLIENT_SECRET)).await;
    let user = seed_user(&database).await;

    let mut config = test_config();
    config.consent_policy = policy;

    Harness {
        resources: Arc::new(ServerResources::new(database, config)),
        client,
        user,
        _tmp: tmp,
    }
}
