// ABOUTME: Environment configuration management for deployment-specific settings
// ABOUTME: Handles environment variables and runtime configuration parsing
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Tollgate Project

//! Environment-based configuration management for production deployment

use crate::errors::{AppError, AppResult, ErrorCode};
use crate::models::ConsentPolicy;
use std::env;
use tracing::info;

/// Default access-token lifetime in seconds
pub const DEFAULT_ACCESS_TOKEN_TTL_SECS: i64 = 3600;

/// Default authorization-code lifetime in seconds
pub const DEFAULT_AUTH_CODE_TTL_SECS: i64 = 120;

/// Server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address
    pub host: String,
    /// HTTP listen port
    pub http_port: u16,
    /// Database connection URL (SQLite by default)
    pub database_url: String,
    /// Public base URL of this server, used when building redirects
    pub base_url: String,
    /// Path of the host application's login flow
    pub login_path: String,
    /// Shared secret for signing access tokens and session cookies
    pub token_signing_secret: String,
    /// Access-token lifetime in seconds
    pub access_token_ttl_secs: i64,
    /// Authorization-code lifetime in seconds
    pub auth_code_ttl_secs: i64,
    /// How authorization requests obtain user approval
    pub consent_policy: ConsentPolicy,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns a configuration error when a mandatory variable is missing or
    /// a value fails to parse
    pub fn from_env() -> AppResult<Self> {
        info!("Loading configuration from environment variables");

        let host = env_var_or("HOST", "127.0.0.1");
        let http_port = parse_var("HTTP_PORT", 8081)?;
        let database_url = env_var_or("DATABASE_URL", "sqlite:tollgate.db");
        let base_url =
            env_var_or("BASE_URL", &format!("http://localhost:{http_port}"));
        let login_path = env_var_or("LOGIN_PATH", "/login");

        let token_signing_secret = env::var("TOKEN_SIGNING_SECRET").map_err(|_| {
            AppError::new(
                ErrorCode::ConfigMissing,
                "TOKEN_SIGNING_SECRET must be set",
            )
        })?;

        let access_token_ttl_secs =
            parse_var("ACCESS_TOKEN_TTL_SECS", DEFAULT_ACCESS_TOKEN_TTL_SECS)?;
        let auth_code_ttl_secs = parse_var("AUTH_CODE_TTL_SECS", DEFAULT_AUTH_CODE_TTL_SECS)?;

        let consent_policy = match env_var_or("CONSENT_POLICY", "auto_approve").as_str() {
            "auto_approve" => ConsentPolicy::AutoApprove,
            "require_consent" => ConsentPolicy::RequireConsent,
            other => {
                return Err(AppError::config(format!(
                    "unknown CONSENT_POLICY value: {other}"
                )))
            }
        };

        Ok(Self {
            host,
            http_port,
            database_url,
            base_url,
            login_path,
            token_signing_secret,
            access_token_ttl_secs,
            auth_code_ttl_secs,
            consent_policy,
        })
    }

    /// Socket address string for binding the listener
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.http_port)
    }
}

fn env_var_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_owned())
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> AppResult<T> {
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| AppError::config(format!("invalid {name} value: {raw}"))),
        Err(_) => Ok(default),
    }
}
