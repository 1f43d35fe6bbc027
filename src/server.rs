// ABOUTME: Server assembly - shared resources, router construction and the serve loop
// ABOUTME: Routes receive an Arc<ServerResources> context via axum State
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Tollgate Project

//! HTTP server assembly

use crate::config::ServerConfig;
use crate::database::Database;
use crate::errors::{AppError, AppResult};
use crate::oauth2::{self, AuthorizationServer};
use crate::tokens::TokenCodec;
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared state injected into route handlers
pub struct ServerResources {
    /// Backing stores
    pub database: Arc<Database>,
    /// Token signing and verification
    pub codec: Arc<TokenCodec>,
    /// The authorization server service
    pub oauth: AuthorizationServer,
    /// Server configuration
    pub config: ServerConfig,
}

impl ServerResources {
    /// Wire the service layer over its stores and configuration
    #[must_use]
    pub fn new(database: Database, config: ServerConfig) -> Self {
        let database = Arc::new(database);
        let codec = Arc::new(TokenCodec::new(
            &config.token_signing_secret,
            config.access_token_ttl_secs,
        ));
        let oauth = AuthorizationServer::new(
            Arc::clone(&database),
            Arc::clone(&codec),
            config.auth_code_ttl_secs,
            config.consent_policy,
        );

        Self {
            database,
            codec,
            oauth,
            config,
        }
    }
}

/// Build the application router with tracing and CORS middleware
pub fn router(resources: Arc<ServerResources>) -> Router {
    oauth2::routes::router(resources)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Bind the listener and serve until shutdown
///
/// # Errors
///
/// Returns an error when binding or serving fails
pub async fn serve(resources: Arc<ServerResources>) -> AppResult<()> {
    let bind_address = resources.config.bind_address();
    let app = router(resources);

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .map_err(|e| AppError::internal(format!("failed to bind {bind_address}: {e}")))?;

    info!("listening on {bind_address}");

    axum::serve(listener, app)
        .await
        .map_err(|e| AppError::internal(format!("server error: {e}")))
}
