// ABOUTME: Server binary - loads configuration, initializes logging and serves the router
// ABOUTME: All behavior lives in the library; this is bootstrap only
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Tollgate Project

//! Tollgate authorization server binary

use anyhow::{Context, Result};
use std::sync::Arc;
use tollgate::config::ServerConfig;
use tollgate::database::Database;
use tollgate::logging;
use tollgate::server::{self, ServerResources};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_from_env().context("failed to initialize logging")?;

    let config = ServerConfig::from_env().context("failed to load configuration")?;

    let database = Database::new(&config.database_url)
        .await
        .context("failed to connect to database")?;

    info!(
        port = config.http_port,
        database = %config.database_url,
        "starting tollgate authorization server"
    );

    let resources = Arc::new(ServerResources::new(database, config));
    server::serve(resources).await.context("server failed")?;

    Ok(())
}
