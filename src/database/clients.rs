// ABOUTME: Client registry storage - lookup and registration of OAuth clients
// ABOUTME: Redirect URIs and scopes are stored as JSON arrays in TEXT columns
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Tollgate Project

use super::Database;
use crate::errors::{AppError, AppResult};
use crate::models::OAuthClient;
use chrono::{DateTime, Utc};
use sqlx::Row;

impl Database {
    /// Look up a registered client by id
    ///
    /// # Errors
    ///
    /// Returns a database error when the query fails or a stored row is
    /// malformed
    pub async fn get_oauth_client(&self, client_id: &str) -> AppResult<Option<OAuthClient>> {
        let row = sqlx::query(
            r"
            SELECT client_id, client_secret, redirect_uris, allowed_scopes,
                   is_trusted, client_name, created_at
            FROM oauth_clients
            WHERE client_id = ?
            ",
        )
        .bind(client_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(row_to_client).transpose()
    }

    /// Store a client registration
    ///
    /// Registration is an out-of-band concern; this is used by seeding and
    /// tests.
    ///
    /// # Errors
    ///
    /// Returns a database error when the insert fails
    pub async fn store_oauth_client(&self, client: &OAuthClient) -> AppResult<()> {
        let redirect_uris = serde_json::to_string(&client.redirect_uris)
            .map_err(|e| AppError::internal(format!("failed to serialize redirect_uris: {e}")))?;
        let allowed_scopes = serde_json::to_string(&client.allowed_scopes)
            .map_err(|e| AppError::internal(format!("failed to serialize allowed_scopes: {e}")))?;

        sqlx::query(
            r"
            INSERT INTO oauth_clients
                (client_id, client_secret, redirect_uris, allowed_scopes,
                 is_trusted, client_name, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ",
        )
        .bind(&client.client_id)
        .bind(&client.client_secret)
        .bind(redirect_uris)
        .bind(allowed_scopes)
        .bind(client.is_trusted)
        .bind(&client.client_name)
        .bind(client.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn row_to_client(row: sqlx::sqlite::SqliteRow) -> AppResult<OAuthClient> {
    let redirect_uris: Vec<String> =
        serde_json::from_str(&row.try_get::<String, _>("redirect_uris")?)
            .map_err(|e| AppError::database(format!("malformed redirect_uris column: {e}")))?;
    let allowed_scopes: Vec<String> =
        serde_json::from_str(&row.try_get::<String, _>("allowed_scopes")?)
            .map_err(|e| AppError::database(format!("malformed allowed_scopes column: {e}")))?;

    Ok(OAuthClient {
        client_id: row.try_get("client_id")?,
        client_secret: row.try_get("client_secret")?,
        redirect_uris,
        allowed_scopes,
        is_trusted: row.try_get("is_trusted")?,
        client_name: row.try_get("client_name")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
    })
}
