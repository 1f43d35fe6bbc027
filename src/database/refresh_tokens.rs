// ABOUTME: Refresh-token storage - issuance, validated lookup and revocation
// ABOUTME: Lookup is a conditional SELECT; tokens are not rotated on use
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Tollgate Project

use super::Database;
use crate::errors::{AppError, AppResult};
use crate::models::RefreshToken;
use chrono::{DateTime, Utc};
use sqlx::Row;
use uuid::Uuid;

impl Database {
    /// Store a freshly issued refresh token
    ///
    /// # Errors
    ///
    /// Returns a database error when the insert fails
    pub async fn store_refresh_token(&self, refresh_token: &RefreshToken) -> AppResult<()> {
        sqlx::query(
            r"
            INSERT INTO oauth_refresh_tokens
                (token, client_id, user_id, scope, issued_at, revoked)
            VALUES (?, ?, ?, ?, ?, ?)
            ",
        )
        .bind(&refresh_token.token)
        .bind(&refresh_token.client_id)
        .bind(refresh_token.user_id.to_string())
        .bind(&refresh_token.scope)
        .bind(refresh_token.issued_at)
        .bind(refresh_token.revoked)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Look up a refresh token that is unrevoked and bound to `client_id`
    ///
    /// Returns `None` for unknown, revoked or wrong-client tokens alike; the
    /// caller cannot distinguish which condition failed.
    ///
    /// # Errors
    ///
    /// Returns a database error when the query fails
    pub async fn get_valid_refresh_token(
        &self,
        token: &str,
        client_id: &str,
    ) -> AppResult<Option<RefreshToken>> {
        let row = sqlx::query(
            r"
            SELECT token, client_id, user_id, scope, issued_at, revoked
            FROM oauth_refresh_tokens
            WHERE token = ? AND client_id = ? AND revoked = false
            ",
        )
        .bind(token)
        .bind(client_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(row_to_refresh_token).transpose()
    }

    /// Revoke a refresh token; returns whether a live token was revoked
    ///
    /// # Errors
    ///
    /// Returns a database error when the update fails
    pub async fn revoke_refresh_token(&self, token: &str) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE oauth_refresh_tokens SET revoked = true WHERE token = ? AND revoked = false",
        )
        .bind(token)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

fn row_to_refresh_token(row: sqlx::sqlite::SqliteRow) -> AppResult<RefreshToken> {
    let user_id_raw: String = row.try_get("user_id")?;
    let user_id = Uuid::parse_str(&user_id_raw)
        .map_err(|e| AppError::database(format!("malformed user_id column: {e}")))?;

    Ok(RefreshToken {
        token: row.try_get("token")?,
        client_id: row.try_get("client_id")?,
        user_id,
        scope: row.try_get("scope")?,
        issued_at: row.try_get::<DateTime<Utc>, _>("issued_at")?,
        revoked: row.try_get("revoked")?,
    })
}
