// ABOUTME: Authorization-code storage with atomic single-use consumption
// ABOUTME: Redemption is one conditional UPDATE so concurrent instances race safely
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Tollgate Project

use super::Database;
use crate::errors::{AppError, AppResult};
use crate::models::AuthorizationCode;
use chrono::{DateTime, Utc};
use sqlx::Row;
use uuid::Uuid;

impl Database {
    /// Store a freshly issued authorization code
    ///
    /// # Errors
    ///
    /// Returns a database error when the insert fails
    pub async fn store_auth_code(&self, auth_code: &AuthorizationCode) -> AppResult<()> {
        sqlx::query(
            r"
            INSERT INTO oauth_auth_codes
                (code, client_id, user_id, redirect_uri, scope,
                 code_challenge, code_challenge_method, issued_at, expires_at, consumed)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ",
        )
        .bind(&auth_code.code)
        .bind(&auth_code.client_id)
        .bind(auth_code.user_id.to_string())
        .bind(&auth_code.redirect_uri)
        .bind(&auth_code.scope)
        .bind(&auth_code.code_challenge)
        .bind(&auth_code.code_challenge_method)
        .bind(auth_code.issued_at)
        .bind(auth_code.expires_at)
        .bind(auth_code.consumed)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Atomically redeem an authorization code
    ///
    /// A single conditional UPDATE marks the code consumed and returns the
    /// row, but only when the code exists, matches the client and redirect
    /// URI, is unconsumed and unexpired. `None` means the grant must be
    /// refused; concurrent redemptions see at most one `Some`.
    ///
    /// # Errors
    ///
    /// Returns a database error when the statement fails
    pub async fn consume_auth_code(
        &self,
        code: &str,
        client_id: &str,
        redirect_uri: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<AuthorizationCode>> {
        let row = sqlx::query(
            r"
            UPDATE oauth_auth_codes
            SET consumed = true
            WHERE code = ?
              AND client_id = ?
              AND redirect_uri = ?
              AND consumed = false
              AND expires_at > ?
            RETURNING code, client_id, user_id, redirect_uri, scope,
                      code_challenge, code_challenge_method, issued_at, expires_at, consumed
            ",
        )
        .bind(code)
        .bind(client_id)
        .bind(redirect_uri)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        row.map(row_to_auth_code).transpose()
    }

    /// Delete expired authorization codes
    ///
    /// # Errors
    ///
    /// Returns a database error when the delete fails
    pub async fn purge_expired_auth_codes(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM oauth_auth_codes WHERE expires_at <= ?")
            .bind(now)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

fn row_to_auth_code(row: sqlx::sqlite::SqliteRow) -> AppResult<AuthorizationCode> {
    let user_id_raw: String = row.try_get("user_id")?;
    let user_id = Uuid::parse_str(&user_id_raw)
        .map_err(|e| AppError::database(format!("malformed user_id column: {e}")))?;

    Ok(AuthorizationCode {
        code: row.try_get("code")?,
        client_id: row.try_get("client_id")?,
        user_id,
        redirect_uri: row.try_get("redirect_uri")?,
        scope: row.try_get("scope")?,
        code_challenge: row.try_get("code_challenge")?,
        code_challenge_method: row.try_get("code_challenge_method")?,
        issued_at: row.try_get::<DateTime<Utc>, _>("issued_at")?,
        expires_at: row.try_get::<DateTime<Utc>, _>("expires_at")?,
        consumed: row.try_get("consumed")?,
    })
}
