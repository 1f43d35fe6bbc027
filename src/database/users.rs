// ABOUTME: User profile lookup over the host application's users table
// ABOUTME: This server reads profiles for the userinfo endpoint; the host owns writes
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Tollgate Project

use super::Database;
use crate::errors::{AppError, AppResult};
use crate::models::UserProfile;
use sqlx::Row;
use uuid::Uuid;

impl Database {
    /// Look up a user profile by id
    ///
    /// # Errors
    ///
    /// Returns a database error when the query fails
    pub async fn get_user_profile(&self, user_id: Uuid) -> AppResult<Option<UserProfile>> {
        let row = sqlx::query(
            r"
            SELECT id, username, full_name, email, avatar_url, bio,
                   profile_url, website_url, twitter_url
            FROM users
            WHERE id = ?
            ",
        )
        .bind(user_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(row_to_profile).transpose()
    }

    /// Store a user profile
    ///
    /// User management belongs to the host application; this is used by
    /// seeding and tests.
    ///
    /// # Errors
    ///
    /// Returns a database error when the insert fails
    pub async fn store_user_profile(&self, profile: &UserProfile) -> AppResult<()> {
        sqlx::query(
            r"
            INSERT INTO users
                (id, username, full_name, email, avatar_url, bio,
                 profile_url, website_url, twitter_url)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ",
        )
        .bind(profile.id.to_string())
        .bind(&profile.username)
        .bind(&profile.full_name)
        .bind(&profile.email)
        .bind(&profile.avatar_url)
        .bind(&profile.bio)
        .bind(&profile.profile_url)
        .bind(&profile.website_url)
        .bind(&profile.twitter_url)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn row_to_profile(row: sqlx::sqlite::SqliteRow) -> AppResult<UserProfile> {
    let id_raw: String = row.try_get("id")?;
    let id = Uuid::parse_str(&id_raw)
        .map_err(|e| AppError::database(format!("malformed id column: {e}")))?;

    Ok(UserProfile {
        id,
        username: row.try_get("username")?,
        full_name: row.try_get("full_name")?,
        email: row.try_get("email")?,
        avatar_url: row.try_get("avatar_url")?,
        bio: row.try_get("bio")?,
        profile_url: row.try_get("profile_url")?,
        website_url: row.try_get("website_url")?,
        twitter_url: row.try_get("twitter_url")?,
    })
}
