// ABOUTME: Main library entry point for the Tollgate authorization server
// ABOUTME: Provides the OAuth 2.0 authorization-code grant with PKCE over signed bearer tokens
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Tollgate Project

#![deny(unsafe_code)]

//! # Tollgate
//!
//! An OAuth 2.0 authorization server core: the authorization-code grant with
//! PKCE, refresh-token exchange, stateless signed bearer access tokens and a
//! userinfo endpoint.
//!
//! ## Architecture
//!
//! - **Models**: domain records for clients, codes, tokens and profiles
//! - **Database**: SQLite-backed stores with atomic single-use code redemption
//! - **Tokens**: HS256 codec for access tokens and session cookies
//! - **`OAuth2`**: endpoint service layer and axum routes
//! - **Config**: environment-driven server configuration
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tollgate::config::ServerConfig;
//! use tollgate::errors::AppResult;
//!
//! fn main() -> AppResult<()> {
//!     let config = ServerConfig::from_env()?;
//!     println!("Tollgate configured for port {}", config.http_port);
//!     Ok(())
//! }
//! ```

/// Configuration management
pub mod config;

/// SQLite-backed stores for clients, codes, refresh tokens and users
pub mod database;

/// Unified error handling system with standard error codes and HTTP responses
pub mod errors;

/// Production logging and structured output
pub mod logging;

/// Common data models
pub mod models;

/// OAuth 2.0 authorization server endpoints and routes
pub mod oauth2;

/// HTTP server assembly
pub mod server;

/// Access-token and session-cookie codec
pub mod tokens;
