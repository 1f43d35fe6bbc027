// ABOUTME: OAuth 2.0 authorization server module - endpoints, wire models and HTTP routes
// ABOUTME: The service layer is HTTP-agnostic; routes.rs adapts it to axum
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Tollgate Project

//! OAuth 2.0 authorization server
//!
//! Implements the authorization-code grant with PKCE, refresh-token
//! exchange, and a userinfo endpoint over stateless signed bearer tokens.

/// Endpoint implementations (authorize, token, userinfo)
pub mod endpoints;

/// Request/response wire types and protocol errors
pub mod models;

/// HTTP route handlers
pub mod routes;

pub use endpoints::{AuthorizationServer, AuthorizeOutcome};
