// ABOUTME: Main library entry point for the mcpauth authorization server engine
// ABOUTME: Framework- and storage-agnostic OAuth 2.0 core for MCP host applications
//
// SPDX-License-Identifier: MIT OR Apache-2.0

#![deny(unsafe_code)]

//! # mcpauth
//!
//! A self-hosted OAuth 2.0 authorization server engine: the authorization
//! code flow with PKCE, refresh token rotation, RFC 7009 revocation,
//! RFC 7591 dynamic client registration, and RFC 8414/9728 discovery,
//! implemented as pure protocol logic over framework-neutral HTTP types.
//!
//! The engine owns no sockets and no database. Hosts plug in:
//! - a [`StorageAdapter`] for clients, codes, and tokens;
//! - [`HostHooks`] for user authentication and the consent UI;
//! - an [`OAuthConfig`] naming the issuer, lifetimes, and secrets.
//!
//! ## Example
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use mcpauth::{
//!     AuthorizationServer, HostHooks, HttpRequest, MemoryStorage, OAuthConfig, OAuthUser,
//! };
//! use std::sync::Arc;
//!
//! struct MyHost;
//!
//! #[async_trait]
//! impl HostHooks for MyHost {
//!     async fn authenticate_user(&self, _request: &HttpRequest) -> Option<OAuthUser> {
//!         // Resolve the user from your session cookie
//!         Some(OAuthUser::new("user-1"))
//!     }
//!
//!     fn sign_in_url(&self, _request: &HttpRequest, callback_url: &str) -> String {
//!         format!("https://auth.example.com/sign-in?next={callback_url}")
//!     }
//! }
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = OAuthConfig::new("https://auth.example.com")
//!     .with_state_secret(*b"an-actual-randomly-generated-key");
//! let server = AuthorizationServer::new(config, Arc::new(MemoryStorage::new()), Arc::new(MyHost))?;
//!
//! let request = HttpRequest::get("https://auth.example.com/.well-known/oauth-authorization-server");
//! let response = server.handle(&request).await;
//! assert_eq!(response.status, 200);
//! # Ok(())
//! # }
//! ```

/// Authorization endpoint handlers (consent GET, decision POST)
pub mod authorize;

/// Engine configuration and the host integration trait
pub mod config;

/// CORS allow-list policy
pub mod cors;

/// Credential generation and secret hashing
pub mod crypto;

/// OAuth error taxonomy
pub mod errors;

/// Framework-neutral HTTP request/response types
pub mod http;

/// Protocol data models
pub mod models;

/// Dynamic client registration endpoint (RFC 7591)
pub mod register;

/// Bearer-token authentication for protected resources
pub mod resource;

/// Token revocation endpoint (RFC 7009)
pub mod revoke;

/// Scope parsing and validation
pub mod scope;

/// Engine struct and request dispatcher
pub mod server;

/// Signed internal state for the consent flow
pub mod state;

/// Storage adapter contract and in-memory reference adapter
pub mod storage;

/// Token endpoint handlers (code exchange, refresh rotation)
pub mod token;

/// Discovery documents and JWKS (RFC 8414, RFC 9728)
pub mod well_known;

pub use config::{ConsentContext, HostHooks, OAuthConfig};
pub use cors::CorsPolicy;
pub use errors::{OAuthError, OAuthErrorCode};
pub use http::{FormData, HttpRequest, HttpResponse, RequestBody, ResponseBody};
pub use models::{
    AuthorizationCode, AuthorizationDetails, AuthorizeRequest, ClientRegistrationRequest,
    ClientRegistrationResponse, OAuthClient, OAuthToken, OAuthUser, TokenRequest, TokenResponse,
};
pub use server::AuthorizationServer;
pub use state::InternalStateSigner;
pub use storage::{MemoryStorage, StorageAdapter, StorageResult};
pub use well_known::{JsonWebKey, JsonWebKeySet};
