// ABOUTME: Storage adapter contract every backend implements, plus an in-memory reference adapter
// ABOUTME: Single-use code atomicity lives here via take_authorization_code
//
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::crypto;
use crate::errors::OAuthError;
use crate::models::{AuthorizationCode, OAuthClient, OAuthToken};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Result alias for adapter methods.
///
/// Backends that need to surface a recognized OAuth error return it
/// directly; anything else should be wrapped as `server_error`.
pub type StorageResult<T> = Result<T, OAuthError>;

/// Persistence contract for clients, authorization codes, and tokens.
///
/// The engine owns all protocol semantics; adapters only store and fetch.
/// The one nuance adapters own is client-secret verification in
/// `get_client`, since the adapter owns the stored hash format.
#[async_trait]
pub trait StorageAdapter: Send + Sync {
    /// Fetch a client by `client_id`, verifying `client_secret` when the
    /// client's auth method requires one. Public clients
    /// (`token_endpoint_auth_method == "none"`) skip the secret check.
    /// Returns `None` for unknown clients and failed verification alike.
    async fn get_client(
        &self,
        client_id: &str,
        client_secret: Option<&str>,
    ) -> StorageResult<Option<OAuthClient>>;

    /// Persist a freshly minted authorization code
    async fn save_authorization_code(
        &self,
        code: AuthorizationCode,
    ) -> StorageResult<AuthorizationCode>;

    /// Fetch an authorization code without consuming it
    async fn get_authorization_code(&self, code: &str)
        -> StorageResult<Option<AuthorizationCode>>;

    /// Atomically fetch and delete an authorization code.
    ///
    /// The token endpoint only ever consumes codes through this method, so
    /// two racing exchanges cannot both succeed. Backends with conditional
    /// delete should override the default get-then-revoke implementation.
    async fn take_authorization_code(
        &self,
        code: &str,
    ) -> StorageResult<Option<AuthorizationCode>> {
        match self.get_authorization_code(code).await? {
            Some(found) => {
                self.revoke_authorization_code(&found.code).await?;
                Ok(Some(found))
            }
            None => Ok(None),
        }
    }

    /// Delete an authorization code; unknown codes are not an error
    async fn revoke_authorization_code(&self, code: &str) -> StorageResult<bool>;

    /// Persist an issued token pair
    async fn save_token(&self, token: OAuthToken) -> StorageResult<OAuthToken>;

    /// Fetch a token record by access token
    async fn get_access_token(&self, access_token: &str) -> StorageResult<Option<OAuthToken>>;

    /// Fetch a token record by refresh token
    async fn get_refresh_token(&self, refresh_token: &str) -> StorageResult<Option<OAuthToken>>;

    /// Delete any token record whose access or refresh token matches;
    /// returns whether something was deleted
    async fn revoke_token(&self, token: &str) -> StorageResult<bool>;

    /// Persist an engine-prepared client record (credentials already
    /// generated and hashed). Backends that do not support dynamic
    /// registration keep the default, which the endpoint maps to 501.
    async fn register_client(&self, client: OAuthClient) -> StorageResult<OAuthClient> {
        let _ = client;
        Err(OAuthError::not_implemented(
            "Client registration is not supported by this storage backend",
        ))
    }
}

/// In-process adapter backing the test suite and local development.
///
/// Not for production: everything lives in process memory and vanishes on
/// restart.
#[derive(Default)]
pub struct MemoryStorage {
    clients: RwLock<HashMap<String, OAuthClient>>,
    codes: RwLock<HashMap<String, AuthorizationCode>>,
    tokens: RwLock<HashMap<String, OAuthToken>>,
}

impl MemoryStorage {
    /// Empty adapter
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a client record directly, bypassing registration
    pub async fn insert_client(&self, client: OAuthClient) {
        self.clients
            .write()
            .await
            .insert(client.client_id.clone(), client);
    }
}

#[async_trait]
impl StorageAdapter for MemoryStorage {
    async fn get_client(
        &self,
        client_id: &str,
        client_secret: Option<&str>,
    ) -> StorageResult<Option<OAuthClient>> {
        let clients = self.clients.read().await;
        let Some(client) = clients.get(client_id) else {
            // Equalize timing with the verification path
            crypto::dummy_verify(client_secret.unwrap_or_default());
            return Ok(None);
        };

        if client.is_public() {
            return Ok(Some(client.clone()));
        }

        let (Some(secret), Some(stored_hash)) = (client_secret, client.client_secret.as_deref())
        else {
            crypto::dummy_verify(client_secret.unwrap_or_default());
            return Ok(None);
        };
        if !crypto::verify_client_secret(secret, stored_hash) {
            return Ok(None);
        }
        Ok(Some(client.clone()))
    }

    async fn save_authorization_code(
        &self,
        code: AuthorizationCode,
    ) -> StorageResult<AuthorizationCode> {
        self.codes
            .write()
            .await
            .insert(code.code.clone(), code.clone());
        Ok(code)
    }

    async fn get_authorization_code(
        &self,
        code: &str,
    ) -> StorageResult<Option<AuthorizationCode>> {
        Ok(self.codes.read().await.get(code).cloned())
    }

    async fn take_authorization_code(
        &self,
        code: &str,
    ) -> StorageResult<Option<AuthorizationCode>> {
        // Single write-lock remove keeps consumption atomic
        Ok(self.codes.write().await.remove(code))
    }

    async fn revoke_authorization_code(&self, code: &str) -> StorageResult<bool> {
        Ok(self.codes.write().await.remove(code).is_some())
    }

    async fn save_token(&self, token: OAuthToken) -> StorageResult<OAuthToken> {
        self.tokens
            .write()
            .await
            .insert(token.access_token.clone(), token.clone());
        Ok(token)
    }

    async fn get_access_token(&self, access_token: &str) -> StorageResult<Option<OAuthToken>> {
        Ok(self.tokens.read().await.get(access_token).cloned())
    }

    async fn get_refresh_token(&self, refresh_token: &str) -> StorageResult<Option<OAuthToken>> {
        Ok(self
            .tokens
            .read()
            .await
            .values()
            .find(|t| t.refresh_token.as_deref() == Some(refresh_token))
            .cloned())
    }

    async fn revoke_token(&self, token: &str) -> StorageResult<bool> {
        let mut tokens = self.tokens.write().await;
        let before = tokens.len();
        tokens.retain(|_, t| {
            t.access_token != token && t.refresh_token.as_deref() != Some(token)
        });
        Ok(tokens.len() < before)
    }

    async fn register_client(&self, client: OAuthClient) -> StorageResult<OAuthClient> {
        self.clients
            .write()
            .await
            .insert(client.client_id.clone(), client.clone());
        Ok(client)
    }
}
