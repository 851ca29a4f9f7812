// ABOUTME: AuthorizationServer engine struct and the method+path dispatcher
// ABOUTME: Hosts either call handle() or mount individual endpoint methods
//
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::config::{HostHooks, OAuthConfig};
use crate::cors::CorsPolicy;
use crate::http::{HttpRequest, HttpResponse};
use crate::state::InternalStateSigner;
use crate::storage::StorageAdapter;
use anyhow::Result;
use serde_json::json;
use std::sync::Arc;

/// OAuth 2.0 authorization server engine.
///
/// Pure protocol logic over the neutral HTTP types: no sockets, no
/// framework, no database. Hosts translate their framework's request into
/// [`HttpRequest`], call [`handle`](Self::handle) (or an individual endpoint
/// method), and translate the [`HttpResponse`] back.
pub struct AuthorizationServer {
    config: OAuthConfig,
    storage: Arc<dyn StorageAdapter>,
    host: Arc<dyn HostHooks>,
    signer: InternalStateSigner,
    cors: CorsPolicy,
}

impl AuthorizationServer {
    /// Build the engine from explicit configuration.
    ///
    /// # Errors
    /// Fails when the configuration is production-flagged without an
    /// internal state secret.
    pub fn new(
        config: OAuthConfig,
        storage: Arc<dyn StorageAdapter>,
        host: Arc<dyn HostHooks>,
    ) -> Result<Self> {
        let signer =
            InternalStateSigner::new(config.internal_state_secret.as_deref(), config.production)?;
        let cors = CorsPolicy::new(config.allowed_origins.clone());
        Ok(Self {
            config,
            storage,
            host,
            signer,
            cors,
        })
    }

    pub(crate) const fn config(&self) -> &OAuthConfig {
        &self.config
    }

    pub(crate) fn storage(&self) -> &dyn StorageAdapter {
        self.storage.as_ref()
    }

    pub(crate) fn host(&self) -> &dyn HostHooks {
        self.host.as_ref()
    }

    pub(crate) const fn signer(&self) -> &InternalStateSigner {
        &self.signer
    }

    pub(crate) const fn cors(&self) -> &CorsPolicy {
        &self.cors
    }

    /// Route a request to the matching endpoint.
    ///
    /// Endpoints live under the configured issuer path; the well-known
    /// documents answer both at the root and under the issuer path. Any
    /// OPTIONS request gets a CORS preflight response.
    pub async fn handle(&self, request: &HttpRequest) -> HttpResponse {
        if request.method == "OPTIONS" {
            return self.cors.preflight(request);
        }

        let base = self.config.issuer_path.trim_end_matches('/').to_owned();
        let path = request.path();

        let well_known = |doc: &str| {
            path == format!("/.well-known/{doc}") || path == format!("{base}/.well-known/{doc}")
        };

        match request.method.as_str() {
            "GET" if path == format!("{base}/authorize") => self.authorize_get(request).await,
            "POST" if path == format!("{base}/authorize") => self.authorize_post(request).await,
            "POST" if path == format!("{base}/token") => self.token(request).await,
            "POST" if path == format!("{base}/revoke") => self.revoke(request).await,
            "POST" if path == format!("{base}/register") => self.register(request).await,
            "GET" if well_known("oauth-authorization-server") => {
                self.authorization_server_metadata(request)
            }
            "GET" if well_known("oauth-protected-resource") => {
                self.protected_resource_metadata(request)
            }
            "GET" if well_known("jwks.json") => self.jwks(request),
            _ => HttpResponse::json(404, json!({ "error": "not_found" })),
        }
    }
}
