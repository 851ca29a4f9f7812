// ABOUTME: Engine configuration with explicit injection and env-var loading
// ABOUTME: Defines the HostHooks trait the embedding application implements
//
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::http::{HttpRequest, HttpResponse};
use crate::models::{AuthorizeRequest, OAuthClient, OAuthUser};
use anyhow::{bail, Result};
use async_trait::async_trait;

/// Default mount path for the OAuth endpoints
pub const DEFAULT_ISSUER_PATH: &str = "/api/oauth";

/// Default access token lifetime in seconds (1 hour)
pub const DEFAULT_ACCESS_TOKEN_LIFETIME: i64 = 3600;

/// Default refresh token lifetime in seconds (14 days)
pub const DEFAULT_REFRESH_TOKEN_LIFETIME: i64 = 1_209_600;

/// Default authorization code lifetime in seconds (5 minutes)
pub const DEFAULT_AUTHORIZATION_CODE_LIFETIME: i64 = 300;

/// Scope applied when an authorize request carries none
pub const DEFAULT_SCOPE: &str = "openid profile email";

fn default_allowed_scopes() -> Vec<String> {
    [
        "openid",
        "profile",
        "email",
        "read",
        "write",
        "offline_access",
        "claudeai",
    ]
    .iter()
    .map(|s| (*s).to_owned())
    .collect()
}

/// Engine configuration.
///
/// Everything is explicit: the signing secret, CORS origins, and JWKS key
/// are fields, not ambient globals, so hosts and tests construct exactly the
/// deployment they mean. `from_env` layers the conventional environment
/// variables on top for binary hosts.
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    /// Public origin of the deployment, e.g. `https://auth.example.com`
    pub issuer_url: String,
    /// Path the endpoints are mounted under
    pub issuer_path: String,
    /// Access token lifetime in seconds
    pub access_token_lifetime: i64,
    /// Refresh token lifetime in seconds
    pub refresh_token_lifetime: i64,
    /// Authorization code lifetime in seconds
    pub authorization_code_lifetime: i64,
    /// Scopes clients may request
    pub allowed_scopes: Vec<String>,
    /// Scope applied when a request carries none
    pub default_scope: String,
    /// HMAC key for internal state signing
    pub internal_state_secret: Option<Vec<u8>>,
    /// Production deployments refuse to start without a state secret
    pub production: bool,
    /// CORS allow-list; `None` disables CORS, `*` allows any origin
    pub allowed_origins: Option<Vec<String>>,
    /// RSA private key (PKCS#8 or PKCS#1 PEM) backing the JWKS document
    pub jwks_private_key_pem: Option<String>,
    /// Whether the RFC 7591 registration endpoint is enabled
    pub registration_enabled: bool,
}

impl OAuthConfig {
    /// Configuration with defaults for the given issuer origin
    #[must_use]
    pub fn new(issuer_url: impl Into<String>) -> Self {
        Self {
            issuer_url: issuer_url.into(),
            issuer_path: DEFAULT_ISSUER_PATH.to_owned(),
            access_token_lifetime: DEFAULT_ACCESS_TOKEN_LIFETIME,
            refresh_token_lifetime: DEFAULT_REFRESH_TOKEN_LIFETIME,
            authorization_code_lifetime: DEFAULT_AUTHORIZATION_CODE_LIFETIME,
            allowed_scopes: default_allowed_scopes(),
            default_scope: DEFAULT_SCOPE.to_owned(),
            internal_state_secret: None,
            production: false,
            allowed_origins: None,
            jwks_private_key_pem: None,
            registration_enabled: true,
        }
    }

    /// Configuration from the conventional environment variables:
    /// `MCPAUTH_ENV`, `INTERNAL_STATE_SECRET`, `OAUTH_ALLOWED_ORIGIN`,
    /// and `MCPAUTH_PRIVATE_KEY`.
    ///
    /// # Errors
    /// Fails when `MCPAUTH_ENV=production` and no state secret is set.
    pub fn from_env(issuer_url: impl Into<String>) -> Result<Self> {
        let mut config = Self::new(issuer_url);

        config.production = std::env::var("MCPAUTH_ENV")
            .is_ok_and(|v| v.eq_ignore_ascii_case("production"));

        if let Ok(secret) = std::env::var("INTERNAL_STATE_SECRET") {
            if !secret.is_empty() {
                config.internal_state_secret = Some(secret.into_bytes());
            }
        }
        if config.production && config.internal_state_secret.is_none() {
            bail!("INTERNAL_STATE_SECRET must be set when MCPAUTH_ENV=production");
        }

        if let Ok(origins) = std::env::var("OAUTH_ALLOWED_ORIGIN") {
            let list: Vec<String> = origins
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
                .collect();
            if !list.is_empty() {
                config.allowed_origins = Some(list);
            }
        }

        if let Ok(pem) = std::env::var("MCPAUTH_PRIVATE_KEY") {
            if !pem.is_empty() {
                config.jwks_private_key_pem = Some(pem);
            }
        }

        Ok(config)
    }

    /// Set the internal state signing secret
    #[must_use]
    pub fn with_state_secret(mut self, secret: impl Into<Vec<u8>>) -> Self {
        self.internal_state_secret = Some(secret.into());
        self
    }

    /// Set the CORS allow-list
    #[must_use]
    pub fn with_allowed_origins(mut self, origins: Vec<String>) -> Self {
        self.allowed_origins = Some(origins);
        self
    }

    /// Absolute URL of an endpoint under the issuer path
    #[must_use]
    pub fn endpoint_url(&self, endpoint: &str) -> String {
        format!(
            "{}{}{endpoint}",
            self.issuer_url.trim_end_matches('/'),
            self.issuer_path.trim_end_matches('/')
        )
    }
}

/// Context handed to the consent page renderer
#[derive(Debug, Clone)]
pub struct ConsentContext {
    /// Client requesting authorization
    pub client: OAuthClient,
    /// Authenticated resource owner
    pub user: OAuthUser,
    /// Validated authorize request
    pub request: AuthorizeRequest,
    /// Client CSRF state, carried as a plain form field outside the signed
    /// payload
    pub state: Option<String>,
    /// Signed internal state to embed as a hidden field
    pub internal_state: String,
    /// URL the consent form must POST to
    pub form_action: String,
}

/// Hooks the host application implements to connect the engine to its own
/// session handling and UI.
#[async_trait]
pub trait HostHooks: Send + Sync {
    /// Resolve the current user from the request (session cookie, etc.);
    /// `None` sends the browser to the sign-in flow.
    async fn authenticate_user(&self, request: &HttpRequest) -> Option<OAuthUser>;

    /// URL of the host's sign-in page; `callback_url` is the authorize URL
    /// to return to after signing in.
    fn sign_in_url(&self, request: &HttpRequest, callback_url: &str) -> String;

    /// Custom consent page; return `None` to use the engine's built-in one.
    async fn render_consent_page(
        &self,
        request: &HttpRequest,
        consent: &ConsentContext,
    ) -> Option<HttpResponse> {
        let _ = (request, consent);
        None
    }
}
