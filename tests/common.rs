// ABOUTME: Shared test utilities and fixture builders for integration tests
// ABOUTME: Provides engine, storage, and host hook setup helpers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
#![allow(
    dead_code,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::module_name_repetitions
)]
//! Shared test utilities for `mcpauth`
//!
//! Builds a fully wired [`AuthorizationServer`] over [`MemoryStorage`] with
//! a scriptable host hook implementation.

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use chrono::Utc;
use mcpauth::{
    AuthorizationServer, FormData, HostHooks, HttpRequest, HttpResponse, MemoryStorage,
    OAuthClient, OAuthConfig, OAuthUser,
};
use sha2::{Digest, Sha256};
use std::sync::{Arc, Once};

pub const ISSUER: &str = "https://auth.example.com";
pub const REDIRECT_URI: &str = "https://app.example.com/callback";
pub const STATE_SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";

static INIT_LOGGER: Once = Once::new();

/// Initialize quiet logging for tests (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        let log_level = match std::env::var("TEST_LOG").as_deref() {
            Ok("TRACE") => tracing::Level::TRACE,
            Ok("DEBUG") => tracing::Level::DEBUG,
            Ok("INFO") => tracing::Level::INFO,
            _ => tracing::Level::WARN,
        };

        tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_test_writer()
            .init();
    });
}

/// Host hooks with a configurable authenticated user
pub struct TestHost {
    pub user: Option<OAuthUser>,
}

#[async_trait]
impl HostHooks for TestHost {
    async fn authenticate_user(&self, _request: &HttpRequest) -> Option<OAuthUser> {
        self.user.clone()
    }

    fn sign_in_url(&self, _request: &HttpRequest, callback_url: &str) -> String {
        format!("{ISSUER}/sign-in?next={callback_url}")
    }
}

/// Engine + storage pair used by most tests
pub struct TestServer {
    pub server: AuthorizationServer,
    pub storage: Arc<MemoryStorage>,
}

/// Build an engine with an authenticated user and default config
pub fn test_server() -> TestServer {
    test_server_with(|_| {})
}

/// Build an engine, letting the caller adjust the config first
pub fn test_server_with(configure: impl FnOnce(&mut OAuthConfig)) -> TestServer {
    init_test_logging();
    let mut config = OAuthConfig::new(ISSUER).with_state_secret(STATE_SECRET);
    configure(&mut config);
    let storage = Arc::new(MemoryStorage::new());
    let host = Arc::new(TestHost {
        user: Some(OAuthUser::new("user-1")),
    });
    let server = AuthorizationServer::new(config, storage.clone(), host).unwrap();
    TestServer { server, storage }
}

/// Build an engine whose host has no signed-in user
pub fn test_server_unauthenticated() -> TestServer {
    init_test_logging();
    let config = OAuthConfig::new(ISSUER).with_state_secret(STATE_SECRET);
    let storage = Arc::new(MemoryStorage::new());
    let host = Arc::new(TestHost { user: None });
    let server = AuthorizationServer::new(config, storage.clone(), host).unwrap();
    TestServer { server, storage }
}

/// Seed a public client with the standard redirect URI
pub async fn seed_public_client(storage: &MemoryStorage, client_id: &str) -> OAuthClient {
    let client = OAuthClient {
        id: format!("row-{client_id}"),
        client_id: client_id.to_owned(),
        client_secret: None,
        token_endpoint_auth_method: "none".to_owned(),
        name: "Test App".to_owned(),
        redirect_uris: vec![REDIRECT_URI.to_owned()],
        grant_types: vec!["authorization_code".to_owned(), "refresh_token".to_owned()],
        response_types: vec!["code".to_owned()],
        scope: Some("openid profile email".to_owned()),
        created_at: Utc::now(),
    };
    storage.insert_client(client.clone()).await;
    client
}

/// Seed a confidential client; returns the client and its plaintext secret
pub async fn seed_confidential_client(
    storage: &MemoryStorage,
    client_id: &str,
) -> (OAuthClient, String) {
    let secret = "test-client-secret".to_owned();
    let client = OAuthClient {
        id: format!("row-{client_id}"),
        client_id: client_id.to_owned(),
        client_secret: Some(mcpauth::crypto::hash_client_secret(&secret).unwrap()),
        token_endpoint_auth_method: "client_secret_basic".to_owned(),
        name: "Confidential App".to_owned(),
        redirect_uris: vec![REDIRECT_URI.to_owned()],
        grant_types: vec!["authorization_code".to_owned(), "refresh_token".to_owned()],
        response_types: vec!["code".to_owned()],
        scope: Some("openid profile email".to_owned()),
        created_at: Utc::now(),
    };
    storage.insert_client(client.clone()).await;
    (client, secret)
}

/// PKCE S256 verifier/challenge pair
pub fn pkce_pair() -> (String, String) {
    let verifier = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk".to_owned();
    let challenge = general_purpose::URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()));
    (verifier, challenge)
}

/// Authorize URL for the standard client and redirect URI
pub fn authorize_url(client_id: &str, extra: &str) -> String {
    let redirect = urlencode(REDIRECT_URI);
    format!(
        "{ISSUER}/api/oauth/authorize?client_id={client_id}&redirect_uri={redirect}&response_type=code{extra}"
    )
}

/// Minimal percent-encoding for query values in test URLs
pub fn urlencode(value: &str) -> String {
    let mut out = String::new();
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char);
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

/// Pull a hidden form field value out of the consent page HTML
pub fn hidden_field(html: &str, name: &str) -> Option<String> {
    let marker = format!("name=\"{name}\" value=\"");
    let start = html.find(&marker)? + marker.len();
    let end = html[start..].find('"')? + start;
    Some(html[start..end].to_owned())
}

/// Run the consent flow for a seeded client and return the authorization
/// code from the redirect
pub async fn obtain_authorization_code(
    harness: &TestServer,
    client_id: &str,
    extra_query: &str,
) -> String {
    let consent = harness
        .server
        .handle(&HttpRequest::get(&authorize_url(client_id, extra_query)))
        .await;
    assert_eq!(consent.status, 200, "consent page should render");
    let html = consent.body_html().unwrap();
    let internal_state = hidden_field(html, "internal_state").unwrap();

    let mut fields = vec![
        ("allow".to_owned(), "true".to_owned()),
        ("internal_state".to_owned(), internal_state),
    ];
    if let Some(state) = hidden_field(html, "state") {
        fields.push(("state".to_owned(), state));
    }
    let form = FormData::from_pairs(fields.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    let decision = harness
        .server
        .handle(&HttpRequest::post(&format!("{ISSUER}/api/oauth/authorize")).with_form(form))
        .await;
    code_from_redirect(&decision)
}

/// Submit an approving consent decision
pub async fn approve_consent(harness: &TestServer, internal_state: &str) -> HttpResponse {
    let form = FormData::from_pairs([("allow", "true"), ("internal_state", internal_state)]);
    harness
        .server
        .handle(&HttpRequest::post(&format!("{ISSUER}/api/oauth/authorize")).with_form(form))
        .await
}

/// Extract `code` from a 302 redirect
pub fn code_from_redirect(response: &HttpResponse) -> String {
    assert_eq!(response.status, 302, "expected a redirect: {response:?}");
    let location = response.redirect.clone().unwrap();
    let url = url::Url::parse(&location).unwrap();
    url.query_pairs()
        .find(|(k, _)| k == "code")
        .map(|(_, v)| v.into_owned())
        .unwrap()
}

/// POST a form to the token endpoint
pub async fn post_token(harness: &TestServer, fields: &[(&str, &str)]) -> HttpResponse {
    let form = FormData::from_pairs(fields.iter().copied());
    harness
        .server
        .handle(&HttpRequest::post(&format!("{ISSUER}/api/oauth/token")).with_form(form))
        .await
}
