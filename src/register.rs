// ABOUTME: RFC 7591 dynamic client registration endpoint
// ABOUTME: Credentials are generated and hashed here; adapters only persist the record
//
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::crypto;
use crate::errors::OAuthError;
use crate::http::{HttpRequest, HttpResponse, RequestBody};
use crate::models::{ClientRegistrationRequest, ClientRegistrationResponse, OAuthClient};
use crate::scope;
use crate::server::AuthorizationServer;
use chrono::Utc;
use tracing::info;
use url::Url;
use uuid::Uuid;

const SUPPORTED_GRANT_TYPES: &[&str] = &["authorization_code", "refresh_token"];
const SUPPORTED_RESPONSE_TYPES: &[&str] = &["code"];
const SUPPORTED_AUTH_METHODS: &[&str] = &["client_secret_basic", "client_secret_post", "none"];

/// Out-of-band redirect URN accepted for CLI-style clients
const OOB_REDIRECT_URN: &str = "urn:ietf:wg:oauth:2.0:oob";

impl AuthorizationServer {
    /// POST /register: dynamic client registration (RFC 7591).
    ///
    /// The plaintext secret appears exactly once, in the 201 response; only
    /// the Argon2 hash reaches storage.
    pub async fn register(&self, request: &HttpRequest) -> HttpResponse {
        let mut response = self.register_inner(request).await;
        self.cors().apply(&mut response, request, "POST, OPTIONS");
        response
    }

    async fn register_inner(&self, request: &HttpRequest) -> HttpResponse {
        if !self.config().registration_enabled {
            return HttpResponse::oauth_error(&OAuthError::not_implemented(
                "Dynamic client registration is not enabled",
            ));
        }

        let RequestBody::Json(body) = &request.body else {
            return HttpResponse::oauth_error(&OAuthError::invalid_request(
                "Request body must be a JSON object",
            ));
        };
        if !body.is_object() {
            return HttpResponse::oauth_error(&OAuthError::invalid_request(
                "Request body must be a JSON object",
            ));
        }
        let registration: ClientRegistrationRequest = match serde_json::from_value(body.clone()) {
            Ok(parsed) => parsed,
            Err(e) => {
                return HttpResponse::oauth_error(&OAuthError::invalid_client_metadata(format!(
                    "Malformed registration metadata: {e}"
                )))
            }
        };

        if let Err(err) = validate_registration(&registration, &self.config().allowed_scopes) {
            return HttpResponse::oauth_error(&err);
        }

        let auth_method = registration
            .token_endpoint_auth_method
            .clone()
            .unwrap_or_else(|| "client_secret_basic".to_owned());
        let is_public = auth_method == "none";

        let client_id = match crypto::random_hex(16) {
            Ok(id) => id,
            Err(err) => return HttpResponse::oauth_error(&err),
        };
        let plaintext_secret = if is_public {
            None
        } else {
            match crypto::random_hex(32) {
                Ok(secret) => Some(secret),
                Err(err) => return HttpResponse::oauth_error(&err),
            }
        };
        let secret_hash = match plaintext_secret
            .as_deref()
            .map(crypto::hash_client_secret)
            .transpose()
        {
            Ok(hash) => hash,
            Err(err) => return HttpResponse::oauth_error(&err),
        };

        let record = OAuthClient {
            id: Uuid::new_v4().to_string(),
            client_id: client_id.clone(),
            client_secret: secret_hash,
            token_endpoint_auth_method: auth_method.clone(),
            name: registration
                .client_name
                .as_deref()
                .map(str::trim)
                .unwrap_or_default()
                .to_owned(),
            redirect_uris: registration.redirect_uris.clone().unwrap_or_default(),
            grant_types: registration
                .grant_types
                .clone()
                .unwrap_or_else(|| vec!["authorization_code".to_owned()]),
            response_types: registration
                .response_types
                .clone()
                .unwrap_or_else(|| vec!["code".to_owned()]),
            scope: registration
                .scope
                .as_deref()
                .and_then(scope::normalize)
                .or_else(|| Some(self.config().default_scope.clone())),
            created_at: Utc::now(),
        };

        // Backends without registration support surface NotImplemented here,
        // which maps to a 501 response
        let stored = match self.storage().register_client(record).await {
            Ok(stored) => stored,
            Err(err) => return HttpResponse::oauth_error(&err),
        };

        info!(
            client_id = %stored.client_id,
            public = is_public,
            "registered OAuth client"
        );

        let response = ClientRegistrationResponse {
            client_id: stored.client_id,
            client_secret_expires_at: plaintext_secret.as_ref().map(|_| 0),
            client_secret: plaintext_secret,
            client_id_issued_at: Utc::now().timestamp(),
            redirect_uris: stored.redirect_uris,
            grant_types: stored.grant_types,
            response_types: stored.response_types,
            client_name: if stored.name.is_empty() {
                None
            } else {
                Some(stored.name)
            },
            scope: stored.scope,
            token_endpoint_auth_method: stored.token_endpoint_auth_method,
        };
        match serde_json::to_value(&response) {
            Ok(value) => HttpResponse::json(201, value),
            Err(e) => HttpResponse::oauth_error(&OAuthError::server_error(format!(
                "Failed to encode registration response: {e}"
            ))),
        }
    }
}

fn validate_registration(
    registration: &ClientRegistrationRequest,
    allowed_scopes: &[String],
) -> Result<(), OAuthError> {
    let redirect_uris = registration
        .redirect_uris
        .as_deref()
        .filter(|uris| !uris.is_empty())
        .ok_or_else(|| {
            OAuthError::invalid_redirect_uri("At least one redirect_uri is required")
        })?;
    for uri in redirect_uris {
        validate_redirect_uri(uri)?;
    }

    if let Some(grant_types) = &registration.grant_types {
        for grant in grant_types {
            if !SUPPORTED_GRANT_TYPES.contains(&grant.as_str()) {
                return Err(OAuthError::invalid_client_metadata(format!(
                    "Unsupported grant type: {grant}"
                )));
            }
        }
    }
    if let Some(response_types) = &registration.response_types {
        for response_type in response_types {
            if !SUPPORTED_RESPONSE_TYPES.contains(&response_type.as_str()) {
                return Err(OAuthError::invalid_client_metadata(format!(
                    "Unsupported response type: {response_type}"
                )));
            }
        }
    }
    if let Some(method) = &registration.token_endpoint_auth_method {
        if !SUPPORTED_AUTH_METHODS.contains(&method.as_str()) {
            return Err(OAuthError::invalid_client_metadata(format!(
                "Unsupported token endpoint auth method: {method}"
            )));
        }
    }

    if let Some(requested) = &registration.scope {
        let invalid = scope::invalid_scopes(requested, allowed_scopes);
        if !invalid.is_empty() {
            return Err(OAuthError::invalid_scope(format!(
                "The following scopes are not allowed: {}",
                invalid.join(", ")
            )));
        }
    }

    Ok(())
}

/// Redirect URIs must be absolute http(s) URLs without fragments or
/// wildcards; https is required except for loopback hosts. The OOB URN is
/// accepted for clients without a redirect target.
fn validate_redirect_uri(uri: &str) -> Result<(), OAuthError> {
    if uri == OOB_REDIRECT_URN {
        return Ok(());
    }
    if uri.contains('*') {
        return Err(OAuthError::invalid_redirect_uri(format!(
            "Wildcards are not allowed in redirect URIs: {uri}"
        )));
    }
    let parsed = Url::parse(uri).map_err(|_| {
        OAuthError::invalid_redirect_uri(format!("redirect_uri is not a valid URL: {uri}"))
    })?;
    if parsed.fragment().is_some() {
        return Err(OAuthError::invalid_redirect_uri(format!(
            "redirect_uri must not contain a fragment: {uri}"
        )));
    }
    match parsed.scheme() {
        "https" => Ok(()),
        "http" => {
            let host = parsed.host_str().unwrap_or_default();
            if host == "localhost" || host == "127.0.0.1" || host == "[::1]" {
                Ok(())
            } else {
                Err(OAuthError::invalid_redirect_uri(format!(
                    "http redirect URIs are only allowed for loopback hosts: {uri}"
                )))
            }
        }
        other => Err(OAuthError::invalid_redirect_uri(format!(
            "Unsupported redirect URI scheme '{other}': {uri}"
        ))),
    }
}
