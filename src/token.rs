// ABOUTME: Token endpoint: authorization_code and refresh_token grants with PKCE
// ABOUTME: Codes are consumed atomically; refresh tokens rotate on every use
//
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::crypto;
use crate::errors::OAuthError;
use crate::http::{HttpRequest, HttpResponse};
use crate::models::{OAuthToken, TokenRequest, TokenResponse};
use crate::scope;
use crate::server::AuthorizationServer;
use base64::{engine::general_purpose, Engine as _};
use chrono::{Duration, Utc};
use serde_json::json;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tracing::debug;

impl AuthorizationServer {
    /// POST /token: exchange an authorization code or rotate a refresh
    /// token. Responses always carry `Cache-Control: no-store` and
    /// `Pragma: no-cache` per RFC 6749 §5.1.
    pub async fn token(&self, request: &HttpRequest) -> HttpResponse {
        let params = TokenRequest::from_request(request);
        let mut response = match params.grant_type.as_deref() {
            Some("authorization_code") => self.exchange_authorization_code(&params).await,
            Some("refresh_token") => self.refresh_access_token(&params).await,
            Some(other) => HttpResponse::oauth_error(&OAuthError::unsupported_grant_type(
                format!("Grant type '{other}' is not supported"),
            )),
            None => HttpResponse::oauth_error(&OAuthError::invalid_request(
                "Missing required parameter: grant_type",
            )),
        };
        response
            .headers
            .insert("cache-control".to_owned(), "no-store".to_owned());
        response
            .headers
            .insert("pragma".to_owned(), "no-cache".to_owned());
        self.cors().apply(&mut response, request, "POST, OPTIONS");
        response
    }

    async fn exchange_authorization_code(&self, params: &TokenRequest) -> HttpResponse {
        let missing: Vec<&str> = [
            ("code", params.code.as_deref()),
            ("redirect_uri", params.redirect_uri.as_deref()),
            ("client_id", params.client_id.as_deref()),
        ]
        .iter()
        .filter(|(_, v)| v.is_none())
        .map(|(name, _)| *name)
        .collect();
        if !missing.is_empty() {
            return HttpResponse::oauth_error(&OAuthError::invalid_request(format!(
                "Missing required parameters: {}",
                missing.join(", ")
            )));
        }
        let code = params.code.as_deref().unwrap_or_default();
        let redirect_uri = params.redirect_uri.as_deref().unwrap_or_default();
        let client_id = params.client_id.as_deref().unwrap_or_default();

        let client = match self
            .storage()
            .get_client(client_id, params.client_secret.as_deref())
            .await
        {
            Ok(Some(client)) => client,
            Ok(None) => {
                return HttpResponse::oauth_error(&OAuthError::invalid_client(
                    "Client authentication failed",
                ))
            }
            Err(err) => return HttpResponse::oauth_error(&err),
        };

        // Atomic consume: a second exchange of the same code, racing or
        // replayed, observes invalid_grant
        let code_record = match self.storage().take_authorization_code(code).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                return HttpResponse::oauth_error(&OAuthError::invalid_grant(
                    "Invalid authorization code",
                ))
            }
            Err(err) => return HttpResponse::oauth_error(&err),
        };

        if code_record.client.client_id != client.client_id {
            return HttpResponse::oauth_error(&OAuthError::invalid_grant(
                "Authorization code was issued to another client",
            ));
        }
        if code_record.redirect_uri != redirect_uri {
            return HttpResponse::oauth_error(&OAuthError::invalid_grant(
                "redirect_uri does not match the authorization request",
            ));
        }
        if code_record.expires_at <= Utc::now() {
            debug!(client_id, "expired authorization code presented");
            return HttpResponse::oauth_error(&OAuthError::invalid_grant(
                "Authorization code has expired",
            ));
        }

        if let Some(challenge) = code_record.code_challenge.as_deref() {
            let Some(verifier) = params.code_verifier.as_deref() else {
                return HttpResponse::oauth_error(&OAuthError::invalid_request(
                    "Missing required parameter: code_verifier",
                ));
            };
            if !verify_pkce(
                verifier,
                challenge,
                code_record.code_challenge_method.as_deref(),
            ) {
                return HttpResponse::oauth_error(&OAuthError::invalid_grant(
                    "PKCE verification failed",
                ));
            }
        }

        let token = match self
            .mint_token(
                code_record.scope.clone(),
                code_record.authorization_details.clone(),
                client,
                code_record.user,
            )
            .await
        {
            Ok(token) => token,
            Err(err) => return HttpResponse::oauth_error(&err),
        };
        self.token_success(&token)
    }

    async fn refresh_access_token(&self, params: &TokenRequest) -> HttpResponse {
        let missing: Vec<&str> = [
            ("refresh_token", params.refresh_token.as_deref()),
            ("client_id", params.client_id.as_deref()),
        ]
        .iter()
        .filter(|(_, v)| v.is_none())
        .map(|(name, _)| *name)
        .collect();
        if !missing.is_empty() {
            return HttpResponse::oauth_error(&OAuthError::invalid_request(format!(
                "Missing required parameters: {}",
                missing.join(", ")
            )));
        }
        let refresh_token = params.refresh_token.as_deref().unwrap_or_default();
        let client_id = params.client_id.as_deref().unwrap_or_default();

        // Refresh is confidential-only; public clients re-run the code flow
        let Some(client_secret) = params.client_secret.as_deref() else {
            return HttpResponse::oauth_error(&OAuthError::invalid_client(
                "Client authentication required",
            ));
        };

        let client = match self
            .storage()
            .get_client(client_id, Some(client_secret))
            .await
        {
            Ok(Some(client)) => client,
            Ok(None) => {
                return HttpResponse::oauth_error(&OAuthError::invalid_client(
                    "Client authentication failed",
                ))
            }
            Err(err) => return HttpResponse::oauth_error(&err),
        };

        let existing = match self.storage().get_refresh_token(refresh_token).await {
            Ok(Some(token)) => token,
            Ok(None) => {
                return HttpResponse::oauth_error(&OAuthError::invalid_grant(
                    "Invalid refresh token",
                ))
            }
            Err(err) => return HttpResponse::oauth_error(&err),
        };

        if existing.client.client_id != client.client_id {
            return HttpResponse::oauth_error(&OAuthError::invalid_grant(
                "Refresh token was issued to another client",
            ));
        }
        let expired = existing
            .refresh_token_expires_at
            .is_none_or(|at| at <= Utc::now());
        if expired {
            // Expired tokens are purged on detection so they cannot linger
            if let Err(err) = self.storage().revoke_token(refresh_token).await {
                return HttpResponse::oauth_error(&err);
            }
            return HttpResponse::oauth_error(&OAuthError::invalid_grant(
                "Refresh token has expired",
            ));
        }

        let granted_scope = match params.scope.as_deref().and_then(scope::normalize) {
            Some(requested) => {
                let original = existing.scope.as_deref().unwrap_or_default();
                if !scope::is_subset(&requested, original) {
                    return HttpResponse::oauth_error(&OAuthError::invalid_scope(
                        "Requested scope exceeds the originally granted scope",
                    ));
                }
                Some(requested)
            }
            None => existing.scope.clone(),
        };

        // Rotation: the presented refresh token dies with its record
        if let Err(err) = self.storage().revoke_token(refresh_token).await {
            return HttpResponse::oauth_error(&err);
        }

        let token = match self
            .mint_token(
                granted_scope,
                existing.authorization_details.clone(),
                client,
                existing.user,
            )
            .await
        {
            Ok(token) => token,
            Err(err) => return HttpResponse::oauth_error(&err),
        };
        self.token_success(&token)
    }

    async fn mint_token(
        &self,
        scope: Option<String>,
        authorization_details: Option<Vec<crate::models::AuthorizationDetails>>,
        client: crate::models::OAuthClient,
        user: crate::models::OAuthUser,
    ) -> Result<OAuthToken, OAuthError> {
        let now = Utc::now();
        let token = OAuthToken {
            access_token: crypto::random_hex(40)?,
            access_token_expires_at: now
                + Duration::seconds(self.config().access_token_lifetime),
            refresh_token: Some(crypto::random_hex(40)?),
            refresh_token_expires_at: Some(
                now + Duration::seconds(self.config().refresh_token_lifetime),
            ),
            scope,
            authorization_details,
            client,
            user,
        };
        self.storage().save_token(token).await
    }

    fn token_success(&self, token: &OAuthToken) -> HttpResponse {
        let body = TokenResponse {
            access_token: token.access_token.clone(),
            token_type: "Bearer".to_owned(),
            expires_in: self.config().access_token_lifetime,
            refresh_token: token.refresh_token.clone(),
            scope: token.scope.clone(),
        };
        match serde_json::to_value(&body) {
            Ok(value) => HttpResponse::json(200, value),
            Err(_) => HttpResponse::json(500, json!({ "error": "server_error" })),
        }
    }
}

/// RFC 7636 verification: `S256` hashes the verifier, `plain` compares it
/// directly, anything else fails. Comparisons are constant-time.
#[must_use]
pub fn verify_pkce(verifier: &str, stored_challenge: &str, method: Option<&str>) -> bool {
    match method.unwrap_or("plain") {
        "S256" => {
            let mut hasher = Sha256::new();
            hasher.update(verifier.as_bytes());
            let computed = general_purpose::URL_SAFE_NO_PAD.encode(hasher.finalize());
            bool::from(computed.as_bytes().ct_eq(stored_challenge.as_bytes()))
        }
        "plain" => bool::from(verifier.as_bytes().ct_eq(stored_challenge.as_bytes())),
        _ => false,
    }
}
