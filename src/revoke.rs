// ABOUTME: RFC 7009 token revocation endpoint
// ABOUTME: Authenticated requests always get 200 whether or not the token existed
//
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::errors::{OAuthError, OAuthErrorCode};
use crate::http::{HttpRequest, HttpResponse};
use crate::server::AuthorizationServer;
use base64::{engine::general_purpose, Engine as _};
use tracing::debug;

impl AuthorizationServer {
    /// POST /revoke: revoke an access or refresh token (RFC 7009).
    ///
    /// Unknown tokens are not an error; revealing whether a token existed
    /// would leak token state to a client that only guessed it.
    pub async fn revoke(&self, request: &HttpRequest) -> HttpResponse {
        let mut response = self.revoke_inner(request).await;
        response
            .headers
            .insert("cache-control".to_owned(), "no-store".to_owned());
        response
            .headers
            .insert("pragma".to_owned(), "no-cache".to_owned());
        self.cors().apply(&mut response, request, "POST, OPTIONS");
        response
    }

    async fn revoke_inner(&self, request: &HttpRequest) -> HttpResponse {
        let Some((client_id, client_secret)) = client_credentials(request) else {
            return unauthorized("Client authentication required");
        };

        match self
            .storage()
            .get_client(&client_id, client_secret.as_deref())
            .await
        {
            Ok(Some(_)) => {}
            Ok(None) => return unauthorized("Client authentication failed"),
            Err(err) => return HttpResponse::oauth_error(&err),
        }

        let Some(token) = request.body_param("token") else {
            return HttpResponse::oauth_error(&OAuthError::invalid_request(
                "Missing required parameter: token",
            ));
        };

        match self.storage().revoke_token(token).await {
            Ok(revoked) => {
                debug!(client_id, revoked, "token revocation processed");
                HttpResponse::empty_ok()
            }
            Err(err) if err.code == OAuthErrorCode::ServerError => {
                HttpResponse::oauth_error(&err)
            }
            // Adapter-level protocol errors still must not leak token state
            Err(_) => HttpResponse::empty_ok(),
        }
    }
}

/// Credentials from the `Authorization: Basic` header, falling back to body
/// parameters (RFC 6749 §2.3.1 permits both)
fn client_credentials(request: &HttpRequest) -> Option<(String, Option<String>)> {
    if let Some(header) = request.header("authorization") {
        if let Some(encoded) = header.strip_prefix("Basic ") {
            let decoded = general_purpose::STANDARD.decode(encoded.trim()).ok()?;
            let decoded = String::from_utf8(decoded).ok()?;
            let (id, secret) = decoded.split_once(':')?;
            if id.is_empty() {
                return None;
            }
            let secret = if secret.is_empty() {
                None
            } else {
                Some(secret.to_owned())
            };
            return Some((id.to_owned(), secret));
        }
    }

    let client_id = request.body_param("client_id")?;
    let client_secret = request.body_param("client_secret").map(str::to_owned);
    Some((client_id.to_owned(), client_secret))
}

fn unauthorized(description: &str) -> HttpResponse {
    HttpResponse::oauth_error(&OAuthError::invalid_client(description)).with_header(
        "www-authenticate",
        "Basic realm=\"OAuth2 Token Revocation\"",
    )
}
