// ABOUTME: Discovery documents (RFC 8414, RFC 9728) and the JWKS endpoint
// ABOUTME: The JWK kid is the RFC 7638 SHA-256 thumbprint of the public key
//
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::errors::OAuthError;
use crate::http::{HttpRequest, HttpResponse};
use crate::server::AuthorizationServer;
use base64::{engine::general_purpose, Engine as _};
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::{Digest, Sha256};

/// RSA public key in JWK form (RFC 7517)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonWebKey {
    /// Key type, always `RSA`
    pub kty: String,
    /// Intended use, always `sig`
    #[serde(rename = "use")]
    pub key_use: String,
    /// Key identifier (RFC 7638 thumbprint)
    pub kid: String,
    /// Signing algorithm, always `RS256`
    pub alg: String,
    /// Modulus, base64url without padding
    pub n: String,
    /// Exponent, base64url without padding
    pub e: String,
}

/// JWK set document (RFC 7517)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonWebKeySet {
    /// Published keys
    pub keys: Vec<JsonWebKey>,
}

impl AuthorizationServer {
    /// GET /.well-known/oauth-authorization-server (RFC 8414)
    #[must_use]
    pub fn authorization_server_metadata(&self, request: &HttpRequest) -> HttpResponse {
        let config = self.config();
        let issuer = config.issuer_url.trim_end_matches('/');
        let mut metadata = json!({
            "issuer": issuer,
            "authorization_endpoint": config.endpoint_url("/authorize"),
            "token_endpoint": config.endpoint_url("/token"),
            "revocation_endpoint": config.endpoint_url("/revoke"),
            "jwks_uri": format!("{issuer}/.well-known/jwks.json"),
            "response_types_supported": ["code"],
            "grant_types_supported": ["authorization_code", "refresh_token"],
            // The token endpoint also accepts `plain`, but only S256 is
            // advertised to steer clients to it
            "code_challenge_methods_supported": ["S256"],
            "token_endpoint_auth_methods_supported": [
                "client_secret_basic",
                "client_secret_post",
                "none",
            ],
            "scopes_supported": config.allowed_scopes,
        });
        if config.registration_enabled {
            metadata["registration_endpoint"] = json!(config.endpoint_url("/register"));
        }
        self.cacheable(request, HttpResponse::json(200, metadata))
    }

    /// GET /.well-known/oauth-protected-resource (RFC 9728)
    #[must_use]
    pub fn protected_resource_metadata(&self, request: &HttpRequest) -> HttpResponse {
        let config = self.config();
        let issuer = config.issuer_url.trim_end_matches('/');
        let metadata = json!({
            "resource": issuer,
            "authorization_servers": [issuer],
            "jwks_uri": format!("{issuer}/.well-known/jwks.json"),
            "scopes_supported": config.allowed_scopes,
            "bearer_methods_supported": ["header"],
        });
        self.cacheable(request, HttpResponse::json(200, metadata))
    }

    /// GET /.well-known/jwks.json.
    ///
    /// Publishes the RSA public key derived from the configured private key;
    /// this is the one discovery document that can fail, with a 500 when no
    /// key is configured.
    #[must_use]
    pub fn jwks(&self, request: &HttpRequest) -> HttpResponse {
        let Some(pem) = self.config().jwks_private_key_pem.as_deref() else {
            return HttpResponse::oauth_error(&OAuthError::server_error(
                "JWKS private key is not configured",
            ));
        };
        let jwk = match public_jwk_from_pem(pem) {
            Ok(jwk) => jwk,
            Err(err) => return HttpResponse::oauth_error(&err),
        };
        let body = match serde_json::to_value(&JsonWebKeySet { keys: vec![jwk] }) {
            Ok(value) => value,
            Err(e) => {
                return HttpResponse::oauth_error(&OAuthError::server_error(format!(
                    "Failed to encode JWKS: {e}"
                )))
            }
        };
        self.cacheable(request, HttpResponse::json(200, body))
    }

    fn cacheable(&self, request: &HttpRequest, mut response: HttpResponse) -> HttpResponse {
        response
            .headers
            .insert("cache-control".to_owned(), "public, max-age=3600".to_owned());
        self.cors().apply(&mut response, request, "GET, OPTIONS");
        response
    }
}

/// Build the public JWK from an RSA private key PEM (PKCS#8 or PKCS#1)
pub fn public_jwk_from_pem(pem: &str) -> Result<JsonWebKey, OAuthError> {
    let private_key = RsaPrivateKey::from_pkcs8_pem(pem)
        .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
        .map_err(|e| OAuthError::server_error(format!("Failed to parse RSA private key: {e}")))?;
    let public_key = RsaPublicKey::from(&private_key);

    let n = general_purpose::URL_SAFE_NO_PAD.encode(public_key.n().to_bytes_be());
    let e = general_purpose::URL_SAFE_NO_PAD.encode(public_key.e().to_bytes_be());

    // RFC 7638: thumbprint over the required members in lexicographic order
    let canonical = format!(r#"{{"e":"{e}","kty":"RSA","n":"{n}"}}"#);
    let kid = general_purpose::URL_SAFE_NO_PAD.encode(Sha256::digest(canonical.as_bytes()));

    Ok(JsonWebKey {
        kty: "RSA".to_owned(),
        key_use: "sig".to_owned(),
        kid,
        alg: "RS256".to_owned(),
        n,
        e,
    })
}
