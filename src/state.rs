// ABOUTME: HMAC-signed internal state carrying the authorize request between GET and POST
// ABOUTME: Format is base64url(payload JSON) "." base64url(HMAC-SHA256 tag), 300s replay window
//
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::errors::OAuthError;
use crate::models::AuthorizeRequest;
use anyhow::{bail, Result};
use base64::{engine::general_purpose, Engine as _};
use chrono::Utc;
use ring::hmac;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// States older than this are rejected as replays
pub const STATE_REPLAY_WINDOW_SECS: i64 = 300;

/// Signed payload sealed into the consent form
#[derive(Debug, Clone, Serialize, Deserialize)]
struct InternalStatePayload {
    oauth_req_info: AuthorizeRequest,
    /// Issuance time, epoch milliseconds
    iat: i64,
}

/// Signs and verifies the internal state that makes the consent POST
/// tamper-evident.
///
/// Production deployments must configure a secret; without one the signer
/// refuses to construct. Development deployments may operate unsigned, and
/// every sign/verify logs a warning so the mode cannot go unnoticed.
pub struct InternalStateSigner {
    key: Option<hmac::Key>,
}

impl InternalStateSigner {
    /// Build a signer from the configured secret.
    ///
    /// # Errors
    /// Fails when `production` is set and no secret is configured.
    pub fn new(secret: Option<&[u8]>, production: bool) -> Result<Self> {
        match secret {
            Some(bytes) if !bytes.is_empty() => Ok(Self {
                key: Some(hmac::Key::new(hmac::HMAC_SHA256, bytes)),
            }),
            _ if production => {
                bail!("INTERNAL_STATE_SECRET must be configured in production")
            }
            _ => {
                warn!(
                    "internal state signing DISABLED - set INTERNAL_STATE_SECRET; \
                     consent forms are not tamper-protected in this mode"
                );
                Ok(Self { key: None })
            }
        }
    }

    /// Whether states are cryptographically signed
    #[must_use]
    pub const fn is_signed(&self) -> bool {
        self.key.is_some()
    }

    /// Seal an authorize request into a state string
    pub fn sign(&self, oauth_req_info: &AuthorizeRequest) -> Result<String, OAuthError> {
        let payload = InternalStatePayload {
            oauth_req_info: oauth_req_info.clone(),
            iat: Utc::now().timestamp_millis(),
        };
        let json = serde_json::to_vec(&payload)
            .map_err(|e| OAuthError::server_error(format!("Failed to encode state: {e}")))?;
        let encoded = general_purpose::URL_SAFE_NO_PAD.encode(json);

        match &self.key {
            Some(key) => {
                let tag = hmac::sign(key, encoded.as_bytes());
                let signature = general_purpose::URL_SAFE_NO_PAD.encode(tag.as_ref());
                Ok(format!("{encoded}.{signature}"))
            }
            None => {
                warn!("issuing UNSIGNED internal state");
                Ok(encoded)
            }
        }
    }

    /// Verify a state string and recover the trusted authorize request.
    ///
    /// Rejects bad signatures, malformed payloads, and states older than the
    /// replay window; every failure maps to `invalid_request`.
    pub fn verify(&self, state: &str) -> Result<AuthorizeRequest, OAuthError> {
        let (encoded, signature) = match state.split_once('.') {
            Some((payload, sig)) => (payload, Some(sig)),
            None => (state, None),
        };

        match &self.key {
            Some(key) => {
                let signature = signature.ok_or_else(|| {
                    OAuthError::invalid_request("Internal state is missing its signature")
                })?;
                let tag = general_purpose::URL_SAFE_NO_PAD
                    .decode(signature)
                    .map_err(|_| OAuthError::invalid_request("Internal state signature is malformed"))?;
                // ring performs the comparison in constant time
                hmac::verify(key, encoded.as_bytes(), &tag)
                    .map_err(|_| OAuthError::invalid_request("Internal state signature is invalid"))?;
            }
            None => warn!("accepting UNSIGNED internal state"),
        }

        let json = general_purpose::URL_SAFE_NO_PAD
            .decode(encoded)
            .map_err(|_| OAuthError::invalid_request("Internal state is malformed"))?;
        let payload: InternalStatePayload = serde_json::from_slice(&json)
            .map_err(|_| OAuthError::invalid_request("Internal state is malformed"))?;

        let age_ms = Utc::now().timestamp_millis() - payload.iat;
        if age_ms > STATE_REPLAY_WINDOW_SECS * 1000 {
            return Err(OAuthError::invalid_request("Internal state has expired"));
        }

        Ok(payload.oauth_req_info)
    }
}
