// ABOUTME: OAuth 2.0 error taxonomy shared by endpoints and storage adapters
// ABOUTME: Maps RFC 6749/7591 error codes to HTTP statuses and JSON bodies
//
// SPDX-License-Identifier: MIT OR Apache-2.0

use serde::{Serialize, Serializer};
use serde_json::{json, Value};
use std::fmt;
use thiserror::Error;

/// Recognized OAuth error codes (RFC 6749 §5.2, RFC 7591 §3.2.2).
///
/// Storage adapters return these too; anything a backend raises that does
/// not carry a recognized code is surfaced as `ServerError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OAuthErrorCode {
    /// Request is missing a parameter or is otherwise malformed
    InvalidRequest,
    /// Client authentication failed
    InvalidClient,
    /// Authorization code or refresh token is invalid, expired, or mismatched
    InvalidGrant,
    /// Requested scope is invalid or exceeds what was granted
    InvalidScope,
    /// Grant type is not supported by the token endpoint
    UnsupportedGrantType,
    /// Response type is not supported by the authorization endpoint
    UnsupportedResponseType,
    /// Resource owner or the server denied the request
    AccessDenied,
    /// Internal failure the client cannot correct
    ServerError,
    /// Endpoint exists but the deployment does not support it
    NotImplemented,
    /// Registration redirect URI failed validation (RFC 7591)
    InvalidRedirectUri,
    /// Registration metadata failed validation (RFC 7591)
    InvalidClientMetadata,
}

impl OAuthErrorCode {
    /// Wire name of the error code
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidRequest => "invalid_request",
            Self::InvalidClient => "invalid_client",
            Self::InvalidGrant => "invalid_grant",
            Self::InvalidScope => "invalid_scope",
            Self::UnsupportedGrantType => "unsupported_grant_type",
            Self::UnsupportedResponseType => "unsupported_response_type",
            Self::AccessDenied => "access_denied",
            Self::ServerError => "server_error",
            Self::NotImplemented => "not_implemented",
            Self::InvalidRedirectUri => "invalid_redirect_uri",
            Self::InvalidClientMetadata => "invalid_client_metadata",
        }
    }

    /// HTTP status the code maps to when returned as a direct response
    #[must_use]
    pub const fn http_status(self) -> u16 {
        match self {
            Self::InvalidRequest
            | Self::InvalidGrant
            | Self::InvalidScope
            | Self::UnsupportedGrantType
            | Self::UnsupportedResponseType
            | Self::InvalidRedirectUri
            | Self::InvalidClientMetadata => 400,
            Self::InvalidClient => 401,
            Self::AccessDenied => 403,
            Self::ServerError => 500,
            Self::NotImplemented => 501,
        }
    }

    /// Specification section describing the error
    #[must_use]
    pub const fn error_uri(self) -> &'static str {
        match self {
            Self::InvalidRequest
            | Self::InvalidScope
            | Self::UnsupportedResponseType
            | Self::AccessDenied
            | Self::ServerError => {
                "https://datatracker.ietf.org/doc/html/rfc6749#section-4.1.2.1"
            }
            Self::InvalidClient
            | Self::InvalidGrant
            | Self::UnsupportedGrantType
            | Self::NotImplemented => "https://datatracker.ietf.org/doc/html/rfc6749#section-5.2",
            Self::InvalidRedirectUri | Self::InvalidClientMetadata => {
                "https://datatracker.ietf.org/doc/html/rfc7591#section-3.2.2"
            }
        }
    }
}

impl fmt::Display for OAuthErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for OAuthErrorCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// OAuth protocol error with a recognized code and human-readable description
#[derive(Debug, Clone, Error, Serialize)]
#[error("{code}: {description}")]
pub struct OAuthError {
    /// Recognized error code
    #[serde(rename = "error")]
    pub code: OAuthErrorCode,
    /// Human-readable description for the client developer
    #[serde(rename = "error_description")]
    pub description: String,
}

impl OAuthError {
    /// Create an error with an arbitrary recognized code
    #[must_use]
    pub fn new(code: OAuthErrorCode, description: impl Into<String>) -> Self {
        Self {
            code,
            description: description.into(),
        }
    }

    /// Create an `invalid_request` error
    #[must_use]
    pub fn invalid_request(description: impl Into<String>) -> Self {
        Self::new(OAuthErrorCode::InvalidRequest, description)
    }

    /// Create an `invalid_client` error
    #[must_use]
    pub fn invalid_client(description: impl Into<String>) -> Self {
        Self::new(OAuthErrorCode::InvalidClient, description)
    }

    /// Create an `invalid_grant` error
    #[must_use]
    pub fn invalid_grant(description: impl Into<String>) -> Self {
        Self::new(OAuthErrorCode::InvalidGrant, description)
    }

    /// Create an `invalid_scope` error
    #[must_use]
    pub fn invalid_scope(description: impl Into<String>) -> Self {
        Self::new(OAuthErrorCode::InvalidScope, description)
    }

    /// Create an `unsupported_grant_type` error
    #[must_use]
    pub fn unsupported_grant_type(description: impl Into<String>) -> Self {
        Self::new(OAuthErrorCode::UnsupportedGrantType, description)
    }

    /// Create an `unsupported_response_type` error
    #[must_use]
    pub fn unsupported_response_type(description: impl Into<String>) -> Self {
        Self::new(OAuthErrorCode::UnsupportedResponseType, description)
    }

    /// Create an `access_denied` error
    #[must_use]
    pub fn access_denied(description: impl Into<String>) -> Self {
        Self::new(OAuthErrorCode::AccessDenied, description)
    }

    /// Create a `server_error` error
    #[must_use]
    pub fn server_error(description: impl Into<String>) -> Self {
        Self::new(OAuthErrorCode::ServerError, description)
    }

    /// Create a `not_implemented` error
    #[must_use]
    pub fn not_implemented(description: impl Into<String>) -> Self {
        Self::new(OAuthErrorCode::NotImplemented, description)
    }

    /// Create an `invalid_redirect_uri` error (RFC 7591)
    #[must_use]
    pub fn invalid_redirect_uri(description: impl Into<String>) -> Self {
        Self::new(OAuthErrorCode::InvalidRedirectUri, description)
    }

    /// Create an `invalid_client_metadata` error (RFC 7591)
    #[must_use]
    pub fn invalid_client_metadata(description: impl Into<String>) -> Self {
        Self::new(OAuthErrorCode::InvalidClientMetadata, description)
    }

    /// JSON body for an error response
    #[must_use]
    pub fn to_body(&self) -> Value {
        json!({
            "error": self.code.as_str(),
            "error_description": self.description,
            "error_uri": self.code.error_uri(),
        })
    }
}
