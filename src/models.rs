// ABOUTME: OAuth 2.0 data models for the authorization, token, and registration flows
// ABOUTME: Implements RFC 6749/7591/9396 request, response, and persistence structures
//
// SPDX-License-Identifier: MIT OR Apache-2.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Resource owner as the host application knows them.
///
/// `claims` carries whatever extra profile data the host wants attached to
/// issued grants; the engine passes it through untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthUser {
    /// Stable user identifier
    pub id: String,
    /// Additional host-defined claims
    #[serde(flatten)]
    pub claims: Map<String, Value>,
}

impl OAuthUser {
    /// User with an id and no extra claims
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            claims: Map::new(),
        }
    }
}

/// Registered OAuth client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthClient {
    /// Storage primary key
    pub id: String,
    /// Public client identifier
    pub client_id: String,
    /// Hashed client secret; `None` for public clients
    pub client_secret: Option<String>,
    /// `client_secret_basic`, `client_secret_post`, or `none`
    pub token_endpoint_auth_method: String,
    /// Display name
    pub name: String,
    /// Registered redirect URIs (exact-match at authorization time)
    pub redirect_uris: Vec<String>,
    /// Grant types the client may use
    pub grant_types: Vec<String>,
    /// Response types the client may use
    pub response_types: Vec<String>,
    /// Scopes the client registered for
    pub scope: Option<String>,
    /// When the client was registered
    pub created_at: DateTime<Utc>,
}

impl OAuthClient {
    /// Whether the client authenticates without a secret
    #[must_use]
    pub fn is_public(&self) -> bool {
        self.token_endpoint_auth_method == "none"
    }
}

/// Rich authorization request detail (RFC 9396), passed through opaquely
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthorizationDetails {
    /// Detail type identifier
    #[serde(rename = "type")]
    pub detail_type: String,
    /// Resource locations the detail applies to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locations: Option<Vec<String>>,
    /// Actions the client requests
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actions: Option<Vec<String>>,
    /// Data types the client requests access to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datatypes: Option<Vec<String>>,
    /// Specific resource identifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    /// Privileges the client requests
    #[serde(skip_serializing_if = "Option::is_none")]
    pub privileges: Option<Vec<String>>,
}

/// Single-use authorization code with the context captured at consent time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationCode {
    /// The code value handed to the client
    pub code: String,
    /// Expiry instant
    pub expires_at: DateTime<Utc>,
    /// Redirect URI the code was issued for (must match at exchange)
    pub redirect_uri: String,
    /// Granted scope, space-delimited
    pub scope: Option<String>,
    /// PKCE code challenge, when the client sent one
    pub code_challenge: Option<String>,
    /// PKCE challenge method (`S256` or `plain`)
    pub code_challenge_method: Option<String>,
    /// RFC 9396 details carried through to the token
    pub authorization_details: Option<Vec<AuthorizationDetails>>,
    /// Client the code was issued to
    pub client: OAuthClient,
    /// User who approved the request
    pub user: OAuthUser,
}

/// Issued token pair with its grant context
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthToken {
    /// Opaque access token
    pub access_token: String,
    /// Access token expiry
    pub access_token_expires_at: DateTime<Utc>,
    /// Opaque refresh token, when issued
    pub refresh_token: Option<String>,
    /// Refresh token expiry, when issued
    pub refresh_token_expires_at: Option<DateTime<Utc>>,
    /// Granted scope, space-delimited
    pub scope: Option<String>,
    /// RFC 9396 details carried from the authorization
    pub authorization_details: Option<Vec<AuthorizationDetails>>,
    /// Client the token belongs to
    pub client: OAuthClient,
    /// User the token acts for
    pub user: OAuthUser,
}

/// OAuth 2.0 authorization request captured from the query string.
///
/// This is the payload sealed inside the signed internal state between the
/// consent GET and the decision POST. The client's CSRF `state` is
/// deliberately not part of it; it travels as a plain form field so the
/// signed payload carries only the protocol parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizeRequest {
    /// Response type; only `code` is supported
    pub response_type: String,
    /// Client identifier
    pub client_id: String,
    /// Redirect URI, validated against the registration
    pub redirect_uri: String,
    /// Requested scope, space-delimited
    pub scope: Option<String>,
    /// PKCE code challenge (RFC 7636)
    pub code_challenge: Option<String>,
    /// PKCE challenge method (`S256` or `plain`)
    pub code_challenge_method: Option<String>,
    /// RFC 9396 authorization details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorization_details: Option<Vec<AuthorizationDetails>>,
}

/// OAuth 2.0 token request parameters
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenRequest {
    /// `authorization_code` or `refresh_token`
    pub grant_type: Option<String>,
    /// Authorization code (code grant)
    pub code: Option<String>,
    /// Redirect URI (code grant, must match issuance)
    pub redirect_uri: Option<String>,
    /// Client identifier
    pub client_id: Option<String>,
    /// Client secret, absent for public clients
    pub client_secret: Option<String>,
    /// Refresh token (refresh grant)
    pub refresh_token: Option<String>,
    /// Requested scope narrowing (refresh grant)
    pub scope: Option<String>,
    /// PKCE code verifier (code grant)
    pub code_verifier: Option<String>,
}

impl TokenRequest {
    /// Collect token parameters from a form or JSON body
    #[must_use]
    pub fn from_request(request: &crate::http::HttpRequest) -> Self {
        Self {
            grant_type: request.body_param("grant_type").map(str::to_owned),
            code: request.body_param("code").map(str::to_owned),
            redirect_uri: request.body_param("redirect_uri").map(str::to_owned),
            client_id: request.body_param("client_id").map(str::to_owned),
            client_secret: request.body_param("client_secret").map(str::to_owned),
            refresh_token: request.body_param("refresh_token").map(str::to_owned),
            scope: request.body_param("scope").map(str::to_owned),
            code_verifier: request.body_param("code_verifier").map(str::to_owned),
        }
    }
}

/// OAuth 2.0 token response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    /// Opaque access token
    pub access_token: String,
    /// Always `Bearer`
    pub token_type: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
    /// Refresh token, when issued
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Granted scope
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

/// Client registration request (RFC 7591)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientRegistrationRequest {
    /// Redirect URIs for the authorization code flow
    pub redirect_uris: Option<Vec<String>>,
    /// Requested authentication method; `none` registers a public client
    pub token_endpoint_auth_method: Option<String>,
    /// Grant types the client wants
    pub grant_types: Option<Vec<String>>,
    /// Response types the client wants
    pub response_types: Option<Vec<String>>,
    /// Display name
    pub client_name: Option<String>,
    /// Informational URI
    pub client_uri: Option<String>,
    /// Requested scopes, space-delimited
    pub scope: Option<String>,
}

/// Client registration response (RFC 7591).
///
/// `client_secret` is the plaintext, returned exactly once here; only the
/// hash is persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientRegistrationResponse {
    /// Issued client identifier
    pub client_id: String,
    /// Plaintext client secret; absent for public clients
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    /// Issuance time, epoch seconds
    pub client_id_issued_at: i64,
    /// `0` (never expires); absent when no secret was issued
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret_expires_at: Option<i64>,
    /// Registered redirect URIs
    pub redirect_uris: Vec<String>,
    /// Registered grant types
    pub grant_types: Vec<String>,
    /// Registered response types
    pub response_types: Vec<String>,
    /// Display name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,
    /// Registered scopes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// Authentication method the client was registered with
    pub token_endpoint_auth_method: String,
}
