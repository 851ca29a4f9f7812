// ABOUTME: Bearer-token authentication for protected resource handlers
// ABOUTME: Returns None on every failure; the host decides how to answer
//
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::http::HttpRequest;
use crate::models::OAuthToken;
use crate::server::AuthorizationServer;
use chrono::Utc;
use tracing::debug;

impl AuthorizationServer {
    /// Authenticate a resource request via its `Authorization: Bearer`
    /// header.
    ///
    /// When `required_scopes` is given, every entry must be present in the
    /// token's granted scopes. Missing or malformed headers, unknown tokens,
    /// expired access tokens, and insufficient scope all yield `None` rather
    /// than an HTTP error; the host owns the 401/403 policy for its
    /// resources.
    pub async fn authenticate_resource(
        &self,
        request: &HttpRequest,
        required_scopes: Option<&[String]>,
    ) -> Option<OAuthToken> {
        let header = request.header("authorization")?;
        let token = bearer_token(header)?;

        let record = match self.storage().get_access_token(token).await {
            Ok(Some(record)) => {
                if record.access_token_expires_at <= Utc::now() {
                    debug!("expired access token presented");
                    return None;
                }
                record
            }
            Ok(None) => {
                debug!("unknown access token presented");
                return None;
            }
            Err(err) => {
                debug!(error = %err, "storage failure during bearer authentication");
                return None;
            }
        };

        if let Some(required) = required_scopes {
            if !has_all_scopes(record.scope.as_deref(), required) {
                debug!("access token lacks a required scope");
                return None;
            }
        }
        Some(record)
    }
}

fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

fn has_all_scopes(granted: Option<&str>, required: &[String]) -> bool {
    let granted: std::collections::HashSet<&str> =
        granted.unwrap_or_default().split_whitespace().collect();
    required.iter().all(|s| granted.contains(s.as_str()))
}
