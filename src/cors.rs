// ABOUTME: CORS allow-list policy applied to browser-facing OAuth endpoints
// ABOUTME: Unlisted origins fall back to the first configured origin, never echo
//
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::http::{HttpRequest, HttpResponse};

/// Header values allowed on cross-origin requests to the engine's endpoints
const ALLOWED_REQUEST_HEADERS: &str = "Content-Type, Authorization, mcp-protocol-version";

/// Allow-list CORS policy.
///
/// Built from the `OAUTH_ALLOWED_ORIGIN` configuration: `None` disables CORS
/// entirely, `*` emits the literal wildcard, and a list echoes listed
/// origins while unlisted or absent origins resolve to the first configured
/// entry.
#[derive(Debug, Clone, Default)]
pub struct CorsPolicy {
    allowed_origins: Option<Vec<String>>,
}

impl CorsPolicy {
    /// Policy from the configured origin list
    #[must_use]
    pub const fn new(allowed_origins: Option<Vec<String>>) -> Self {
        Self { allowed_origins }
    }

    /// Origin value to emit for a request, or `None` when CORS is disabled
    #[must_use]
    pub fn resolve_origin(&self, request_origin: Option<&str>) -> Option<String> {
        let allowed = self.allowed_origins.as_ref()?;
        if allowed.iter().any(|o| o == "*") {
            return Some("*".to_owned());
        }
        match request_origin {
            Some(origin) if allowed.iter().any(|o| o == origin) => Some(origin.to_owned()),
            _ => allowed.first().cloned(),
        }
    }

    /// Attach CORS headers for the given allowed methods
    pub fn apply(&self, response: &mut HttpResponse, request: &HttpRequest, methods: &str) {
        let Some(origin) = self.resolve_origin(request.header("origin")) else {
            return;
        };
        response
            .headers
            .insert("access-control-allow-origin".to_owned(), origin);
        response
            .headers
            .insert("access-control-allow-methods".to_owned(), methods.to_owned());
        response.headers.insert(
            "access-control-allow-headers".to_owned(),
            ALLOWED_REQUEST_HEADERS.to_owned(),
        );
        response.headers.insert(
            "access-control-allow-credentials".to_owned(),
            "true".to_owned(),
        );
        response
            .headers
            .insert("access-control-max-age".to_owned(), "86400".to_owned());
        response
            .headers
            .insert("vary".to_owned(), "Origin".to_owned());
    }

    /// 204 preflight response
    #[must_use]
    pub fn preflight(&self, request: &HttpRequest) -> HttpResponse {
        let mut response = HttpResponse::no_content();
        self.apply(&mut response, request, "GET, POST, OPTIONS");
        response
    }
}
