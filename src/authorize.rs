// ABOUTME: Authorization endpoint: consent GET and decision POST handlers
// ABOUTME: Trusted values on POST come only from the verified internal state
//
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::config::ConsentContext;
use crate::crypto;
use crate::errors::{OAuthError, OAuthErrorCode};
use crate::http::{HttpRequest, HttpResponse};
use crate::models::{AuthorizationCode, AuthorizeRequest};
use crate::scope;
use crate::server::AuthorizationServer;
use chrono::{Duration, Utc};
use tracing::debug;
use url::Url;

impl AuthorizationServer {
    /// GET /authorize: authenticate the user, validate the request, and
    /// render the consent page with a signed internal state.
    ///
    /// Validation failures are direct 400 JSON responses; the only redirects
    /// this handler issues are to the sign-in page and, later, from the
    /// decision POST.
    pub async fn authorize_get(&self, request: &HttpRequest) -> HttpResponse {
        let Some(user) = self.host().authenticate_user(request).await else {
            debug!("unauthenticated authorize request, redirecting to sign-in");
            let sign_in = self.host().sign_in_url(request, &request.url);
            return HttpResponse::redirect(sign_in);
        };

        let requested_scope = request
            .query("scope")
            .and_then(scope::normalize)
            .unwrap_or_else(|| self.config().default_scope.clone());
        let invalid = scope::invalid_scopes(&requested_scope, &self.config().allowed_scopes);
        if !invalid.is_empty() {
            return HttpResponse::oauth_error(&OAuthError::invalid_scope(format!(
                "The following scopes are not allowed: {}",
                invalid.join(", ")
            )));
        }

        let authorization_details = match request.query("authorization_details") {
            Some(raw) => match serde_json::from_str(raw) {
                Ok(details) => Some(details),
                Err(_) => {
                    return HttpResponse::oauth_error(&OAuthError::invalid_request(
                        "authorization_details must be a valid JSON array",
                    ))
                }
            },
            None => None,
        };

        let missing: Vec<&str> = [
            ("client_id", request.query("client_id")),
            ("redirect_uri", request.query("redirect_uri")),
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
        let client_id = request.query("client_id").unwrap_or_default();
        let redirect_uri = request.query("redirect_uri").unwrap_or_default();

        let response_type = request.query("response_type").unwrap_or("code");
        if response_type != "code" {
            return HttpResponse::oauth_error(&OAuthError::invalid_request(
                "response_type must be 'code'",
            ));
        }

        let client = match self.storage().get_client(client_id, None).await {
            Ok(Some(client)) => client,
            // 400 rather than 401: nothing authenticated at the front
            // channel, the client_id is simply not registered
            Ok(None) => {
                return HttpResponse::json(
                    400,
                    OAuthError::invalid_client("Unknown client").to_body(),
                )
            }
            Err(err) => return storage_failure(&err),
        };

        if !client.redirect_uris.iter().any(|uri| uri == redirect_uri) {
            return HttpResponse::oauth_error(&OAuthError::invalid_request(
                "redirect_uri does not match any registered redirect URIs",
            ));
        }

        // The client's CSRF state rides the form as its own field; only the
        // protocol parameters get sealed into the signed payload
        let state = request.query("state").map(str::to_owned);

        let oauth_req_info = AuthorizeRequest {
            response_type: response_type.to_owned(),
            client_id: client_id.to_owned(),
            redirect_uri: redirect_uri.to_owned(),
            scope: Some(requested_scope),
            code_challenge: request.query("code_challenge").map(str::to_owned),
            code_challenge_method: request.query("code_challenge_method").map(str::to_owned),
            authorization_details,
        };

        let internal_state = match self.signer().sign(&oauth_req_info) {
            Ok(state) => state,
            Err(err) => return HttpResponse::oauth_error(&err),
        };

        let consent = ConsentContext {
            client,
            user,
            request: oauth_req_info,
            state,
            internal_state,
            form_action: self.config().endpoint_url("/authorize"),
        };
        if let Some(custom) = self.host().render_consent_page(request, &consent).await {
            return custom;
        }
        HttpResponse::html(200, render_consent_page(&consent))
    }

    /// POST /authorize: verify the internal state and act on the user's
    /// decision. All protocol parameters come from the verified state, never
    /// from the submitted form; only the client's CSRF `state` is read back
    /// from the form.
    pub async fn authorize_post(&self, request: &HttpRequest) -> HttpResponse {
        // The decision POST rides the same session as the consent GET
        let Some(user) = self.host().authenticate_user(request).await else {
            debug!("unauthenticated consent decision, redirecting to sign-in");
            let sign_in = self.host().sign_in_url(request, &request.url);
            return HttpResponse::redirect(sign_in);
        };

        let Some(internal_state) = request.form().and_then(|f| f.get("internal_state")) else {
            return HttpResponse::oauth_error(&OAuthError::invalid_request(
                "Missing required parameter: internal_state",
            ));
        };
        let state = request
            .form()
            .and_then(|f| f.get("state"))
            .map(str::to_owned);

        let oauth_req_info = match self.signer().verify(internal_state) {
            Ok(info) => info,
            Err(err) => return HttpResponse::oauth_error(&err),
        };
        let redirect_uri = oauth_req_info.redirect_uri.clone();

        let allowed = request.form().and_then(|f| f.get("allow")) == Some("true");
        if !allowed {
            return error_redirect(
                &redirect_uri,
                &OAuthError::access_denied("The user denied the authorization request"),
                state.as_deref(),
            );
        }

        let client = match self
            .storage()
            .get_client(&oauth_req_info.client_id, None)
            .await
        {
            Ok(Some(client)) => client,
            Ok(None) => {
                return error_redirect(
                    &redirect_uri,
                    &OAuthError::invalid_request("Unknown client"),
                    state.as_deref(),
                )
            }
            Err(err) => return self.authorize_storage_error(&redirect_uri, &err, state.as_deref()),
        };

        let code = match crypto::random_hex(32) {
            Ok(code) => code,
            Err(err) => return HttpResponse::oauth_error(&err),
        };
        let record = AuthorizationCode {
            code: code.clone(),
            expires_at: Utc::now()
                + Duration::seconds(self.config().authorization_code_lifetime),
            redirect_uri: redirect_uri.clone(),
            scope: oauth_req_info.scope.clone(),
            code_challenge: oauth_req_info.code_challenge.clone(),
            code_challenge_method: oauth_req_info.code_challenge_method.clone(),
            authorization_details: oauth_req_info.authorization_details.clone(),
            client,
            user,
        };

        if let Err(err) = self.storage().save_authorization_code(record).await {
            return self.authorize_storage_error(&redirect_uri, &err, state.as_deref());
        }

        success_redirect(&redirect_uri, &code, state.as_deref())
    }

    /// Recognized OAuth errors from the adapter redirect back to the client;
    /// server errors surface as 500 JSON so they are not laundered through
    /// the redirect URI.
    fn authorize_storage_error(
        &self,
        redirect_uri: &str,
        err: &OAuthError,
        state: Option<&str>,
    ) -> HttpResponse {
        if err.code == OAuthErrorCode::ServerError {
            storage_failure(err)
        } else {
            error_redirect(redirect_uri, err, state)
        }
    }
}

fn storage_failure(err: &OAuthError) -> HttpResponse {
    debug!(error = %err, "storage adapter failure");
    HttpResponse::oauth_error(&OAuthError::server_error(err.description.clone()))
}

fn success_redirect(redirect_uri: &str, code: &str, state: Option<&str>) -> HttpResponse {
    let Ok(mut url) = Url::parse(redirect_uri) else {
        return HttpResponse::oauth_error(&OAuthError::server_error(
            "Stored redirect URI is not a valid URL",
        ));
    };
    {
        let mut pairs = url.query_pairs_mut();
        pairs.append_pair("code", code);
        if let Some(state) = state {
            pairs.append_pair("state", state);
        }
    }
    HttpResponse::redirect(url.as_str())
}

fn error_redirect(redirect_uri: &str, err: &OAuthError, state: Option<&str>) -> HttpResponse {
    let Ok(mut url) = Url::parse(redirect_uri) else {
        return HttpResponse::oauth_error(err);
    };
    {
        let mut pairs = url.query_pairs_mut();
        pairs.append_pair("error", err.code.as_str());
        pairs.append_pair("error_description", &err.description);
        if let Some(state) = state {
            pairs.append_pair("state", state);
        }
    }
    HttpResponse::redirect(url.as_str())
}

/// Built-in consent page used when the host does not render its own.
///
/// Every interpolated value is HTML-escaped; the hidden fields mirror the
/// signed state so a host-rendered page can reproduce the same form.
fn render_consent_page(consent: &ConsentContext) -> String {
    let client_name = if consent.client.name.is_empty() {
        &consent.client.client_id
    } else {
        &consent.client.name
    };
    let client_name = html_escape::encode_text(client_name);
    let scope_list = consent
        .request
        .scope
        .as_deref()
        .unwrap_or_default()
        .split_whitespace()
        .map(|s| format!("<li>{}</li>", html_escape::encode_text(s)))
        .collect::<String>();

    let mut hidden_fields = String::new();
    let mut push_field = |name: &str, value: &str| {
        hidden_fields.push_str(&format!(
            "<input type=\"hidden\" name=\"{name}\" value=\"{}\">\n",
            html_escape::encode_double_quoted_attribute(value)
        ));
    };
    push_field("user_id", &consent.user.id);
    push_field("client_id", &consent.request.client_id);
    push_field("redirect_uri", &consent.request.redirect_uri);
    push_field("response_type", &consent.request.response_type);
    push_field("internal_state", &consent.internal_state);
    if let Some(state) = &consent.state {
        push_field("state", state);
    }
    if let Some(challenge) = &consent.request.code_challenge {
        push_field("code_challenge", challenge);
    }
    if let Some(method) = &consent.request.code_challenge_method {
        push_field("code_challenge_method", method);
    }

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Authorize {client_name}</title>
<style>
body {{ font-family: system-ui, sans-serif; max-width: 28rem; margin: 4rem auto; padding: 0 1rem; color: #1a1a1a; }}
ul {{ padding-left: 1.25rem; }}
button {{ padding: 0.5rem 1.5rem; border-radius: 6px; border: 1px solid #ccc; cursor: pointer; }}
button[value="true"] {{ background: #1a73e8; border-color: #1a73e8; color: #fff; }}
</style>
</head>
<body>
<h1>Authorize {client_name}</h1>
<p><strong>{client_name}</strong> is requesting access to your account with the following scopes:</p>
<ul>{scope_list}</ul>
<form method="post" action="{form_action}">
{hidden_fields}<button type="submit" name="allow" value="true">Allow</button>
<button type="submit" name="allow" value="false">Deny</button>
</form>
</body>
</html>
"#,
        form_action = html_escape::encode_double_quoted_attribute(&consent.form_action),
    )
}
