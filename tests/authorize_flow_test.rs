// ABOUTME: Authorization endpoint tests: validation, consent rendering, and decisions
// ABOUTME: Covers open-redirect protections and internal-state tamper handling
//
// SPDX-License-Identifier: MIT OR Apache-2.0

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use common::{
    approve_consent, authorize_url, hidden_field, seed_public_client, test_server,
    test_server_unauthenticated, urlencode, ISSUER, REDIRECT_URI,
};
use mcpauth::{FormData, HttpRequest};

#[tokio::test]
async fn missing_parameters_are_rejected_without_redirect() {
    let harness = test_server();
    let response = harness
        .server
        .handle(&HttpRequest::get(&format!("{ISSUER}/api/oauth/authorize")))
        .await;
    assert_eq!(response.status, 400);
    let body = response.body_json().unwrap();
    assert_eq!(body["error"], "invalid_request");
    assert!(body["error_description"]
        .as_str()
        .unwrap()
        .contains("client_id"));
}

#[tokio::test]
async fn unknown_client_is_rejected_without_redirect() {
    let harness = test_server();
    let response = harness
        .server
        .handle(&HttpRequest::get(&authorize_url("ghost-client", "")))
        .await;
    assert_eq!(response.status, 400);
    assert_eq!(response.body_json().unwrap()["error"], "invalid_client");
    assert!(response.redirect.is_none());
}

#[tokio::test]
async fn unregistered_redirect_uri_never_redirects() {
    let harness = test_server();
    seed_public_client(&harness.storage, "client-1").await;
    let url = format!(
        "{ISSUER}/api/oauth/authorize?client_id=client-1&redirect_uri={}&response_type=code",
        urlencode("https://evil.example.com/cb")
    );
    let response = harness.server.handle(&HttpRequest::get(&url)).await;
    assert_eq!(response.status, 400);
    assert!(response.redirect.is_none());
    assert_eq!(response.body_json().unwrap()["error"], "invalid_request");
}

#[tokio::test]
async fn unsupported_response_type_is_rejected_without_redirect() {
    let harness = test_server();
    seed_public_client(&harness.storage, "client-1").await;
    let url = format!(
        "{ISSUER}/api/oauth/authorize?client_id=client-1&redirect_uri={}&response_type=token&state=csrf",
        urlencode(REDIRECT_URI)
    );
    let response = harness.server.handle(&HttpRequest::get(&url)).await;
    assert_eq!(response.status, 400);
    assert!(response.redirect.is_none());
    let body = response.body_json().unwrap();
    assert_eq!(body["error"], "invalid_request");
    assert!(body["error_description"]
        .as_str()
        .unwrap()
        .contains("response_type"));
}

#[tokio::test]
async fn disallowed_scope_is_rejected_without_redirect() {
    let harness = test_server();
    seed_public_client(&harness.storage, "client-1").await;
    let response = harness
        .server
        .handle(&HttpRequest::get(&authorize_url(
            "client-1",
            "&scope=openid%20admin",
        )))
        .await;
    assert_eq!(response.status, 400);
    assert!(response.redirect.is_none());
    let body = response.body_json().unwrap();
    assert_eq!(body["error"], "invalid_scope");
    assert!(body["error_description"].as_str().unwrap().contains("admin"));
}

#[tokio::test]
async fn authentication_runs_before_any_validation() {
    // A signed-out user with a bad scope still lands on the sign-in page
    let harness = test_server_unauthenticated();
    seed_public_client(&harness.storage, "client-1").await;
    let response = harness
        .server
        .handle(&HttpRequest::get(&authorize_url(
            "client-1",
            "&scope=openid%20admin",
        )))
        .await;
    assert_eq!(response.status, 302);
    assert!(response
        .redirect
        .unwrap()
        .starts_with(&format!("{ISSUER}/sign-in?next=")));
}

#[tokio::test]
async fn unauthenticated_user_is_sent_to_sign_in() {
    let harness = test_server_unauthenticated();
    seed_public_client(&harness.storage, "client-1").await;
    let response = harness
        .server
        .handle(&HttpRequest::get(&authorize_url("client-1", "")))
        .await;
    assert_eq!(response.status, 302);
    let location = response.redirect.unwrap();
    assert!(location.starts_with(&format!("{ISSUER}/sign-in?next=")));
    assert!(location.contains("/api/oauth/authorize"));
}

#[tokio::test]
async fn consent_page_embeds_the_request_as_hidden_fields() {
    let harness = test_server();
    seed_public_client(&harness.storage, "client-1").await;
    let response = harness
        .server
        .handle(&HttpRequest::get(&authorize_url(
            "client-1",
            "&state=csrf&code_challenge=abc&code_challenge_method=S256",
        )))
        .await;
    assert_eq!(response.status, 200);
    let html = response.body_html().unwrap();
    assert_eq!(hidden_field(html, "client_id").unwrap(), "client-1");
    assert_eq!(hidden_field(html, "redirect_uri").unwrap(), REDIRECT_URI);
    assert_eq!(hidden_field(html, "state").unwrap(), "csrf");
    assert_eq!(hidden_field(html, "code_challenge").unwrap(), "abc");
    assert_eq!(hidden_field(html, "code_challenge_method").unwrap(), "S256");
    assert_eq!(hidden_field(html, "user_id").unwrap(), "user-1");
    assert!(hidden_field(html, "internal_state").is_some());
    // No scope requested: the default applies
    assert!(html.contains("<li>openid</li>"));
    assert!(html.contains("<li>email</li>"));
    // Decision buttons submit the allow field
    assert!(html.contains(r#"name="allow" value="true""#));
    assert!(html.contains(r#"name="allow" value="false""#));
}

#[tokio::test]
async fn post_without_internal_state_is_invalid_request() {
    let harness = test_server();
    let form = FormData::from_pairs([("allow", "true")]);
    let response = harness
        .server
        .handle(&HttpRequest::post(&format!("{ISSUER}/api/oauth/authorize")).with_form(form))
        .await;
    assert_eq!(response.status, 400);
    let body = response.body_json().unwrap();
    assert_eq!(body["error"], "invalid_request");
    assert!(body["error_description"]
        .as_str()
        .unwrap()
        .contains("internal_state"));
}

#[tokio::test]
async fn post_with_tampered_state_is_invalid_request() {
    let harness = test_server();
    seed_public_client(&harness.storage, "client-1").await;
    let consent = harness
        .server
        .handle(&HttpRequest::get(&authorize_url("client-1", "")))
        .await;
    let internal_state = hidden_field(consent.body_html().unwrap(), "internal_state").unwrap();
    let (payload, _sig) = internal_state.split_once('.').unwrap();
    let tampered = format!("{payload}.AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA");

    let response = approve_consent(&harness, &tampered).await;
    assert_eq!(response.status, 400);
    assert_eq!(response.body_json().unwrap()["error"], "invalid_request");
}

#[tokio::test]
async fn unauthenticated_post_is_sent_to_sign_in() {
    let harness = test_server_unauthenticated();
    let form = FormData::from_pairs([("allow", "true"), ("internal_state", "whatever")]);
    let response = harness
        .server
        .handle(&HttpRequest::post(&format!("{ISSUER}/api/oauth/authorize")).with_form(form))
        .await;
    assert_eq!(response.status, 302);
    assert!(response
        .redirect
        .unwrap()
        .starts_with(&format!("{ISSUER}/sign-in?next=")));
}

#[tokio::test]
async fn deny_decision_redirects_with_access_denied() {
    let harness = test_server();
    seed_public_client(&harness.storage, "client-1").await;
    let consent = harness
        .server
        .handle(&HttpRequest::get(&authorize_url("client-1", "&state=csrf")))
        .await;
    let html = consent.body_html().unwrap();
    let internal_state = hidden_field(html, "internal_state").unwrap();
    let state = hidden_field(html, "state").unwrap();

    let form = FormData::from_pairs([
        ("allow", "false"),
        ("internal_state", &internal_state),
        ("state", &state),
    ]);
    let response = harness
        .server
        .handle(&HttpRequest::post(&format!("{ISSUER}/api/oauth/authorize")).with_form(form))
        .await;
    assert_eq!(response.status, 302);
    let location = response.redirect.unwrap();
    assert!(location.starts_with(REDIRECT_URI));
    assert!(location.contains("error=access_denied"));
    assert!(location.contains("state=csrf"));
}

#[tokio::test]
async fn decision_without_allow_field_is_a_denial() {
    let harness = test_server();
    seed_public_client(&harness.storage, "client-1").await;
    let consent = harness
        .server
        .handle(&HttpRequest::get(&authorize_url("client-1", "")))
        .await;
    let internal_state = hidden_field(consent.body_html().unwrap(), "internal_state").unwrap();

    let form = FormData::from_pairs([("action", "approve"), ("internal_state", &internal_state)]);
    let response = harness
        .server
        .handle(&HttpRequest::post(&format!("{ISSUER}/api/oauth/authorize")).with_form(form))
        .await;
    assert_eq!(response.status, 302);
    let location = response.redirect.unwrap();
    assert!(location.starts_with(REDIRECT_URI));
    assert!(location.contains("error=access_denied"));
}

#[tokio::test]
async fn approval_issues_a_code_bound_to_the_request() {
    let harness = test_server();
    seed_public_client(&harness.storage, "client-1").await;
    let consent = harness
        .server
        .handle(&HttpRequest::get(&authorize_url(
            "client-1",
            "&state=csrf&scope=openid%20profile&code_challenge=abc&code_challenge_method=S256",
        )))
        .await;
    let html = consent.body_html().unwrap();
    let internal_state = hidden_field(html, "internal_state").unwrap();
    let state = hidden_field(html, "state").unwrap();

    let form = FormData::from_pairs([
        ("allow", "true"),
        ("internal_state", &internal_state),
        ("state", &state),
    ]);
    let response = harness
        .server
        .handle(&HttpRequest::post(&format!("{ISSUER}/api/oauth/authorize")).with_form(form))
        .await;
    assert_eq!(response.status, 302);
    let location = response.redirect.clone().unwrap();
    assert!(location.contains("state=csrf"));
    let code = common::code_from_redirect(&response);
    assert_eq!(code.len(), 64);

    use mcpauth::StorageAdapter;
    let stored = harness
        .storage
        .get_authorization_code(&code)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.client.client_id, "client-1");
    assert_eq!(stored.user.id, "user-1");
    assert_eq!(stored.scope.as_deref(), Some("openid profile"));
    assert_eq!(stored.code_challenge.as_deref(), Some("abc"));
    assert_eq!(stored.code_challenge_method.as_deref(), Some("S256"));
    assert_eq!(stored.redirect_uri, REDIRECT_URI);
}

#[tokio::test]
async fn form_parameters_cannot_override_the_signed_request() {
    let harness = test_server();
    seed_public_client(&harness.storage, "client-1").await;
    let consent = harness
        .server
        .handle(&HttpRequest::get(&authorize_url("client-1", "")))
        .await;
    let internal_state = hidden_field(consent.body_html().unwrap(), "internal_state").unwrap();

    // Attacker-controlled form fields try to redirect the code elsewhere
    let form = FormData::from_pairs([
        ("allow", "true"),
        ("internal_state", internal_state.as_str()),
        ("redirect_uri", "https://evil.example.com/cb"),
        ("client_id", "other-client"),
    ]);
    let response = harness
        .server
        .handle(&HttpRequest::post(&format!("{ISSUER}/api/oauth/authorize")).with_form(form))
        .await;
    assert_eq!(response.status, 302);
    assert!(response.redirect.unwrap().starts_with(REDIRECT_URI));
}
