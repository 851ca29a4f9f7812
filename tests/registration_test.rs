// ABOUTME: RFC 7591 dynamic client registration endpoint tests
// ABOUTME: Covers metadata validation, credential issuance, and secret hashing
//
// SPDX-License-Identifier: MIT OR Apache-2.0

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use common::{test_server, test_server_with, ISSUER};
use mcpauth::{FormData, HttpRequest, HttpResponse, StorageAdapter};
use serde_json::{json, Value};

async fn post_register(harness: &common::TestServer, body: Value) -> HttpResponse {
    harness
        .server
        .handle(&HttpRequest::post(&format!("{ISSUER}/api/oauth/register")).with_json(body))
        .await
}

#[tokio::test]
async fn disabled_registration_is_501() {
    let harness = test_server_with(|config| config.registration_enabled = false);
    let response = post_register(
        &harness,
        json!({ "redirect_uris": ["https://app.example.com/cb"] }),
    )
    .await;
    assert_eq!(response.status, 501);
    assert_eq!(response.body_json().unwrap()["error"], "not_implemented");
}

#[tokio::test]
async fn non_json_body_is_rejected() {
    let harness = test_server();
    let form = FormData::from_pairs([("redirect_uris", "https://app.example.com/cb")]);
    let response = harness
        .server
        .handle(&HttpRequest::post(&format!("{ISSUER}/api/oauth/register")).with_form(form))
        .await;
    assert_eq!(response.status, 400);
    assert_eq!(response.body_json().unwrap()["error"], "invalid_request");
}

#[tokio::test]
async fn confidential_registration_returns_credentials_once() {
    let harness = test_server();
    let response = post_register(
        &harness,
        json!({
            "client_name": "My App",
            "redirect_uris": ["https://app.example.com/cb"],
            "grant_types": ["authorization_code", "refresh_token"],
            "scope": "openid profile",
        }),
    )
    .await;
    assert_eq!(response.status, 201);
    let body = response.body_json().unwrap();

    let client_id = body["client_id"].as_str().unwrap();
    let secret = body["client_secret"].as_str().unwrap();
    assert_eq!(client_id.len(), 32);
    assert_eq!(secret.len(), 64);
    assert_eq!(body["client_secret_expires_at"], 0);
    assert_eq!(body["token_endpoint_auth_method"], "client_secret_basic");
    assert_eq!(body["client_name"], "My App");
    assert_eq!(body["scope"], "openid profile");
    assert!(body["client_id_issued_at"].as_i64().unwrap() > 0);

    // Only the hash reaches storage, and it verifies against the secret
    let stored = harness
        .storage
        .get_client(client_id, Some(secret))
        .await
        .unwrap()
        .unwrap();
    let hash = stored.client_secret.unwrap();
    assert_ne!(hash, secret);
    assert!(hash.starts_with("$argon2"));
}

#[tokio::test]
async fn public_client_registration_has_no_secret() {
    let harness = test_server();
    let response = post_register(
        &harness,
        json!({
            "redirect_uris": ["http://localhost:3000/cb"],
            "token_endpoint_auth_method": "none",
        }),
    )
    .await;
    assert_eq!(response.status, 201);
    let body = response.body_json().unwrap();
    assert!(body.get("client_secret").is_none() || body["client_secret"].is_null());
    assert!(
        body.get("client_secret_expires_at").is_none()
            || body["client_secret_expires_at"].is_null()
    );
    assert_eq!(body["token_endpoint_auth_method"], "none");
}

#[tokio::test]
async fn registration_requires_redirect_uris() {
    let harness = test_server();
    let response = post_register(&harness, json!({ "client_name": "No Redirects" })).await;
    assert_eq!(response.status, 400);
    assert_eq!(
        response.body_json().unwrap()["error"],
        "invalid_redirect_uri"
    );
}

#[tokio::test]
async fn insecure_redirect_uri_is_rejected() {
    let harness = test_server();
    let response = post_register(
        &harness,
        json!({ "redirect_uris": ["http://app.example.com/cb"] }),
    )
    .await;
    assert_eq!(response.status, 400);
    assert_eq!(
        response.body_json().unwrap()["error"],
        "invalid_redirect_uri"
    );
}

#[tokio::test]
async fn unknown_scope_is_invalid_scope() {
    let harness = test_server();
    let response = post_register(
        &harness,
        json!({
            "redirect_uris": ["https://app.example.com/cb"],
            "scope": "openid admin",
        }),
    )
    .await;
    assert_eq!(response.status, 400);
    let body = response.body_json().unwrap();
    assert_eq!(body["error"], "invalid_scope");
    assert!(body["error_description"].as_str().unwrap().contains("admin"));
}

#[tokio::test]
async fn unsupported_metadata_is_invalid_client_metadata() {
    let harness = test_server();

    let bad_grant = post_register(
        &harness,
        json!({
            "redirect_uris": ["https://app.example.com/cb"],
            "grant_types": ["implicit"],
        }),
    )
    .await;
    assert_eq!(bad_grant.status, 400);
    assert_eq!(
        bad_grant.body_json().unwrap()["error"],
        "invalid_client_metadata"
    );

    let bad_auth = post_register(
        &harness,
        json!({
            "redirect_uris": ["https://app.example.com/cb"],
            "token_endpoint_auth_method": "private_key_jwt",
        }),
    )
    .await;
    assert_eq!(bad_auth.status, 400);
    assert_eq!(
        bad_auth.body_json().unwrap()["error"],
        "invalid_client_metadata"
    );
}

#[tokio::test]
async fn registered_client_can_run_the_code_flow() {
    let harness = test_server();
    let response = post_register(
        &harness,
        json!({
            "client_name": "Flow App",
            "redirect_uris": [common::REDIRECT_URI],
            "token_endpoint_auth_method": "none",
        }),
    )
    .await;
    assert_eq!(response.status, 201);
    let client_id = response.body_json().unwrap()["client_id"]
        .as_str()
        .unwrap()
        .to_owned();

    let code = common::obtain_authorization_code(&harness, &client_id, "").await;
    let token = common::post_token(
        &harness,
        &[
            ("grant_type", "authorization_code"),
            ("code", &code),
            ("redirect_uri", common::REDIRECT_URI),
            ("client_id", &client_id),
        ],
    )
    .await;
    assert_eq!(token.status, 200);
}
