// ABOUTME: Framework-neutral HTTP request/response types used by every endpoint
// ABOUTME: Host applications translate their framework's types to and from these
//
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::errors::OAuthError;
use serde_json::Value;
use std::collections::HashMap;
use url::Url;

/// Plain form-data container with ordered string pairs.
///
/// Hosts fill this from whatever body parser their framework provides; the
/// engine never touches a framework form type.
#[derive(Debug, Clone, Default)]
pub struct FormData {
    entries: Vec<(String, String)>,
}

impl FormData {
    /// Create an empty form
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Build a form from name/value pairs
    #[must_use]
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// First value for a field name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Append a field
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// All fields in insertion order
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Request body variants the engine understands
#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    /// No body
    #[default]
    Empty,
    /// `application/x-www-form-urlencoded` body
    Form(FormData),
    /// `application/json` body
    Json(Value),
}

/// Framework-neutral HTTP request
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// Full request URL (absolute, or path + query)
    pub url: String,
    /// HTTP method, uppercase
    pub method: String,
    /// Header map with lowercase names
    pub headers: HashMap<String, String>,
    /// Decoded query parameters
    pub search_params: HashMap<String, String>,
    /// Parsed request body
    pub body: RequestBody,
}

impl HttpRequest {
    /// Create a request, parsing the query string into `search_params`
    #[must_use]
    pub fn new(method: &str, url: &str) -> Self {
        Self {
            url: url.to_owned(),
            method: method.to_uppercase(),
            headers: HashMap::new(),
            search_params: parse_query(url),
            body: RequestBody::Empty,
        }
    }

    /// Convenience constructor for GET requests
    #[must_use]
    pub fn get(url: &str) -> Self {
        Self::new("GET", url)
    }

    /// Convenience constructor for POST requests
    #[must_use]
    pub fn post(url: &str) -> Self {
        Self::new("POST", url)
    }

    /// Attach a header (name is lowercased)
    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_lowercase(), value.into());
        self
    }

    /// Attach a form body
    #[must_use]
    pub fn with_form(mut self, form: FormData) -> Self {
        self.body = RequestBody::Form(form);
        self
    }

    /// Attach a JSON body
    #[must_use]
    pub fn with_json(mut self, value: Value) -> Self {
        self.body = RequestBody::Json(value);
        self
    }

    /// Case-insensitive header lookup
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(String::as_str)
    }

    /// Query parameter lookup
    #[must_use]
    pub fn query(&self, name: &str) -> Option<&str> {
        self.search_params.get(name).map(String::as_str)
    }

    /// Path component of the URL, without query or fragment
    #[must_use]
    pub fn path(&self) -> String {
        Url::parse(&self.url).map_or_else(
            |_| {
                self.url
                    .split(['?', '#'])
                    .next()
                    .unwrap_or_default()
                    .to_owned()
            },
            |parsed| parsed.path().to_owned(),
        )
    }

    /// Form body, when the request carries one
    #[must_use]
    pub fn form(&self) -> Option<&FormData> {
        match &self.body {
            RequestBody::Form(form) => Some(form),
            _ => None,
        }
    }

    /// Body parameter lookup that works for form and JSON-object bodies.
    ///
    /// The token and revocation endpoints accept both encodings.
    #[must_use]
    pub fn body_param(&self, name: &str) -> Option<&str> {
        match &self.body {
            RequestBody::Form(form) => form.get(name),
            RequestBody::Json(value) => value.get(name).and_then(Value::as_str),
            RequestBody::Empty => None,
        }
    }
}

fn parse_query(url: &str) -> HashMap<String, String> {
    let parsed = Url::parse(url).or_else(|_| {
        // Relative URLs are resolved against a synthetic base for parsing only
        Url::parse("http://localhost").and_then(|base| base.join(url))
    });
    parsed.map_or_else(
        |_| HashMap::new(),
        |u| {
            u.query_pairs()
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect()
        },
    )
}

/// Response body variants produced by the engine
#[derive(Debug, Clone, Default)]
pub enum ResponseBody {
    /// No body
    #[default]
    Empty,
    /// JSON body
    Json(Value),
    /// HTML body (consent page)
    Html(String),
}

/// Framework-neutral HTTP response
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,
    /// Header map with lowercase names
    pub headers: HashMap<String, String>,
    /// Response body
    pub body: ResponseBody,
    /// Redirect target, set for 3xx responses alongside the `location` header
    pub redirect: Option<String>,
}

impl HttpResponse {
    /// JSON response with the given status
    #[must_use]
    pub fn json(status: u16, body: Value) -> Self {
        let mut headers = HashMap::new();
        headers.insert("content-type".to_owned(), "application/json".to_owned());
        Self {
            status,
            headers,
            body: ResponseBody::Json(body),
            redirect: None,
        }
    }

    /// HTML response with the given status
    #[must_use]
    pub fn html(status: u16, body: impl Into<String>) -> Self {
        let mut headers = HashMap::new();
        headers.insert(
            "content-type".to_owned(),
            "text/html; charset=utf-8".to_owned(),
        );
        Self {
            status,
            headers,
            body: ResponseBody::Html(body.into()),
            redirect: None,
        }
    }

    /// 302 redirect
    #[must_use]
    pub fn redirect(location: impl Into<String>) -> Self {
        let location = location.into();
        let mut headers = HashMap::new();
        headers.insert("location".to_owned(), location.clone());
        Self {
            status: 302,
            headers,
            body: ResponseBody::Empty,
            redirect: Some(location),
        }
    }

    /// 204 empty response
    #[must_use]
    pub fn no_content() -> Self {
        Self {
            status: 204,
            headers: HashMap::new(),
            body: ResponseBody::Empty,
            redirect: None,
        }
    }

    /// 200 empty response (revocation endpoint)
    #[must_use]
    pub fn empty_ok() -> Self {
        Self {
            status: 200,
            headers: HashMap::new(),
            body: ResponseBody::Empty,
            redirect: None,
        }
    }

    /// JSON error response with the status the error code maps to
    #[must_use]
    pub fn oauth_error(err: &OAuthError) -> Self {
        Self::json(err.code.http_status(), err.to_body())
    }

    /// Attach a header (name is lowercased)
    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_lowercase(), value.into());
        self
    }

    /// Case-insensitive header lookup
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(String::as_str)
    }

    /// JSON body accessor for hosts and tests
    #[must_use]
    pub fn body_json(&self) -> Option<&Value> {
        match &self.body {
            ResponseBody::Json(value) => Some(value),
            _ => None,
        }
    }

    /// HTML body accessor for hosts and tests
    #[must_use]
    pub fn body_html(&self) -> Option<&str> {
        match &self.body {
            ResponseBody::Html(html) => Some(html),
            _ => None,
        }
    }
}
