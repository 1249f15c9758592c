//! Accumulated, not-yet-dispatched request configuration.
//!
//! # Design
//! `RequestDescriptor` is plain data: the builder writes into it and
//! `finalize` turns it into an `HttpRequest` at `execute` time. Headers and
//! parameters only ever merge (later keys overwrite earlier ones); nothing
//! replaces a whole mapping. The descriptor is serde-enabled so a starting
//! configuration can be loaded from JSON.

use std::collections::BTreeMap;

use regex::{NoExpand, Regex};
use serde::{Deserialize, Serialize};

use crate::error::EchoError;
use crate::http::{HttpMethod, HttpRequest};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RequestDescriptor {
    pub base_url: Option<String>,
    pub url: Option<String>,
    pub method: Option<HttpMethod>,
    pub headers: BTreeMap<String, String>,
    pub parameters: BTreeMap<String, String>,
    pub body: Option<serde_json::Value>,
}

impl RequestDescriptor {
    pub fn merge_headers<I, K, V>(&mut self, headers: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.headers
            .extend(headers.into_iter().map(|(k, v)| (k.into(), v.into())));
    }

    pub fn merge_parameters<I, K, V>(&mut self, parameters: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.parameters
            .extend(parameters.into_iter().map(|(k, v)| (k.into(), v.into())));
    }

    /// Replace every `:name` and `{name}` placeholder in the stored url with
    /// `value`. A missing url is left missing.
    pub fn substitute_path(&mut self, name: &str, value: &str) -> Result<(), EchoError> {
        let pattern = placeholder_pattern(name)?;
        if let Some(url) = self.url.as_mut() {
            let replaced = pattern.replace_all(url, NoExpand(value)).into_owned();
            tracing::trace!(placeholder = name, from = %url, to = %replaced, "substituted path");
            *url = replaced;
        }
        Ok(())
    }

    /// The url handed to the transport: `base_url` and `url` concatenated
    /// byte for byte.
    pub fn full_url(&self) -> String {
        match (&self.base_url, &self.url) {
            (Some(base), Some(url)) => format!("{base}{url}"),
            (Some(base), None) => base.clone(),
            (None, Some(url)) => url.clone(),
            (None, None) => String::new(),
        }
    }

    pub fn finalize(&self) -> Result<HttpRequest, EchoError> {
        let body = self
            .body
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| EchoError::SerializationError(e.to_string()))?;
        Ok(self.request_with_body(body))
    }

    /// Like `finalize`, but a body that fails to serialize is dropped rather
    /// than reported. Used to describe requests that were never dispatched.
    pub fn snapshot(&self) -> HttpRequest {
        let body = self
            .body
            .as_ref()
            .and_then(|body| serde_json::to_string(body).ok());
        self.request_with_body(body)
    }

    fn request_with_body(&self, body: Option<String>) -> HttpRequest {
        HttpRequest {
            method: self.method.unwrap_or_default(),
            url: self.full_url(),
            headers: self.headers.clone(),
            parameters: self.parameters.clone(),
            body,
        }
    }
}

/// `:name` must not be followed by another identifier character, so `id`
/// leaves `:idx` alone.
fn placeholder_pattern(name: &str) -> Result<Regex, EchoError> {
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(EchoError::InvalidArgument(format!(
            "invalid path placeholder name: {name:?}"
        )));
    }
    let name = regex::escape(name);
    Regex::new(&format!(r":{name}\b|\{{{name}\}}"))
        .map_err(|e| EchoError::InvalidArgument(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_url(url: &str) -> RequestDescriptor {
        RequestDescriptor {
            url: Some(url.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn colon_placeholder_is_replaced_in_place() {
        let mut d = with_url("/users/:id");
        d.substitute_path("id", "42").unwrap();
        assert_eq!(d.url.as_deref(), Some("/users/42"));
    }

    #[test]
    fn brace_placeholder_is_replaced_in_place() {
        let mut d = with_url("/users/{id}");
        d.substitute_path("id", "42").unwrap();
        assert_eq!(d.url.as_deref(), Some("/users/42"));
    }

    #[test]
    fn every_occurrence_is_replaced() {
        let mut d = with_url("/a/:id/b/{id}/c/:id");
        d.substitute_path("id", "7").unwrap();
        assert_eq!(d.url.as_deref(), Some("/a/7/b/7/c/7"));
    }

    #[test]
    fn longer_placeholder_is_not_clobbered() {
        let mut d = with_url("/users/:id/items/:idx");
        d.substitute_path("id", "1").unwrap();
        assert_eq!(d.url.as_deref(), Some("/users/1/items/:idx"));
    }

    #[test]
    fn replacement_value_is_literal() {
        let mut d = with_url("/files/{name}");
        d.substitute_path("name", "$1-report").unwrap();
        assert_eq!(d.url.as_deref(), Some("/files/$1-report"));
    }

    #[test]
    fn substitution_without_url_is_noop() {
        let mut d = RequestDescriptor::default();
        d.substitute_path("id", "1").unwrap();
        assert!(d.url.is_none());
    }

    #[test]
    fn invalid_placeholder_names_are_rejected() {
        let mut d = with_url("/users/:id");
        for name in ["", "a/b", "x y", "{id}"] {
            let err = d.substitute_path(name, "1").unwrap_err();
            assert!(matches!(err, EchoError::InvalidArgument(_)), "{name:?}");
        }
        assert_eq!(d.url.as_deref(), Some("/users/:id"));
    }

    #[test]
    fn full_url_concatenates_without_normalization() {
        let mut d = with_url("/users");
        assert_eq!(d.full_url(), "/users");
        d.base_url = Some("http://localhost:3000/".to_string());
        assert_eq!(d.full_url(), "http://localhost:3000//users");
        d.url = None;
        assert_eq!(d.full_url(), "http://localhost:3000/");
        d.base_url = None;
        assert_eq!(d.full_url(), "");
    }

    #[test]
    fn finalize_defaults_method_and_omits_absent_body() {
        let req = with_url("/x").finalize().unwrap();
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.url, "/x");
        assert!(req.headers.is_empty());
        assert!(req.parameters.is_empty());
        assert!(req.body.is_none());
    }

    #[test]
    fn finalize_serializes_body_as_json() {
        let mut d = with_url("/x");
        d.body = Some(serde_json::json!({"title": "Buy milk", "done": false}));
        let req = d.finalize().unwrap();
        let body: serde_json::Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body["title"], "Buy milk");
        assert_eq!(body["done"], false);
    }

    #[test]
    fn merges_overlay_existing_keys() {
        let mut d = RequestDescriptor::default();
        d.merge_headers([("a", "1"), ("b", "2")]);
        d.merge_headers([("b", "3")]);
        assert_eq!(d.headers.get("a").map(String::as_str), Some("1"));
        assert_eq!(d.headers.get("b").map(String::as_str), Some("3"));
    }

    #[test]
    fn descriptor_loads_from_camel_case_json() {
        let d: RequestDescriptor = serde_json::from_str(
            r#"{"baseUrl":"http://api","method":"POST","headers":{"accept":"application/json"}}"#,
        )
        .unwrap();
        assert_eq!(d.base_url.as_deref(), Some("http://api"));
        assert_eq!(d.method, Some(HttpMethod::Post));
        assert_eq!(d.headers.len(), 1);
        assert!(d.url.is_none());
        assert!(d.parameters.is_empty());
    }
}
