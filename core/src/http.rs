//! HTTP transport types exchanged with the `HttpClient` collaborator.
//!
//! # Design
//! These types describe HTTP requests and responses as plain data. The core
//! finalizes a `RequestDescriptor` into an `HttpRequest`, hands it to the
//! injected transport, and interprets the returned `HttpResponse`. The
//! transport never sees builder state and the builder never sees sockets.
//!
//! All fields use owned types (`String`, `BTreeMap`, `Vec`) so values can be
//! moved into the settlement task without lifetime concerns. Ordered maps keep
//! header and parameter iteration deterministic.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EchoError;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Patch,
    Put,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    pub const ALL: [HttpMethod; 7] = [
        HttpMethod::Get,
        HttpMethod::Post,
        HttpMethod::Patch,
        HttpMethod::Put,
        HttpMethod::Delete,
        HttpMethod::Head,
        HttpMethod::Options,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses a verb case-insensitively. Anything outside the supported set is
/// rejected with `EchoError::InvalidArgument`.
impl FromStr for HttpMethod {
    type Err = EchoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HttpMethod::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| EchoError::InvalidArgument(format!("unsupported HTTP method: {s:?}")))
    }
}

/// A finalized HTTP request described as plain data.
///
/// Produced by `RequestDescriptor::finalize` at `execute` time and kept on the
/// resulting `EchoPromise` as a snapshot of what was dispatched. Query
/// parameters are not encoded into `url`; the transport appends them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub parameters: BTreeMap<String, String>,
    pub body: Option<String>,
}

impl HttpRequest {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// An HTTP response described as plain data.
///
/// Returned by the transport for every completed round-trip, including
/// non-2xx statuses. Status interpretation happens in the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
