//! Response envelope produced on successful settlement.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::EchoError;
use crate::http::HttpResponse;

/// A successful response with its payload decoded into `T`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EchoResponse<T> {
    pub data: T,
    pub status: u16,
    pub headers: Vec<(String, String)>,
}

impl<T: DeserializeOwned> EchoResponse<T> {
    /// Interpret a transport response: non-2xx statuses become errors, 2xx
    /// bodies are decoded as JSON. An empty body decodes as `null` so `()`,
    /// `Option<_>` and `serde_json::Value` accept HEAD and 204 replies.
    pub fn from_http(response: HttpResponse) -> Result<Self, EchoError> {
        check_status(&response)?;
        let text = response.body.trim();
        let text = if text.is_empty() { "null" } else { text };
        let data = serde_json::from_str(text)
            .map_err(|e| EchoError::DeserializationError(e.to_string()))?;
        Ok(EchoResponse {
            data,
            status: response.status,
            headers: response.headers,
        })
    }
}

impl<T> EchoResponse<T> {
    /// Case-insensitive header lookup; the first match wins.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Map non-success status codes to the appropriate `EchoError` variant.
fn check_status(response: &HttpResponse) -> Result<(), EchoError> {
    if response.is_success() {
        return Ok(());
    }
    if response.status == 404 {
        return Err(EchoError::NotFound);
    }
    Err(EchoError::HttpError {
        status: response.status,
        body: response.body.clone(),
    })
}
