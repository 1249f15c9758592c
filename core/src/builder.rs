//! Fluent request builder.
//!
//! # Design
//! Chain methods take `self` by value and hand it back, so one builder value
//! flows through the chain and no intermediate state is shared. Forking a
//! partially configured chain is explicit: `EchoBuilder` is `Clone`, and the
//! clone owns its own `RequestDescriptor`.
//!
//! Chain methods never fail. Input that cannot be used (an unknown verb, a
//! malformed placeholder name, a body that does not serialize) is recorded on
//! the builder and reported by `execute` through the promise's error channel.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::descriptor::RequestDescriptor;
use crate::error::EchoError;
use crate::http::{HttpMethod, HttpRequest};
use crate::promise::EchoPromise;
use crate::transport::{HttpClient, UreqClient};
use crate::types::EchoResponse;

#[derive(Clone)]
pub struct EchoBuilder {
    client: Arc<dyn HttpClient>,
    descriptor: RequestDescriptor,
    invalid: Option<EchoError>,
}

impl EchoBuilder {
    pub fn new(client: impl HttpClient + 'static) -> Self {
        Self::with_descriptor(client, RequestDescriptor::default())
    }

    /// Start from an existing configuration, e.g. one loaded from JSON.
    pub fn with_descriptor(client: impl HttpClient + 'static, descriptor: RequestDescriptor) -> Self {
        Self {
            client: Arc::new(client),
            descriptor,
            invalid: None,
        }
    }

    pub fn descriptor(&self) -> &RequestDescriptor {
        &self.descriptor
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.descriptor.base_url = Some(base_url.into());
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.descriptor.url = Some(url.into());
        self
    }

    pub fn method(mut self, method: HttpMethod) -> Self {
        self.descriptor.method = Some(method);
        self
    }

    /// Set the method from its textual name. An unknown verb leaves the
    /// method unchanged and makes `execute` fail with `InvalidArgument`.
    pub fn try_method(self, method: &str) -> Self {
        match method.parse() {
            Ok(method) => self.method(method),
            Err(err) => self.record(err),
        }
    }

    pub fn get(self, url: impl Into<String>) -> Self {
        self.url(url).method(HttpMethod::Get)
    }

    pub fn post(self, url: impl Into<String>) -> Self {
        self.url(url).method(HttpMethod::Post)
    }

    pub fn patch(self, url: impl Into<String>) -> Self {
        self.url(url).method(HttpMethod::Patch)
    }

    pub fn put(self, url: impl Into<String>) -> Self {
        self.url(url).method(HttpMethod::Put)
    }

    pub fn delete(self, url: impl Into<String>) -> Self {
        self.url(url).method(HttpMethod::Delete)
    }

    pub fn head(self, url: impl Into<String>) -> Self {
        self.url(url).method(HttpMethod::Head)
    }

    pub fn options(self, url: impl Into<String>) -> Self {
        self.url(url).method(HttpMethod::Options)
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.descriptor.merge_headers([(name.into(), value.into())]);
        self
    }

    /// Merge `headers` into the existing ones; later keys win.
    pub fn headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.descriptor.merge_headers(headers);
        self
    }

    pub fn parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.descriptor.merge_parameters([(name.into(), value.into())]);
        self
    }

    /// Merge `parameters` into the existing ones; later keys win.
    pub fn parameters<I, K, V>(mut self, parameters: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.descriptor.merge_parameters(parameters);
        self
    }

    /// Alias for [`EchoBuilder::parameter`].
    pub fn query(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameter(name, value)
    }

    /// Alias for [`EchoBuilder::parameters`].
    pub fn queries<I, K, V>(self, queries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.parameters(queries)
    }

    /// Replace `:name` and `{name}` placeholders in the current url with
    /// `value`. Placeholder names are ASCII alphanumerics and `_`.
    pub fn path(mut self, name: &str, value: impl AsRef<str>) -> Self {
        match self.descriptor.substitute_path(name, value.as_ref()) {
            Ok(()) => self,
            Err(err) => self.record(err),
        }
    }

    pub fn body(mut self, body: impl Serialize) -> Self {
        match serde_json::to_value(body) {
            Ok(value) => {
                self.descriptor.body = Some(value);
                self
            }
            Err(e) => self.record(EchoError::SerializationError(e.to_string())),
        }
    }

    /// Dispatch the request and return a promise in the `Loading` state.
    ///
    /// Never fails synchronously: configuration errors, transport failures
    /// and undecodable responses all settle the promise as an error.
    pub fn execute<T>(self) -> EchoPromise<T>
    where
        T: DeserializeOwned + Send + Sync + 'static,
    {
        if let Some(err) = self.invalid {
            return reject(self.descriptor.snapshot(), err);
        }
        let request = match self.descriptor.finalize() {
            Ok(request) => request,
            Err(err) => return reject(self.descriptor.snapshot(), err),
        };

        tracing::debug!(method = %request.method, url = %request.url, "dispatching request");
        let client = self.client;
        let outgoing = request.clone();
        EchoPromise::spawn(request, async move {
            let method = outgoing.method;
            let url = outgoing.url.clone();
            let settlement = client
                .send(outgoing)
                .await
                .and_then(EchoResponse::<T>::from_http);
            match &settlement {
                Ok(response) => {
                    tracing::debug!(%method, %url, status = response.status, "request succeeded");
                }
                Err(err) => {
                    tracing::warn!(%method, %url, error = %err, "request failed");
                }
            }
            settlement
        })
    }

    fn record(mut self, err: EchoError) -> Self {
        tracing::debug!(error = %err, "recorded invalid builder input");
        self.invalid.get_or_insert(err);
        self
    }
}

/// Settle without dispatching; used for errors recorded before `execute`.
fn reject<T>(request: HttpRequest, err: EchoError) -> EchoPromise<T>
where
    T: Send + Sync + 'static,
{
    tracing::warn!(method = %request.method, url = %request.url, error = %err, "request not dispatched");
    EchoPromise::settled(request, Err(err))
}

impl Default for EchoBuilder {
    fn default() -> Self {
        Self::new(UreqClient::default())
    }
}

impl fmt::Debug for EchoBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EchoBuilder")
            .field("descriptor", &self.descriptor)
            .field("invalid", &self.invalid)
            .finish_non_exhaustive()
    }
}
