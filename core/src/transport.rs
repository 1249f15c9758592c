//! The HTTP client collaborator and the bundled `ureq` implementation.
//!
//! # Design
//! The core never performs I/O itself: `execute` hands a finalized
//! `HttpRequest` to an `HttpClient` and interprets the `HttpResponse` it gets
//! back. Implementations return every completed round-trip as `Ok`, whatever
//! the status code, and reserve `Err` for failures to talk to the server.
//!
//! `UreqClient` runs the blocking `ureq` agent on tokio's blocking pool so it
//! can sit behind the async trait.

use std::sync::Arc;

use async_trait::async_trait;
use ureq::typestate::{WithBody, WithoutBody};
use ureq::{Agent, RequestBuilder};

use crate::error::EchoError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Performs a single HTTP round-trip.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, EchoError>;
}

#[async_trait]
impl<C> HttpClient for Arc<C>
where
    C: HttpClient + ?Sized,
{
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, EchoError> {
        (**self).send(request).await
    }
}

/// `HttpClient` backed by a `ureq` agent.
///
/// The agent is configured with `http_status_as_error(false)` so 4xx/5xx
/// responses come back as data and status interpretation stays in the core.
#[derive(Debug, Clone)]
pub struct UreqClient {
    agent: Agent,
}

impl UreqClient {
    /// Wrap an existing agent. The agent should not treat HTTP statuses as
    /// errors, otherwise non-2xx replies surface as `EchoError::Transport`.
    pub fn from_agent(agent: Agent) -> Self {
        Self { agent }
    }
}

impl Default for UreqClient {
    fn default() -> Self {
        let agent = Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self { agent }
    }
}

#[async_trait]
impl HttpClient for UreqClient {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, EchoError> {
        let agent = self.agent.clone();
        tokio::task::spawn_blocking(move || call(&agent, &request))
            .await
            .map_err(|e| EchoError::Transport(e.to_string()))?
    }
}

fn call(agent: &Agent, request: &HttpRequest) -> Result<HttpResponse, EchoError> {
    let url = request.url.as_str();
    let result = match request.method {
        HttpMethod::Get => send_without_body(decorate(agent.get(url), request), request),
        HttpMethod::Delete => send_without_body(decorate(agent.delete(url), request), request),
        HttpMethod::Head => send_without_body(decorate(agent.head(url), request), request),
        HttpMethod::Options => send_without_body(decorate(agent.options(url), request), request),
        HttpMethod::Post => send_with_body(decorate(agent.post(url), request), request),
        HttpMethod::Put => send_with_body(decorate(agent.put(url), request), request),
        HttpMethod::Patch => send_with_body(decorate(agent.patch(url), request), request),
    };
    let mut response = result.map_err(|e| EchoError::Transport(e.to_string()))?;

    let status = response.status().as_u16();
    let headers = response
        .headers()
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                value.to_str().unwrap_or_default().to_string(),
            )
        })
        .collect();
    let body = response
        .body_mut()
        .read_to_string()
        .map_err(|e| EchoError::Transport(e.to_string()))?;

    Ok(HttpResponse {
        status,
        headers,
        body,
    })
}

type UreqResult = Result<ureq::http::Response<ureq::Body>, ureq::Error>;

fn send_without_body(builder: RequestBuilder<WithoutBody>, request: &HttpRequest) -> UreqResult {
    match &request.body {
        Some(_) => send_with_body(builder.force_send_body(), request),
        None => builder.call(),
    }
}

fn send_with_body(builder: RequestBuilder<WithBody>, request: &HttpRequest) -> UreqResult {
    match &request.body {
        Some(body) if request.header("content-type").is_none() => builder
            .header("content-type", "application/json")
            .send(body.as_bytes()),
        Some(body) => builder.send(body.as_bytes()),
        None => builder.send_empty(),
    }
}

/// Apply headers and query parameters.
fn decorate<B>(builder: RequestBuilder<B>, request: &HttpRequest) -> RequestBuilder<B> {
    let builder = request
        .headers
        .iter()
        .fold(builder, |b, (name, value)| b.header(name, value));
    request
        .parameters
        .iter()
        .fold(builder, |b, (name, value)| b.query(name, value))
}
