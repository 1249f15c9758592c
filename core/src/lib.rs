//! Fluent HTTP request builder with inspectable request promises.
//!
//! # Overview
//! `EchoBuilder` accumulates a request through chained calls and `execute`
//! dispatches it through an injected `HttpClient`, returning an
//! `EchoPromise`. The promise is an ordinary `Future` and also exposes the
//! request's status (`Loading`, `Success`, `Error`) and results synchronously,
//! so callers can poll state without awaiting.
//!
//! # Design
//! - The transport is a trait object; the core never touches sockets.
//!   `UreqClient` is the bundled implementation.
//! - `RequestDescriptor` is plain, serde-enabled data; the builder is a thin
//!   chain over it.
//! - Every failure after `execute` flows through the promise's error channel.
//!   The `require_*` accessors are the only synchronous failure points.
//!
//! ```no_run
//! # async fn demo() {
//! let promise = echolink_core::echo()
//!     .base_url("http://localhost:3000")
//!     .get("/users/:id")
//!     .path("id", "1")
//!     .execute::<serde_json::Value>();
//! assert!(promise.is_loading());
//! let user = promise.await;
//! # }
//! ```

pub mod builder;
pub mod descriptor;
pub mod error;
pub mod http;
pub mod promise;
pub mod transport;
pub mod types;

pub use builder::EchoBuilder;
pub use descriptor::RequestDescriptor;
pub use error::EchoError;
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use promise::{EchoPromise, EchoPromiseStatus};
pub use transport::{HttpClient, UreqClient};
pub use types::EchoResponse;

/// A builder backed by the default `UreqClient`.
pub fn echo() -> EchoBuilder {
    EchoBuilder::default()
}
