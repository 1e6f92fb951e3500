//! HTTP API of the gateway.
//!
//! Routes are nested under the configured API prefix. Protected routes
//! go through the identity middleware; every route is request-logged.
//!
//! The router is composable: `gateway_router()` returns a `Router` that
//! can be mounted on any axum server instance.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod proxy;
pub mod router;
pub mod server;
pub mod types;

pub use router::gateway_router;
pub use server::{start_server, GatewayServer, ServerError, ServerSession};
pub use types::{ApiContext, Identity};
