//! HTTP/REST API adapter.
//!
//! Inbound adapter exposing the signal webhook and the read/operate
//! endpoints. Every handler delegates to an application use case.

mod controller;
mod request;
mod response;

pub use controller::{AppState, create_router};
pub use request::*;
pub use response::*;
