//! Infrastructure Layer
//!
//! Adapters behind the application ports plus the HTTP surface.

pub mod container;
pub mod exchange;
pub mod http;

pub use container::Container;
