//! Outbound side: the client that talks to the upstream open-banking service.

pub mod upstream;

pub use upstream::{UpstreamClient, UpstreamError, UpstreamResponse};
