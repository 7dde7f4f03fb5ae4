//! OpenBanking proxy
//!
//! Thin HTTP proxy exposing read-only open-banking product endpoints. Each
//! request is validated, forwarded to the upstream mock service with its
//! pagination parameters, and answered with the upstream JSON or a mapped
//! error.

pub mod api;
pub mod config;
pub mod context;
pub mod error;
pub mod http;
pub mod proxy;
pub mod server;
