//! Inbound API surface
//!
//! - **`pagination`**: validates `page` / `page-size` query values
//! - **`resources`**: static table mapping inbound resources to upstream paths
//! - **`catalog`**: health payload and the endpoint catalog
//! - **`cors`**: CORS response headers and preflight answers
//! - **`router`**: route resolution, the shared forwarding handler, and error mapping

pub mod catalog;
pub mod cors;
pub mod pagination;
pub mod resources;
pub mod router;

pub use pagination::{PaginationError, PaginationParams};
pub use router::{Route, handle};
