//! Minimal HTTP/1.1 server.
//!
//! - **`connection`**: per-client request/response state machine with keep-alive
//! - **`parser`**: parses incoming HTTP requests from byte buffers
//! - **`request`**: request representation, header and query-string access
//! - **`response`**: response representation with builder and JSON helpers
//! - **`writer`**: serializes and writes responses to the client
//!
//! # Connection State Machine
//!
//! ```text
//!        ┌─────────────┐
//!        │   Reading   │ ← Wait for incoming request data
//!        └──────┬──────┘
//!               │ Request received (malformed → 400, then close)
//!               ▼
//!        ┌──────────────────┐
//!        │   Processing     │ ← Route, validate, forward upstream
//!        └──────┬───────────┘
//!               │ Response ready
//!               ▼
//!        ┌──────────────────┐
//!        │    Writing       │ ← Send response to client
//!        └──────┬───────────┘
//!               │ Response sent
//!               ├─ Keep-Alive → Reading (same connection)
//!               └─ Close → Closed
//! ```

pub mod connection;
pub mod parser;
pub mod request;
pub mod response;
pub mod writer;
