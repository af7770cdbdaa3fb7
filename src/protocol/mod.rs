//! Request/response types at the HTTP boundary.
//!
//! ## Signed headers
//!
//! ```text
//! X-Anti-Spam-Token:     <shared secret>
//! X-Anti-Spam-Timestamp: <epoch milliseconds>
//! X-Anti-Spam-Signature: hex(HMAC-SHA256(secret, "METHOD|PATH|BODY|TIMESTAMP"))
//! ```

mod headers;
mod request;
mod response;

pub use headers::*;
pub use request::GuardedRequest;
pub use response::{ErrorResponse, Response};
