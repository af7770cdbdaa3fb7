//! TTL-bound cache used for replay records and rate-limit histories.

mod memory;
mod traits;

pub use memory::MemoryCache;
pub use traits::ReplayCache;
