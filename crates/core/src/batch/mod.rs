//! Request batching
//!
//! Groups logical API calls into a single composite HTTP request and routes
//! each part of the composite response back to the call that produced it.

pub mod codec;
pub mod multiplexer;

pub use multiplexer::{ApiCall, BatchScope, BatchSummary, Multiplexer, ResponseCallback};
