//! Request handlers for API endpoints
//!
//! Handlers translate query parameters into finders, await the finder's
//! accessors and shape the JSON response.

pub mod search;

pub use search::*;
