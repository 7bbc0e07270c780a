//! Kumquat search service
//!
//! Search and result paging for a digital library's items and collections:
//! - Declarative query specifications compiled to Elasticsearch queries
//! - Finders with deferred, memoized execution and facet materialization
//! - Hydration of index hits from PostgreSQL
//! - A thin JSON HTTP surface

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod models;
pub mod services;
pub mod state;

pub use config::Config;
pub use error::{Error, Result};
pub use state::AppState;
