//! Search index gateway
//!
//! This crate executes structured query documents against an Elasticsearch
//! node over HTTP and hands back the parsed response. It knows nothing
//! about how queries are built or what the hits mean.
//!
//! # Examples
//!
//! ```rust,no_run
//! use kumquat_index_client::{ElasticsearchClient, SearchIndex};
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ElasticsearchClient::new("http://localhost:9200")?;
//! let response = client
//!     .search("items", &json!({ "query": { "match_all": {} }, "size": 10 }))
//!     .await?;
//! println!("{}", response["hits"]["total"]);
//! # Ok(())
//! # }
//! ```
//!
pub mod client;
pub mod error;
pub mod gateway;
pub mod models;

pub use client::ElasticsearchClient;
pub use error::{Error, Result};
pub use gateway::SearchIndex;
pub use models::IndexSummary;
