//! Database layer - entity storage and search query construction

pub mod search;
pub mod store;
pub mod traits;

pub use search::{CompiledQuery, QueryBuilder, QuerySpec};
pub use store::PostgresEntityStore;
pub use traits::EntityStore;
