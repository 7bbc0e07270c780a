//! Search layer - query specification and compilation
//!
//! Nothing in this module performs I/O: a [`QuerySpec`] describes a search
//! and a [`QueryBuilder`] turns it into the index's query document.

pub(crate) mod escape;
pub mod fields;
pub mod params;
pub mod query_builder;

pub use params::{
    FacetFilter, FilterClause, FilterValue, QuerySpec, SortDirection, SortOrder, TextQuery,
    DEFAULT_LIMIT, MAX_RESULT_WINDOW,
};
pub use query_builder::{CompiledQuery, QueryBuilder, RoleVisibility};
