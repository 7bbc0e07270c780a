//! Business logic layer - finders and response materialization

pub mod finder;
pub mod response;

pub use finder::{
    CollectionFinder, EntityFinder, Finder, FinderScope, ItemFinder, SearchContext, SearchOptions,
};
pub use response::{FieldStats, SearchResponse};
