//! Domain models for the repository

pub mod entity;
pub mod facets;

pub use entity::{variants, Collection, Entity, EntityKind, Item, Scope};
pub use facets::{Facet, FacetCatalog, FacetDef, FacetLookup, FacetTerm};
