//! Facet definitions and materialized facets

use super::entity::{EntityKind, Scope};
use serde::{Deserialize, Serialize};

/// A facetable index field and its display label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetDef {
    pub field: String,
    pub label: String,
}

impl FacetDef {
    pub fn new(field: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            label: label.into(),
        }
    }
}

/// Read-only lookup of facet definitions.
pub trait FacetLookup: Send + Sync {
    /// Facetable fields for a scope, in display order.
    fn facet_defs(&self, scope: Scope) -> Vec<FacetDef>;

    /// Human-readable label of a facet field within a scope.
    fn label(&self, scope: Scope, field: &str) -> Option<String> {
        self.facet_defs(scope)
            .into_iter()
            .find(|def| def.field == field)
            .map(|def| def.label)
    }
}

/// Static facet catalog, one ordered list per entity kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetCatalog {
    pub items: Vec<FacetDef>,
    pub collections: Vec<FacetDef>,
}

impl Default for FacetCatalog {
    fn default() -> Self {
        Self {
            items: vec![
                FacetDef::new("facet_collection", "Collection"),
                FacetDef::new("facet_creator", "Creator"),
                FacetDef::new("facet_date", "Date"),
                FacetDef::new("facet_format", "Format"),
                FacetDef::new("facet_language", "Language"),
                FacetDef::new("facet_place", "Place"),
                FacetDef::new("facet_subject", "Subject"),
                FacetDef::new("facet_type", "Type"),
            ],
            collections: vec![
                FacetDef::new("facet_repository", "Repository"),
                FacetDef::new("facet_resource_type", "Resource Type"),
                FacetDef::new("access_systems", "Access Systems"),
            ],
        }
    }
}

impl FacetCatalog {
    fn defs_for(&self, kind: EntityKind) -> &[FacetDef] {
        match kind {
            EntityKind::Item => &self.items,
            EntityKind::Collection => &self.collections,
        }
    }
}

impl FacetLookup for FacetCatalog {
    fn facet_defs(&self, scope: Scope) -> Vec<FacetDef> {
        let mut out: Vec<FacetDef> = Vec::new();
        // Items lead in the cross-entity list; they carry the richer facets.
        let mut kinds = scope.kinds().to_vec();
        kinds.sort_by_key(|k| match k {
            EntityKind::Item => 0,
            EntityKind::Collection => 1,
        });
        for kind in kinds {
            for def in self.defs_for(kind) {
                if !out.iter().any(|d| d.field == def.field) {
                    out.push(def.clone());
                }
            }
        }
        out
    }
}

/// One bucket of a facet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacetTerm {
    /// Raw term as stored in the index.
    pub name: String,
    pub label: String,
    pub count: u64,
    /// Field of the owning facet.
    pub field: String,
}

impl FacetTerm {
    /// The `field:term` form used in `fq` query parameters.
    pub fn filter_param(&self) -> String {
        format!("{}:{}", self.field, self.name)
    }
}

/// A facet materialized from one query's aggregations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Facet {
    /// Display label.
    pub name: String,
    pub field: String,
    pub terms: Vec<FacetTerm>,
}

impl Facet {
    pub fn term(&self, name: &str) -> Option<&FacetTerm> {
        self.terms.iter().find(|t| t.name == name)
    }
}
