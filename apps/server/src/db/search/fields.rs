//! Field names shared by the items and collections indexes.
//!
//! Both indexes use the same names for system fields so that a single
//! query document can be run against either, or against both at once.

use crate::models::EntityKind;

pub const REPOSITORY_ID: &str = "repository_id";
/// `Item` or `Collection`.
pub const CLASS: &str = "class";
pub const PUBLICLY_ACCESSIBLE: &str = "publicly_accessible";
pub const ALLOWED_ROLES: &str = "allowed_roles";
pub const ALLOWED_ROLE_COUNT: &str = "allowed_role_count";
pub const DENIED_ROLES: &str = "denied_roles";
/// Composite field populated at index time by copying the descriptive and
/// full-text fields into it.
pub const SEARCH_ALL: &str = "search_all";
pub const TITLE: &str = "title";

pub const PARENT_ITEM: &str = "parent_item";
pub const PARENT_COLLECTIONS: &str = "parent_collections";

pub const COLLECTION: &str = "collection";
pub const VARIANT: &str = "variant";
pub const MEDIA_TYPE: &str = "media_type";
pub const DATE: &str = "date";

/// Field holding the parent reference of an entity kind.
pub fn parent_field(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Item => PARENT_ITEM,
        EntityKind::Collection => PARENT_COLLECTIONS,
    }
}

/// Numeric/date fields summarized when stats are requested.
pub fn stats_fields(kind: EntityKind) -> &'static [&'static str] {
    match kind {
        EntityKind::Item => &[DATE],
        EntityKind::Collection => &[],
    }
}
