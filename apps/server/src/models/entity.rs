//! Repository entities returned by finders

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of a persisted entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Collection,
    Item,
}

impl EntityKind {
    /// Value of the `class` field in indexed documents.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Collection => "Collection",
            Self::Item => "Item",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "collection" => Some(Self::Collection),
            "item" => Some(Self::Item),
            _ => None,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a finder searches over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Items,
    Collections,
    /// Items and collections together.
    Entities,
}

impl Scope {
    /// Entity kinds covered by this scope. Collections come first so that a
    /// multi-index request lists the collections index first.
    pub fn kinds(self) -> &'static [EntityKind] {
        match self {
            Self::Items => &[EntityKind::Item],
            Self::Collections => &[EntityKind::Collection],
            Self::Entities => &[EntityKind::Collection, EntityKind::Item],
        }
    }
}

/// Values of [`Item::variant`].
pub mod variants {
    pub const BACK_COVER: &str = "BackCover";
    pub const COMPOSITE: &str = "Composite";
    pub const DIRECTORY: &str = "Directory";
    pub const FILE: &str = "File";
    pub const FRONT_COVER: &str = "FrontCover";
    pub const FRONT_MATTER: &str = "FrontMatter";
    pub const INDEX: &str = "Index";
    pub const INSIDE_BACK_COVER: &str = "InsideBackCover";
    pub const INSIDE_FRONT_COVER: &str = "InsideFrontCover";
    pub const KEY: &str = "Key";
    pub const PAGE: &str = "Page";
    pub const SUPPLEMENT: &str = "Supplement";
    pub const TABLE_OF_CONTENTS: &str = "TableOfContents";
    pub const THREE_D_MODEL: &str = "3DModel";
    pub const TITLE: &str = "Title";

    pub const ALL: &[&str] = &[
        BACK_COVER,
        COMPOSITE,
        DIRECTORY,
        FILE,
        FRONT_COVER,
        FRONT_MATTER,
        INDEX,
        INSIDE_BACK_COVER,
        INSIDE_FRONT_COVER,
        KEY,
        PAGE,
        SUPPLEMENT,
        TABLE_OF_CONTENTS,
        THREE_D_MODEL,
        TITLE,
    ];

    /// Parts of a compound object that read as pages of it.
    pub const PAGE_LIKE: &[&str] = &[FRONT_MATTER, INDEX, KEY, PAGE, TABLE_OF_CONTENTS, TITLE];

    /// Every variant except [`FILE`].
    pub fn all_but_file() -> impl Iterator<Item = &'static str> {
        ALL.iter().copied().filter(|v| *v != FILE)
    }
}

/// A digital object (or a page/file of one).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub repository_id: String,
    pub collection_repository_id: Option<String>,
    /// Set for child items such as pages of a compound object.
    pub parent_repository_id: Option<String>,
    pub title: Option<String>,
    pub variant: Option<String>,
    pub media_type: Option<String>,
    pub published: bool,
    pub updated_at: DateTime<Utc>,
}

/// A collection of items, optionally nested under other collections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    pub repository_id: String,
    pub parent_repository_id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub published: bool,
    pub updated_at: DateTime<Utc>,
}

/// Either kind of entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Entity {
    Collection(Collection),
    Item(Item),
}

impl Entity {
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Collection(_) => EntityKind::Collection,
            Self::Item(_) => EntityKind::Item,
        }
    }

    pub fn repository_id(&self) -> &str {
        match self {
            Self::Collection(c) => &c.repository_id,
            Self::Item(i) => &i.repository_id,
        }
    }

    pub fn title(&self) -> Option<&str> {
        match self {
            Self::Collection(c) => c.title.as_deref(),
            Self::Item(i) => i.title.as_deref(),
        }
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        match self {
            Self::Collection(c) => c.updated_at,
            Self::Item(i) => i.updated_at,
        }
    }

    pub fn as_item(&self) -> Option<&Item> {
        match self {
            Self::Item(i) => Some(i),
            Self::Collection(_) => None,
        }
    }

    pub fn as_collection(&self) -> Option<&Collection> {
        match self {
            Self::Collection(c) => Some(c),
            Self::Item(_) => None,
        }
    }
}

impl From<Item> for Entity {
    fn from(item: Item) -> Self {
        Self::Item(item)
    }
}

impl From<Collection> for Entity {
    fn from(collection: Collection) -> Self {
        Self::Collection(collection)
    }
}
