//! Entity and index document builders

use chrono::{DateTime, Utc};
use kumquat::{
    db::search::fields,
    models::{Collection, EntityKind, Item},
};
use serde_json::{json, Map, Value};

pub fn item(id: &str) -> Item {
    Item {
        repository_id: id.to_string(),
        collection_repository_id: None,
        parent_repository_id: None,
        title: Some(format!("Item {}", id)),
        variant: None,
        media_type: None,
        published: true,
        updated_at: DateTime::<Utc>::UNIX_EPOCH,
    }
}

pub fn collection(id: &str) -> Collection {
    Collection {
        repository_id: id.to_string(),
        parent_repository_id: None,
        title: Some(format!("Collection {}", id)),
        description: None,
        published: true,
        updated_at: DateTime::<Utc>::UNIX_EPOCH,
    }
}

/// A search response body with the given `(index, id)` hits.
pub fn response(total: u64, hits: &[(&str, &str)]) -> Value {
    let hits: Vec<Value> = hits
        .iter()
        .map(|(index, id)| {
            json!({
                "_index": index,
                "_id": id,
                "_score": 1.0,
                "_source": {"repository_id": id}
            })
        })
        .collect();
    json!({
        "took": 2,
        "timed_out": false,
        "hits": {"total": {"value": total, "relation": "eq"}, "hits": hits}
    })
}

/// Source document of an indexed entity.
///
/// Starts out published and unrestricted.
pub struct Doc {
    kind: EntityKind,
    source: Map<String, Value>,
}

pub fn item_doc(id: &str) -> Doc {
    Doc::new(EntityKind::Item, id)
}

pub fn collection_doc(id: &str) -> Doc {
    Doc::new(EntityKind::Collection, id)
}

impl Doc {
    fn new(kind: EntityKind, id: &str) -> Self {
        let mut source = Map::new();
        source.insert(fields::REPOSITORY_ID.into(), json!(id));
        source.insert(fields::CLASS.into(), json!(kind.as_str()));
        source.insert(fields::PUBLICLY_ACCESSIBLE.into(), json!(true));
        source.insert(fields::ALLOWED_ROLES.into(), json!([]));
        source.insert(fields::ALLOWED_ROLE_COUNT.into(), json!(0));
        source.insert(fields::DENIED_ROLES.into(), json!([]));
        Self { kind, source }
    }

    pub fn set(mut self, field: &str, value: Value) -> Self {
        self.source.insert(field.to_string(), value);
        self
    }

    /// Sets the title and copies it into the search-all field.
    pub fn title(self, title: &str) -> Self {
        self.set(fields::TITLE, json!(title))
            .set(fields::SEARCH_ALL, json!(title))
    }

    pub fn unpublished(self) -> Self {
        self.set(fields::PUBLICLY_ACCESSIBLE, json!(false))
    }

    pub fn allowed_roles(self, roles: &[&str]) -> Self {
        self.set(fields::ALLOWED_ROLES, json!(roles))
            .set(fields::ALLOWED_ROLE_COUNT, json!(roles.len()))
    }

    pub fn denied_roles(self, roles: &[&str]) -> Self {
        self.set(fields::DENIED_ROLES, json!(roles))
    }

    pub fn parent(self, parent_id: &str) -> Self {
        let field = fields::parent_field(self.kind);
        self.set(field, json!(parent_id))
    }

    pub fn in_collection(self, collection_id: &str) -> Self {
        self.set(fields::COLLECTION, json!(collection_id))
    }

    pub fn build(self) -> Value {
        Value::Object(self.source)
    }
}
