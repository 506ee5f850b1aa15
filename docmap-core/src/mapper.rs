//! Maps property names used in queries, updates and documents onto stored
//! field names.
//!
//! A domain type's `id` property is stored as `_id`. Hex strings given for it
//! are converted to `ObjectId`s so they compare equal to driver-assigned ids.
//! Documents read back get their `_id` copied to `id` again.

use bson::{Bson, Document, oid::ObjectId};

const ID_PROPERTY: &str = "id";
const ID_FIELD: &str = "_id";

/// Rewrites filter and update documents before they reach the engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryMapper;

impl QueryMapper {
    /// Create a mapper.
    pub fn new() -> Self {
        Self
    }

    /// Map a filter document.
    pub fn map_filter(&self, filter: Document) -> Document {
        let mut mapped = Document::new();
        for (key, value) in filter {
            match key.as_str() {
                "$and" | "$or" | "$nor" => {
                    mapped.insert(key, self.map_clauses(value));
                }
                ID_PROPERTY | ID_FIELD => {
                    mapped.insert(ID_FIELD, map_id_value(value));
                }
                _ => {
                    mapped.insert(key, value);
                }
            }
        }
        mapped
    }

    /// Map an update document; keys inside each operator are renamed.
    pub fn map_update(&self, update: Document) -> Document {
        let mut mapped = Document::new();
        for (op, value) in update {
            let value = match value {
                Bson::Document(fields) => Bson::Document(
                    fields
                        .into_iter()
                        .map(|(k, v)| {
                            if k == ID_PROPERTY {
                                (ID_FIELD.to_string(), map_id_value(v))
                            } else {
                                (k, v)
                            }
                        })
                        .collect(),
                ),
                other => other,
            };
            mapped.insert(op, value);
        }
        mapped
    }

    /// Map a document about to be written.
    ///
    /// A top-level `id` becomes `_id` unless the document already has one.
    /// A null `id` is dropped so the engine assigns the key.
    pub fn map_document(&self, mut document: Document) -> Document {
        if document.contains_key(ID_FIELD) {
            return document;
        }
        match document.remove(ID_PROPERTY) {
            None | Some(Bson::Null) => document,
            Some(value) => {
                let mut mapped = Document::new();
                mapped.insert(ID_FIELD, map_id_value(value));
                mapped.extend(document);
                mapped
            }
        }
    }

    /// Map a stored document back onto property names.
    ///
    /// `_id` is copied to `id` when the document has no `id` of its own.
    pub fn unmap_document(&self, mut document: Document) -> Document {
        if !document.contains_key(ID_PROPERTY) {
            if let Some(key) = document.get(ID_FIELD).cloned() {
                document.insert(ID_PROPERTY, key);
            }
        }
        document
    }

    /// The same document with an `ObjectId` `id` rendered as its hex string.
    ///
    /// `None` when `id` is not an `ObjectId`.
    pub fn with_hex_id(&self, document: &Document) -> Option<Document> {
        match document.get(ID_PROPERTY) {
            Some(Bson::ObjectId(oid)) => {
                let mut hex = document.clone();
                hex.insert(ID_PROPERTY, oid.to_hex());
                Some(hex)
            }
            _ => None,
        }
    }

    fn map_clauses(&self, value: Bson) -> Bson {
        match value {
            Bson::Array(clauses) => Bson::Array(
                clauses
                    .into_iter()
                    .map(|clause| match clause {
                        Bson::Document(doc) => Bson::Document(self.map_filter(doc)),
                        other => other,
                    })
                    .collect(),
            ),
            other => other,
        }
    }
}

fn map_id_value(value: Bson) -> Bson {
    match value {
        Bson::String(s) => match ObjectId::parse_str(&s) {
            Ok(oid) => Bson::ObjectId(oid),
            Err(_) => Bson::String(s),
        },
        Bson::Document(ops) => Bson::Document(
            ops.into_iter()
                .map(|(op, v)| (op, map_id_value(v)))
                .collect(),
        ),
        Bson::Array(values) => Bson::Array(values.into_iter().map(map_id_value).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_id_property_renamed() {
        let mapped = QueryMapper::new().map_filter(doc! { "id": 42, "name": "Dave" });
        assert_eq!(mapped, doc! { "_id": 42, "name": "Dave" });
    }

    #[test]
    fn test_hex_id_becomes_object_id() {
        let oid = ObjectId::new();
        let mapped = QueryMapper::new().map_filter(doc! { "id": oid.to_hex() });
        assert_eq!(mapped.get_object_id("_id").unwrap(), oid);
    }

    #[test]
    fn test_non_hex_id_stays_string() {
        let mapped = QueryMapper::new().map_filter(doc! { "id": "dave" });
        assert_eq!(mapped, doc! { "_id": "dave" });
    }

    #[test]
    fn test_id_inside_operator_and_in() {
        let oid = ObjectId::new();
        let mapped = QueryMapper::new().map_filter(doc! { "id": { "$in": [oid.to_hex()] } });
        assert_eq!(mapped, doc! { "_id": { "$in": [oid] } });
    }

    #[test]
    fn test_nested_or_clauses() {
        let mapped =
            QueryMapper::new().map_filter(doc! { "$or": [ { "id": 1 }, { "name": "x" } ] });
        assert_eq!(mapped, doc! { "$or": [ { "_id": 1 }, { "name": "x" } ] });
    }

    #[test]
    fn test_update_keys_renamed() {
        let mapped = QueryMapper::new().map_update(doc! { "$set": { "id": 7, "a": 1 } });
        assert_eq!(mapped, doc! { "$set": { "_id": 7, "a": 1 } });
    }

    #[test]
    fn test_written_id_becomes_key() {
        let oid = ObjectId::new();
        let mapper = QueryMapper::new();

        assert_eq!(
            mapper.map_document(doc! { "name": "Dave", "id": "dave" }),
            doc! { "_id": "dave", "name": "Dave" }
        );
        assert_eq!(
            mapper.map_document(doc! { "id": oid.to_hex() }),
            doc! { "_id": oid }
        );
    }

    #[test]
    fn test_null_id_left_for_engine() {
        let mapped = QueryMapper::new().map_document(doc! { "id": null, "name": "Dave" });
        assert_eq!(mapped, doc! { "name": "Dave" });
    }

    #[test]
    fn test_explicit_key_wins_on_write() {
        let mapped = QueryMapper::new().map_document(doc! { "_id": 1, "id": 2 });
        assert_eq!(mapped, doc! { "_id": 1, "id": 2 });
    }

    #[test]
    fn test_read_copies_key_to_id() {
        let mapper = QueryMapper::new();

        assert_eq!(
            mapper.unmap_document(doc! { "_id": "dave", "name": "Dave" }),
            doc! { "_id": "dave", "name": "Dave", "id": "dave" }
        );
        assert_eq!(
            mapper.unmap_document(doc! { "_id": 1, "id": 2 }),
            doc! { "_id": 1, "id": 2 }
        );
    }

    #[test]
    fn test_hex_variant_only_for_object_ids() {
        let oid = ObjectId::new();
        let mapper = QueryMapper::new();

        assert_eq!(
            mapper.with_hex_id(&doc! { "id": oid }),
            Some(doc! { "id": oid.to_hex() })
        );
        assert_eq!(mapper.with_hex_id(&doc! { "id": "dave" }), None);
    }
}
