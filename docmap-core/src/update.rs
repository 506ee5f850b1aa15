//! Update definitions.

use bson::{Bson, Document};
use indexmap::IndexMap;

/// An update document built from operators.
///
/// ```rust
/// use docmap_core::Update;
///
/// let update = Update::new().set("lastname", "Skywalker").inc("visits", 1);
/// let doc = update.update_document();
///
/// assert_eq!(doc.get_document("$set").unwrap().get_str("lastname").unwrap(), "Skywalker");
/// assert_eq!(doc.get_document("$inc").unwrap().get_i32("visits").unwrap(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
    operators: IndexMap<&'static str, Document>,
}

impl Update {
    /// Create an empty update.
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for `Update::new().set(key, value)`.
    pub fn set_value(key: impl Into<String>, value: impl Into<Bson>) -> Self {
        Self::new().set(key, value)
    }

    /// `$set` a field.
    pub fn set(self, key: impl Into<String>, value: impl Into<Bson>) -> Self {
        self.push_operator("$set", key.into(), value.into())
    }

    /// `$unset` a field.
    pub fn unset(self, key: impl Into<String>) -> Self {
        self.push_operator("$unset", key.into(), Bson::Int32(1))
    }

    /// `$inc` a numeric field.
    pub fn inc(self, key: impl Into<String>, amount: impl Into<Bson>) -> Self {
        self.push_operator("$inc", key.into(), amount.into())
    }

    /// `$push` a value onto an array field.
    pub fn push(self, key: impl Into<String>, value: impl Into<Bson>) -> Self {
        self.push_operator("$push", key.into(), value.into())
    }

    /// `$setOnInsert` a field; only applied when an upsert inserts.
    pub fn set_on_insert(self, key: impl Into<String>, value: impl Into<Bson>) -> Self {
        self.push_operator("$setOnInsert", key.into(), value.into())
    }

    /// `$rename` a field.
    pub fn rename(self, old: impl Into<String>, new: impl Into<String>) -> Self {
        self.push_operator("$rename", old.into(), Bson::String(new.into()))
    }

    /// Whether no operator was added.
    pub fn is_empty(&self) -> bool {
        self.operators.values().all(Document::is_empty)
    }

    /// Build the update document, operators in first-use order.
    pub fn update_document(&self) -> Document {
        let mut doc = Document::new();
        for (op, fields) in &self.operators {
            doc.insert(*op, fields.clone());
        }
        doc
    }

    fn push_operator(mut self, op: &'static str, key: String, value: Bson) -> Self {
        self.operators.entry(op).or_default().insert(key, value);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_set() {
        let update = Update::set_value("lastname", "Skywalker");
        assert_eq!(
            update.update_document(),
            doc! { "$set": { "lastname": "Skywalker" } }
        );
    }

    #[test]
    fn test_operators_grouped() {
        let update = Update::new()
            .set("a", 1)
            .inc("count", 2)
            .set("b", "x")
            .unset("c");
        assert_eq!(
            update.update_document(),
            doc! {
                "$set": { "a": 1, "b": "x" },
                "$inc": { "count": 2 },
                "$unset": { "c": 1 }
            }
        );
    }

    #[test]
    fn test_rename_and_push() {
        let update = Update::new().rename("name", "fullname").push("tags", "new");
        assert_eq!(
            update.update_document(),
            doc! { "$rename": { "name": "fullname" }, "$push": { "tags": "new" } }
        );
    }

    #[test]
    fn test_empty() {
        assert!(Update::new().is_empty());
        assert!(!Update::set_value("a", 1).is_empty());
    }
}
