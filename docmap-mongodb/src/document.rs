//! Document helpers for values read from and written to MongoDB.

use bson::{Bson, Document, oid::ObjectId};
use docmap_core::Entity;

use crate::error::{MongoError, MongoResult};

/// Accessors for the fields the engine and callers commonly need.
pub trait DocumentExt {
    /// The `_id` value, whatever its type.
    fn id(&self) -> Option<&Bson>;

    /// The `_id` field as an ObjectId.
    fn object_id(&self) -> MongoResult<ObjectId>;

    /// Sets `_id` to `id` unless the document already carries one.
    fn with_id(self, id: Bson) -> Document;

    /// A string field.
    fn str_field(&self, key: &str) -> MongoResult<&str>;

    /// An integer field stored as either Int32 or Int64.
    fn int_field(&self, key: &str) -> MongoResult<i64>;

    /// Read the document as an entity.
    fn into_entity<T: Entity>(self) -> MongoResult<T>;
}

impl DocumentExt for Document {
    fn id(&self) -> Option<&Bson> {
        self.get("_id")
    }

    fn object_id(&self) -> MongoResult<ObjectId> {
        self.get_object_id("_id")
            .map_err(|_| MongoError::field("field '_id' is not an ObjectId"))
    }

    fn with_id(mut self, id: Bson) -> Document {
        if !self.contains_key("_id") {
            self.insert("_id", id);
        }
        self
    }

    fn str_field(&self, key: &str) -> MongoResult<&str> {
        self.get_str(key)
            .map_err(|_| MongoError::field(format!("field '{}' is not a string", key)))
    }

    fn int_field(&self, key: &str) -> MongoResult<i64> {
        match self.get(key) {
            Some(Bson::Int32(v)) => Ok(i64::from(*v)),
            Some(Bson::Int64(v)) => Ok(*v),
            _ => Err(MongoError::field(format!("field '{}' is not an integer", key))),
        }
    }

    fn into_entity<T: Entity>(self) -> MongoResult<T> {
        from_document(self)
    }
}

/// Convert an entity to a BSON document.
pub fn to_document<T: Entity>(value: &T) -> MongoResult<Document> {
    Ok(bson::to_document(value)?)
}

/// Convert a BSON document to an entity.
pub fn from_document<T: Entity>(doc: Document) -> MongoResult<T> {
    Ok(bson::from_document(doc)?)
}

/// Parse an ObjectId from its hex form.
pub fn parse_object_id(s: &str) -> MongoResult<ObjectId> {
    ObjectId::parse_str(s).map_err(MongoError::from)
}

/// BSON conversions for UUID and chrono values, for use in criteria and
/// updates.
pub mod bson_types {
    use super::*;
    use chrono::{DateTime, Utc};
    use uuid::Uuid;

    /// Convert a UUID to BSON Binary (subtype 4).
    pub fn uuid_to_bson(uuid: Uuid) -> Bson {
        Bson::Binary(bson::Binary {
            subtype: bson::spec::BinarySubtype::Uuid,
            bytes: uuid.as_bytes().to_vec(),
        })
    }

    /// Convert BSON Binary or a hyphenated string to a UUID.
    pub fn bson_to_uuid(bson: &Bson) -> MongoResult<Uuid> {
        match bson {
            Bson::Binary(binary) => {
                let bytes: [u8; 16] = binary
                    .bytes
                    .as_slice()
                    .try_into()
                    .map_err(|_| MongoError::field("invalid UUID bytes"))?;
                Ok(Uuid::from_bytes(bytes))
            }
            Bson::String(s) => Uuid::parse_str(s)
                .map_err(|e| MongoError::field(format!("invalid UUID string: {}", e))),
            _ => Err(MongoError::field("expected Binary or String for UUID")),
        }
    }

    /// Store a UTC timestamp as a BSON datetime (millisecond precision).
    pub fn datetime_to_bson(dt: DateTime<Utc>) -> Bson {
        Bson::DateTime(bson::DateTime::from_chrono(dt))
    }

    /// Read a BSON datetime back as a UTC timestamp.
    pub fn bson_to_datetime(bson: &Bson) -> MongoResult<DateTime<Utc>> {
        match bson {
            Bson::DateTime(dt) => Ok(dt.to_chrono()),
            _ => Err(MongoError::field("expected DateTime")),
        }
    }
}
