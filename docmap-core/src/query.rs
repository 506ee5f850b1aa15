//! Filter criteria and queries.
//!
//! [`Criteria`] builds a filter document one key at a time, [`Query`] wraps
//! it together with paging and sorting.
//!
//! ```rust
//! use docmap_core::query::{query, where_};
//!
//! let q = query(where_("firstname").is("Dave").and("age").gte(18).lt(65));
//! let filter = q.filter_document();
//!
//! // { "firstname": "Dave", "age": { "$gte": 18, "$lt": 65 } }
//! assert_eq!(filter.get_str("firstname").unwrap(), "Dave");
//! assert!(filter.get_document("age").unwrap().contains_key("$lt"));
//! ```

use bson::{Bson, Document, doc};

use crate::error::{DataAccessError, DataAccessResult};

/// Start a criteria chain on `key`.
pub fn where_(key: impl Into<String>) -> Criteria {
    Criteria::where_(key)
}

/// Wrap criteria into a query.
pub fn query(criteria: Criteria) -> Query {
    Query::new().add_criteria(criteria)
}

#[derive(Debug, Clone, Default)]
enum Condition {
    #[default]
    Unset,
    Is(Bson),
    Operators(Document),
}

/// Fluent builder for filter conditions, one key at a time.
#[derive(Debug, Clone)]
pub struct Criteria {
    done: Document,
    key: String,
    condition: Condition,
}

impl Criteria {
    /// Start a criteria chain on `key`.
    pub fn where_(key: impl Into<String>) -> Self {
        Self {
            done: Document::new(),
            key: key.into(),
            condition: Condition::Unset,
        }
    }

    /// Move on to another key.
    pub fn and(mut self, key: impl Into<String>) -> Self {
        self.flush();
        self.key = key.into();
        self
    }

    /// Equality.
    pub fn is(mut self, value: impl Into<Bson>) -> Self {
        let value = value.into();
        self.condition = match std::mem::take(&mut self.condition) {
            Condition::Operators(mut ops) => {
                ops.insert("$eq", value);
                Condition::Operators(ops)
            }
            _ => Condition::Is(value),
        };
        self
    }

    /// Not equal.
    pub fn ne(self, value: impl Into<Bson>) -> Self {
        self.operator("$ne", value.into())
    }

    /// Greater than.
    pub fn gt(self, value: impl Into<Bson>) -> Self {
        self.operator("$gt", value.into())
    }

    /// Greater than or equal.
    pub fn gte(self, value: impl Into<Bson>) -> Self {
        self.operator("$gte", value.into())
    }

    /// Less than.
    pub fn lt(self, value: impl Into<Bson>) -> Self {
        self.operator("$lt", value.into())
    }

    /// Less than or equal.
    pub fn lte(self, value: impl Into<Bson>) -> Self {
        self.operator("$lte", value.into())
    }

    /// Value is one of `values`.
    pub fn in_(self, values: impl IntoIterator<Item = impl Into<Bson>>) -> Self {
        let values: Vec<Bson> = values.into_iter().map(Into::into).collect();
        self.operator("$in", Bson::Array(values))
    }

    /// Value is none of `values`.
    pub fn nin(self, values: impl IntoIterator<Item = impl Into<Bson>>) -> Self {
        let values: Vec<Bson> = values.into_iter().map(Into::into).collect();
        self.operator("$nin", Bson::Array(values))
    }

    /// Field presence.
    pub fn exists(self, exists: bool) -> Self {
        self.operator("$exists", Bson::Boolean(exists))
    }

    /// Regular expression match.
    pub fn regex(self, pattern: &str) -> Self {
        self.operator("$regex", Bson::String(pattern.to_string()))
    }

    /// Combine alternatives with `$or`.
    pub fn or_operator(mut self, alternatives: Vec<Criteria>) -> Self {
        self.flush();
        let docs: Vec<Bson> = alternatives
            .into_iter()
            .map(|c| Bson::Document(c.to_document()))
            .collect();
        self.done.insert("$or", docs);
        self
    }

    /// Build the filter document.
    pub fn to_document(mut self) -> Document {
        self.flush();
        self.done
    }

    fn operator(mut self, op: &str, value: Bson) -> Self {
        self.condition = match std::mem::take(&mut self.condition) {
            Condition::Unset => Condition::Operators(doc! { op: value }),
            Condition::Is(eq) => Condition::Operators(doc! { "$eq": eq, op: value }),
            Condition::Operators(mut ops) => {
                ops.insert(op, value);
                Condition::Operators(ops)
            }
        };
        self
    }

    fn flush(&mut self) {
        match std::mem::take(&mut self.condition) {
            Condition::Unset => {}
            Condition::Is(value) => {
                self.done.insert(self.key.clone(), value);
            }
            Condition::Operators(ops) => {
                self.done.insert(self.key.clone(), ops);
            }
        }
    }
}

/// A filter plus paging and sort.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    criteria: Document,
    sort: Option<Document>,
    limit: Option<i64>,
    skip: Option<u64>,
}

impl Query {
    /// A query matching every document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a raw JSON filter, e.g. `{"firstname": "Dave"}`.
    pub fn from_json(json: &str) -> DataAccessResult<Self> {
        let criteria: Document = serde_json::from_str(json).map_err(|e| {
            DataAccessError::invalid_argument(format!("invalid filter JSON: {}", e))
        })?;
        Ok(Self {
            criteria,
            ..Self::default()
        })
    }

    /// Wrap an already built filter document.
    pub fn from_document(criteria: Document) -> Self {
        Self {
            criteria,
            ..Self::default()
        }
    }

    /// Merge more criteria into the filter. Later keys replace earlier ones.
    pub fn add_criteria(mut self, criteria: Criteria) -> Self {
        for (k, v) in criteria.to_document() {
            self.criteria.insert(k, v);
        }
        self
    }

    /// Limit the number of returned documents.
    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skip the first `skip` documents.
    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    /// Sort specification, e.g. `doc! { "lastname": 1 }`.
    pub fn with_sort(mut self, sort: Document) -> Self {
        self.sort = Some(sort);
        self
    }

    /// The filter document.
    pub fn filter_document(&self) -> Document {
        self.criteria.clone()
    }

    /// The sort document, if any.
    pub fn sort_document(&self) -> Option<&Document> {
        self.sort.as_ref()
    }

    /// The configured limit, if any.
    pub fn get_limit(&self) -> Option<i64> {
        self.limit
    }

    /// The configured skip, if any.
    pub fn get_skip(&self) -> Option<u64> {
        self.skip
    }

    /// Whether the filter matches every document.
    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }
}

impl From<Criteria> for Query {
    fn from(criteria: Criteria) -> Self {
        query(criteria)
    }
}
