//! Domain types and their runtime descriptors.

use std::fmt;

use serde::Serialize;
use serde::de::DeserializeOwned;

/// A type that can be stored as a document.
///
/// The collection a type lives in defaults to its simple type name with the
/// first letter lowercased (`Customer` lives in `customer`). Override
/// [`Entity::COLLECTION`] to pin it to another collection.
///
/// ```rust
/// use docmap_core::Entity;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, Serialize, Deserialize)]
/// struct Jedi {
///     firstname: String,
/// }
///
/// impl Entity for Jedi {
///     const COLLECTION: Option<&'static str> = Some("star-wars");
/// }
/// ```
pub trait Entity: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Explicit collection name for this type.
    const COLLECTION: Option<&'static str> = None;
}

/// Runtime descriptor of a domain type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DomainType {
    name: &'static str,
    collection: Option<&'static str>,
}

impl DomainType {
    /// Describe the entity type `T`.
    pub fn of<T: Entity>() -> Self {
        Self {
            name: simple_type_name(std::any::type_name::<T>()),
            collection: T::COLLECTION,
        }
    }

    /// The simple type name, without module path or generics.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The explicit collection name, if the type declares one.
    pub fn collection(&self) -> Option<&'static str> {
        self.collection
    }

    /// The collection name derived from the type alone.
    pub fn default_collection_name(&self) -> String {
        match self.collection {
            Some(collection) => collection.to_string(),
            None => uncapitalize(self.name),
        }
    }
}

impl fmt::Display for DomainType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

fn simple_type_name(full: &'static str) -> &'static str {
    let base = match full.find('<') {
        Some(idx) => &full[..idx],
        None => full,
    };
    match base.rfind("::") {
        Some(idx) => &base[idx + 2..],
        None => base,
    }
}

fn uncapitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}
