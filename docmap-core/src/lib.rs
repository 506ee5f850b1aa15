//! # docmap-core
//!
//! Staged, type-safe builders for inserting, updating and reading domain
//! objects in a document store.
//!
//! This crate provides:
//! - Fluent insert, update and find operations whose stages only expose
//!   the calls that are legal at that point
//! - A criteria and update DSL that renders to BSON
//! - Query mapping from domain field names to stored field names
//! - Reactive (futures and streams) and blocking execution styles
//! - The [`DocumentEngine`] seam that drivers implement
//!
//! ## Example
//!
//! ```rust,ignore
//! use docmap_core::prelude::*;
//!
//! #[derive(Debug, Serialize, Deserialize)]
//! struct Jedi {
//!     firstname: String,
//!     lastname: Option<String>,
//! }
//!
//! impl Entity for Jedi {
//!     const COLLECTION: Option<&'static str> = Some("star-wars");
//! }
//!
//! let template = DocumentTemplate::new(engine);
//!
//! template
//!     .insert::<Jedi>()
//!     .one(Jedi { firstname: "luke".into(), lastname: None })
//!     .await?;
//!
//! let result = template
//!     .update::<Jedi>()
//!     .matching(query(where_("firstname").is("luke")))
//!     .apply(Update::set_value("lastname", "skywalker"))
//!     .first()
//!     .await?;
//! ```
//!
//! ## Blocking
//!
//! The same chains run synchronously on a [`Blocking`] template:
//!
//! ```rust,ignore
//! let template = DocumentTemplate::blocking(engine)?;
//! let all: Vec<Jedi> = template.find_all::<Jedi>()?;
//! ```

pub mod engine;
pub mod entity;
pub mod error;
pub mod execution;
pub mod mapper;
pub mod operations;
pub mod options;
pub mod query;
pub mod template;
pub mod update;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use bson::{Bson, Document, doc};
pub use engine::{
    BoxFuture, BoxStream, DocumentEngine, FindCommand, InsertManyCommand, InsertOneCommand,
    UpdateCommand,
};
pub use entity::{DomainType, Entity};
pub use error::{DataAccessError, DataAccessResult, ErrorCode, ErrorContext};
pub use execution::{Blocking, Execution, Reactive};
pub use mapper::QueryMapper;
pub use operations::OperationSpec;
pub use options::{UpdateMode, UpdateOptions, UpdateOutcome, UpdateResult};
pub use query::{Criteria, Query, query, where_};
pub use template::DocumentTemplate;
pub use update::Update;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::engine::DocumentEngine;
    pub use crate::entity::{DomainType, Entity};
    pub use crate::error::{DataAccessError, DataAccessResult, ErrorCode};
    pub use crate::execution::{Blocking, Execution, Reactive};
    pub use crate::options::{UpdateOptions, UpdateResult};
    pub use crate::query::{Criteria, Query, query, where_};
    pub use crate::template::DocumentTemplate;
    pub use crate::update::Update;
    pub use bson::{Bson, Document, doc};
    pub use serde::{Deserialize, Serialize};
}
