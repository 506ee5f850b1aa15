//! # docmap
//!
//! Staged, type-safe insert, update and find operations for document stores.
//!
//! docmap provides:
//! - Fluent builders whose stages only expose the calls that are legal next
//! - A criteria and update DSL that renders to BSON
//! - Reactive (futures and streams) and blocking execution styles
//! - A MongoDB engine on top of the official driver
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use docmap::prelude::*;
//!
//! #[derive(Debug, Serialize, Deserialize)]
//! pub struct Customer {
//!     pub firstname: String,
//!     pub lastname: String,
//! }
//!
//! impl Entity for Customer {}
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = MongoEngine::connect(MongoConfig::from_env()?).await?;
//!     let template = DocumentTemplate::new(engine);
//!
//!     template
//!         .insert::<Customer>()
//!         .in_collection("people")
//!         .one(Customer { firstname: "Dave".into(), lastname: "Matthews".into() })
//!         .await?;
//!
//!     let result = template
//!         .update::<Customer>()
//!         .in_collection("people")
//!         .matching(query(where_("firstname").is("Dave")))
//!         .apply(Update::set_value("lastname", "Skywalker"))
//!         .all()
//!         .await?;
//!
//!     println!("modified {}", result.modified_count);
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub use docmap_core;

/// MongoDB engine.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use docmap_mongodb::*;
}

/// Prelude module for convenient imports.
pub mod prelude {
    pub use docmap_core::prelude::*;

    #[cfg(feature = "mongodb")]
    pub use docmap_mongodb::{MongoClient, MongoConfig, MongoEngine};
}

// Re-export key types at the crate root
pub use docmap_core::{
    DataAccessError, DataAccessResult, DocumentEngine, DocumentTemplate, Entity, ErrorCode,
    Query, Update, UpdateOptions, UpdateResult, query, where_,
};
