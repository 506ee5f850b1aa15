//! # docmap-mongodb
//!
//! MongoDB execution engine for docmap templates.
//!
//! This crate provides:
//! - Connection configuration, including environment overrides
//! - A client wrapper over the official driver, which owns pooling
//! - [`MongoEngine`], the [`DocumentEngine`](docmap_core::DocumentEngine)
//!   that runs template commands
//! - Translation of driver failures into [`DataAccessError`](docmap_core::DataAccessError)
//!
//! ## Example
//!
//! ```rust,ignore
//! use docmap_core::prelude::*;
//! use docmap_mongodb::{MongoConfig, MongoEngine};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = MongoEngine::connect(MongoConfig::from_env()?).await?;
//!     let template = DocumentTemplate::new(engine);
//!
//!     template
//!         .insert::<Customer>()
//!         .one(Customer::new("Dave", "Matthews"))
//!         .await?;
//!
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod document;
pub mod engine;
pub mod error;

pub use bson::oid::ObjectId;
pub use client::{MongoClient, MongoClientBuilder};
pub use config::{MongoConfig, MongoConfigBuilder, ReadPreference, WriteConcern};
pub use document::DocumentExt;
pub use engine::MongoEngine;
pub use error::{MongoError, MongoResult};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::client::{MongoClient, MongoClientBuilder};
    pub use crate::config::{MongoConfig, MongoConfigBuilder};
    pub use crate::document::DocumentExt;
    pub use crate::engine::MongoEngine;
    pub use crate::error::{MongoError, MongoResult};
    pub use bson::oid::ObjectId;
}
