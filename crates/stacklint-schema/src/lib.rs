//! # stacklint-schema — Resource-Schema Store
//!
//! Provides the per-resource-type provider schemas the validator walks.
//!
//! ## Store (`store`)
//!
//! [`SchemaStore`] is the lookup seam the engine consumes:
//! `resource_schema(type, region)`. [`InMemorySchemaStore`] implements it
//! and can be filled programmatically, from a directory laid out by region
//! ([`InMemorySchemaStore::load_dir`]), or from the small schema set
//! compiled into this crate ([`InMemorySchemaStore::bundled`]).
//!
//! ## Meta-Validation (`meta`)
//!
//! Every provider schema is checked against the provider meta-schema with
//! the `jsonschema` crate before it is admitted. A store never holds a
//! schema whose pointer lists or `typeName` are malformed.
//!
//! ## Crate Policy
//!
//! - Depends only on `stacklint-core` internally.
//! - Loading happens before validation; stores are immutable afterwards and
//!   shared behind `Arc`.

pub mod error;
pub mod meta;
pub mod resource;
pub mod store;

pub use error::SchemaStoreError;
pub use meta::MetaValidator;
pub use resource::{pointer_to_path, ResourceSchema};
pub use store::{InMemorySchemaStore, SchemaStore};
