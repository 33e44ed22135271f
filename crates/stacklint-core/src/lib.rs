//! # stacklint-core — Foundational Types
//!
//! This crate is the bedrock of the stacklint workspace. It defines the
//! primitives every other crate builds on and depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **`CanonicalBytes` newtype.** All content hashing flows through
//!    `CanonicalBytes::new()` (exact) or `CanonicalBytes::scalar_insensitive()`
//!    (for predicates compared as strings). No raw `serde_json::to_vec()` for
//!    cache keys or condition hashes.
//!
//! 2. **`ContentDigest` from canonical bytes only.** `sha256_digest()` accepts
//!    `&CanonicalBytes`, so two structurally equal JSON values always hash
//!    identically regardless of key order.
//!
//! 3. **Validated `Region` newtype.** Region identifiers are checked at
//!    construction and know their partition, URL suffix and availability
//!    zones.
//!
//! 4. **Immutable template model.** [`Template`] is built once from a parsed
//!    document and is only read afterwards.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `stacklint-*` crates (this is the leaf of the DAG).
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod canonical;
pub mod digest;
pub mod error;
pub mod identity;
pub mod path;
pub mod template;
pub mod yaml;

// Re-export primary types for ergonomic imports.
pub use canonical::{CanonicalBytes, Encoding};
pub use digest::{sha256_digest, ContentDigest};
pub use error::{CanonicalizationError, CoreError, TemplateError};
pub use identity::{Partition, Region};
pub use path::{DocumentPath, PathSegment};
pub use template::{Parameter, Resource, Template, TemplateIssue};
pub use yaml::{load_document, parse_json, parse_yaml};
