//! # Error Types — Core Error Hierarchy
//!
//! Defines the error types shared by the foundational layer. All errors use
//! `thiserror` for derive-based `Display` and `Error` implementations.
//!
//! ## Design
//!
//! - Canonicalization errors are fatal for the value being hashed only.
//! - Template errors carry the document path of the offending node so the
//!   lint pass can attribute them.

use thiserror::Error;

/// Top-level error type for the core crate.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Canonicalization failed.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// The document could not be interpreted as a template.
    #[error("template error: {0}")]
    Template(#[from] TemplateError),

    /// A region identifier failed validation.
    #[error("invalid region identifier: {0:?}")]
    InvalidRegion(String),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// JSON serialization failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// Error while loading or interpreting a template document.
#[derive(Error, Debug)]
pub enum TemplateError {
    /// The document text is not valid JSON.
    #[error("invalid JSON at line {line}, column {column}: {reason}")]
    Json {
        /// 1-based line of the parse failure.
        line: usize,
        /// 1-based column of the parse failure.
        column: usize,
        /// Parser message.
        reason: String,
    },

    /// The document text is not valid YAML.
    #[error("invalid YAML: {0}")]
    Yaml(String),

    /// A YAML short-form tag could not be expanded.
    #[error("unsupported YAML tag {tag:?}: {reason}")]
    Tag {
        /// The tag as written, e.g. `!GetAtt`.
        tag: String,
        /// Why the tag could not be expanded.
        reason: String,
    },

    /// The document root is not a mapping.
    #[error("template root must be an object, found {found}")]
    NotAnObject {
        /// JSON type name of the root value.
        found: &'static str,
    },
}
