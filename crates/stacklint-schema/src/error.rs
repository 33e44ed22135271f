//! Errors raised while loading provider schemas.

use std::path::PathBuf;

use thiserror::Error;

/// Error loading or registering a resource provider schema.
#[derive(Error, Debug)]
pub enum SchemaStoreError {
    /// The schema directory or a schema file could not be read.
    #[error("cannot read {path}: {source}")]
    Read {
        /// File or directory that failed.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// A schema file is not valid JSON.
    #[error("schema file {path} is not valid JSON: {reason}")]
    Parse {
        /// Offending file.
        path: PathBuf,
        /// Parser message.
        reason: String,
    },

    /// A provider schema does not conform to the provider meta-schema.
    #[error("provider schema for '{type_name}' is invalid:\n{}", violations.join("\n"))]
    Invalid {
        /// `typeName` of the schema, or the file name if absent.
        type_name: String,
        /// One line per violation: `<instance path>: <message>`.
        violations: Vec<String>,
    },

    /// The provider meta-schema itself failed to compile.
    #[error("provider meta-schema failed to compile: {0}")]
    MetaSchema(String),

    /// A directory under the store root is not a region name.
    #[error("schema directory '{0}' is neither 'all' nor a region name")]
    UnknownRegionDirectory(String),
}
