//! # Engine Errors
//!
//! - [`ResolveError`]: the resolver's two signals. `Unpredictable` means
//!   "cannot validate further here" and is never reported; `Invalid` is a
//!   provable authoring error and becomes a diagnostic.
//! - [`ConfigurationError`]: the surrounding tool is misconfigured. Always
//!   fatal; raised at registry build or linter construction.
//! - [`LintError`]: failures of a lint run before validation starts.

use thiserror::Error;

use stacklint_core::{CoreError, PathSegment, TemplateError};
use stacklint_schema::SchemaStoreError;

/// Why an intrinsic function produced no candidates.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// The value depends on deploy-time information.
    #[error("{function} cannot be resolved statically: {reason}")]
    Unpredictable {
        /// Function being resolved.
        function: String,
        /// What is unknown.
        reason: String,
    },

    /// The invocation is provably wrong.
    #[error("{message}")]
    Invalid {
        /// Function that raised the error.
        function: String,
        /// Author-facing message.
        message: String,
        /// Path of the offending node below the resolved value.
        path: Vec<PathSegment>,
    },
}

impl ResolveError {
    /// Shorthand for [`ResolveError::Unpredictable`].
    pub fn unpredictable(function: &str, reason: impl Into<String>) -> Self {
        Self::Unpredictable {
            function: function.to_string(),
            reason: reason.into(),
        }
    }

    /// The function the error is about.
    pub fn function(&self) -> &str {
        match self {
            Self::Unpredictable { function, .. } | Self::Invalid { function, .. } => function,
        }
    }

    /// Place an `Invalid` below `prefix`. `Unpredictable` is unchanged.
    pub fn within(self, prefix: &[PathSegment]) -> Self {
        match self {
            Self::Invalid {
                function,
                message,
                path,
            } => Self::Invalid {
                function,
                message,
                path: prefix.iter().cloned().chain(path).collect(),
            },
            other => other,
        }
    }
}

/// The rule collection or lint configuration is unusable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// A child check names a parent rule that was never registered.
    #[error("child rule {child} names unknown parent rule {parent}")]
    UnknownParent {
        /// The missing parent id.
        parent: String,
        /// The orphaned child id.
        child: String,
    },

    /// Two checks share a rule id.
    #[error("rule id {0} is registered more than once")]
    DuplicateRule(String),

    /// A declared keyword has no check registered for it.
    #[error("keyword {0:?} is declared but has no checks")]
    KeywordWithoutChecks(String),

    /// A rule id is not of the form `E1234`, `W1234` or `I1234`.
    #[error("invalid rule id {0:?}")]
    InvalidRuleId(String),

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Failure of a lint run before validation.
#[derive(Error, Debug)]
pub enum LintError {
    /// Registry or configuration problem.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// Schema store could not be loaded.
    #[error(transparent)]
    Schema(#[from] SchemaStoreError),

    /// Document could not be read or parsed.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Document root is not a template.
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// Configuration file could not be parsed.
    #[error("cannot parse configuration {path}: {reason}")]
    ConfigFile {
        /// The configuration file.
        path: String,
        /// Parser message.
        reason: String,
    },
}
