//! # stacklint-engine — Validation Engine
//!
//! Validates template resources against provider schemas while tracking
//! regions, condition assumptions and intrinsic functions.
//!
//! ## Components
//!
//! - [`Context`]: immutable per-position state, derived by [`Context::evolve`].
//! - [`Resolver`]: turns intrinsic functions into the finite set of values
//!   they can statically take.
//! - [`Validator`]: the schema dispatch loop; runs the [`KeywordCheck`]s of a
//!   [`Registry`] and handles function-valued instances.
//! - [`Linter`]: one pass per region over every resource, merged into
//!   [`Diagnostic`]s.
//!
//! ## Crate Policy
//!
//! - Keyword checks live outside this crate and plug in through
//!   [`RegistryBuilder`].
//! - Caches are pass-scoped and guarded by `parking_lot` mutexes; everything
//!   shared between passes is immutable behind `Arc`.
//! - Library code never installs a tracing subscriber.

pub mod builtin;
pub mod config;
pub mod context;
pub mod diagnostic;
pub mod error;
pub mod functions;
pub mod linter;
pub mod registry;
pub mod resolver;
pub mod validator;

pub use builtin::{builtin, BuiltinRules};
pub use config::LintConfig;
pub use context::{Changes, Context, PathStep};
pub use diagnostic::{Diagnostic, RuleMeta, Severity, ValidationError};
pub use error::{ConfigurationError, LintError, ResolveError};
pub use functions::{as_function, contains_function, is_no_value, Function, FunctionSet};
pub use linter::Linter;
pub use registry::{CheckNode, KeywordCheck, Registry, RegistryBuilder};
pub use resolver::{Candidate, ResolveCache, Resolver};
pub use validator::Validator;
