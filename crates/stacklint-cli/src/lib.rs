//! # stacklint-cli — Command-Line Interface
//!
//! Lints template files with the standard rule collection and reports the
//! findings.
//!
//! ## Exit Status
//!
//! The process exits with the bitwise OR of the severities found: `2` for
//! errors, `4` for warnings, `8` for informational findings, `0` when clean.
//! `1` means the run itself failed (unreadable file, bad configuration).
//!
//! ## Crate Policy
//!
//! - Argument parsing lives in `main.rs`; handlers take parsed arguments and
//!   return the exit status.
//! - Linting is delegated to `stacklint-engine` and `stacklint-rules`.
//! - Only the binary installs a tracing subscriber.

pub mod lint;
pub mod output;
