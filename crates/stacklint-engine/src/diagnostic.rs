//! # Diagnostics
//!
//! [`ValidationError`] is what keyword checks and the dispatch loop emit
//! while walking one resource. [`Diagnostic`] is the merged, region-aware
//! record a lint run returns. Neither is mutated after emission, except that
//! the dispatch loop fills in the keyword and rule of a raw error that lacks
//! them.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use stacklint_core::{path::render, PathSegment, Region};

use crate::context::Context;
use crate::error::ConfigurationError;

/// How serious a rule's findings are.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Informational,
}

impl Severity {
    /// Exit-code bit contributed by findings of this severity.
    pub fn exit_bit(self) -> u8 {
        match self {
            Self::Error => 2,
            Self::Warning => 4,
            Self::Informational => 8,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Informational => "info",
        })
    }
}

fn rule_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[EWI]\d{4}$").expect("BUG: hardcoded rule id pattern rejected by regex")
    })
}

/// Identity and description of a rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RuleMeta {
    id: String,
    description: String,
    severity: Severity,
}

impl RuleMeta {
    /// Create rule metadata; severity follows the id prefix (`E`, `W`, `I`).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::InvalidRuleId`] for malformed ids.
    pub fn new(id: &str, description: impl Into<String>) -> Result<Self, ConfigurationError> {
        if !rule_id_pattern().is_match(id) {
            return Err(ConfigurationError::InvalidRuleId(id.to_string()));
        }
        let severity = match id.as_bytes()[0] {
            b'E' => Severity::Error,
            b'W' => Severity::Warning,
            _ => Severity::Informational,
        };
        Ok(Self {
            id: id.to_string(),
            description: description.into(),
            severity,
        })
    }

    /// Rule id, e.g. `E3012`.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// One-line description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Severity of the rule's findings.
    pub fn severity(&self) -> Severity {
        self.severity
    }
}

/// A raw finding from one validation walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Author-facing message.
    pub message: String,
    /// Document path of the offending node.
    pub path: Vec<PathSegment>,
    /// Resource-type-relative schema path.
    pub schema_path: Vec<String>,
    /// Schema keyword that produced the error.
    pub keyword: Option<String>,
    /// Rule the error is attributed to.
    pub rule: Option<RuleMeta>,
}

impl ValidationError {
    /// An unattributed error at the context's position.
    pub fn new(ctx: &Context, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: ctx.path().path().to_vec(),
            schema_path: ctx.path().cfn_path().to_vec(),
            keyword: None,
            rule: None,
        }
    }

    /// Attribute the error to `rule` under `keyword`.
    pub fn with_rule(mut self, keyword: &str, rule: &RuleMeta) -> Self {
        self.keyword = Some(keyword.to_string());
        self.rule = Some(rule.clone());
        self
    }

    /// Fill in the keyword and rule only where missing.
    pub(crate) fn attribute(&mut self, keyword: &str, rule: &RuleMeta) {
        if self.keyword.is_none() {
            self.keyword = Some(keyword.to_string());
        }
        if self.rule.is_none() {
            self.rule = Some(rule.clone());
        }
    }
}

/// A finding returned by a lint run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Rule id.
    pub rule_id: String,
    /// Severity of the rule.
    pub severity: Severity,
    /// Author-facing message.
    pub message: String,
    /// Document path.
    pub path: Vec<PathSegment>,
    /// Resource-type-relative schema path.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub schema_path: Vec<String>,
    /// Regions in which the finding occurs; empty when region-independent.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub regions: Vec<Region>,
}

impl Diagnostic {
    /// A region-independent diagnostic.
    pub fn new(rule: &RuleMeta, message: impl Into<String>, path: Vec<PathSegment>) -> Self {
        Self {
            rule_id: rule.id().to_string(),
            severity: rule.severity(),
            message: message.into(),
            path,
            schema_path: Vec::new(),
            regions: Vec::new(),
        }
    }

    /// The document path rendered as `A/B/0`.
    pub fn display_path(&self) -> String {
        render(&self.path)
    }

    /// Identity used to merge findings across regions.
    pub(crate) fn merge_key(&self) -> (String, Vec<PathSegment>, String) {
        (self.rule_id.clone(), self.path.clone(), self.message.clone())
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.rule_id, self.display_path(), self.message)
    }
}
