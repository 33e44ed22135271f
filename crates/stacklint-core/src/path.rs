//! # Document Paths
//!
//! A position inside a template is tracked as three parallel sequences:
//!
//! - **path**: every key and index walked from the document root,
//!   including intrinsic-function wrapper keys and their arguments.
//! - **value_path**: the position of the *value* the author is setting.
//!   Function wrapper keys and function arguments are skipped, so the value
//!   path of `Properties/Name/Fn::Join/1/0` is `Properties/Name`.
//! - **cfn_path**: the resource-type-relative schema position used for
//!   schema lookup. List indices are replaced by `*`.
//!
//! ## Invariants
//!
//! - `value_path` and `path` diverge only inside function invocations.
//! - `cfn_path` never contains a list index.
//! - Every operation returns a new `DocumentPath`; none mutates its receiver.

use serde::{Deserialize, Serialize};

/// One step in a document path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    /// An object key.
    Key(String),
    /// A list index.
    Index(usize),
}

impl PathSegment {
    /// The key, if this segment is a key.
    pub fn as_key(&self) -> Option<&str> {
        match self {
            Self::Key(k) => Some(k),
            Self::Index(_) => None,
        }
    }
}

impl std::fmt::Display for PathSegment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Key(k) => f.write_str(k),
            Self::Index(i) => write!(f, "{i}"),
        }
    }
}

impl From<&str> for PathSegment {
    fn from(value: &str) -> Self {
        Self::Key(value.to_string())
    }
}

impl From<String> for PathSegment {
    fn from(value: String) -> Self {
        Self::Key(value)
    }
}

impl From<usize> for PathSegment {
    fn from(value: usize) -> Self {
        Self::Index(value)
    }
}

/// Render a segment sequence as `A/B/0/C`.
pub fn render(segments: &[PathSegment]) -> String {
    segments
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("/")
}

/// The three parallel position sequences of a node in the document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentPath {
    path: Vec<PathSegment>,
    value_path: Vec<PathSegment>,
    cfn_path: Vec<String>,
    in_function: bool,
}

impl DocumentPath {
    /// The empty root path.
    pub fn root() -> Self {
        Self::default()
    }

    /// Full document path.
    pub fn path(&self) -> &[PathSegment] {
        &self.path
    }

    /// Path of the value being set, skipping function wrappers.
    pub fn value_path(&self) -> &[PathSegment] {
        &self.value_path
    }

    /// Resource-type-relative schema path.
    pub fn cfn_path(&self) -> &[String] {
        &self.cfn_path
    }

    /// Whether the position lies inside a function's arguments.
    pub fn in_function(&self) -> bool {
        self.in_function
    }

    /// Descend into an ordinary key or index.
    pub fn push(&self, segment: impl Into<PathSegment>) -> Self {
        let segment = segment.into();
        let mut next = self.clone();
        if !self.in_function {
            next.value_path.push(segment.clone());
            next.cfn_path.push(match &segment {
                PathSegment::Key(k) => k.clone(),
                PathSegment::Index(_) => "*".to_string(),
            });
        }
        next.path.push(segment);
        next
    }

    /// Descend into a document key that lies outside the schema.
    ///
    /// Used for the `Resources/<Name>/Properties` prefix: schema paths are
    /// relative to a resource type's properties, so the prefix extends the
    /// document and value paths only.
    pub fn push_document(&self, segment: impl Into<PathSegment>) -> Self {
        let segment = segment.into();
        let mut next = self.clone();
        if !self.in_function {
            next.value_path.push(segment.clone());
        }
        next.path.push(segment);
        next
    }

    /// Descend into an intrinsic function wrapper key.
    ///
    /// The wrapper key and everything beneath it extend `path` only.
    pub fn enter_function(&self, name: &str) -> Self {
        let mut next = self.clone();
        next.path.push(PathSegment::Key(name.to_string()));
        next.in_function = true;
        next
    }

    /// Descend into a conditional branch whose value stands in for the
    /// enclosing property value.
    ///
    /// The branch index extends `path` only; below it the value and schema
    /// paths resume from where the function was entered.
    pub fn enter_branch(&self, index: usize) -> Self {
        let mut next = self.clone();
        next.path.push(PathSegment::Index(index));
        next.in_function = false;
        next
    }

    /// `path` rendered as `A/B/0`.
    pub fn display_path(&self) -> String {
        render(&self.path)
    }
}
