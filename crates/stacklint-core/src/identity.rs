//! # Region Identity
//!
//! Validated newtype for the region identifiers a template is linted
//! against. A region knows its partition, its URL suffix and, for the
//! regions in the built-in table, its availability zone names.
//!
//! ## Validation
//!
//! - Lowercase ASCII letters and digits separated by `-`.
//! - At least three segments (`us-east-1`, `us-gov-west-1`).
//! - The final segment is numeric.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Availability zone suffixes for the regions with a stable static layout.
///
/// Regions missing from this table resolve `Fn::GetAZs` as unpredictable.
const AVAILABILITY_ZONES: &[(&str, &[&str])] = &[
    ("us-east-1", &["a", "b", "c", "d", "e", "f"]),
    ("us-east-2", &["a", "b", "c"]),
    ("us-west-1", &["a", "c"]),
    ("us-west-2", &["a", "b", "c", "d"]),
    ("ca-central-1", &["a", "b", "d"]),
    ("eu-west-1", &["a", "b", "c"]),
    ("eu-west-2", &["a", "b", "c"]),
    ("eu-central-1", &["a", "b", "c"]),
    ("ap-northeast-1", &["a", "c", "d"]),
    ("ap-southeast-1", &["a", "b", "c"]),
    ("ap-southeast-2", &["a", "b", "c"]),
    ("sa-east-1", &["a", "b", "c"]),
    ("cn-north-1", &["a", "b"]),
    ("us-gov-west-1", &["a", "b", "c"]),
];

/// The partition a region belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Partition {
    /// Commercial regions.
    Aws,
    /// China regions.
    AwsCn,
    /// GovCloud regions.
    AwsUsGov,
    /// ISO regions.
    AwsIso,
    /// ISO-B regions.
    AwsIsoB,
}

impl Partition {
    /// The partition name as it appears in ARNs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Aws => "aws",
            Self::AwsCn => "aws-cn",
            Self::AwsUsGov => "aws-us-gov",
            Self::AwsIso => "aws-iso",
            Self::AwsIsoB => "aws-iso-b",
        }
    }

    /// The service endpoint domain suffix for this partition.
    pub fn url_suffix(&self) -> &'static str {
        match self {
            Self::AwsCn => "amazonaws.com.cn",
            Self::AwsIso => "c2s.ic.gov",
            Self::AwsIsoB => "sc2s.sgov.gov",
            Self::Aws | Self::AwsUsGov => "amazonaws.com",
        }
    }
}

impl std::fmt::Display for Partition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated region identifier, e.g. `us-east-1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Region(String);

impl Region {
    /// Create a region from a string, validating its format.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidRegion`] when the identifier is malformed.
    pub fn new(value: impl Into<String>) -> Result<Self, CoreError> {
        let s = value.into();
        Self::validate(&s)?;
        Ok(Self(s))
    }

    fn validate(s: &str) -> Result<(), CoreError> {
        let segments: Vec<&str> = s.split('-').collect();
        let well_formed = segments.len() >= 3
            && segments.iter().all(|seg| {
                !seg.is_empty()
                    && seg
                        .chars()
                        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
            })
            && segments
                .last()
                .is_some_and(|last| last.chars().all(|c| c.is_ascii_digit()));
        if well_formed {
            Ok(())
        } else {
            Err(CoreError::InvalidRegion(s.to_string()))
        }
    }

    /// Access the region string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The partition this region belongs to.
    pub fn partition(&self) -> Partition {
        let s = self.0.as_str();
        if s.starts_with("cn-") {
            Partition::AwsCn
        } else if s.starts_with("us-gov-") {
            Partition::AwsUsGov
        } else if s.starts_with("us-isob-") {
            Partition::AwsIsoB
        } else if s.starts_with("us-iso-") {
            Partition::AwsIso
        } else {
            Partition::Aws
        }
    }

    /// The URL suffix of the region's partition.
    pub fn url_suffix(&self) -> &'static str {
        self.partition().url_suffix()
    }

    /// Availability zone names for this region, when statically known.
    pub fn availability_zones(&self) -> Option<Vec<String>> {
        AVAILABILITY_ZONES
            .iter()
            .find(|(name, _)| *name == self.0)
            .map(|(name, suffixes)| suffixes.iter().map(|s| format!("{name}{s}")).collect())
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Region {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Region {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Region> for String {
    fn from(region: Region) -> Self {
        region.0
    }
}
