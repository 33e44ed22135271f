//! # Schema Store
//!
//! Supplies the provider schema for a resource type in a region. Schemas
//! are loaded once, before any validation pass, and shared read-only.
//!
//! ## Directory Layout
//!
//! ```text
//! <root>/all/*.json          schemas valid in every region
//! <root>/<region>/*.json     region-specific overrides
//! <root>/*.json              same as all/
//! ```
//!
//! A region directory entry replaces the `all/` entry for the same
//! `typeName` in that region only.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;

use stacklint_core::Region;

use crate::error::SchemaStoreError;
use crate::meta::MetaValidator;
use crate::resource::ResourceSchema;

/// Lookup of provider schemas by resource type and region.
pub trait SchemaStore: Send + Sync {
    /// The schema for `type_name` in `region`, if known.
    fn resource_schema(&self, type_name: &str, region: &Region) -> Option<Arc<ResourceSchema>>;
}

/// A store held entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemorySchemaStore {
    global: BTreeMap<String, Arc<ResourceSchema>>,
    regional: BTreeMap<String, BTreeMap<String, Arc<ResourceSchema>>>,
}

const BUNDLED: &[(&str, &str)] = &[
    ("all/aws-ec2-instance.json", include_str!("../schemas/all/aws-ec2-instance.json")),
    ("all/aws-ec2-subnet.json", include_str!("../schemas/all/aws-ec2-subnet.json")),
    ("all/aws-ec2-vpc.json", include_str!("../schemas/all/aws-ec2-vpc.json")),
    ("all/aws-s3-bucket.json", include_str!("../schemas/all/aws-s3-bucket.json")),
    ("all/aws-sqs-queue.json", include_str!("../schemas/all/aws-sqs-queue.json")),
    (
        "us-gov-west-1/aws-sqs-queue.json",
        include_str!("../schemas/us-gov-west-1/aws-sqs-queue.json"),
    ),
];

impl InMemorySchemaStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// The schemas compiled into this crate.
    ///
    /// # Errors
    ///
    /// Returns an error if a bundled schema fails to parse or meta-validate.
    pub fn bundled() -> Result<Self, SchemaStoreError> {
        let meta = MetaValidator::new()?;
        let mut store = Self::new();
        for (name, text) in BUNDLED {
            let path = PathBuf::from(name);
            let value: Value = serde_json::from_str(text).map_err(|e| SchemaStoreError::Parse {
                path: path.clone(),
                reason: e.to_string(),
            })?;
            let scope = name.split('/').next().unwrap_or("all");
            store.admit(&meta, value, &path, scope)?;
        }
        Ok(store)
    }

    /// Load every schema under `root`.
    ///
    /// # Errors
    ///
    /// Fails on unreadable files, invalid JSON, meta-schema violations and
    /// directories that are neither `all` nor a region.
    pub fn load_dir(root: impl AsRef<Path>) -> Result<Self, SchemaStoreError> {
        let root = root.as_ref();
        let meta = MetaValidator::new()?;
        let mut store = Self::new();

        for entry in read_dir_sorted(root)? {
            if entry.is_dir() {
                let scope = entry
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or_default()
                    .to_string();
                if scope != "all" && Region::new(scope.as_str()).is_err() {
                    return Err(SchemaStoreError::UnknownRegionDirectory(scope));
                }
                for file in read_dir_sorted(&entry)? {
                    if is_json(&file) {
                        store.load_file(&meta, &file, &scope)?;
                    }
                }
            } else if is_json(&entry) {
                store.load_file(&meta, &entry, "all")?;
            }
        }

        tracing::debug!(
            root = %root.display(),
            global = store.global.len(),
            regions = store.regional.len(),
            "schema store loaded"
        );
        Ok(store)
    }

    /// Register a schema for every region.
    pub fn insert(&mut self, schema: ResourceSchema) {
        self.global
            .insert(schema.type_name().to_string(), Arc::new(schema));
    }

    /// Register a schema for one region only.
    pub fn insert_for_region(&mut self, region: &Region, schema: ResourceSchema) {
        self.regional
            .entry(region.as_str().to_string())
            .or_default()
            .insert(schema.type_name().to_string(), Arc::new(schema));
    }

    /// Resource types known in any region, sorted.
    pub fn type_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .global
            .keys()
            .chain(self.regional.values().flat_map(|m| m.keys()))
            .map(String::as_str)
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }

    /// Number of distinct schemas held.
    pub fn len(&self) -> usize {
        self.global.len() + self.regional.values().map(BTreeMap::len).sum::<usize>()
    }

    /// True if the store holds no schema.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn load_file(&mut self, meta: &MetaValidator, path: &Path, scope: &str) -> Result<(), SchemaStoreError> {
        let text = std::fs::read_to_string(path).map_err(|source| SchemaStoreError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let value: Value = serde_json::from_str(&text).map_err(|e| SchemaStoreError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        self.admit(meta, value, path, scope)
    }

    fn admit(
        &mut self,
        meta: &MetaValidator,
        value: Value,
        path: &Path,
        scope: &str,
    ) -> Result<(), SchemaStoreError> {
        meta.check(&value)?;
        let schema = ResourceSchema::from_provider(value).ok_or_else(|| SchemaStoreError::Invalid {
            type_name: path.display().to_string(),
            violations: vec!["(root): missing typeName".to_string()],
        })?;
        if scope == "all" {
            self.insert(schema);
        } else {
            let region = Region::new(scope)
                .map_err(|_| SchemaStoreError::UnknownRegionDirectory(scope.to_string()))?;
            self.insert_for_region(&region, schema);
        }
        Ok(())
    }
}

impl SchemaStore for InMemorySchemaStore {
    fn resource_schema(&self, type_name: &str, region: &Region) -> Option<Arc<ResourceSchema>> {
        self.regional
            .get(region.as_str())
            .and_then(|m| m.get(type_name))
            .or_else(|| self.global.get(type_name))
            .cloned()
    }
}

fn is_json(path: &Path) -> bool {
    path.is_file() && path.extension().is_some_and(|e| e == "json")
}

fn read_dir_sorted(dir: &Path) -> Result<Vec<PathBuf>, SchemaStoreError> {
    let read_err = |source| SchemaStoreError::Read {
        path: dir.to_path_buf(),
        source,
    };
    let mut entries = std::fs::read_dir(dir)
        .map_err(read_err)?
        .map(|e| e.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(read_err)?;
    entries.sort();
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_store_loads() {
        let store = InMemorySchemaStore::bundled().unwrap();
        let east = Region::new("us-east-1").unwrap();
        let bucket = store.resource_schema("AWS::S3::Bucket", &east).unwrap();
        assert!(bucket.is_read_only(&["Arn".to_string()]));
        assert!(store.resource_schema("AWS::Nope::Thing", &east).is_none());
    }

    #[test]
    fn test_regional_override() {
        let store = InMemorySchemaStore::bundled().unwrap();
        let east = Region::new("us-east-1").unwrap();
        let gov = Region::new("us-gov-west-1").unwrap();
        let global = store.resource_schema("AWS::SQS::Queue", &east).unwrap();
        let regional = store.resource_schema("AWS::SQS::Queue", &gov).unwrap();
        assert!(global.schema()["properties"].get("ContentBasedDeduplication").is_some());
        assert!(regional.schema()["properties"].get("ContentBasedDeduplication").is_none());
    }
}
