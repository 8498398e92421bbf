// Material buckets for series indexing
//
// Every record maps to exactly one bucket regardless of the free text stored
// on it: one of the configured materials, `other` for any other non-empty
// value, or `unknown` when the field is empty.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Indexing group of a record's material
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaterialBucket {
    /// One of the configured first-class materials
    Listed(String),
    /// A material was given but is not in the configured list
    Other,
    /// No material was given
    Unknown,
}

impl MaterialBucket {
    pub fn name(&self) -> &str {
        match self {
            MaterialBucket::Listed(name) => name,
            MaterialBucket::Other => "other",
            MaterialBucket::Unknown => "unknown",
        }
    }
}

impl fmt::Display for MaterialBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The fixed material enumeration plus the two synthetic buckets
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterialGroups {
    allowed: Vec<String>,
}

impl MaterialGroups {
    pub fn new<I, S>(allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut list: Vec<String> = Vec::new();
        for name in allowed {
            let name = name.into();
            // The synthetic names can never be first-class
            if name.is_empty() || name == "other" || name == "unknown" || list.contains(&name) {
                continue;
            }
            list.push(name);
        }
        Self { allowed: list }
    }

    /// Map material text to its bucket
    ///
    /// Trailing whitespace is ignored; matching is exact otherwise.
    pub fn resolve(&self, material: &str) -> MaterialBucket {
        let material = material.trim_end();
        if material.is_empty() || material == "unknown" {
            return MaterialBucket::Unknown;
        }
        match self.allowed.iter().find(|m| m.as_str() == material) {
            Some(name) => MaterialBucket::Listed(name.clone()),
            None => MaterialBucket::Other,
        }
    }

    /// All buckets in display order: configured materials, then other, unknown
    pub fn buckets(&self) -> Vec<MaterialBucket> {
        self.allowed
            .iter()
            .cloned()
            .map(MaterialBucket::Listed)
            .chain([MaterialBucket::Other, MaterialBucket::Unknown])
            .collect()
    }
}

impl Default for MaterialGroups {
    fn default() -> Self {
        Self::new(["PET", "HDPE", "PVC", "LDPE", "PP", "PS"])
    }
}

/// Per-bucket visibility switches; buckets default to visible
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BucketToggles {
    hidden: HashMap<MaterialBucket, bool>,
}

impl BucketToggles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_visible(&mut self, bucket: MaterialBucket, visible: bool) {
        self.hidden.insert(bucket, !visible);
    }

    pub fn is_visible(&self, bucket: &MaterialBucket) -> bool {
        !self.hidden.get(bucket).copied().unwrap_or(false)
    }
}
