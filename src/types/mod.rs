use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod error;
pub mod job;
pub mod token;

pub const RUN_SUMMARY_NAME: &str = "RUN_SUMMARY";
pub const FAILED_OBJECT_NAME: &str = "FAILED_OBJECT";

/// Relative location of an object below a storage root, kept as ordered path segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RelativePath(Vec<String>);

impl RelativePath {
    pub fn new(segments: Vec<String>) -> Self {
        Self(segments)
    }

    /// Builds a path from a `/` separated key. Empty segments are dropped.
    pub fn from_key(key: &str) -> Self {
        Self(
            key.split('/')
                .filter(|segment| !segment.is_empty())
                .map(|segment| segment.to_string())
                .collect(),
        )
    }

    pub fn key(&self) -> String {
        self.0.join("/")
    }

    pub fn name(&self) -> &str {
        self.0.last().map(|s| s.as_str()).unwrap_or_default()
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Display for RelativePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccessTier {
    Hot,
    Cool,
    Cold,
    Archive,
}

impl FromStr for AccessTier {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "hot" => Ok(AccessTier::Hot),
            "cool" => Ok(AccessTier::Cool),
            "cold" => Ok(AccessTier::Cold),
            "archive" => Ok(AccessTier::Archive),
            _ => Err(format!(
                "invalid tier: {value}. valid values: Hot, Cool, Cold, Archive"
            )),
        }
    }
}

impl fmt::Display for AccessTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AccessTier::Hot => "Hot",
            AccessTier::Cool => "Cool",
            AccessTier::Cold => "Cold",
            AccessTier::Archive => "Archive",
        };
        write!(f, "{name}")
    }
}

/// Current properties of a stored object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyBag {
    pub tier: Option<AccessTier>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    #[serde(default)]
    pub tags: HashMap<String, String>,
}

/// Desired property mutation. `None` leaves the property untouched,
/// an empty metadata or tag map clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyChanges {
    pub tier: Option<AccessTier>,
    pub metadata: Option<HashMap<String, String>>,
    pub tags: Option<HashMap<String, String>>,
}

impl PropertyChanges {
    pub fn is_empty(&self) -> bool {
        self.tier.is_none() && self.metadata.is_none() && self.tags.is_none()
    }

    pub fn apply_to(&self, properties: &mut PropertyBag) {
        if let Some(tier) = self.tier {
            properties.tier = Some(tier);
        }
        if let Some(metadata) = &self.metadata {
            properties.metadata = metadata.clone();
        }
        if let Some(tags) = &self.tags {
            properties.tags = tags.clone();
        }
    }
}

/// An object found by enumerating a source. Immutable once produced.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectDescriptor {
    path: RelativePath,
    size: u64,
    last_modified: DateTime<Utc>,
    properties: Option<PropertyBag>,
}

impl ObjectDescriptor {
    pub fn new(
        path: RelativePath,
        size: u64,
        last_modified: DateTime<Utc>,
        properties: Option<PropertyBag>,
    ) -> Self {
        Self {
            path,
            size,
            last_modified,
            properties,
        }
    }

    pub fn path(&self) -> &RelativePath {
        &self.path
    }

    pub fn key(&self) -> String {
        self.path.key()
    }

    pub fn name(&self) -> &str {
        self.path.name()
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn last_modified(&self) -> &DateTime<Utc> {
        &self.last_modified
    }

    pub fn properties(&self) -> Option<&PropertyBag> {
        self.properties.as_ref()
    }

    pub fn tier(&self) -> Option<AccessTier> {
        self.properties.as_ref().and_then(|p| p.tier)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransferStatistics {
    TransferBytes(u64),
    JobComplete { key: String },
    JobSkip { key: String },
    JobFailed { key: String },
    JobCancelled { key: String },
    JobWarning { key: String },
    ChunkRetry { key: String },
    ObjectFiltered { key: String },
}
