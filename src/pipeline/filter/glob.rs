use globset::{Glob, GlobBuilder, GlobSet, GlobSetBuilder};

use crate::pipeline::filter::FilterPredicate;
use crate::types::ObjectDescriptor;
use crate::types::error::TransferError;

const INCLUDE_FILTER_NAME: &str = "IncludePatternFilter";
const EXCLUDE_FILTER_NAME: &str = "ExcludePatternFilter";

/// Shell glob patterns, split by whether they are anchored to the full relative path.
///
/// A pattern without `/` is matched against the object name so that `*.pdf` hits
/// at any depth. A pattern with `/` is matched against the whole key and `*` does
/// not cross a separator.
#[derive(Debug, Clone)]
pub struct GlobPatternSet {
    name_set: Option<GlobSet>,
    path_set: Option<GlobSet>,
}

impl GlobPatternSet {
    pub fn new(patterns: &[String]) -> Result<Self, TransferError> {
        let mut name_builder = GlobSetBuilder::new();
        let mut path_builder = GlobSetBuilder::new();
        let mut name_count = 0;
        let mut path_count = 0;

        for pattern in patterns {
            if pattern.contains('/') {
                let anchored = pattern.trim_start_matches("./").trim_start_matches('/');
                let glob = GlobBuilder::new(anchored)
                    .literal_separator(true)
                    .build()
                    .map_err(|e| invalid_pattern(pattern, e))?;
                path_builder.add(glob);
                path_count += 1;
            } else {
                let glob = Glob::new(pattern).map_err(|e| invalid_pattern(pattern, e))?;
                name_builder.add(glob);
                name_count += 1;
            }
        }

        Ok(Self {
            name_set: build_set(name_builder, name_count)?,
            path_set: build_set(path_builder, path_count)?,
        })
    }

    pub fn is_match(&self, object: &ObjectDescriptor) -> bool {
        if let Some(name_set) = &self.name_set {
            if name_set.is_match(object.name()) {
                return true;
            }
        }

        if let Some(path_set) = &self.path_set {
            if path_set.is_match(object.key()) {
                return true;
            }
        }

        false
    }
}

fn build_set(builder: GlobSetBuilder, count: usize) -> Result<Option<GlobSet>, TransferError> {
    if count == 0 {
        return Ok(None);
    }

    builder
        .build()
        .map(Some)
        .map_err(|e| TransferError::FilterError(e.to_string()))
}

fn invalid_pattern(pattern: &str, e: globset::Error) -> TransferError {
    TransferError::FilterError(format!("invalid pattern {pattern}: {e}"))
}

pub struct IncludePatternFilter {
    patterns: GlobPatternSet,
}

impl IncludePatternFilter {
    pub fn new(patterns: &[String]) -> Result<Self, TransferError> {
        Ok(Self {
            patterns: GlobPatternSet::new(patterns)?,
        })
    }
}

impl FilterPredicate for IncludePatternFilter {
    fn name(&self) -> &str {
        INCLUDE_FILTER_NAME
    }

    fn matches(&self, object: &ObjectDescriptor) -> bool {
        self.patterns.is_match(object)
    }
}

/// Matches the objects that are NOT hit by any exclude pattern.
pub struct ExcludePatternFilter {
    patterns: GlobPatternSet,
}

impl ExcludePatternFilter {
    pub fn new(patterns: &[String]) -> Result<Self, TransferError> {
        Ok(Self {
            patterns: GlobPatternSet::new(patterns)?,
        })
    }
}

impl FilterPredicate for ExcludePatternFilter {
    fn name(&self) -> &str {
        EXCLUDE_FILTER_NAME
    }

    fn matches(&self, object: &ObjectDescriptor) -> bool {
        !self.patterns.is_match(object)
    }
}
