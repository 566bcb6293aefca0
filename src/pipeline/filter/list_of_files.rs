use std::collections::HashSet;
use std::path::Path;

use crate::pipeline::filter::FilterPredicate;
use crate::types::ObjectDescriptor;
use crate::types::error::TransferError;

const FILTER_NAME: &str = "ListOfFilesFilter";
const COMMENT_PREFIX: char = '#';

/// Keeps objects named in a list file, or lying under a listed directory.
pub struct ListOfFilesFilter {
    entries: HashSet<String>,
    recursive: bool,
}

impl ListOfFilesFilter {
    pub fn from_file(path: &Path, recursive: bool) -> Result<Self, TransferError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            TransferError::FilterError(format!(
                "failed to read list of files {}: {e}",
                path.display()
            ))
        })?;

        Ok(Self::from_entries(content.lines(), recursive))
    }

    pub fn from_entries<'a, I>(lines: I, recursive: bool) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let entries = lines
            .into_iter()
            .filter_map(normalize_entry)
            .collect::<HashSet<String>>();

        Self { entries, recursive }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FilterPredicate for ListOfFilesFilter {
    fn name(&self) -> &str {
        FILTER_NAME
    }

    fn matches(&self, object: &ObjectDescriptor) -> bool {
        let segments = object.path().segments();
        if self.entries.contains(&segments.join("/")) {
            return true;
        }

        // direct parent only when not recursive
        let shallowest = if self.recursive {
            1
        } else {
            segments.len().saturating_sub(1).max(1)
        };
        (shallowest..segments.len()).any(|depth| self.entries.contains(&segments[..depth].join("/")))
    }
}

fn normalize_entry(line: &str) -> Option<String> {
    let entry = line.trim();
    if entry.is_empty() || entry.starts_with(COMMENT_PREFIX) {
        return None;
    }

    let entry = entry
        .strip_prefix("./")
        .unwrap_or(entry)
        .trim_start_matches('/')
        .trim_end_matches('/');
    if entry.is_empty() {
        return None;
    }

    Some(entry.to_string())
}
