use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use regex::Regex;
use std::io::Write;
use tempfile::NamedTempFile;
use tracing::trace;

use crate::types::{PropertyBag, RelativePath};

/// Directory below a local storage root that holds object properties. Never enumerated.
pub const RESERVED_DIRECTORY_NAME: &str = ".xferjob";
const PROPERTIES_DIRECTORY_NAME: &str = "properties";
const PROPERTIES_FILE_SUFFIX: &str = ".json";

pub fn check_directory_traversal(key: &str) -> bool {
    let re = Regex::new(r"(^|[/\\])\.\.([/\\]|$)").unwrap();
    re.is_match(key)
}

pub fn key_to_file_path(path: &Path, key: &str) -> PathBuf {
    let relative_path = RelativePath::from_key(&convert_windows_directory_char_to_slash(key));

    let mut file_path = path.to_path_buf();
    for segment in relative_path.segments() {
        file_path.push(segment);
    }
    file_path
}

pub fn properties_file_path(path: &Path, key: &str) -> PathBuf {
    let mut file_path = path
        .join(RESERVED_DIRECTORY_NAME)
        .join(PROPERTIES_DIRECTORY_NAME);
    let relative_path = RelativePath::from_key(&convert_windows_directory_char_to_slash(key));

    let segments = relative_path.segments();
    if let Some((name, directories)) = segments.split_last() {
        for directory in directories {
            file_path.push(directory);
        }
        file_path.push(format!("{name}{PROPERTIES_FILE_SUFFIX}"));
    }
    file_path
}

/// Builds the relative path of `entry_path` below `root`. `None` if it is not below `root`.
pub fn relative_path_from(root: &Path, entry_path: &Path) -> Option<RelativePath> {
    let stripped = entry_path.strip_prefix(root).ok()?;

    let segments = stripped
        .components()
        .filter_map(|component| match component {
            Component::Normal(segment) => Some(segment.to_string_lossy().to_string()),
            _ => None,
        })
        .collect::<Vec<String>>();
    if segments.is_empty() {
        return None;
    }

    Some(RelativePath::new(segments))
}

pub fn is_reserved_path(root: &Path, entry_path: &Path) -> bool {
    entry_path
        .strip_prefix(root)
        .ok()
        .and_then(|stripped| stripped.components().next())
        .is_some_and(|component| component.as_os_str() == RESERVED_DIRECTORY_NAME)
}

pub async fn create_parent_directory(file_path: &Path) -> Result<bool> {
    let Some(directory_path) = file_path.parent() else {
        return Ok(false);
    };

    if tokio::fs::try_exists(directory_path).await.unwrap_or(false) {
        return Ok(false);
    }

    tokio::fs::create_dir_all(directory_path)
        .await
        .context("tokio::fs::create_dir_all() failed.")?;

    let directory = directory_path.to_string_lossy().to_string();
    trace!(directory = directory, "directory created.");

    Ok(true)
}

pub fn system_time_to_utc(system_time: std::time::SystemTime) -> DateTime<Utc> {
    DateTime::<Utc>::from(system_time)
}

pub fn load_properties(properties_path: &Path) -> Result<Option<PropertyBag>> {
    let content = match std::fs::read(properties_path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e).context("failed to read properties file."),
    };

    let properties = serde_json::from_slice::<PropertyBag>(&content)
        .context("failed to parse properties file.")?;
    Ok(Some(properties))
}

/// Writes `properties` next to its final location first and renames it into place.
pub fn save_properties(properties_path: &Path, properties: &PropertyBag) -> Result<()> {
    let directory = properties_path
        .parent()
        .context("properties path has no parent directory.")?;
    std::fs::create_dir_all(directory).context("std::fs::create_dir_all() failed.")?;

    let mut temp_file =
        NamedTempFile::new_in(directory).context("NamedTempFile::new_in failed.")?;
    temp_file
        .write_all(&serde_json::to_vec_pretty(properties)?)
        .context("failed to write properties file.")?;
    temp_file
        .persist(properties_path)
        .context("NamedTempFile::persist failed.")?;

    Ok(())
}

fn convert_windows_directory_char_to_slash(path: &str) -> String {
    if cfg!(windows) {
        return path.replace('\\', "/");
    }
    path.to_string()
}
