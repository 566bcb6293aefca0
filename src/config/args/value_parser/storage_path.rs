use std::path::PathBuf;

use regex::Regex;

const NO_PATH_SPECIFIED: &str = "path must be specified.";
const REMOTE_PATH_NOT_SUPPORTED: &str =
    "remote storage URLs are not supported by this build. specify a local path.";
const URL_SCHEME_REGEX: &str = r"^[a-zA-Z][a-zA-Z0-9+.\-]*://";

pub fn check_storage_path(path: &str) -> Result<String, String> {
    if path.is_empty() {
        return Err(NO_PATH_SPECIFIED.to_string());
    }

    if is_url(path) {
        return Err(REMOTE_PATH_NOT_SUPPORTED.to_string());
    }

    Ok(path.to_string())
}

pub fn parse_storage_path(path: &str) -> Result<PathBuf, String> {
    check_storage_path(path)?;

    Ok(PathBuf::from(path))
}

fn is_url(path: &str) -> bool {
    Regex::new(URL_SCHEME_REGEX).unwrap().is_match(path)
}
