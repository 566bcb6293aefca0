use std::collections::HashMap;

use regex::Regex;

const INVALID_METADATA: &str = "invalid metadata. expected key=value pairs separated by ';'";

// An empty value is accepted and clears the metadata of the object.
pub fn check_metadata(metadata: &str) -> Result<String, String> {
    if metadata.is_empty() {
        return Ok(metadata.to_string());
    }

    let regex = Regex::new(r"(;?([a-zA-Z0-9_\-.]+)=([a-zA-Z0-9_\-. ]*))+").unwrap();

    let mat = regex.find(metadata);
    if mat.is_none() {
        return Err(INVALID_METADATA.to_string());
    }

    if mat.unwrap().as_str() != metadata {
        return Err(INVALID_METADATA.to_string());
    }

    Ok(metadata.to_string())
}

pub fn parse_metadata(value: &str) -> Result<HashMap<String, String>, String> {
    check_metadata(value)?;

    if value.is_empty() {
        return Ok(HashMap::new());
    }

    Ok(value
        .split(';')
        .filter_map(|key_value| key_value.split_once('='))
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect::<HashMap<String, String>>())
}
