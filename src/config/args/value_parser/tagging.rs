use std::collections::HashMap;

use regex::Regex;

const INVALID_TAGGING: &str = "invalid tagging. expected key=value pairs separated by '&'";

pub fn check_tagging(tagging: &str) -> Result<String, String> {
    if tagging.is_empty() {
        return Ok(tagging.to_string());
    }

    let regex = Regex::new(r"(&?([a-zA-Z0-9+%._\-~]+)=([a-zA-Z0-9+%._\-~]*))+").unwrap();

    let mat = regex.find(tagging);
    if mat.is_none() {
        return Err(INVALID_TAGGING.to_string());
    }

    if mat.unwrap().as_str() != tagging {
        return Err(INVALID_TAGGING.to_string());
    }

    Ok(tagging.to_string())
}

pub fn parse_tagging(value: &str) -> Result<HashMap<String, String>, String> {
    check_tagging(value)?;

    Ok(value
        .split('&')
        .filter_map(|key_value| key_value.split_once('='))
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect::<HashMap<String, String>>())
}
