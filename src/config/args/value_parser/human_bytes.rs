use byte_unit::Byte;
use std::str::FromStr;

const UNDER_MIN_VALUE: &str = "must be greater than or equal to 1B";
const OVER_MAX_VALUE: &str = "must be smaller than or equal to 5GiB";

const MIN_VALUE: u128 = 1;
const MAX_VALUE: u128 = 5 * 1024 * 1024 * 1024;

const UNDER_MIN_BANDWIDTH: &str = "must be greater than or equal to 1KiB";
const OVER_MAX_BANDWIDTH: &str = "must be smaller than or equal to 100GiB";

const MIN_BANDWIDTH: u128 = 1024;
const MAX_BANDWIDTH: u128 = 100 * 1024 * 1024 * 1024;

const TOO_LARGE_VALUE: &str = "must be smaller than 16EiB";

pub fn check_human_bytes(value: &str) -> Result<String, String> {
    let result = Byte::from_str(value).map_err(|e| e.to_string())?;

    if result.as_u128() < MIN_VALUE {
        return Err(UNDER_MIN_VALUE.to_string());
    }
    if result.as_u128() > MAX_VALUE {
        return Err(OVER_MAX_VALUE.to_string());
    }

    Ok(value.to_string())
}

pub fn parse_human_bytes(value: &str) -> Result<u64, String> {
    check_human_bytes(value)?;

    to_u64(value)
}

pub fn check_human_bytes_without_limit(value: &str) -> Result<String, String> {
    to_u64(value)?;

    Ok(value.to_string())
}

pub fn parse_human_bytes_without_limit(value: &str) -> Result<u64, String> {
    to_u64(value)
}

pub fn check_human_bandwidth(value: &str) -> Result<String, String> {
    let result = Byte::from_str(value).map_err(|e| e.to_string())?;

    if result.as_u128() < MIN_BANDWIDTH {
        return Err(UNDER_MIN_BANDWIDTH.to_string());
    }
    if result.as_u128() > MAX_BANDWIDTH {
        return Err(OVER_MAX_BANDWIDTH.to_string());
    }

    Ok(value.to_string())
}

pub fn parse_human_bandwidth(value: &str) -> Result<u64, String> {
    check_human_bandwidth(value)?;

    to_u64(value)
}

fn to_u64(value: &str) -> Result<u64, String> {
    let result = Byte::from_str(value).map_err(|e| e.to_string())?;
    result
        .as_u128()
        .try_into()
        .map_err(|_| TOO_LARGE_VALUE.to_string())
}
