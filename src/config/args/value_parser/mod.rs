pub mod file_exist;
pub mod glob_pattern;
pub mod human_bytes;
pub mod metadata;
pub mod storage_path;
pub mod tagging;
pub mod tier;
