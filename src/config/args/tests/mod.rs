mod options;

#[cfg(test)]
pub(crate) fn create_source_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("file1.txt"), b"hello").unwrap();
    dir
}

#[cfg(test)]
pub(crate) fn path_string(path: &std::path::Path) -> String {
    path.to_string_lossy().to_string()
}
