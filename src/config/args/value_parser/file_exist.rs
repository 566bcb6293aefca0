use std::path::PathBuf;

pub fn is_file_exist(file_path: &str) -> Result<String, String> {
    let file_path = PathBuf::from(file_path);

    if file_path.is_file() {
        Ok(file_path.to_string_lossy().to_string())
    } else {
        Err(format!("file does not exist: {}", file_path.display()))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn existing_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "dir1/file1").unwrap();

        let path = file.path().to_string_lossy().to_string();
        assert_eq!(is_file_exist(&path).unwrap(), path);
    }

    #[test]
    fn missing_file_or_directory() {
        let dir = tempfile::tempdir().unwrap();

        assert!(is_file_exist(&dir.path().to_string_lossy()).is_err());
        assert!(is_file_exist(&dir.path().join("missing.txt").to_string_lossy()).is_err());
    }
}
