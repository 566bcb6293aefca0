use globset::Glob;

const PATTERN_SEPARATOR: char = ';';
const EMPTY_PATTERN: &str = "pattern must not be empty.";

pub fn check_glob_patterns(value: &str) -> Result<String, String> {
    split_patterns(value)?;

    Ok(value.to_string())
}

/// Splits a `;` separated pattern list and validates every pattern as a shell glob.
pub fn split_patterns(value: &str) -> Result<Vec<String>, String> {
    let patterns = value
        .split(PATTERN_SEPARATOR)
        .map(|pattern| pattern.trim())
        .filter(|pattern| !pattern.is_empty())
        .map(|pattern| pattern.to_string())
        .collect::<Vec<String>>();

    if patterns.is_empty() {
        return Err(EMPTY_PATTERN.to_string());
    }

    for pattern in &patterns {
        Glob::new(pattern).map_err(|e| format!("invalid pattern {pattern}: {e}"))?;
    }

    Ok(patterns)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_valid_patterns() {
        assert_eq!(split_patterns("*.pdf").unwrap(), vec!["*.pdf".to_string()]);
        assert_eq!(
            split_patterns("*.pdf;exactName;dir/*.txt").unwrap(),
            vec![
                "*.pdf".to_string(),
                "exactName".to_string(),
                "dir/*.txt".to_string()
            ]
        );
        assert_eq!(split_patterns("*.pdf;").unwrap().len(), 1);

        check_glob_patterns("file[0-9].txt").unwrap();
    }

    #[test]
    fn split_invalid_patterns() {
        assert!(split_patterns("").is_err());
        assert!(split_patterns(";;").is_err());
        assert!(split_patterns("file[0-9.txt").is_err());
        assert!(check_glob_patterns("{a,b").is_err());
    }
}
