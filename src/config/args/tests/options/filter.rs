#[cfg(test)]
mod tests {
    use std::io::Write;

    use crate::config::args::tests::{create_source_dir, path_string};
    use crate::config::args::*;
    use crate::types::AccessTier;

    #[test]
    fn with_default_value() {
        init_dummy_tracing_subscriber();

        let source = create_source_dir();
        let target = tempfile::tempdir().unwrap();
        let args = vec![
            "xferjob".to_string(),
            path_string(source.path()),
            path_string(target.path()),
        ];

        let config = build_config_from_args(args).unwrap();

        assert!(config.filter_config.is_empty());
    }

    #[test]
    fn with_custom_value() {
        init_dummy_tracing_subscriber();

        let source = create_source_dir();
        let target = tempfile::tempdir().unwrap();
        let mut list_file = tempfile::NamedTempFile::new().unwrap();
        writeln!(list_file, "file1.txt").unwrap();

        let args = vec![
            "xferjob".to_string(),
            "--include-pattern".to_string(),
            "*.pdf;exactName".to_string(),
            "--exclude-pattern".to_string(),
            "dir/*.tmp".to_string(),
            "--list-of-files".to_string(),
            path_string(list_file.path()),
            "--filter-mtime-before".to_string(),
            "2023-02-19T12:00:00Z".to_string(),
            "--filter-mtime-after".to_string(),
            "2023-01-19T12:00:00Z".to_string(),
            "--filter-larger-size".to_string(),
            "1KiB".to_string(),
            "--filter-smaller-size".to_string(),
            "1MiB".to_string(),
            "--filter-tier".to_string(),
            "Hot".to_string(),
            path_string(source.path()),
            path_string(target.path()),
        ];

        let config = build_config_from_args(args).unwrap();

        assert_eq!(
            config.filter_config.include_patterns,
            vec!["*.pdf".to_string(), "exactName".to_string()]
        );
        assert_eq!(
            config.filter_config.exclude_patterns,
            vec!["dir/*.tmp".to_string()]
        );
        assert_eq!(
            config.filter_config.list_of_files.as_deref(),
            Some(list_file.path())
        );
        assert_eq!(
            config.filter_config.before_time.unwrap().to_rfc3339(),
            "2023-02-19T12:00:00+00:00"
        );
        assert_eq!(
            config.filter_config.after_time.unwrap().to_rfc3339(),
            "2023-01-19T12:00:00+00:00"
        );
        assert_eq!(config.filter_config.larger_size, Some(1024));
        assert_eq!(config.filter_config.smaller_size, Some(1024 * 1024));
        assert_eq!(config.filter_config.tier, Some(AccessTier::Hot));
    }

    #[test]
    fn with_invalid_pattern() {
        init_dummy_tracing_subscriber();

        let source = create_source_dir();
        let target = tempfile::tempdir().unwrap();
        let args = vec![
            "xferjob".to_string(),
            "--include-pattern".to_string(),
            "file[0-9.txt".to_string(),
            path_string(source.path()),
            path_string(target.path()),
        ];

        assert!(build_config_from_args(args).is_err());
    }

    #[test]
    fn with_missing_list_of_files() {
        init_dummy_tracing_subscriber();

        let source = create_source_dir();
        let target = tempfile::tempdir().unwrap();
        let args = vec![
            "xferjob".to_string(),
            "--list-of-files".to_string(),
            path_string(&source.path().join("missing.txt")),
            path_string(source.path()),
            path_string(target.path()),
        ];

        assert!(build_config_from_args(args).is_err());
    }

    #[test]
    fn with_size_filter_conflict() {
        init_dummy_tracing_subscriber();

        let source = create_source_dir();
        let target = tempfile::tempdir().unwrap();
        let args = vec![
            "xferjob".to_string(),
            "--filter-larger-size".to_string(),
            "1MiB".to_string(),
            "--filter-smaller-size".to_string(),
            "1KiB".to_string(),
            path_string(source.path()),
            path_string(target.path()),
        ];

        assert_eq!(
            build_config_from_args(args).unwrap_err(),
            SIZE_FILTER_CONFLICT
        );
    }

    #[test]
    fn with_mtime_filter_conflict() {
        init_dummy_tracing_subscriber();

        let source = create_source_dir();
        let target = tempfile::tempdir().unwrap();
        let args = vec![
            "xferjob".to_string(),
            "--filter-mtime-before".to_string(),
            "2023-01-19T12:00:00Z".to_string(),
            "--filter-mtime-after".to_string(),
            "2023-02-19T12:00:00Z".to_string(),
            path_string(source.path()),
            path_string(target.path()),
        ];

        assert_eq!(
            build_config_from_args(args).unwrap_err(),
            MTIME_FILTER_CONFLICT
        );
    }

    fn init_dummy_tracing_subscriber() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("dummy=trace")
            .try_init();
    }
}
