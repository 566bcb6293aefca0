#[cfg(test)]
mod tests {
    use crate::config::args::tests::{create_source_dir, path_string};
    use crate::config::args::*;

    #[test]
    fn with_custom_value() {
        init_dummy_tracing_subscriber();

        let source = create_source_dir();
        let target = tempfile::tempdir().unwrap();
        let args = vec![
            "xferjob".to_string(),
            "--max-attempts".to_string(),
            "3".to_string(),
            "--initial-backoff-milliseconds".to_string(),
            "10".to_string(),
            "--max-backoff-milliseconds".to_string(),
            "50".to_string(),
            path_string(source.path()),
            path_string(target.path()),
        ];

        let config = build_config_from_args(args).unwrap();

        assert_eq!(config.retry_config.max_attempts, 3);
        assert_eq!(config.retry_config.initial_backoff_milliseconds, 10);
        assert_eq!(config.retry_config.max_backoff_milliseconds, 50);
    }

    #[test]
    fn with_zero_max_attempts() {
        init_dummy_tracing_subscriber();

        let source = create_source_dir();
        let target = tempfile::tempdir().unwrap();
        let args = vec![
            "xferjob".to_string(),
            "--max-attempts".to_string(),
            "0".to_string(),
            path_string(source.path()),
            path_string(target.path()),
        ];

        assert!(build_config_from_args(args).is_err());
    }

    #[test]
    fn with_backoff_conflict() {
        init_dummy_tracing_subscriber();

        let source = create_source_dir();
        let target = tempfile::tempdir().unwrap();
        let args = vec![
            "xferjob".to_string(),
            "--initial-backoff-milliseconds".to_string(),
            "1000".to_string(),
            "--max-backoff-milliseconds".to_string(),
            "10".to_string(),
            path_string(source.path()),
            path_string(target.path()),
        ];

        assert_eq!(build_config_from_args(args).unwrap_err(), BACKOFF_CONFLICT);
    }

    fn init_dummy_tracing_subscriber() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("dummy=trace")
            .try_init();
    }
}
