#[cfg(test)]
mod tests {
    use crate::config::args::tests::{create_source_dir, path_string};
    use crate::config::args::*;

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

        assert!(config.resume_config.state_dir.is_none());
        assert!(config.resume_config.run_id.is_none());
        assert_eq!(
            config.resume_config.checkpoint_interval_milliseconds,
            DEFAULT_CHECKPOINT_INTERVAL_MILLISECONDS
        );
    }

    #[test]
    fn with_custom_value() {
        init_dummy_tracing_subscriber();

        let source = create_source_dir();
        let target = tempfile::tempdir().unwrap();
        let state_dir = tempfile::tempdir().unwrap();
        let args = vec![
            "xferjob".to_string(),
            "--resume-state-dir".to_string(),
            path_string(state_dir.path()),
            "--run-id".to_string(),
            "nightly-backup".to_string(),
            "--checkpoint-interval-milliseconds".to_string(),
            "1000".to_string(),
            path_string(source.path()),
            path_string(target.path()),
        ];

        let config = build_config_from_args(args).unwrap();

        assert_eq!(
            config.resume_config.state_dir.as_deref(),
            Some(state_dir.path())
        );
        assert_eq!(
            config.resume_config.run_id,
            Some("nightly-backup".to_string())
        );
        assert_eq!(config.resume_config.checkpoint_interval_milliseconds, 1000);
    }

    #[test]
    fn run_id_requires_state_dir() {
        init_dummy_tracing_subscriber();

        let source = create_source_dir();
        let target = tempfile::tempdir().unwrap();
        let args = vec![
            "xferjob".to_string(),
            "--run-id".to_string(),
            "nightly-backup".to_string(),
            path_string(source.path()),
            path_string(target.path()),
        ];

        assert!(build_config_from_args(args).is_err());
    }

    fn init_dummy_tracing_subscriber() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("dummy=trace")
            .try_init();
    }
}
