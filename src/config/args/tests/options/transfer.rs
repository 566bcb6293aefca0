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

        assert_eq!(config.transfer_config.multipart_threshold, 8 * 1024 * 1024);
        assert_eq!(config.transfer_config.multipart_chunksize, 8 * 1024 * 1024);
    }

    #[test]
    fn with_custom_value() {
        init_dummy_tracing_subscriber();

        let source = create_source_dir();
        let target = tempfile::tempdir().unwrap();
        let args = vec![
            "xferjob".to_string(),
            "--multipart-threshold".to_string(),
            "16MiB".to_string(),
            "--multipart-chunksize".to_string(),
            "1KiB".to_string(),
            path_string(source.path()),
            path_string(target.path()),
        ];

        let config = build_config_from_args(args).unwrap();

        assert_eq!(config.transfer_config.multipart_threshold, 16 * 1024 * 1024);
        assert_eq!(config.transfer_config.multipart_chunksize, 1024);
    }

    #[test]
    fn with_zero_chunksize() {
        init_dummy_tracing_subscriber();

        let source = create_source_dir();
        let target = tempfile::tempdir().unwrap();
        let args = vec![
            "xferjob".to_string(),
            "--multipart-chunksize".to_string(),
            "0".to_string(),
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
