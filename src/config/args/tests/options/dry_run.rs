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

        assert!(!config.dry_run);
    }

    #[test]
    fn with_custom_value() {
        init_dummy_tracing_subscriber();

        let source = create_source_dir();
        let target = tempfile::tempdir().unwrap();
        let args = vec![
            "xferjob".to_string(),
            "--dry-run".to_string(),
            path_string(source.path()),
            path_string(target.path()),
        ];

        let config = build_config_from_args(args).unwrap();

        assert!(config.dry_run);
        assert_eq!(
            config.tracing_config.unwrap().tracing_level,
            log::Level::Info
        );
        assert!(!config.tracing_config.unwrap().json_tracing);
        assert!(!config.tracing_config.unwrap().span_events_tracing);
        assert!(!config.tracing_config.unwrap().disable_color_tracing);
    }

    #[test]
    fn with_custom_value_with_quiet_option() {
        init_dummy_tracing_subscriber();

        let source = create_source_dir();
        let target = tempfile::tempdir().unwrap();
        let args = vec![
            "xferjob".to_string(),
            "--dry-run".to_string(),
            "-qq".to_string(),
            path_string(source.path()),
            path_string(target.path()),
        ];

        let config = build_config_from_args(args).unwrap();

        assert!(config.dry_run);
        assert_eq!(
            config.tracing_config.unwrap().tracing_level,
            log::Level::Info
        );
    }

    #[test]
    fn with_custom_value_with_tracing_option() {
        init_dummy_tracing_subscriber();

        let source = create_source_dir();
        let target = tempfile::tempdir().unwrap();
        let args = vec![
            "xferjob".to_string(),
            "--dry-run".to_string(),
            "-vvv".to_string(),
            "--json-tracing".to_string(),
            path_string(source.path()),
            path_string(target.path()),
        ];

        let config = build_config_from_args(args).unwrap();

        assert!(config.dry_run);
        assert_eq!(
            config.tracing_config.unwrap().tracing_level,
            log::Level::Trace
        );
        assert!(config.tracing_config.unwrap().json_tracing);
    }

    fn init_dummy_tracing_subscriber() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("dummy=trace")
            .try_init();
    }
}
