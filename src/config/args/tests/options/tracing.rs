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

        assert_eq!(
            config.tracing_config.as_ref().unwrap().tracing_level,
            log::Level::Warn
        );
        assert!(!config.tracing_config.as_ref().unwrap().json_tracing);
        assert!(!config.tracing_config.as_ref().unwrap().span_events_tracing);
        assert!(
            !config
                .tracing_config
                .as_ref()
                .unwrap()
                .disable_color_tracing
        );
    }

    #[test]
    fn with_custom_value() {
        init_dummy_tracing_subscriber();

        let source = create_source_dir();
        let target = tempfile::tempdir().unwrap();
        let args = vec![
            "xferjob".to_string(),
            "-vvv".to_string(),
            "--json-tracing".to_string(),
            "--span-events-tracing".to_string(),
            "--disable-color-tracing".to_string(),
            path_string(source.path()),
            path_string(target.path()),
        ];

        let config = build_config_from_args(args).unwrap();

        assert_eq!(
            config.tracing_config.as_ref().unwrap().tracing_level,
            log::Level::Trace
        );
        assert!(config.tracing_config.as_ref().unwrap().json_tracing);
        assert!(config.tracing_config.as_ref().unwrap().span_events_tracing);
        assert!(config.tracing_config.as_ref().unwrap().disable_color_tracing);
    }

    #[test]
    fn with_quiet_option() {
        init_dummy_tracing_subscriber();

        let source = create_source_dir();
        let target = tempfile::tempdir().unwrap();
        let args = vec![
            "xferjob".to_string(),
            "-qq".to_string(),
            path_string(source.path()),
            path_string(target.path()),
        ];

        let config = build_config_from_args(args).unwrap();

        assert!(config.tracing_config.is_none());
    }

    fn init_dummy_tracing_subscriber() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("dummy=trace")
            .try_init();
    }
}
