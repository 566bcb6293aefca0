#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use crate::config::args::tests::{create_source_dir, path_string};
    use crate::config::args::*;
    use crate::types::AccessTier;

    #[test]
    fn with_all_properties() {
        init_dummy_tracing_subscriber();

        let source = create_source_dir();
        let args = vec![
            "xferjob".to_string(),
            "--set-properties".to_string(),
            "--tier".to_string(),
            "archive".to_string(),
            "--metadata".to_string(),
            "key1=value1;key2=value2".to_string(),
            "--tags".to_string(),
            "project=alpha&owner=ops".to_string(),
            path_string(source.path()),
        ];

        let config = build_config_from_args(args).unwrap();

        assert_eq!(config.property_changes.tier, Some(AccessTier::Archive));
        assert_eq!(
            config.property_changes.metadata,
            Some(HashMap::from([
                ("key1".to_string(), "value1".to_string()),
                ("key2".to_string(), "value2".to_string()),
            ]))
        );
        assert_eq!(
            config.property_changes.tags,
            Some(HashMap::from([
                ("project".to_string(), "alpha".to_string()),
                ("owner".to_string(), "ops".to_string()),
            ]))
        );
    }

    #[test]
    fn with_empty_metadata_clears() {
        init_dummy_tracing_subscriber();

        let source = create_source_dir();
        let args = vec![
            "xferjob".to_string(),
            "--set-properties".to_string(),
            "--metadata".to_string(),
            "".to_string(),
            path_string(source.path()),
        ];

        let config = build_config_from_args(args).unwrap();

        assert_eq!(config.property_changes.metadata, Some(HashMap::new()));
        assert!(config.property_changes.tier.is_none());
    }

    #[test]
    fn copy_with_properties() {
        init_dummy_tracing_subscriber();

        let source = create_source_dir();
        let target = tempfile::tempdir().unwrap();
        let args = vec![
            "xferjob".to_string(),
            "--tier".to_string(),
            "Cold".to_string(),
            path_string(source.path()),
            path_string(target.path()),
        ];

        let config = build_config_from_args(args).unwrap();

        assert_eq!(config.operation, Operation::Copy);
        assert_eq!(config.property_changes.tier, Some(AccessTier::Cold));
    }

    #[test]
    fn with_invalid_tier() {
        init_dummy_tracing_subscriber();

        let source = create_source_dir();
        let args = vec![
            "xferjob".to_string(),
            "--set-properties".to_string(),
            "--tier".to_string(),
            "Glacier".to_string(),
            path_string(source.path()),
        ];

        assert!(build_config_from_args(args).is_err());
    }

    fn init_dummy_tracing_subscriber() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("dummy=trace")
            .try_init();
    }
}
