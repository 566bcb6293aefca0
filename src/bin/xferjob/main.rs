use ::tracing::trace;
use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use rusty_fork::rusty_fork_test;

use xferjob::CLIArgs;
use xferjob::Config;

mod cli;
mod tracing;

#[cfg(not(tarpaulin_include))]
#[tokio::main]
async fn main() -> Result<()> {
    let config = load_config_exit_if_err();

    if let Some(shell) = config.auto_complete_shell {
        generate(
            shell,
            &mut CLIArgs::command(),
            "xferjob",
            &mut std::io::stdout(),
        );

        return Ok(());
    }

    start_tracing_if_necessary(&config);

    trace!("config = {:?}", config);

    let exit_code = cli::run(config).await?;
    if exit_code != cli::EXIT_CODE_SUCCESS {
        std::process::exit(exit_code);
    }

    Ok(())
}

#[cfg(not(tarpaulin_include))]
fn load_config_exit_if_err() -> Config {
    let config = Config::try_from(CLIArgs::parse());
    if let Err(error_message) = config {
        clap::Error::raw(clap::error::ErrorKind::ValueValidation, error_message).exit();
    }

    config.unwrap()
}

fn start_tracing_if_necessary(config: &Config) -> bool {
    if config.tracing_config.is_none() {
        return false;
    }

    tracing::init_tracing(config.tracing_config.as_ref().unwrap());
    true
}

rusty_fork_test! {
    #[test]
    fn with_tracing() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().to_string_lossy().to_string();
        let target = dir.path().join("target").to_string_lossy().to_string();
        let args = vec!["unittest", "--recursive", &source, &target];

        let config = xferjob::Config::try_from(CLIArgs::try_parse_from(args).unwrap()).unwrap();
        assert!(start_tracing_if_necessary(&config));
    }

    #[test]
    fn without_tracing() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().to_string_lossy().to_string();
        let target = dir.path().join("target").to_string_lossy().to_string();
        let args = vec!["unittest", "-qq", &source, &target];

        let config = xferjob::Config::try_from(CLIArgs::try_parse_from(args).unwrap()).unwrap();
        assert!(!start_tracing_if_necessary(&config));
    }

    #[test]
    fn dry_run_forces_tracing() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().to_string_lossy().to_string();
        let target = dir.path().join("target").to_string_lossy().to_string();
        let args = vec!["unittest", "-qq", "--dry-run", &source, &target];

        let config = xferjob::Config::try_from(CLIArgs::try_parse_from(args).unwrap()).unwrap();
        assert!(start_tracing_if_necessary(&config));
    }
}
