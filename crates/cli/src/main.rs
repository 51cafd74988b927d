use std::process::ExitCode;

use recall_core::config::{AppConfig, LoadOptions, LogFormat};

fn init_logging() {
    let config = AppConfig::load(LoadOptions::default()).unwrap_or_default();
    let log_level =
        config.logging.level.parse::<tracing::Level>().unwrap_or(tracing::Level::INFO);

    match config.logging.format {
        LogFormat::Compact => {
            let _ = tracing_subscriber::fmt()
                .with_target(false)
                .with_max_level(log_level)
                .with_writer(std::io::stderr)
                .compact()
                .try_init();
        }
        LogFormat::Pretty => {
            let _ = tracing_subscriber::fmt()
                .with_target(false)
                .with_max_level(log_level)
                .with_writer(std::io::stderr)
                .pretty()
                .try_init();
        }
        LogFormat::Json => {
            let _ = tracing_subscriber::fmt()
                .with_target(false)
                .with_max_level(log_level)
                .with_writer(std::io::stderr)
                .json()
                .try_init();
        }
    }
}

fn main() -> ExitCode {
    init_logging();
    recall_cli::run()
}
