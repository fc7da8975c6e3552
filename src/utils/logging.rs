use std::fs;
use std::path::Path;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::filter::{LevelFilter, Targets};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

use crate::utils::timing::TIMING_TARGET;

/// HTTP plumbing that floods debug output during generation and upload.
const NOISY_TARGETS: &[&str] = &["hyper", "hyper_util", "h2", "rustls", "reqwest"];

/// Keeps the non-blocking writers flushing until the server exits.
pub struct LoggingGuards {
    _guards: Vec<WorkerGuard>,
}

fn parse_log_level(value: &str) -> LevelFilter {
    match value.trim().to_lowercase().as_str() {
        "trace" => LevelFilter::TRACE,
        "debug" => LevelFilter::DEBUG,
        "info" => LevelFilter::INFO,
        "warn" | "warning" => LevelFilter::WARN,
        "error" => LevelFilter::ERROR,
        "off" => LevelFilter::OFF,
        _ => LevelFilter::INFO,
    }
}

fn general_targets(level: LevelFilter) -> Targets {
    NOISY_TARGETS.iter().fold(
        Targets::new()
            .with_default(level)
            .with_target(TIMING_TARGET, LevelFilter::OFF),
        |targets, target| targets.with_target(*target, level.min(LevelFilter::WARN)),
    )
}

fn timing_targets() -> Targets {
    Targets::new()
        .with_default(LevelFilter::OFF)
        .with_target(TIMING_TARGET, LevelFilter::INFO)
}

fn daily_writer(dir: &Path, file_name: &str, guards: &mut Vec<WorkerGuard>) -> NonBlocking {
    let (writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, file_name));
    guards.push(guard);
    writer
}

/// Booth server logging: readable lines on stdout and in `booth.log`,
/// structured copies in `booth.jsonl`, and the service/operation timing
/// stream alone in `timing.jsonl`.
pub fn init_logging(log_level: &str, log_dir: &Path) -> LoggingGuards {
    if let Err(err) = fs::create_dir_all(log_dir) {
        eprintln!("Failed to create log directory {}: {err}", log_dir.display());
    }

    let mut guards = Vec::with_capacity(3);
    let general = general_targets(parse_log_level(log_level));

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .with_filter(general.clone());
    let text_layer = tracing_subscriber::fmt::layer()
        .with_writer(daily_writer(log_dir, "booth.log", &mut guards))
        .with_ansi(false)
        .with_filter(general.clone());
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(daily_writer(log_dir, "booth.jsonl", &mut guards))
        .with_filter(general);
    let timing_layer = tracing_subscriber::fmt::layer()
        .json()
        .flatten_event(true)
        .with_current_span(false)
        .with_writer(daily_writer(log_dir, "timing.jsonl", &mut guards))
        .with_filter(timing_targets());

    tracing_subscriber::registry()
        .with(stdout_layer)
        .with(text_layer)
        .with(json_layer)
        .with(timing_layer)
        .init();

    LoggingGuards { _guards: guards }
}

/// Stderr-only subscriber for one-shot CLI commands.
pub fn init_cli_logging(log_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_filter(general_targets(parse_log_level(log_level))),
        )
        .init();
}

#[cfg(test)]
mod tests {
    use tracing::Level;

    use super::*;

    #[test]
    fn unknown_levels_default_to_info() {
        assert_eq!(parse_log_level("WARNING"), LevelFilter::WARN);
        assert_eq!(parse_log_level(" debug "), LevelFilter::DEBUG);
        assert_eq!(parse_log_level("chatty"), LevelFilter::INFO);
    }

    #[test]
    fn timing_events_stay_out_of_general_output() {
        let general = general_targets(LevelFilter::TRACE);
        assert!(!general.would_enable(TIMING_TARGET, &Level::INFO));
        assert!(general.would_enable("retro_future_booth::booth::flow", &Level::DEBUG));

        let timing = timing_targets();
        assert!(timing.would_enable(TIMING_TARGET, &Level::INFO));
        assert!(!timing.would_enable("retro_future_booth::booth::flow", &Level::INFO));
    }

    #[test]
    fn http_plumbing_is_capped_at_warn() {
        let general = general_targets(LevelFilter::DEBUG);
        assert!(!general.would_enable("hyper_util::client::legacy::pool", &Level::DEBUG));
        assert!(!general.would_enable("reqwest::connect", &Level::INFO));
        assert!(general.would_enable("reqwest::connect", &Level::WARN));

        let quiet = general_targets(LevelFilter::ERROR);
        assert!(!quiet.would_enable("hyper", &Level::WARN));
        assert!(quiet.would_enable("hyper", &Level::ERROR));
    }
}
