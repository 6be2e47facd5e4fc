use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::info;

use taskd::clock::SystemClock;
use taskd::config::DaemonConfig;
use taskd::rest;
use taskd::AppContext;

#[derive(Parser)]
#[command(
    name = "taskd",
    about = "Task management backend daemon",
    version
)]
struct Args {
    /// HTTP API port
    #[arg(long, env = "TASKD_PORT")]
    port: Option<u16>,

    /// Data directory for config and SQLite database
    #[arg(long, env = "TASKD_DATA_DIR")]
    data_dir: Option<std::path::PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "TASKD_LOG")]
    log: Option<String>,

    /// Bind address (default: 127.0.0.1; use 0.0.0.0 for LAN access)
    #[arg(long, env = "TASKD_BIND")]
    bind_address: Option<String>,

    /// Write logs to this file path (rotated daily). Optional.
    #[arg(long, env = "TASKD_LOG_FILE")]
    log_file: Option<std::path::PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Init once — must happen before any tracing calls.
    let log_level = args.log.clone().unwrap_or_else(|| "info".to_string());
    let log_format = std::env::var("TASKD_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());
    let _file_guard = setup_logging(&log_level, args.log_file.as_deref(), &log_format);

    let config = DaemonConfig::load(args.port, args.data_dir, args.log, args.bind_address);
    info!(
        data_dir = %config.data_dir.display(),
        port = config.port,
        "starting taskd"
    );

    let ctx = Arc::new(AppContext::new(config, Arc::new(SystemClock)).await?);
    ctx.spawn_scheduler_jobs();

    rest::start_rest_server(ctx).await
}

/// Initialize the tracing subscriber.
/// If `log_file` is set, logs go to both stdout and a daily-rolling file.
/// Returns a `WorkerGuard` that must stay alive for the process lifetime.
///
/// `log_format` may be `"pretty"` (default, human-readable compact format) or
/// `"json"` (structured JSON for log aggregators).
///
/// If the log directory cannot be created, falls back to stdout-only logging
/// with a warning — never panics.
fn setup_logging(
    log_level: &str,
    log_file: Option<&std::path::Path>,
    log_format: &str,
) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let use_json = log_format == "json";

    if let Some(path) = log_file {
        let dir = path.parent().unwrap_or_else(|| std::path::Path::new("."));
        let filename = path
            .file_name()
            .unwrap_or_else(|| std::ffi::OsStr::new("taskd.log"));

        if std::fs::create_dir_all(dir).is_ok() {
            let appender = tracing_appender::rolling::daily(dir, filename);
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);

            if use_json {
                tracing_subscriber::registry()
                    .with(EnvFilter::new(log_level))
                    .with(fmt::layer().json())
                    .with(fmt::layer().json().with_writer(non_blocking).with_ansi(false))
                    .init();
            } else {
                tracing_subscriber::registry()
                    .with(EnvFilter::new(log_level))
                    .with(fmt::layer().compact())
                    .with(fmt::layer().compact().with_writer(non_blocking).with_ansi(false))
                    .init();
            }
            return Some(guard);
        }
        eprintln!(
            "warning: could not create log directory {} — logging to stdout only",
            dir.display()
        );
    }

    if use_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(log_level)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(log_level)
            .compact()
            .init();
    }
    None
}
