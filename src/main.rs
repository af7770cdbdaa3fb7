//! Integrity Guard - HTTP gate admitting only signed, fresh, unreplayed requests.

use std::env;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use integrity_guard::audit::AuditLogger;
use integrity_guard::auth::RequestGuard;
use integrity_guard::cache::MemoryCache;
use integrity_guard::config::Settings;
use integrity_guard::gateway::{self, AppState};

const VERSION: &str = env!("CARGO_PKG_VERSION");
const NAME: &str = env!("CARGO_PKG_NAME");
const DEFAULT_CONFIG_PATH: &str = "/etc/integrity-guard/guard.toml";

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return ExitCode::SUCCESS;
    }

    if args.iter().any(|a| a == "--version" || a == "-V") {
        println!("{} {}", NAME, VERSION);
        return ExitCode::SUCCESS;
    }

    let config_path = get_config_path(&args);

    let settings = match Settings::load(config_path.as_deref()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    init_logging(&settings);

    info!("Starting {} v{}", NAME, VERSION);
    match &config_path {
        Some(path) => info!("Configuration loaded from: {}", path.display()),
        None => info!("No configuration file, using defaults and environment"),
    }
    info!("Bind address: {}", settings.server.bind);
    info!("Log level: {}", settings.logging.level);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "Failed to create Tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(async_main(settings)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Gateway failed");
            ExitCode::FAILURE
        }
    }
}

async fn async_main(settings: Settings) -> Result<(), Box<dyn std::error::Error>> {
    let cache = Arc::new(MemoryCache::new());
    cache.start_cleanup_task(Duration::from_secs(
        settings.security.cleanup_interval_seconds,
    ));

    let guard = Arc::new(RequestGuard::new(&settings.security, cache));
    if !guard.is_configured() {
        warn!("ANTI_SPAM_TOKEN is not set; every request will be rejected");
    }

    let audit_logger = if settings.audit.enabled {
        let logger = AuditLogger::new(&settings.audit.log_path)?;
        info!("Audit log: {}", logger.path().display());
        Some(Arc::new(logger))
    } else {
        None
    };

    let listener = gateway::bind(&settings.server.bind).await?;
    let state = AppState::new(guard, audit_logger, settings.server.max_body_size);

    gateway::serve(
        listener,
        state,
        Duration::from_secs(settings.server.request_timeout_seconds),
        shutdown_signal(),
    )
    .await?;

    info!("Gateway stopped");
    Ok(())
}

/// Wait for a shutdown signal (SIGTERM or SIGINT).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, draining connections...");
}

/// Print help message.
fn print_help() {
    println!(
        r#"{} {}
HTTP gate admitting only signed, fresh, unreplayed requests.

USAGE:
    {} [OPTIONS]

OPTIONS:
    -c, --config <PATH>    Path to configuration file
                           [default: {} if present]
    -h, --help             Print help information
    -V, --version          Print version information

ENVIRONMENT:
    ANTI_SPAM_TOKEN            Shared secret (required for any request to pass)
    ANTI_SPAM_WINDOW_MS        Allowed clock skew [default: 300000]
    ANTI_SPAM_REPLAY_TTL_MS    Replay record lifetime [default: 600000]
    ANTI_SPAM_RATE_WINDOW_MS   Rate-limit window [default: 900000]
    ANTI_SPAM_RATE_MAX         Requests per IP per window [default: 10]
    RUST_LOG                   Log filter, overrides the configured level
"#,
        NAME, VERSION, NAME, DEFAULT_CONFIG_PATH
    );
}

/// Get configuration file path from command line arguments.
fn get_config_path(args: &[String]) -> Option<PathBuf> {
    for (i, arg) in args.iter().enumerate() {
        if (arg == "--config" || arg == "-c") && i + 1 < args.len() {
            return Some(PathBuf::from(&args[i + 1]));
        }
        if let Some(path) = arg.strip_prefix("--config=") {
            return Some(PathBuf::from(path));
        }
    }

    let default = Path::new(DEFAULT_CONFIG_PATH);
    default.exists().then(|| default.to_path_buf())
}

/// Initialize logging based on settings.
fn init_logging(settings: &Settings) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.logging.level));

    match settings.logging.format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty())
                .init();
        }
    }
}
