// # zonepopd - ZonePop Daemon
//
// This is a THIN integration layer. Reconciliation, DNS and reverse-DNS
// logic all live in zonepop-core and the plugin crates.
//
// The zonepopd daemon is responsible for:
// 1. Reading daemon settings from environment variables
// 2. Loading the TOML configuration of sources and providers
// 3. Registering plugin factories and building the controller
// 4. Exposing metrics and the forward snapshot over HTTP (optional)
// 5. Running the controller until SIGINT/SIGTERM
//
// ## Configuration
//
// - `ZONEPOP_CONFIG`: Path to the TOML configuration (default `zonepop.toml`)
// - `ZONEPOP_INTERVAL_SECS`: Overrides `controller.interval_secs`
// - `ZONEPOP_ONCE`: Run a single pass and exit (non-zero exit on failure)
// - `ZONEPOP_DRY_RUN`: Query sources but never call providers
// - `ZONEPOP_LOG_LEVEL`: trace, debug, info, warn, error (default info)
// - `ZONEPOP_LISTEN_ADDR`: Serve `/metrics` and `/endpoints/forward` here
//
// Provider secrets are read from the environment variables the
// configuration names, never from the configuration file itself.
//
// ## Example
//
// ```bash
// export ZONEPOP_CONFIG=/etc/zonepop/zonepop.toml
// export ZONEPOP_LISTEN_ADDR=127.0.0.1:9153
// export PDNS_API_KEY=...
//
// zonepopd
// ```

mod http;

use anyhow::Result;
use chrono::Utc;
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;
use zonepop_core::{Controller, Registry, RunOptions, ZonepopConfig};

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum ZonepopExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<ZonepopExitCode> for ExitCode {
    fn from(code: ZonepopExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Daemon settings
#[derive(Debug, Clone, PartialEq, Eq)]
struct Settings {
    config_path: PathBuf,
    interval_secs: Option<u64>,
    once: bool,
    dry_run: bool,
    log_level: String,
    listen_addr: Option<SocketAddr>,
}

impl Settings {
    /// Load settings from environment variables
    fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let interval_secs = match lookup("ZONEPOP_INTERVAL_SECS") {
            Some(value) => Some(value.trim().parse().map_err(|_| {
                anyhow::anyhow!("ZONEPOP_INTERVAL_SECS must be a number of seconds. Got: {value}")
            })?),
            None => None,
        };
        let listen_addr = match lookup("ZONEPOP_LISTEN_ADDR").filter(|v| !v.is_empty()) {
            Some(value) => Some(value.parse().map_err(|_| {
                anyhow::anyhow!("ZONEPOP_LISTEN_ADDR must be an address like 127.0.0.1:9153. Got: {value}")
            })?),
            None => None,
        };

        Ok(Self {
            config_path: lookup("ZONEPOP_CONFIG")
                .unwrap_or_else(|| "zonepop.toml".to_string())
                .into(),
            interval_secs,
            once: parse_flag("ZONEPOP_ONCE", lookup("ZONEPOP_ONCE"))?,
            dry_run: parse_flag("ZONEPOP_DRY_RUN", lookup("ZONEPOP_DRY_RUN"))?,
            log_level: lookup("ZONEPOP_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            listen_addr,
        })
    }

    /// Validate the settings
    fn validate(&self) -> Result<()> {
        if self.interval_secs == Some(0) {
            anyhow::bail!("ZONEPOP_INTERVAL_SECS must be > 0");
        }
        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "ZONEPOP_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }
        Ok(())
    }

    fn tracing_level(&self) -> Level {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    }

    /// Apply environment overrides to the loaded configuration
    fn apply(&self, config: &mut ZonepopConfig) {
        if let Some(interval_secs) = self.interval_secs {
            config.controller.interval_secs = interval_secs;
        }
        if self.dry_run {
            config.controller.dry_run = true;
        }
    }
}

fn parse_flag(name: &str, value: Option<String>) -> Result<bool> {
    match value.as_deref().map(str::trim).map(str::to_lowercase).as_deref() {
        None | Some("") | Some("0") | Some("false") | Some("no") => Ok(false),
        Some("1") | Some("true") | Some("yes") => Ok(true),
        Some(other) => anyhow::bail!("{name} must be true or false. Got: {other}"),
    }
}

/// Registry with every compiled-in component
fn build_registry() -> Registry {
    let registry = Registry::with_builtins();

    #[cfg(feature = "authoritative")]
    zonepop_provider_authoritative::register(&registry);

    #[cfg(feature = "file")]
    zonepop_provider_file::register(&registry);

    #[cfg(feature = "http")]
    zonepop_source_http::register(&registry);

    registry
}

fn main() -> ExitCode {
    // Load settings from environment
    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            return ZonepopExitCode::ConfigError.into();
        }
    };

    if let Err(e) = settings.validate() {
        eprintln!("Configuration validation error: {e}");
        return ZonepopExitCode::ConfigError.into();
    }

    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_max_level(settings.tracing_level())
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {e}");
        return ZonepopExitCode::ConfigError.into();
    }

    info!(config = %settings.config_path.display(), "Starting zonepopd daemon");

    let mut config = match ZonepopConfig::load(&settings.config_path) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Failed to load configuration");
            return ZonepopExitCode::ConfigError.into();
        }
    };
    settings.apply(&mut config);

    let registry = build_registry();
    let controller = match registry.build_controller(&config) {
        Ok(controller) => controller,
        Err(e) => {
            error!(error = %e, "Failed to build controller");
            return ZonepopExitCode::ConfigError.into();
        }
    };
    info!(
        sources = ?controller.source_names(),
        providers = ?controller.provider_names(),
        "Configuration loaded"
    );

    // Enter tokio runtime
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return ZonepopExitCode::RuntimeError.into();
        }
    };

    let options = RunOptions {
        dry_run: config.controller.dry_run,
    };
    let result = rt.block_on(async {
        let listener = match settings.listen_addr {
            Some(addr) => match http::bind(addr).await {
                Ok(listener) => Some(listener),
                Err(e) => {
                    error!(error = %e, "Failed to start HTTP server");
                    return ZonepopExitCode::ConfigError;
                }
            },
            None => None,
        };

        if let Err(e) = run_daemon(&settings, controller, registry, listener, options).await {
            error!("Daemon error: {}", e);
            ZonepopExitCode::RuntimeError
        } else {
            ZonepopExitCode::CleanShutdown
        }
    });

    result.into()
}

/// Run the daemon
async fn run_daemon(
    settings: &Settings,
    controller: Controller,
    registry: Registry,
    listener: Option<TcpListener>,
    options: RunOptions,
) -> Result<()> {
    if options.dry_run {
        warn!("Running in DRY-RUN mode - no provider will be called");
    }

    let shutdown = CancellationToken::new();

    let http_server = listener.map(|listener| {
        tokio::spawn(http::start_http_server(
            listener,
            registry.endpoint_cache(),
            shutdown.clone(),
        ))
    });

    let result = if settings.once {
        info!("Running a single reconciliation pass");
        controller.run_once(options).await.map_err(anyhow::Error::from)
    } else {
        let signals = {
            let shutdown = shutdown.clone();
            tokio::spawn(async move {
                match wait_for_shutdown().await {
                    Ok(signal) => info!("Received shutdown signal: {}", signal),
                    Err(e) => error!("Shutdown signal error: {}", e),
                }
                shutdown.cancel();
            })
        };

        controller.schedule_run_once(Utc::now());
        controller.run(shutdown.clone(), options).await;
        signals.abort();
        Ok(())
    };

    info!("Shutting down daemon");
    shutdown.cancel();
    if let Some(server) = http_server {
        match server.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(e) => return Err(anyhow::anyhow!("HTTP server task failed: {e}")),
        }
    }

    result
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
///
/// # Returns
///
/// Returns the name of the signal received.
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    // Set up signal handlers for SIGTERM and SIGINT
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
