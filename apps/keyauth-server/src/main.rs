//! KeyAuth Server - request-signature authentication in front of a tiny
//! identity endpoint.
//!
//! # Usage
//!
//! ```text
//! KEYAUTH_CREDENTIALS_FILE=credentials.json keyauth-server
//! keyauth-server generate        # print a fresh API key / shared secret pair
//! keyauth-server --health-check  # probe a running server (exit code 0 = healthy)
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `KEYAUTH_LISTEN` | `0.0.0.0:8080` | Bind address |
//! | `KEYAUTH_SIGNATURE_SCHEME` | `hmac-sha256` | `hmac-sha256` or `legacy-md5` |
//! | `KEYAUTH_TIMESTAMP_TOLERANCE_SECS` | *(unset)* | Freshness window; unset or `0` disables |
//! | `KEYAUTH_CREDENTIALS_FILE` | *(unset)* | JSON array of `{user, api_key, shared_secret}` |
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `LOG_FORMAT` | `text` | `text` or `json` |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |

mod service;

use std::fs::File;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as HttpConnBuilder;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use keyauth::config::LogFormat;
use keyauth::{AuthGate, InMemoryCredentialStore, KeyAuthConfig};

use crate::service::KeyAuthService;

/// Server version reported at startup.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the tracing subscriber.
///
/// Uses `RUST_LOG` if set, otherwise falls back to the `LOG_LEVEL` config value.
fn init_tracing(log_level: &str, format: LogFormat) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }

    Ok(())
}

/// Build the credential store from the configured file, or an empty store.
fn load_store(config: &KeyAuthConfig) -> Result<InMemoryCredentialStore> {
    let Some(path) = &config.credentials_file else {
        warn!("KEYAUTH_CREDENTIALS_FILE not set, every signed request will be rejected");
        return Ok(InMemoryCredentialStore::new());
    };

    let file =
        File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
    let store = InMemoryCredentialStore::from_json_reader(file)
        .with_context(|| format!("invalid credentials file {}", path.display()))?;

    info!(path = %path.display(), users = store.len(), "loaded credentials");
    Ok(store)
}

/// Print a freshly generated credential pair as JSON.
fn print_generated_pair() -> Result<()> {
    let (api_key, shared_secret) = keyauth::generate_pair();
    let pair = serde_json::json!({
        "api_key": api_key.as_str(),
        "shared_secret": shared_secret.as_str(),
    });
    println!("{}", serde_json::to_string_pretty(&pair)?);
    Ok(())
}

/// Accept connections and hand each one to `service` until Ctrl-C, then wait
/// for in-flight requests to finish.
async fn serve(listener: TcpListener, service: KeyAuthService) -> Result<()> {
    let http = HttpConnBuilder::new(TokioExecutor::new());
    let graceful = hyper_util::server::graceful::GracefulShutdown::new();
    let mut ctrl_c = std::pin::pin!(tokio::signal::ctrl_c());

    loop {
        let (stream, peer_addr) = tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok(conn) => conn,
                Err(e) => {
                    warn!(error = %e, "accept failed");
                    continue;
                }
            },
            _ = &mut ctrl_c => break,
        };

        let conn = graceful.watch(
            http.serve_connection(TokioIo::new(stream), service.clone())
                .into_owned(),
        );
        tokio::spawn(async move {
            if let Err(e) = conn.await {
                debug!(%peer_addr, error = %e, "connection closed with error");
            }
        });
    }

    info!("shutdown requested, draining connections");
    graceful.shutdown().await;
    Ok(())
}

/// Probe `GET /health` on a running server; succeeds on a `200` status line.
async fn run_health_check(addr: &str) -> Result<()> {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let mut stream = tokio::net::TcpStream::connect(addr)
        .await
        .with_context(|| format!("cannot connect to {addr}"))?;
    let request = format!("GET /health HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await?;

    let mut response = Vec::new();
    stream.read_to_end(&mut response).await?;
    anyhow::ensure!(
        response.starts_with(b"HTTP/1.1 200"),
        "unhealthy response from {addr}"
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    if std::env::args().nth(1).as_deref() == Some("generate") {
        return print_generated_pair();
    }

    let config = KeyAuthConfig::from_env().context("invalid configuration")?;

    if std::env::args().any(|a| a == "--health-check") {
        let addr = config.listen.replace("0.0.0.0", "127.0.0.1");
        let healthy = run_health_check(&addr).await.is_ok();
        std::process::exit(i32::from(!healthy));
    }

    init_tracing(&config.log_level, config.log_format)?;

    let store = load_store(&config)?;
    let gate = AuthGate::new(Arc::new(store), config.gate_config());
    info!(
        scheme = %gate.config().scheme,
        timestamp_tolerance_secs = gate.config().timestamp_tolerance.map(|d| d.as_secs()),
        "initialized authentication gate",
    );

    let addr: SocketAddr = config
        .listen
        .parse()
        .with_context(|| format!("invalid bind address: {}", config.listen))?;

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    info!(%addr, version = VERSION, "starting KeyAuth Server");

    serve(listener, KeyAuthService::new(gate)).await
}
