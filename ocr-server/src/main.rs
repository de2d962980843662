use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ocr_server::config::Config;
use ocr_server::manager::ServerManager;
use ocr_server::net::NetworkAddressResolver;
use ocr_server::ocr::OcrProvider;
use ocr_server::server::ServerSupervisor;
use ocr_server::settings::SettingsStore;

#[derive(Parser)]
#[command(name = "ocr-server")]
#[command(about = "On-device OCR server: upload an image, get its text back")]
struct Args {
    /// Address to listen on (overrides OCR_SERVER_HOST)
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (overrides OCR_SERVER_PORT)
    #[arg(long, value_parser = clap::value_parser!(u16).range(1..))]
    port: Option<u16>,

    /// JSON settings file applied before every (re)start (overrides OCR_SERVER_SETTINGS)
    #[arg(long)]
    settings: Option<String>,

    /// Leave the server down after a crash instead of restarting it
    #[arg(long)]
    no_auto_restart: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ocr_server=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = Config::from_env();
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if args.no_auto_restart {
        config.server.auto_restart = false;
    }

    let settings = match args.settings.or_else(Config::settings_path_from_env) {
        Some(path) => {
            tracing::info!("Using settings file {}", path);
            SettingsStore::new(path)
        }
        None => SettingsStore::in_memory(),
    };

    tracing::info!("Initializing OCR engine...");
    let ocr = OcrProvider::new(&config.ocr)?;
    if !ocr.is_available() {
        tracing::warn!("OCR engine unavailable, uploads will be answered with 503");
    }

    let supervisor = ServerSupervisor::new(config.server.clone(), ocr);
    supervisor.set_on_stopped(|| tracing::warn!("Server stopped unexpectedly"));

    let manager = ServerManager::new(
        supervisor,
        NetworkAddressResolver::default(),
        settings,
        config.network.interfaces.clone(),
    );

    let cancel_token = CancellationToken::new();
    let events = manager.spawn_event_listener(cancel_token.child_token());

    let addr = manager.start_server().await?;
    tracing::info!("OCR server starting on http://{}", addr);
    tracing::info!("  Upload form: http://{}/", addr);
    tracing::info!("  Upload API:  POST http://{}/upload", addr);
    if manager.server_urls().is_empty() {
        tracing::info!(
            "No address found on interfaces {}",
            config.network.interfaces.join(",")
        );
    }

    shutdown_signal(cancel_token).await;

    manager.stop_server().await;
    events.await.ok();

    Ok(())
}

async fn shutdown_signal(cancel_token: CancellationToken) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, stopping server...");
    cancel_token.cancel();
}
