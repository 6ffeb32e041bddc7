use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser; // for cli
use salon_gateway::config::Args;
use salon_gateway::provider::GeminiProvider;
use salon_gateway::rate_limit::{SystemClock, build_limiter, sweeper};
use salon_gateway::state::AppState;
use salon_gateway::{Result, build_router, setup_tracing};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

// this is main async function with tokio
#[tokio::main]
async fn main() {
    // parse cli arguments
    let args = Args::parse();
    setup_tracing(&args.log_level, args.log_format);

    if let Err(e) = run(args).await {
        error!(error = %e, "Gateway stopped");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    args.validate()?;
    let api_key = args.require_api_key()?;

    let provider = GeminiProvider::new(
        reqwest::Client::new(),
        args.provider_url.clone(),
        api_key,
        args.text_model.clone(),
        args.image_model.clone(),
    );

    let limiter = build_limiter(
        args.limiter,
        args.rate_limit,
        args.rate_window(),
        Arc::new(SystemClock),
    );

    // keep the limiter map bounded
    if let Some(every) = args.sweep_every() {
        let sweep_limiter = Arc::clone(&limiter);
        tokio::spawn(async move {
            sweeper(sweep_limiter, every).await;
        });
    } else {
        warn!("Rate limit sweeping disabled, limiter state grows with distinct clients");
    }

    // creating shared state
    let state = Arc::new(AppState {
        provider: Arc::new(provider),
        limiter,
        max_body_bytes: args.max_body_bytes,
    });

    let app = build_router(state, &args.endpoint);

    let addr = format!("{}:{}", args.host, args.port);
    let listener = TcpListener::bind(&addr).await?;

    info!(%addr, endpoint = %args.endpoint, "Gateway listening");
    info!(provider = %args.provider_url, text_model = %args.text_model, image_model = %args.image_model, "Provider configured");
    info!(
        limiter = ?args.limiter,
        limit = args.rate_limit,
        window_ms = args.rate_window_ms,
        "Rate limiting enabled"
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Gateway shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received");
}
