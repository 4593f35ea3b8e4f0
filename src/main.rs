use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod approval;
mod cli;
mod config;
mod correlation;
mod discharge;
mod errors;
mod notification;

use approval::polled::PolledApproval;
use approval::sync::SyncApproval;
use correlation::engine::{Engine, EngineHandle};
use discharge::{DischargeAuthority, HttpAuthority};
use notification::slack::{Notifier, SlackNotifier};

/// Shared application state passed to handlers.
pub struct AppState {
    pub config: config::Config,
    pub engine: EngineHandle,
    pub notifier: Arc<dyn Notifier>,
    pub sync_approval: SyncApproval,
    pub polled_approval: PolledApproval,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    use opentelemetry::KeyValue;
    use opentelemetry_sdk::{trace as sdktrace, Resource};

    // OTLP export is optional; enabled only when an endpoint is configured.
    let telemetry_layer = if std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").is_ok() {
        let tracer = opentelemetry_otlp::new_pipeline()
            .tracing()
            .with_exporter(opentelemetry_otlp::new_exporter().tonic())
            .with_trace_config(sdktrace::config().with_resource(Resource::new(vec![
                KeyValue::new("service.name", "signoff"),
            ])))
            .install_batch(opentelemetry_sdk::runtime::Tokio)
            .expect("failed to install OpenTelemetry tracer");
        Some(tracing_opentelemetry::layer().with_tracer(tracer))
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "signoff=debug,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .with(telemetry_layer)
        .init();

    let cfg = config::load()?;
    let args = cli::Cli::parse();

    let port = match args.command {
        Some(cli::Commands::Serve { port }) => port,
        None => cfg.port,
    };

    run_server(cfg, port).await
}

async fn run_server(cfg: config::Config, port: u16) -> anyhow::Result<()> {
    let notifier: Arc<dyn Notifier> = Arc::new(SlackNotifier::new(cfg.slack_bot_token.clone()));
    let authority: Arc<dyn DischargeAuthority> =
        Arc::new(HttpAuthority::new(cfg.authority_url.clone()));

    let engine = Engine::spawn(
        Arc::clone(&authority),
        cfg.approval_deadline(),
        cfg.sweep_interval(),
    );
    tracing::info!(
        deadline_secs = cfg.approval_deadline_secs,
        sweep_secs = cfg.sweep_interval_secs,
        "correlation engine started"
    );

    let sync_approval = SyncApproval::new(
        Arc::clone(&notifier),
        Arc::clone(&authority),
        engine.clone(),
        cfg.prompt_channel.clone(),
    );
    let polled_approval = PolledApproval::new(
        Arc::clone(&notifier),
        engine.clone(),
        cfg.prompt_channel.clone(),
    );

    let state = Arc::new(AppState {
        config: cfg,
        engine,
        notifier,
        sync_approval,
        polled_approval,
    });

    let app = axum::Router::new()
        // Health endpoints (no auth)
        .route("/healthz", axum::routing::get(|| async { "ok" }))
        .route("/readyz", axum::routing::get(readiness_check))
        .merge(api::router())
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(request_id_middleware));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("signoff gateway listening on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Middleware: injects a unique X-Request-Id into every response.
/// This allows clients to correlate errors with gateway logs.
async fn request_id_middleware(
    req: axum::extract::Request,
    next: axum::middleware::Next,
) -> axum::response::Response {
    let req_id = uuid::Uuid::new_v4().to_string();
    let mut resp = next.run(req).await;
    if let Ok(val) = axum::http::HeaderValue::from_str(&req_id) {
        resp.headers_mut().insert("x-request-id", val);
    }
    resp
}

async fn readiness_check() -> &'static str {
    "ok"
}
