use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

use kerbside_common::Config;
use kerbside_engine::{FfmpegExtractor, PollPolicy, SearchWorkflow};
use twelvelabs_client::TwelveLabsClient;

mod rest;

pub struct AppState {
    pub workflow: SearchWorkflow<TwelveLabsClient, FfmpegExtractor>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("kerbside=info".parse()?))
        .init();

    let config = Config::from_env();

    let client = TwelveLabsClient::new(config.twelve_key.clone());
    let extractor = FfmpegExtractor::new(&config.ffmpeg_bin, &config.ffprobe_bin);
    let poll = PollPolicy {
        interval: config.poll_interval,
        deadline: config.indexing_deadline,
    };

    let state = Arc::new(AppState {
        workflow: SearchWorkflow::new(client, extractor, poll),
    });

    let app = Router::new()
        // Health check
        .route("/", get(|| async { "ok" }))
        // Vehicle search over uploaded footage
        .route("/api/search", post(rest::api_search))
        .with_state(state)
        // Uploads are whole videos; lift the default 2MB body cap
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        // CORS
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        // Logging layer: method + path only
        .layer(
            tower_http::trace::TraceLayer::new_for_http().make_span_with(
                |request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                },
            ),
        );

    let addr = format!("{}:{}", config.web_host, config.web_port);
    info!("Kerbside API starting on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
