mod config;
mod errors;
mod llm_client;
mod report;
mod routes;
mod state;
mod storage;
mod survey;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{Config, StorageBackend};
use crate::llm_client::LlmClient;
use crate::report::chart::SvgChartBackend;
use crate::report::pdf::PdfExporter;
use crate::report::raster::ReportRasterizer;
use crate::report::ReportRenderer;
use crate::routes::{build_configuration_error_router, build_router};
use crate::state::ApiState;
use crate::storage::{FileStore, KeyValueStore, MemoryStore, ReportStore};
use crate::survey::orchestrator::Orchestrator;
use crate::survey::service::SurveyService;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Survey API v{}", env!("CARGO_PKG_VERSION"));

    let router = match &config.anthropic_api_key {
        Some(api_key) => build_router(build_state(&config, api_key.clone())?),
        None => {
            warn!("ANTHROPIC_API_KEY is not set; serving configuration errors only");
            build_configuration_error_router()
        }
    };

    let app = router
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the web client has a fixed host

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn build_state(config: &Config, api_key: String) -> Result<ApiState> {
    let store: Box<dyn KeyValueStore> = match config.storage_backend {
        StorageBackend::File => {
            info!("Report storage: files under {}", config.storage_dir.display());
            Box::new(FileStore::new(config.storage_dir.clone()))
        }
        StorageBackend::Memory => {
            info!("Report storage: in-memory");
            Box::new(MemoryStore::new())
        }
    };

    let llm = LlmClient::new(api_key)?;
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    let rasterizer = ReportRasterizer::with_font_search(config.report_font_path.as_deref());

    let survey = SurveyService::new(
        Orchestrator::new(ReportStore::new(store)),
        ReportRenderer::new(Box::new(SvgChartBackend::default())),
        Arc::new(llm),
        PdfExporter::new(Arc::new(rasterizer)),
    );

    Ok(ApiState {
        survey: Arc::new(survey),
    })
}
