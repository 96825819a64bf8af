//! The HTTP shell around the archive: one HTML page plus a health check.

use std::sync::Arc;

use axum::{
    Router,
    extract::{Query, State},
    response::Html,
    routing::get,
};
use serde::Deserialize;

use crate::{
    error::{self, Error},
    model_manager::ModelManager,
    pipeline::{self, Archive, ArchiveCell},
    render,
    search::{self, CategoryFilter, SearchRequest},
    settings::Settings,
};

pub const BIND_ENV_VAR: &str = "INFOSTREAM_BIND";
pub const DEFAULT_BIND: &str = "127.0.0.1:8501";

/// State shared by every request.
#[derive(Debug)]
pub struct AppState {
    settings: Settings,
    models: ModelManager,
    archive: ArchiveCell,
}

impl AppState {
    /// State whose archive is built on the first page request.
    pub fn new(settings: Settings, models: ModelManager) -> Self {
        Self {
            settings,
            models,
            archive: ArchiveCell::new(),
        }
    }

    /// State around an archive that has already been built.
    pub fn with_archive(
        settings: Settings,
        models: ModelManager,
        archive: Archive,
    ) -> Self {
        Self {
            settings,
            models,
            archive: ArchiveCell::ready(archive),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The memoized archive, building it if this is the first call.
    pub async fn archive(&self) -> Arc<Archive> {
        let settings = self.settings.clone();
        let models = self.models.clone();
        self.archive
            .get_or_build(move || {
                pipeline::build_archive(&settings, || models.load())
            })
            .await
    }
}

/// Query string of the search page.
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    #[serde(default)]
    pub q: String,
    pub category: Option<String>,
    /// Present when the search button was pressed.
    pub search: Option<String>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(search_page))
        .route("/health", get(health))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

async fn search_page(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PageParams>,
) -> Html<String> {
    let archive = state.archive().await;
    let request = SearchRequest::new(
        params.q,
        CategoryFilter::parse(params.category.as_deref()),
        state.settings(),
    )
    .triggered(params.search.is_some());

    let outcome = {
        let archive = archive.clone();
        let request = request.clone();
        tokio::task::spawn_blocking(move || {
            search::execute_search(&archive, &request)
        })
        .await
        .unwrap_or_else(|e| {
            Err(Error::Server(format!("search task failed: {e}")))
        })
    };

    if let Err(e) = &outcome {
        tracing::warn!(query = %request.query, "search failed: {e}");
    }

    Html(render::render_page(&archive, &request, &outcome))
}

/// Bind `bind` and serve until interrupted.
pub fn run_server(bind: &str, state: AppState) -> error::Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| {
            Error::Server(format!("failed to start tokio runtime: {e}"))
        })?;

    runtime.block_on(async move {
        let listener =
            tokio::net::TcpListener::bind(bind).await.map_err(|e| {
                Error::Server(format!("cannot bind {bind}: {e}"))
            })?;
        tracing::info!(address = %bind, "listening");

        axum::serve(listener, router(Arc::new(state)))
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
                tracing::info!("shutting down");
            })
            .await?;
        Ok::<(), Error>(())
    })
}
