//! HTTP API and live event stream.
//!
//! - `GET    /api/projects`
//! - `POST   /api/projects`
//! - `DELETE /api/projects/{id}`
//! - `GET    /api/projects/{id}/issues`
//! - `GET    /api/projects/{id}/issues/{issue_id}/chain?max_depth=N`
//! - `POST   /api/projects/{id}/refresh`
//! - `GET    /api/events`

pub mod events;
pub mod handlers;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::Router;
use axum::routing::{delete, get, post};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::config::Config;
use crate::error::Result;
use crate::live::{Hub, NotifyBackend, WatchCoordinator};
use crate::registry::Registry;

/// State shared across HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    registry: Arc<Mutex<Registry>>,
    pub coordinator: WatchCoordinator,
    pub hub: Hub,
}

impl AppState {
    #[must_use]
    pub fn new(registry: Registry, coordinator: WatchCoordinator, hub: Hub) -> Self {
        Self {
            registry: Arc::new(Mutex::new(registry)),
            coordinator,
            hub,
        }
    }

    /// Never hold the guard across an `.await`.
    pub fn registry(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/projects",
            get(handlers::list_projects).post(handlers::add_project),
        )
        .route("/api/projects/{id}", delete(handlers::remove_project))
        .route("/api/projects/{id}/issues", get(handlers::list_issues))
        .route(
            "/api/projects/{id}/issues/{issue_id}/chain",
            get(handlers::dependency_chain),
        )
        .route("/api/projects/{id}/refresh", post(handlers::refresh_project))
        .route("/api/events", get(events::events))
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

/// Run the dashboard server until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the runtime cannot be created or the address cannot
/// be bound.
pub fn run(config: Config) -> Result<()> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    rt.block_on(serve(config))
}

/// Serve on the current runtime.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails.
pub async fn serve(config: Config) -> Result<()> {
    let registry = Registry::load(&config.projects_file());
    let hub = Hub::from_settings(&config.live);
    let coordinator = WatchCoordinator::spawn(NotifyBackend, hub.clone(), config.live);

    for project in registry.all() {
        if !project.path.is_dir() {
            warn!(id = project.id, path = %project.path.display(), "Project path missing, not watching");
            continue;
        }
        coordinator.watch(project.path.clone()).await;
    }

    let state = AppState::new(registry, coordinator, hub.clone());
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    info!("Dashboard listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(hub))
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Resolves on Ctrl-C, after ending every open event stream so that
/// graceful shutdown does not wait on them.
async fn shutdown_signal(hub: Hub) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
    hub.close_all();
}
