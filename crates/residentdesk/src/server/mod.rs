//! HTTP front end.
//!
//! | Route           | Purpose                                   |
//! |-----------------|-------------------------------------------|
//! | `GET /`         | navigation page                           |
//! | `GET /feedback` | feedback form                             |
//! | `POST /feedback`| submit `rating`, `description`            |
//! | `GET /ticket`   | ticket form with the housing-block list   |
//! | `POST /ticket`  | submit `problem`, `housing`, `room`, `time_available` |
//!
//! Both submissions answer `303 See Other` to `/`, accepted or not. Bodies are
//! read as URL-encoded or multipart forms; anything else counts as empty.

mod error;
mod form;
mod routes;
mod templates;

use std::sync::Arc;

use axum::{routing::get, Router};
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::desk::Desk;
use crate::error::{Error, Result};

pub use error::AppError;
pub use templates::Templates;

/// State shared by all handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Submission flows.
    pub desk: Desk,
    /// Compiled page templates.
    pub templates: Arc<Templates>,
}

impl AppState {
    /// Build handler state around `desk`.
    ///
    /// # Errors
    ///
    /// Returns an error if the page templates do not compile.
    pub fn new(desk: Desk) -> Result<Self> {
        Ok(Self {
            desk,
            templates: Arc::new(Templates::new()?),
        })
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(routes::index))
        .route(
            "/feedback",
            get(routes::feedback_page).post(routes::submit_feedback),
        )
        .route("/ticket", get(routes::ticket_page).post(routes::submit_ticket))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Create missing stores, then serve until Ctrl+C or SIGTERM.
///
/// # Errors
///
/// Returns an error if the stores cannot be created, the address cannot be
/// bound, or the server fails.
pub async fn serve(addr: &str, desk: Desk) -> Result<()> {
    let init_desk = desk.clone();
    tokio::task::spawn_blocking(move || init_desk.initialize()).await??;

    let app = router(AppState::new(desk)?);

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| Error::Bind {
            addr: addr.to_string(),
            source,
        })?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| Error::server(e.to_string()))?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
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
}
