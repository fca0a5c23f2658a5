//! HTTP resource API for student records.
//!
//! ## Routes
//!
//! - `GET /student`: list, newest first
//! - `POST /student`: create
//! - `GET /student/:id`: fetch one
//! - `PATCH /student/:id`: partial update
//! - `DELETE /student/:id`: delete
//! - `GET /health`: store liveness
//!
//! The collection routes answer with or without a trailing slash. All
//! responses allow any origin.

pub mod error;
pub mod handlers;

use std::net::SocketAddr;

use axum::extract::Request;
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tracing::info;

pub use error::ApiError;

use crate::config::Config;
use crate::storage::Storage;

/// Build the router over an already-opened store.
pub fn router(storage: Storage) -> Router {
    let collection = get(handlers::list_students).post(handlers::create_student);
    let member = get(handlers::get_student)
        .patch(handlers::update_student)
        .delete(handlers::delete_student);

    Router::new()
        .route("/student", collection.clone())
        .route("/student/", collection)
        .route("/student/:id", member)
        .route("/health", get(handlers::health))
        .layer(middleware::from_fn(cors))
        .with_state(storage)
}

/// Permissive CORS: answer preflights and tag every response.
async fn cors(req: Request, next: Next) -> Response {
    let mut response = if req.method() == Method::OPTIONS {
        StatusCode::NO_CONTENT.into_response()
    } else {
        next.run(req).await
    };

    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET,HEAD,PUT,PATCH,POST,DELETE"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("content-type"),
    );
    response
}

/// Serve the API on an already-bound listener until the server stops.
///
/// # Errors
///
/// Returns an error if the server fails while running.
pub async fn serve_on(listener: TcpListener, storage: Storage) -> std::io::Result<()> {
    axum::serve(listener, router(storage)).await
}

/// Open the store, bind the listener and serve.
///
/// The store is opened (and its schema initialized) before the listener is
/// bound, so no request is ever accepted against an unavailable store.
///
/// # Errors
///
/// Returns an error if the store cannot be opened, the address cannot be
/// bound, or the server fails.
pub async fn serve(config: &Config) -> anyhow::Result<()> {
    let database_path = config.database_path();
    let pool_size = config.store.pool_size;
    let storage =
        tokio::task::spawn_blocking(move || Storage::open(database_path, pool_size)).await??;

    let addr: SocketAddr = config.listen_addr()?;
    let listener = TcpListener::bind(addr).await?;
    info!(
        "API running on http://{} (database {})",
        listener.local_addr()?,
        storage.path().display()
    );

    serve_on(listener, storage).await?;
    Ok(())
}
