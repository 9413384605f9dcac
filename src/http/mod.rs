//! REST surface over the gateway core. Thin JSON adapters; all real logic
//! lives in [`crate::handler`].

pub mod routes;
pub mod state;

pub use state::AppState;

use axum::Router;
use tower_http::trace::TraceLayer;

/// Build the full router, with request tracing installed.
pub fn app(state: AppState) -> Router {
    routes::router(state).layer(TraceLayer::new_for_http())
}
