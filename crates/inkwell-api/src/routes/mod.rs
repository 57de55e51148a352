//! Route modules organized by bounded context.

pub mod health;
pub mod identity;
pub mod orders;

use axum::Router;

use crate::state::AppState;

/// Builds the full application router without middleware.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .nest("/api/v1/identity", identity::router())
        .nest("/api/v1/orders", orders::router())
        .with_state(state)
}
