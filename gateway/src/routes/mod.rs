mod docs;
mod health;
mod v1;

use aide::axum::{routing::get, ApiRouter};

use crate::middleware::auth_middleware;

/// Builds the full router. `/v1` carries [`auth_middleware`] as a route layer so every
/// project-scoped route underneath it is authenticated before the handler runs;
/// `/health` and the docs routes stay open.
pub fn handler() -> ApiRouter {
    ApiRouter::new()
        .merge(docs::handler())
        .api_route("/health", get(health::handler))
        .nest("/v1", v1::handler().route_layer(axum::middleware::from_fn(auth_middleware)))
}
