//! `/v1` route tree: topics and subscriptions, nested under the project path.

use aide::axum::ApiRouter;

mod subscriptions;
mod topics;

pub fn handler() -> ApiRouter {
    ApiRouter::new().merge(topics::handler()).merge(subscriptions::handler())
}
