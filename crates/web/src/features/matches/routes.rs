use axum::{
    Router, middleware,
    routing::{get, post},
};

use super::handlers::{close_expired, complete_match, get_match, start_voting, submit_vote};
use crate::middleware::auth::{ApiKeys, require_auth};
use crate::state::AppState;

pub fn routes(api_keys: ApiKeys) -> Router<AppState> {
    let protected = Router::new()
        .route("/close-expired", post(close_expired))
        .route("/:id/start", post(start_voting))
        .route("/:id/complete", post(complete_match))
        .route_layer(middleware::from_fn_with_state(api_keys, require_auth));

    Router::new()
        .route("/:id", get(get_match))
        .route("/:id/vote", post(submit_vote))
        .merge(protected)
}
