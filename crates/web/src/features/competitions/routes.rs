use axum::{
    Router, middleware,
    routing::{delete, get, patch, post},
};

use super::handlers::{
    clear_bracket, create_competition, delete_competition, generate_bracket, get_bracket,
    get_competition, get_standings, list_competitions, reconcile_bracket, update_competition,
};
use crate::middleware::auth::{ApiKeys, require_auth};
use crate::state::AppState;

pub fn routes(api_keys: ApiKeys) -> Router<AppState> {
    let protected = Router::new()
        .route("/", post(create_competition))
        .route("/:id", patch(update_competition))
        .route("/:id", delete(delete_competition))
        .route("/:id/generate", post(generate_bracket))
        .route("/:id/bracket", delete(clear_bracket))
        .route("/:id/reconcile", post(reconcile_bracket))
        .route_layer(middleware::from_fn_with_state(api_keys, require_auth));

    Router::new()
        .route("/", get(list_competitions))
        .route("/:id", get(get_competition))
        .route("/:id/bracket", get(get_bracket))
        .route("/:id/standings", get(get_standings))
        .merge(protected)
}
