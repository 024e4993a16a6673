use std::time::Duration;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::features::{competitions, matches};
use crate::middleware::auth::ApiKeys;
use crate::openapi::ApiDoc;
use crate::state::AppState;

/// The full HTTP surface: `/api` routes, Swagger UI and CORS
pub fn router(state: AppState, api_keys: ApiKeys) -> Router {
    if api_keys.is_empty() {
        tracing::warn!("No API keys configured; admin endpoints will reject every request");
    }

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .max_age(Duration::from_secs(3600));

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .nest(
            "/api/competitions",
            competitions::routes::routes(api_keys.clone()),
        )
        .nest("/api/matches", matches::routes::routes(api_keys))
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use bracket::BracketEngine;
    use serde_json::{Value, json};
    use std::sync::Arc;
    use storage::MemoryStore;
    use tower::ServiceExt;

    const KEY: &str = "test-key";

    fn test_app() -> Router {
        let store = Arc::new(MemoryStore::new());
        let engine = BracketEngine::new(store.clone(), store);
        router(AppState::new(engine, 10), ApiKeys::from_comma_separated(KEY))
    }

    async fn call(
        app: &Router,
        method: &str,
        uri: &str,
        body: Option<Value>,
        key: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(key) = key {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {key}"));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    async fn create(app: &Router, format: &str) -> i64 {
        let (status, body) = call(
            app,
            "POST",
            "/api/competitions",
            Some(json!({"festival_id": 1, "name": "Poetry Slam", "competition_type": format})),
            Some(KEY),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        body["competition"]["competition_id"].as_i64().unwrap()
    }

    async fn generate(app: &Router, id: i64, performers: Value) -> Value {
        let (status, body) = call(
            app,
            "POST",
            &format!("/api/competitions/{id}/generate"),
            Some(json!({ "performer_ids": performers })),
            Some(KEY),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["matches"].clone()
    }

    #[tokio::test]
    async fn test_admin_routes_require_api_key() {
        let app = test_app();
        let payload = json!({"festival_id": 1, "name": "Slam"});

        let (status, body) =
            call(&app, "POST", "/api/competitions", Some(payload.clone()), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Unauthorized");

        let (status, _) =
            call(&app, "POST", "/api/competitions", Some(payload), Some("wrong")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = call(&app, "POST", "/api/matches/close-expired", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_competition_setup_over_http() {
        let app = test_app();
        let id = create(&app, "single_elimination").await;

        let (status, body) = call(&app, "GET", &format!("/api/competitions/{id}"), None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["competition"]["status"], "setup");
        assert_eq!(body["competition"]["voting_duration"], 10);

        let (_, listed) = call(&app, "GET", "/api/competitions?festival_id=1", None, None).await;
        assert_eq!(listed["competitions"].as_array().unwrap().len(), 1);
        let (_, other) = call(&app, "GET", "/api/competitions?festival_id=2", None, None).await;
        assert!(other["competitions"].as_array().unwrap().is_empty());

        let matches = generate(&app, id, json!([1, 2, 3, 4])).await;
        assert_eq!(matches.as_array().unwrap().len(), 3);

        let (status, view) =
            call(&app, "GET", &format!("/api/competitions/{id}/bracket"), None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["bracket"]["rounds"]["1"].as_array().unwrap().len(), 2);
        assert_eq!(view["bracket"]["rounds"]["2"].as_array().unwrap().len(), 1);

        let (_, standings) =
            call(&app, "GET", &format!("/api/competitions/{id}/standings"), None, None).await;
        assert!(standings["standings"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_vote_and_complete_over_http() {
        let app = test_app();
        let id = create(&app, "single_elimination").await;
        let matches = generate(&app, id, json!([1, 2])).await;
        let match_id = matches[0]["match_id"].as_i64().unwrap();

        let (status, started) =
            call(&app, "POST", &format!("/api/matches/{match_id}/start"), None, Some(KEY)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(started["match"]["status"], "voting");

        let vote_uri = format!("/api/matches/{match_id}/vote");
        let ballot = json!({"performer_id": 1, "voter_id": "phone-1"});
        let (status, first) = call(&app, "POST", &vote_uri, Some(ballot.clone()), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first["vote"]["result"], "counted");
        assert_eq!(first["vote"]["votes_performer_1"], 1);

        let (status, repeat) = call(&app, "POST", &vote_uri, Some(ballot), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(repeat["success"], true);
        assert_eq!(repeat["vote"]["result"], "duplicate");

        let (status, rejected) = call(
            &app,
            "POST",
            &vote_uri,
            Some(json!({"performer_id": 3, "voter_id": "phone-2"})),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(rejected["error"].as_str().unwrap().contains("not part of this match"));

        let (status, completed) = call(
            &app,
            "POST",
            &format!("/api/matches/{match_id}/complete"),
            None,
            Some(KEY),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(completed["match"]["winner_id"], 1);
        assert_eq!(completed["advancement"]["champion"], 1);

        let (_, competition) =
            call(&app, "GET", &format!("/api/competitions/{id}"), None, None).await;
        assert_eq!(competition["competition"]["status"], "completed");
        assert_eq!(competition["competition"]["winner_performer_id"], 1);
    }

    #[tokio::test]
    async fn test_errors_use_error_body() {
        let app = test_app();

        let (status, body) = call(&app, "GET", "/api/competitions/999", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].is_string());

        let (status, body) = call(&app, "GET", "/api/matches/999", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].is_string());

        let id = create(&app, "double_elimination").await;
        let (status, body) = call(
            &app,
            "POST",
            &format!("/api/competitions/{id}/generate"),
            Some(json!({"performer_ids": [1]})),
            Some(KEY),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Validation failed");

        let matches = generate(&app, id, json!([1, 2, 3, 4])).await;
        let final_id = matches
            .as_array()
            .unwrap()
            .iter()
            .find(|m| m["bracket_position"] == "W_R2M1")
            .and_then(|m| m["match_id"].as_i64())
            .unwrap();
        let (status, body) =
            call(&app, "POST", &format!("/api/matches/{final_id}/start"), None, Some(KEY)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("waiting on an earlier result"));
    }

    #[tokio::test]
    async fn test_format_is_frozen_after_generation() {
        let app = test_app();
        let id = create(&app, "single_elimination").await;
        let uri = format!("/api/competitions/{id}");

        let (status, _) = call(
            &app,
            "PATCH",
            &uri,
            Some(json!({"competition_type": "round_robin"})),
            Some(KEY),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        generate(&app, id, json!([1, 2, 3])).await;
        let (status, body) = call(
            &app,
            "PATCH",
            &uri,
            Some(json!({"competition_type": "double_elimination", "name": "Renamed"})),
            Some(KEY),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());

        let (status, renamed) =
            call(&app, "PATCH", &uri, Some(json!({"name": "Renamed"})), Some(KEY)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(renamed["competition"]["name"], "Renamed");
        assert_eq!(renamed["competition"]["competition_type"], "round_robin");
    }

    #[tokio::test]
    async fn test_editing_finished_competition_keeps_result() {
        let app = test_app();
        let id = create(&app, "single_elimination").await;
        let matches = generate(&app, id, json!([1, 2])).await;
        let match_id = matches[0]["match_id"].as_i64().unwrap();
        call(&app, "POST", &format!("/api/matches/{match_id}/start"), None, Some(KEY)).await;
        let (status, _) = call(
            &app,
            "POST",
            &format!("/api/matches/{match_id}/complete"),
            Some(json!({"winner_id": 2})),
            Some(KEY),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, edited) = call(
            &app,
            "PATCH",
            &format!("/api/competitions/{id}"),
            Some(json!({"name": "Slam Finals", "voting_duration": 15})),
            Some(KEY),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(edited["competition"]["name"], "Slam Finals");
        assert_eq!(edited["competition"]["status"], "completed");
        assert_eq!(edited["competition"]["winner_performer_id"], 2);
    }

    #[tokio::test]
    async fn test_delete_removes_competition() {
        let app = test_app();
        let id = create(&app, "round_robin").await;
        generate(&app, id, json!([1, 2, 3])).await;

        let uri = format!("/api/competitions/{id}");
        let (status, body) = call(&app, "DELETE", &uri, None, Some(KEY)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);

        let (status, _) = call(&app, "GET", &uri, None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
