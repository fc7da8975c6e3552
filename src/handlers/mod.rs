pub mod responses;
pub mod sessions;
pub mod themes;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

async fn health() -> &'static str {
    "ok"
}

pub fn theme_routes() -> Router<AppState> {
    Router::new()
        .route("/api/keywords", get(themes::list_keywords))
        .route("/api/themes/resolve", post(themes::resolve_themes))
}

pub fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/api/sessions", post(sessions::create_session))
        .route("/api/sessions/{id}", get(sessions::get_session))
        .route("/api/sessions/{id}/enter", post(sessions::enter))
        .route("/api/sessions/{id}/keywords", post(sessions::select_keywords))
        .route("/api/sessions/{id}/keywords/toggle", post(sessions::toggle_keyword))
        .route("/api/sessions/{id}/keywords/submit", post(sessions::submit_keywords))
        .route("/api/sessions/{id}/capture", post(sessions::capture))
        .route("/api/sessions/{id}/retake", post(sessions::retake))
        .route("/api/sessions/{id}/generate", post(sessions::generate))
        .route("/api/sessions/{id}/composite", post(sessions::upload_composite))
        .route("/api/sessions/{id}/back", post(sessions::go_back))
        .route("/api/sessions/{id}/restart", post(sessions::restart))
}

pub fn router(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/healthz", get(health))
        .merge(theme_routes())
        .merge(session_routes())
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::state::test_support::{jpeg_data_url, state_with};

    async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    fn app(fail_generation: bool) -> Router {
        router(state_with(fail_generation, false), 1024 * 1024)
    }

    #[tokio::test]
    async fn keywords_are_listed_in_declaration_order() {
        let (status, body) = call(&app(false), Method::GET, "/api/keywords", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["keywords"][0], "Bold");
        assert_eq!(body["keywords"].as_array().unwrap().len(), 14);
        assert_eq!(body["past"]["label"], "1970s");
        assert_eq!(body["future"]["themes"][0], "Y3K");
    }

    #[tokio::test]
    async fn resolve_endpoint_returns_winners_and_scores() {
        let (status, body) = call(
            &app(false),
            Method::POST,
            "/api/themes/resolve",
            Some(json!({ "keywords": ["Bold", "Creative", "Dreamy"] })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["themes"], json!({ "past": "Bohemian", "future": "Holographic" }));
        assert_eq!(body["scores"]["past"][1], json!({ "theme": "Bohemian", "score": 4 }));
    }

    #[tokio::test]
    async fn full_session_flow_over_http() {
        let app = app(false);
        let (status, body) = call(&app, Method::POST, "/api/sessions", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["stage"], "landing");
        let id = body["id"].as_str().unwrap().to_string();
        let base = format!("/api/sessions/{}", id);

        let (status, _) = call(&app, Method::POST, &format!("{base}/enter"), None).await;
        assert_eq!(status, StatusCode::OK);

        for keyword in ["Bold", "Creative", "Dreamy", "Calm"] {
            let (status, body) = call(
                &app,
                Method::POST,
                &format!("{base}/keywords/toggle"),
                Some(json!({ "keyword": keyword })),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["accepted"], keyword != "Calm");
        }

        let (status, body) = call(&app, Method::POST, &format!("{base}/keywords/submit"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["stage"], "camera");
        assert_eq!(body["themes"]["past"], "Bohemian");

        let (status, body) = call(
            &app,
            Method::POST,
            &format!("{base}/capture"),
            Some(json!({ "image": jpeg_data_url() })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["stage"], "edit");

        let (status, body) = call(&app, Method::POST, &format!("{base}/generate"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["stage"], "dual_result");

        let (status, body) = call(
            &app,
            Method::POST,
            &format!("{base}/composite"),
            Some(json!({ "image": jpeg_data_url() })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["stage"], "result");
        assert!(body["download_url"].as_str().unwrap().starts_with("https://"));

        let (_, body) = call(&app, Method::POST, &format!("{base}/back"), None).await;
        assert_eq!(body["stage"], "dual_result");

        let (_, body) = call(&app, Method::POST, &format!("{base}/restart"), None).await;
        assert_eq!(body["stage"], "landing");
    }

    #[tokio::test]
    async fn errors_use_status_mapping() {
        let app = app(true);
        let (status, body) = call(&app, Method::GET, "/api/sessions/nope", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("nope"));

        let (_, body) = call(&app, Method::POST, "/api/sessions", None).await;
        let base = format!("/api/sessions/{}", body["id"].as_str().unwrap());

        let (status, _) = call(&app, Method::POST, &format!("{base}/generate"), None).await;
        assert_eq!(status, StatusCode::CONFLICT);

        call(&app, Method::POST, &format!("{base}/enter"), None).await;
        let (status, _) = call(
            &app,
            Method::POST,
            &format!("{base}/keywords"),
            Some(json!({ "keywords": ["Bold", "Sparkly", "Calm"] })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(
            &app,
            Method::POST,
            &format!("{base}/keywords"),
            Some(json!({ "keywords": ["Bold", "Glam", "Calm"] })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        call(
            &app,
            Method::POST,
            &format!("{base}/capture"),
            Some(json!({ "image": jpeg_data_url() })),
        )
        .await;
        let (status, body) = call(&app, Method::POST, &format!("{base}/generate"), None).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(
            body["error"],
            "Failed to create your fashion shots. Please try again."
        );

        let (_, body) = call(&app, Method::GET, &base, None).await;
        assert_eq!(body["stage"], "edit");
    }

    #[tokio::test]
    async fn healthz_answers_ok() {
        let response = app(false)
            .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
