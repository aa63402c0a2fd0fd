use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderName, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use coachgpt::{Coach, TurnError};
use shared::{ErrorResponse, TurnRequest, TurnResponse};
use tower_http::{
    cors::{Any, CorsLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};

pub const COACH_ROUTE: &str = "/api/v0/coach";

const ALLOWED_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";
const ALLOWED_HEADERS: &str = "Content-Type, Authorization, X-Client-Info, Apikey";

#[derive(Clone)]
pub struct AppState {
    pub coach: Arc<Coach>,
}

pub enum ApiError {
    InvalidRole,
    Internal(String),
}

impl From<TurnError> for ApiError {
    fn from(e: TurnError) -> Self {
        match e {
            TurnError::InvalidRole => ApiError::InvalidRole,
            TurnError::Completion(report) => ApiError::Internal(format!("{report:?}")),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::InvalidRole => (StatusCode::BAD_REQUEST, ErrorResponse::new("Invalid role")),
            ApiError::Internal(cause) => {
                tracing::error!("Error: {cause}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new("Internal server error"),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

/// `POST /api/v0/coach`. The body is decoded by hand so a malformed one is
/// reported like any other failure.
pub async fn coach_turn(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<TurnResponse>, ApiError> {
    let request: TurnRequest = serde_json::from_slice(&body)
        .map_err(|e| ApiError::Internal(format!("could not parse request body: {e}")))?;

    let response = state.coach.handle_turn(request).await?;
    Ok(Json(response))
}

/// Any method other than POST on the coach route. OPTIONS never gets here, the
/// CORS layer answers it.
pub async fn unsupported_method() -> ApiError {
    ApiError::Internal("unsupported method on coach route".to_owned())
}

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-client-info"),
            HeaderName::from_static("apikey"),
        ])
        .allow_origin(Any);

    Router::new()
        .route(COACH_ROUTE, post(coach_turn).fallback(unsupported_method))
        .layer(cors)
        .layer(SetResponseHeaderLayer::if_not_present(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOWED_METHODS),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOWED_HEADERS),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::{body::Body, http::Request};
    use coachgpt::{catalog::lookup, Completer, CompletionRequest};
    use rand::{rngs::StdRng, SeedableRng};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;

    struct Canned(Option<&'static str>);

    #[async_trait]
    impl Completer for Canned {
        fn model(&self) -> &str {
            "test-model"
        }

        async fn complete(&self, _request: CompletionRequest) -> miette::Result<Option<String>> {
            match self.0 {
                Some(reply) => Ok(Some(reply.to_owned())),
                None => Err(miette::miette!("upstream unavailable")),
            }
        }
    }

    fn test_app(reply: Option<&'static str>) -> Router {
        app(AppState {
            coach: Arc::new(Coach::with_rng(
                Arc::new(Canned(reply)),
                StdRng::seed_from_u64(1),
            )),
        })
    }

    fn post_json(body: impl Into<Body>) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(COACH_ROUTE)
            .header(header::CONTENT_TYPE, "application/json")
            .body(body.into())
            .unwrap()
    }

    async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value, axum::http::HeaderMap) {
        let resp = app.oneshot(req).await.expect("request");
        let status = resp.status();
        let headers = resp.headers().clone();
        let body = hyper::body::to_bytes(resp.into_body()).await.expect("read body");
        let json = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).expect("parse JSON")
        };
        (status, json, headers)
    }

    fn assert_cors(headers: &axum::http::HeaderMap) {
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        let methods = headers[header::ACCESS_CONTROL_ALLOW_METHODS].to_str().unwrap();
        for method in ["GET", "POST", "PUT", "DELETE", "OPTIONS"] {
            assert!(methods.contains(method), "missing {method} in {methods}");
        }
        let allowed = headers[header::ACCESS_CONTROL_ALLOW_HEADERS]
            .to_str()
            .unwrap()
            .to_ascii_lowercase();
        for name in ["content-type", "authorization", "x-client-info", "apikey"] {
            assert!(allowed.contains(name), "missing {name} in {allowed}");
        }
    }

    #[tokio::test]
    async fn developer_scenario_is_served() {
        let (status, json, headers) =
            send(test_app(None), post_json(json!({ "role": "developer" }).to_string())).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["isScenario"], true);
        let scenario = json["scenario"].as_str().unwrap();
        assert!(lookup("developer").unwrap().scenarios.contains(&scenario));
        assert_cors(&headers);
    }

    #[tokio::test]
    async fn bogus_role_is_rejected() {
        let (status, json, headers) = send(
            test_app(None),
            post_json(json!({ "role": "bogus-role", "userMessage": "hi" }).to_string()),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json, json!({ "error": "Invalid role" }));
        assert_cors(&headers);
    }

    #[tokio::test]
    async fn missing_role_is_rejected() {
        let (status, json, _) = send(test_app(None), post_json("{}")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json, json!({ "error": "Invalid role" }));
    }

    #[tokio::test]
    async fn malformed_body_is_an_internal_error() {
        let (status, json, headers) = send(test_app(None), post_json("{not json")).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json, json!({ "error": "Internal server error" }));
        assert_cors(&headers);
    }

    #[tokio::test]
    async fn upstream_failure_is_an_internal_error() {
        let (status, json, _) = send(
            test_app(None),
            post_json(json!({ "role": "developer", "userMessage": "hi" }).to_string()),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json, json!({ "error": "Internal server error" }));
    }

    #[tokio::test]
    async fn feedback_turn_uses_model_reply() {
        let reply = r#"{"correctedResponse":"Hi there.","score":77,"feedback":"Friendly.","nextMessage":"And then?"}"#;
        let (status, json, _) = send(
            test_app(Some(reply)),
            post_json(
                json!({ "role": "developer", "userMessage": "hi there", "messageCount": 9 }).to_string(),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            json,
            json!({
                "message": "And then?",
                "feedback": "Friendly.",
                "score": 77,
                "correctedResponse": "Hi there.",
                "isComplete": true
            })
        );
    }

    #[tokio::test]
    async fn feedback_turn_falls_back_on_prose_reply() {
        let (status, json, _) = send(
            test_app(Some("That was a solid answer, 8/10.")),
            post_json(json!({ "role": "developer", "userMessage": "hi there" }).to_string()),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["correctedResponse"], "hi there");
        assert_eq!(json["score"], 50);
        assert_eq!(json["isComplete"], false);
    }

    #[tokio::test]
    async fn other_methods_are_internal_errors() {
        for method in [Method::GET, Method::PUT, Method::DELETE] {
            let req = Request::builder()
                .method(method.clone())
                .uri(COACH_ROUTE)
                .body(Body::empty())
                .unwrap();

            let (status, json, headers) = send(test_app(None), req).await;

            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "{method}");
            assert_eq!(json, json!({ "error": "Internal server error" }));
            assert_cors(&headers);
        }
    }

    #[tokio::test]
    async fn bare_options_returns_empty_ok() {
        let req = Request::builder()
            .method(Method::OPTIONS)
            .uri(COACH_ROUTE)
            .body(Body::empty())
            .unwrap();

        let (status, json, headers) = send(test_app(None), req).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, Value::Null);
        assert_cors(&headers);
    }

    #[tokio::test]
    async fn cors_preflight_is_answered() {
        let req = Request::builder()
            .method(Method::OPTIONS)
            .uri(COACH_ROUTE)
            .header(header::ORIGIN, "https://app.example.com")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type, apikey")
            .body(Body::empty())
            .unwrap();

        let (status, json, headers) = send(test_app(None), req).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, Value::Null);
        assert_cors(&headers);
    }
}
