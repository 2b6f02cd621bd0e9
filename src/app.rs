use std::net::SocketAddr;

use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    routing::get,
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::auth::extractors::AUTH_HEADER;
use crate::config::AppConfig;
use crate::state::AppState;
use crate::{auth, tickets};

pub fn build_app(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origin);
    Router::new()
        .route("/", get(|| async { "Welcome to the Ticketing System API" }))
        .route("/health", get(|| async { "ok" }))
        .nest("/api/auth", auth::router())
        .nest("/api/tickets", tickets::router())
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri, status = tracing::field::Empty)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     _latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, "response");
                        } else {
                            tracing::info!(%status, "response");
                        }
                    },
                ),
        )
}

fn cors_layer(origin: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static(AUTH_HEADER)]);
    match origin.parse::<HeaderValue>() {
        Ok(origin) => layer.allow_origin(origin),
        Err(e) => {
            tracing::warn!(error = %e, origin, "invalid CORS_ORIGIN, cross-origin requests disabled");
            layer
        }
    }
}

pub async fn serve(app: Router, config: &AppConfig) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn call(
        app: &Router,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            req = req.header(AUTH_HEADER, token);
        }
        let req = match body {
            Some(b) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(b.to_string()))
                .unwrap(),
            None => req.body(Body::empty()).unwrap(),
        };
        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    fn signup_body(email: &str, role: Option<&str>) -> Value {
        let mut body = json!({
            "email": email,
            "password": "secret1",
            "confirmPassword": "secret1",
            "firstName": "A",
            "lastName": "B",
            "phoneNumber": "+12025550123",
        });
        if let Some(role) = role {
            body["role"] = json!(role);
        }
        body
    }

    async fn signup(app: &Router, email: &str, role: Option<&str>) -> String {
        let (status, body) = call(
            app,
            "POST",
            "/api/auth/signup",
            None,
            Some(signup_body(email, role)),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["token"].as_str().unwrap().to_string()
    }

    async fn create(app: &Router, token: &str, title: &str) -> Value {
        let (status, body) = call(
            app,
            "POST",
            "/api/tickets",
            Some(token),
            Some(json!({ "title": title, "description": "desc" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body
    }

    #[tokio::test]
    async fn signup_returns_user_token() {
        let state = AppState::fake();
        let app = build_app(state.clone());
        let token = signup(&app, "a@x.com", None).await;
        let claims = state.jwt.verify(&token).unwrap();
        assert_eq!(claims.role.as_str(), "user");
        assert_eq!(claims.first_name, "A");
    }

    #[tokio::test]
    async fn admin_exists_reflects_signups() {
        let app = build_app(AppState::fake());
        let (_, body) = call(&app, "GET", "/api/auth/admin-exists", None, None).await;
        assert_eq!(body, json!({ "exists": false }));

        signup(&app, "root@x.com", Some("admin")).await;
        let (_, body) = call(&app, "GET", "/api/auth/admin-exists", None, None).await;
        assert_eq!(body, json!({ "exists": true }));

        let (status, body) = call(
            &app,
            "POST",
            "/api/auth/signup",
            None,
            Some(signup_body("second@x.com", Some("admin"))),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["msg"],
            "An admin already exists; only one admin is allowed"
        );
    }

    #[tokio::test]
    async fn invalid_signup_is_a_validation_error() {
        let app = build_app(AppState::fake());
        let mut body = signup_body("a@x.com", None);
        body["phoneNumber"] = json!("555-0123");
        let (status, body) = call(&app, "POST", "/api/auth/signup", None, Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errors"][0]["param"], "phoneNumber");
    }

    #[tokio::test]
    async fn login_with_wrong_password_is_rejected() {
        let app = build_app(AppState::fake());
        signup(&app, "a@x.com", None).await;

        let (status, body) = call(
            &app,
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": "a@x.com", "password": "wrong1" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "msg": "Invalid credentials" }));

        let (status, body) = call(
            &app,
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": "a@x.com", "password": "secret1" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["token"].is_string());
    }

    #[tokio::test]
    async fn malformed_body_keeps_error_shape() {
        let app = build_app(AppState::fake());
        let req = Request::builder()
            .method("POST")
            .uri("/api/auth/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["msg"], "Validation failed");
        assert_eq!(body["errors"][0]["param"], "body");
    }

    #[tokio::test]
    async fn tickets_require_a_valid_token() {
        let app = build_app(AppState::fake());
        let (status, body) = call(&app, "GET", "/api/tickets", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["msg"], "No token, authorization denied");

        let (status, body) = call(&app, "GET", "/api/tickets", Some("garbage"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["msg"], "Token is not valid or has expired");

        // the standard header is not accepted
        let token = signup(&app, "a@x.com", None).await;
        let req = Request::builder()
            .uri("/api/tickets")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();
        let res = app.clone().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn empty_title_yields_validation_array() {
        let app = build_app(AppState::fake());
        let token = signup(&app, "a@x.com", None).await;
        let (status, body) = call(
            &app,
            "POST",
            "/api/tickets",
            Some(&token),
            Some(json!({ "title": "", "description": "desc" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let errors = body["errors"].as_array().unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0]["param"], "title");
        assert_eq!(errors[0]["msg"], "Title is required");
    }

    #[tokio::test]
    async fn ticket_lifecycle_over_http() {
        let app = build_app(AppState::fake());
        let admin = signup(&app, "root@x.com", Some("admin")).await;
        let alice = signup(&app, "alice@x.com", None).await;
        let bob = signup(&app, "bob@x.com", None).await;

        let ticket = create(&app, &alice, "Printer on fire").await;
        assert_eq!(ticket["status"], "Open");
        assert_eq!(ticket["category"], "Support");
        let id = ticket["id"].as_str().unwrap().to_string();
        let uri = format!("/api/tickets/{id}");

        // bob sees nothing of alice's
        let (_, list) = call(&app, "GET", "/api/tickets", Some(&bob), None).await;
        assert_eq!(list, json!([]));

        // admin sees it with owner identity
        let (_, list) = call(&app, "GET", "/api/tickets", Some(&admin), None).await;
        assert_eq!(list[0]["owner"]["email"], "alice@x.com");

        // the owner cannot change status
        let (status, _) = call(&app, "PUT", &uri, Some(&alice), Some(json!({ "status": "Closed" }))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = call(&app, "PUT", &uri, Some(&admin), Some(json!({ "status": "In Progress" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "In Progress");

        let (status, _) = call(&app, "PUT", &uri, Some(&admin), Some(json!({ "status": "Done" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(&app, "DELETE", &uri, Some(&bob), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = call(&app, "DELETE", &uri, Some(&alice), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "msg": "Ticket deleted" }));

        let (status, _) = call(&app, "DELETE", &uri, Some(&admin), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn admin_status_update_on_missing_ticket_is_not_found() {
        let app = build_app(AppState::fake());
        let admin = signup(&app, "root@x.com", Some("admin")).await;
        let uri = format!("/api/tickets/{}", uuid::Uuid::new_v4());
        let (status, body) = call(&app, "PUT", &uri, Some(&admin), Some(json!({ "status": "Closed" }))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["msg"], "Ticket not found");
    }

    #[tokio::test]
    async fn non_admin_with_bad_body_still_gets_forbidden() {
        let app = build_app(AppState::fake());
        let alice = signup(&app, "alice@x.com", None).await;
        let req = Request::builder()
            .method("PUT")
            .uri(format!("/api/tickets/{}", uuid::Uuid::new_v4()))
            .header(AUTH_HEADER, alice)
            .body(Body::empty())
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn health_and_welcome() {
        let app = build_app(AppState::fake());
        let res = app
            .clone()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let res = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }
}
