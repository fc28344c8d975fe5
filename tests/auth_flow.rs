mod common;

use axum::{
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use common::test_app;
use serde_json::{Value, json};
use storefront_api::{
    build_router,
    dto::auth::{LoginRequest, RegisterRequest},
    error::AppError,
    services::auth_service,
};
use tower::ServiceExt;

fn register_request(username: &str, password: &str) -> RegisterRequest {
    RegisterRequest {
        username: username.into(),
        email: format!("{username}@example.com"),
        password: password.into(),
    }
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn register_then_login_issues_a_bearer_token() {
    let app = test_app();

    let user = auth_service::register_user(&app.state, register_request("alice", "hunter22"))
        .await
        .unwrap()
        .into_data()
        .unwrap();
    assert_ne!(user.password_hash, "hunter22");
    assert_eq!(
        app.mailer.subjects_for("alice@example.com"),
        vec!["Welcome to the Storefront".to_string()]
    );

    let dup = auth_service::register_user(&app.state, register_request("alice", "other")).await;
    assert!(matches!(dup, Err(AppError::BadRequest(_))));

    let token = auth_service::login_user(
        &app.state,
        LoginRequest {
            username: "alice".into(),
            password: "hunter22".into(),
        },
    )
    .await
    .unwrap()
    .into_data()
    .unwrap()
    .token;
    assert!(token.starts_with("Bearer "));

    let wrong = auth_service::login_user(
        &app.state,
        LoginRequest {
            username: "alice".into(),
            password: "nope".into(),
        },
    )
    .await;
    assert!(matches!(wrong, Err(AppError::Unauthorized(_))));
}

#[tokio::test]
async fn protected_routes_require_a_valid_token() {
    let app = test_app();
    let router = build_router(app.state.clone());

    let response = router
        .clone()
        .oneshot(Request::get("/api/cart").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = router
        .oneshot(
            Request::get("/api/cart")
                .header(header::AUTHORIZATION, "Bearer not-a-jwt")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logged_in_users_reach_their_cart_but_not_admin_routes() {
    let app = test_app();
    let router = build_router(app.state.clone());

    let response = router
        .clone()
        .oneshot(
            Request::post("/api/auth/register")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({"username": "bob", "email": "bob@example.com", "password": "pw123456"})
                        .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = router
        .clone()
        .oneshot(
            Request::post("/api/auth/login")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({"username": "bob", "password": "pw123456"}).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let token = body_json(response).await["data"]["token"]
        .as_str()
        .unwrap()
        .to_string();

    let response = router
        .clone()
        .oneshot(
            Request::get("/api/cart")
                .header(header::AUTHORIZATION, &token)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["total"], json!(0.0));

    let category = app.category("Misc").await;
    let response = router
        .oneshot(
            Request::post("/api/products")
                .header(header::AUTHORIZATION, &token)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({
                        "name": "Lamp",
                        "price": 30.0,
                        "stock": 3,
                        "category_id": category.id,
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert!(body["data"]["error"].is_string());
}

#[tokio::test]
async fn unknown_paths_fall_back_to_json_not_found() {
    let app = test_app();
    let response = build_router(app.state)
        .oneshot(Request::get("/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["data"]["path"], "/nope");
}
