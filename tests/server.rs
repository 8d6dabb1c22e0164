//! HTTP front end driven without a socket.

use std::sync::Arc;

use anchor::config::Config;
use anchor::failure::Failure;
use anchor::http::server::AppState;
use anchor::http::{HttpServer, X_REQUEST_ID};
use anchor::routing::{default_routes, Routes};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

mod common;

fn server(toml: &str, routes: Routes) -> HttpServer {
    let config = Arc::new(Config::from_toml(toml).unwrap());
    HttpServer::new(AppState::new(config, common::registry(), routes).environment(Some("production".into())))
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn serves_default_home_page() {
    let app = server("", default_routes()).router();

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "text/html; charset=UTF-8"
    );
    let body = body_text(response).await;
    assert!(body.contains("<h1>anchor</h1>"));
    assert!(!body.contains("{elapsed_time}"));
}

#[tokio::test]
async fn admin_requests_get_cookie_and_expires() {
    let app = server("", default_routes()).router();

    let response = app
        .oneshot(Request::builder().uri("/admin/panel").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get("expires").is_some());
    let cookie = response.headers().get("set-cookie").unwrap().to_str().unwrap();
    assert!(cookie.starts_with("anchor_session="));
}

#[tokio::test]
async fn failing_route_returns_error_page() {
    let routes = Routes::new().route("/", |_| Err(Failure::dispatch("boom")));
    let app = server("", routes).router();

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_text(response).await;
    assert!(body.contains("Internal Server Error"));
    assert!(!body.contains("boom"));
}

#[tokio::test]
async fn request_id_header_is_echoed() {
    let app = server("[app]\nproviders = [\"request-id\", \"status\"]\n", Routes::new()).router();
    let id = "0b8f6c1e-3a2d-4e5f-9a7b-1c2d3e4f5a6b";

    let response = app
        .oneshot(
            Request::builder()
                .uri("/status")
                .header(X_REQUEST_ID, id)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get(X_REQUEST_ID).unwrap(), id);
    let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(json["request_id"], id);
    assert_eq!(json["environment"], "production");
}

#[tokio::test]
async fn request_body_reaches_router() {
    let routes = Routes::new().route("/echo", |request| Ok(request.body().to_string().into()));
    let app = server("", routes).router();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/echo")
                .body(Body::from("ping"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(body_text(response).await, "ping");
}
