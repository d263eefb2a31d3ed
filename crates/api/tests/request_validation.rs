//! Requests rejected before any database or provider work.

mod common;

use axum::http::{Method, StatusCode};
use common::{body_json, get, send_empty, send_json};
use serde_json::json;

#[tokio::test]
async fn blank_base_idea_is_rejected() {
    let app = common::build_offline_app();
    let response = send_json(
        app,
        Method::POST,
        "/api/v1/stories",
        json!({ "base_idea": "   " }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn segment_count_out_of_range_is_rejected() {
    let app = common::build_offline_app();
    let response = send_json(
        app,
        Method::POST,
        "/api/v1/stories",
        json!({ "base_idea": "Un faro que se apaga", "segment_count": 0 }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn blank_series_concept_is_rejected() {
    let app = common::build_offline_app();
    let response = send_json(app, Method::POST, "/api/v1/series", json!({ "base_concept": "" })).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn blank_wan_premise_is_rejected() {
    let app = common::build_offline_app();
    let response = send_json(app, Method::POST, "/api/v1/wan/stories", json!({ "premise": "" })).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn season_zero_is_rejected() {
    let app = common::build_offline_app();
    let response = send_empty(app, Method::POST, "/api/v1/series/1/seasons/0/episodes").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], "Invalid season number: 0");
}

#[tokio::test]
async fn unknown_usage_scope_is_rejected() {
    let app = common::build_offline_app();
    let response = get(app, "/api/v1/usage/galaxy/1").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn non_numeric_id_is_rejected() {
    let app = common::build_offline_app();
    let response = get(app, "/api/v1/stories/abc").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
