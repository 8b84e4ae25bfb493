//! Integration Tests for Admin API Endpoints
//!
//! Tests full request/response cycle for each endpoint against a live cache.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use edu_cache::{api::create_router, AppState, ReadOptions, ResourceCache, ResourceQuery, ResourceType};
use serde_json::Value;
use tower::ServiceExt;

// == Helper Functions ==

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn seed(cache: &ResourceCache, query: ResourceQuery, value: &'static str) {
    let _: String = cache
        .read_through(&query, ReadOptions::default(), move || async move {
            Ok::<_, String>(value.to_string())
        })
        .await
        .unwrap();
}

fn request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn app_for(cache: &ResourceCache) -> Router {
    create_router(AppState::new(cache.clone()))
}

// == Health Endpoint Tests ==

#[tokio::test]
async fn test_health_endpoint() {
    let cache = ResourceCache::new();

    let response = app_for(&cache).oneshot(request("GET", "/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], "healthy");
    assert!(json.get("timestamp").is_some());
}

// == Metrics Endpoint Tests ==

#[tokio::test]
async fn test_metrics_endpoint_reports_per_type_counters() {
    let cache = ResourceCache::new();
    let course = ResourceQuery::new(ResourceType::Course).with_id("c1");
    seed(&cache, course.clone(), "Intro").await;
    seed(&cache, course, "unused").await;

    let response = app_for(&cache).oneshot(request("GET", "/metrics")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["entries"], 1);
    assert_eq!(json["hits"], 1);
    assert_eq!(json["misses"], 1);
    assert_eq!(json["types"][0]["resource"], "course");
    assert_eq!(json["types"][0]["hit_rate"], 0.5);
}

// == Invalidation Endpoint Tests ==

#[tokio::test]
async fn test_invalidate_one_endpoint() {
    let cache = ResourceCache::new();
    seed(&cache, ResourceQuery::new(ResourceType::Course).with_id("123"), "course").await;
    seed(&cache, ResourceQuery::new(ResourceType::Courses), "list").await;
    seed(&cache, ResourceQuery::new(ResourceType::User).with_id("42"), "user").await;

    let response = app_for(&cache)
        .oneshot(request("DELETE", "/cache/course/123?path=/courses/123"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["resource"], "course");
    assert_eq!(json["id"], "123");
    assert_eq!(json["removed"], 2);
    assert_eq!(cache.entry_count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_invalidate_all_endpoint() {
    let cache = ResourceCache::new();
    seed(&cache, ResourceQuery::new(ResourceType::Forum).with_id("t1"), "a").await;
    seed(&cache, ResourceQuery::new(ResourceType::Forum).with_id("t2"), "b").await;
    seed(&cache, ResourceQuery::new(ResourceType::Settings), "c").await;

    let response = app_for(&cache)
        .oneshot(request("DELETE", "/cache/forum"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["removed"], 2);
    assert!(json.get("id").is_none());
    assert_eq!(cache.entry_count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_invalidate_is_idempotent() {
    let cache = ResourceCache::new();
    let app = app_for(&cache);

    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(request("DELETE", "/cache/user/404"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_to_json(response.into_body()).await;
        assert_eq!(json["removed"], 0);
    }
}

// == Error Response Tests ==

#[tokio::test]
async fn test_unknown_resource_type_returns_400() {
    let cache = ResourceCache::new();

    let response = app_for(&cache)
        .oneshot(request("DELETE", "/cache/lecture/1"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_to_json(response.into_body()).await;
    assert!(json["error"].as_str().unwrap().contains("lecture"));
}

#[tokio::test]
async fn test_relative_path_returns_400() {
    let cache = ResourceCache::new();

    let response = app_for(&cache)
        .oneshot(request("DELETE", "/cache/course?path=courses"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_wrong_method_returns_405() {
    let cache = ResourceCache::new();

    let response = app_for(&cache)
        .oneshot(request("GET", "/cache/course"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}
