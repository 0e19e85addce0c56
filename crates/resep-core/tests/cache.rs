use std::sync::Arc;
use std::time::Duration;

use resep_core::api::{ApiClient, ReqwestTransport, Transport};
use resep_core::cache::{CachePolicy, CacheRule, CacheStorage, CacheStrategy, CachingTransport, RoutePattern};
use resep_core::hooks::{favorites_by_user, reviews_for_recipe, CreateReviewController, StaticIdentity};
use resep_core::models::NewReview;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn cached_api(server: &MockServer, storage: Arc<CacheStorage>) -> ApiClient {
    cached_api_with(server, storage, CachePolicy::default())
}

fn cached_api_with(server: &MockServer, storage: Arc<CacheStorage>, policy: CachePolicy) -> ApiClient {
    let network: Arc<dyn Transport> = Arc::new(ReqwestTransport::new(30).unwrap());
    let transport = CachingTransport::new(network, policy, storage);
    ApiClient::with_transport(&server.uri(), Arc::new(transport)).unwrap()
}

fn reviews_body(ids: &[&str]) -> serde_json::Value {
    let data: Vec<_> = ids.iter().map(|id| json!({"id": id, "rating": 4})).collect();
    json!({"success": true, "data": data})
}

#[tokio::test]
async fn recipe_reviews_served_stale_while_revalidating() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/recipes/42/reviews"))
        .respond_with(ResponseTemplate::new(200).set_body_json(reviews_body(&["r1"])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/recipes/42/reviews"))
        .respond_with(ResponseTemplate::new(200).set_body_json(reviews_body(&["r1", "r2"])))
        .mount(&server)
        .await;

    let storage = Arc::new(CacheStorage::in_memory());
    let reviews = reviews_for_recipe(cached_api(&server, Arc::clone(&storage)), Some("42"));

    assert_eq!(reviews.fetch().await.items.len(), 1);
    // Served from cache while the refresh happens in the background
    assert_eq!(reviews.refetch().await.items.len(), 1);

    let mut refreshed = false;
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(20)).await;
        if reviews.refetch().await.items.len() == 2 {
            refreshed = true;
            break;
        }
    }
    assert!(refreshed, "background revalidation never landed");
}

#[tokio::test]
async fn favorites_fall_back_to_cache_when_network_is_slow() {
    let server = MockServer::start().await;
    let favorites = json!({
        "success": true,
        "data": [{"id": "soto", "name": "Soto Ayam"}]
    });
    Mock::given(method("GET"))
        .and(path("/api/v1/users/u-7/favorites"))
        .respond_with(ResponseTemplate::new(200).set_body_json(favorites))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/users/u-7/favorites"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"success": true, "data": []}))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let policy = CachePolicy::new(vec![CacheRule::new(
        RoutePattern::PathPrefix("/api/v1/".to_string()),
        CacheStrategy::NetworkFirst,
        "api-lain-cache",
    )
    .network_timeout_seconds(1)
    .max_entries(50)]);
    let storage = Arc::new(CacheStorage::in_memory());
    let api = cached_api_with(&server, Arc::clone(&storage), policy);
    let identity = StaticIdentity::new("u-7");

    let online = favorites_by_user(api.clone(), &identity).fetch().await;
    assert_eq!(online.items.len(), 1);

    let slow = favorites_by_user(api, &identity).fetch().await;
    assert_eq!(slow.error, None);
    assert_eq!(slow.items[0].name, "Soto Ayam");
}

#[tokio::test]
async fn failure_envelopes_are_not_cached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/recipes/9/reviews"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "success": false,
            "message": "Recipe not found"
        })))
        .mount(&server)
        .await;

    let storage = Arc::new(CacheStorage::in_memory());
    let reviews = reviews_for_recipe(cached_api(&server, Arc::clone(&storage)), Some("9"));

    let state = reviews.fetch().await;
    assert_eq!(state.error.as_deref(), Some("Recipe not found"));
    assert_eq!(storage.len("api-resep-cache").await, 0);
}

#[tokio::test]
async fn posted_review_shows_up_on_next_list() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/recipes/42/reviews"))
        .respond_with(ResponseTemplate::new(200).set_body_json(reviews_body(&[])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/recipes/42/reviews"))
        .respond_with(ResponseTemplate::new(200).set_body_json(reviews_body(&["r1"])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/recipes/42/reviews"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "success": true,
            "data": {"id": "r1", "rating": 5}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let storage = Arc::new(CacheStorage::in_memory());
    let api = cached_api(&server, Arc::clone(&storage));
    let reviews = reviews_for_recipe(api.clone(), Some("42"));
    assert!(reviews.fetch().await.items.is_empty());

    let create = CreateReviewController::new(api);
    assert!(create.create_review("42", &NewReview::new(5, "enak")).await.is_some());

    let state = reviews.refetch().await;
    assert_eq!(state.items.len(), 1);
    assert_eq!(state.items[0].id, "r1");
}
