use std::time::Duration;

use resep_core::api::ApiClient;
use resep_core::hooks::{
    favorites_by_user, reviews_by_user, reviews_for_recipe, CreateReviewController, CreateState,
    StaticIdentity,
};
use resep_core::models::NewReview;
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn api(server: &MockServer) -> ApiClient {
    ApiClient::new(&server.uri()).expect("client")
}

#[tokio::test]
async fn recipe_reviews_load_from_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/recipes/42/reviews"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": [
                {"id": "r1", "recipe_id": "42", "rating": 5, "comment": "mantap"},
                {"id": "r2", "recipe_id": "42", "rating": 3}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let reviews = reviews_for_recipe(api(&server), Some("42"));
    assert!(reviews.state().loading);

    let state = reviews.fetch().await;
    assert!(!state.loading);
    assert_eq!(state.error, None);
    assert_eq!(state.items.len(), 2);
    assert_eq!(state.items[0].comment.as_deref(), Some("mantap"));
}

#[tokio::test]
async fn recipe_reviews_without_id_never_hit_network() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let state = reviews_for_recipe(api(&server), None).fetch().await;
    assert!(!state.loading);
    assert!(state.items.is_empty());
    assert_eq!(state.error, None);
}

#[tokio::test]
async fn failure_envelope_surfaces_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/recipes/missing/reviews"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "success": false,
            "message": "Recipe not found"
        })))
        .mount(&server)
        .await;

    let state = reviews_for_recipe(api(&server), Some("missing")).fetch().await;
    assert_eq!(state.error.as_deref(), Some("Recipe not found"));
    assert!(state.items.is_empty());
    assert!(!state.loading);
}

#[tokio::test]
async fn failure_envelope_without_message_uses_default() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/users/u-7/reviews"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": false})))
        .mount(&server)
        .await;

    let identity = StaticIdentity::new("u-7");
    let state = reviews_by_user(api(&server), &identity).fetch().await;
    assert_eq!(state.error.as_deref(), Some("Failed to fetch user reviews"));
}

#[tokio::test]
async fn server_error_without_envelope_is_a_fault() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/recipes/42/reviews"))
        .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
        .mount(&server)
        .await;

    let state = reviews_for_recipe(api(&server), Some("42")).fetch().await;
    assert!(!state.loading);
    assert_eq!(state.error.as_deref(), Some("Server error: Bad Gateway"));
}

#[tokio::test]
async fn user_reviews_need_an_identity() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let state = reviews_by_user(api(&server), &StaticIdentity::anonymous()).fetch().await;
    assert!(!state.loading);
    assert!(state.items.is_empty());
    assert_eq!(state.error, None);
}

#[tokio::test]
async fn favorites_for_current_user() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/users/u-7/favorites"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": [{"id": "rendang", "name": "Rendang", "category": "makanan"}]
        })))
        .mount(&server)
        .await;

    let state = favorites_by_user(api(&server), &StaticIdentity::new("u-7")).fetch().await;
    assert_eq!(state.items.len(), 1);
    assert_eq!(state.items[0].name, "Rendang");
    assert_eq!(state.items[0].category_display(), "makanan");
}

#[tokio::test]
async fn refetch_picks_up_new_reviews() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/recipes/42/reviews"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true, "data": []})))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/recipes/42/reviews"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": [{"id": "r1", "rating": 5}]
        })))
        .mount(&server)
        .await;

    let reviews = reviews_for_recipe(api(&server), Some("42"));
    assert!(reviews.fetch().await.items.is_empty());
    assert_eq!(reviews.refetch().await.items.len(), 1);
}

#[tokio::test]
async fn create_review_success_returns_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/recipes/42/reviews"))
        .and(body_json(json!({"rating": 5, "comment": "great"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "success": true,
            "data": {"id": "r1"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let create = CreateReviewController::new(api(&server));
    let envelope = create
        .create_review("42", &NewReview::new(5, "great"))
        .await
        .expect("envelope");

    assert!(envelope.success);
    assert_eq!(envelope.data.unwrap().id, "r1");
    assert_eq!(
        create.state(),
        CreateState { loading: false, error: None, success: true }
    );
}

#[tokio::test]
async fn create_review_failure_returns_none() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/recipes/42/reviews"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "success": false,
            "message": "duplicate review"
        })))
        .mount(&server)
        .await;

    let create = CreateReviewController::new(api(&server));
    let result = create.create_review("42", &NewReview::new(5, "great")).await;

    assert!(result.is_none());
    assert_eq!(
        create.state(),
        CreateState {
            loading: false,
            error: Some("duplicate review".to_string()),
            success: false
        }
    );
}

#[tokio::test]
async fn create_review_fault_sets_error() {
    // Nothing listens on this port once the listener is dropped
    let uri = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        format!("http://{}", listener.local_addr().unwrap())
    };

    let create = CreateReviewController::new(ApiClient::new(&uri).unwrap());
    let result = create.create_review("42", &NewReview::new(4, "ok")).await;

    assert!(result.is_none());
    let state = create.state();
    assert!(!state.loading);
    assert!(!state.success);
    assert!(state.error.unwrap().starts_with("Network error"));
}

#[tokio::test]
async fn create_review_needs_a_recipe() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let create = CreateReviewController::new(api(&server));
    assert!(create.create_review(" ", &NewReview::new(5, "great")).await.is_none());
    assert_eq!(
        create.state().error.as_deref(),
        Some("A recipe is required to create a review")
    );
}

#[tokio::test]
async fn abandoned_create_clears_loading() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/recipes/42/reviews"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!({"success": true, "data": {"id": "r1"}}))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let create = CreateReviewController::new(api(&server));
    let attempt = tokio::time::timeout(
        Duration::from_millis(200),
        create.create_review("42", &NewReview::new(5, "great")),
    )
    .await;

    assert!(attempt.is_err());
    assert_eq!(
        create.state(),
        CreateState {
            loading: false,
            error: None,
            success: false
        }
    );
}
