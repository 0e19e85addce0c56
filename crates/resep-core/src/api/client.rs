//! API client for communicating with the Resep Nusantara REST API.
//!
//! This module provides the `ApiClient` struct for the review and favorites
//! endpoints. Each call returns the backend's `ResponseEnvelope`; callers
//! decide what `success = false` means for them.

use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};
use url::Url;

use crate::models::{NewReview, Recipe, ResponseEnvelope, Review};

use super::transport::DEFAULT_REQUEST_TIMEOUT_SECS;
use super::{ApiError, HttpRequest, HttpResponse, ReqwestTransport, Transport};

// ============================================================================
// Constants
// ============================================================================

/// Path segments shared by every endpoint: `/api/v1`
const API_PREFIX: [&str; 2] = ["api", "v1"];

/// API client for the recipe backend.
/// Clone is cheap - the transport is shared behind an Arc.
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    base_url: Url,
}

impl ApiClient {
    /// Create a client that talks straight to the network
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let transport = ReqwestTransport::new(DEFAULT_REQUEST_TIMEOUT_SECS)?;
        Self::with_transport(base_url, Arc::new(transport))
    }

    /// Create a client on top of an existing transport, e.g. a `CachingTransport`
    pub fn with_transport(base_url: &str, transport: Arc<dyn Transport>) -> Result<Self, ApiError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ApiError::InvalidRequest(format!("Invalid base URL {}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidRequest(format!(
                "Base URL cannot carry a path: {}",
                base_url
            )));
        }
        Ok(Self {
            transport,
            base_url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build `<base>/api/v1/<segments..>`. Segments are percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<String, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidRequest(format!("Invalid base URL: {}", self.base_url)))?
            .pop_if_empty()
            .extend(API_PREFIX)
            .extend(segments);
        Ok(url.into())
    }

    /// Turn a raw response into an envelope.
    ///
    /// The backend reports application failures as `success: false`, often with a
    /// 4xx status, so an error status with a well-formed envelope is still an
    /// envelope. Anything else off the success path is mapped by status.
    fn decode<T: DeserializeOwned>(url: &str, response: HttpResponse) -> Result<ResponseEnvelope<T>, ApiError> {
        if response.is_success() {
            return serde_json::from_str(&response.body).map_err(|e| {
                ApiError::InvalidResponse(format!("Failed to parse JSON response from {}: {}", url, e))
            });
        }

        match serde_json::from_str::<ResponseEnvelope<T>>(&response.body) {
            Ok(envelope) if !envelope.success => {
                debug!(url, status = response.status, "Error status carried a failure envelope");
                Ok(envelope)
            }
            _ => {
                warn!(url, status = response.status, "Request failed");
                Err(ApiError::from_status(response.status, &response.body))
            }
        }
    }

    async fn get<T: DeserializeOwned>(&self, url: &str) -> Result<ResponseEnvelope<T>, ApiError> {
        let response = self.transport.send(&HttpRequest::get(url)).await?;
        Self::decode(url, response)
    }

    async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<ResponseEnvelope<T>, ApiError> {
        let body = serde_json::to_value(body)
            .map_err(|e| ApiError::InvalidRequest(format!("Failed to encode request body: {}", e)))?;
        let response = self.transport.send(&HttpRequest::post(url, body)).await?;
        Self::decode(url, response)
    }

    // ===== Reviews =====

    /// `GET /api/v1/recipes/{id}/reviews`
    pub async fn get_reviews(&self, recipe_id: &str) -> Result<ResponseEnvelope<Vec<Review>>, ApiError> {
        let url = self.endpoint(&["recipes", recipe_id, "reviews"])?;
        self.get(&url).await
    }

    /// `GET /api/v1/users/{userId}/reviews`
    pub async fn get_reviews_by_user(
        &self,
        user_identifier: &str,
    ) -> Result<ResponseEnvelope<Vec<Review>>, ApiError> {
        let url = self.endpoint(&["users", user_identifier, "reviews"])?;
        self.get(&url).await
    }

    /// `POST /api/v1/recipes/{id}/reviews`
    pub async fn create_review(
        &self,
        recipe_id: &str,
        review: &NewReview,
    ) -> Result<ResponseEnvelope<Review>, ApiError> {
        let url = self.endpoint(&["recipes", recipe_id, "reviews"])?;
        self.post(&url, review).await
    }

    // ===== Favorites =====

    /// `GET /api/v1/users/{userId}/favorites`
    pub async fn get_favorites(
        &self,
        user_identifier: &str,
    ) -> Result<ResponseEnvelope<Vec<Recipe>>, ApiError> {
        let url = self.endpoint(&["users", user_identifier, "favorites"])?;
        self.get(&url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> ApiClient {
        ApiClient::new(base).expect("Failed to build client")
    }

    #[test]
    fn test_endpoint_joins_prefix() {
        let api = client("http://localhost:3000");
        assert_eq!(
            api.endpoint(&["recipes", "42", "reviews"]).unwrap(),
            "http://localhost:3000/api/v1/recipes/42/reviews"
        );
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let api = client("https://example.com/resep/");
        assert_eq!(
            api.endpoint(&["users", "u1", "favorites"]).unwrap(),
            "https://example.com/resep/api/v1/users/u1/favorites"
        );
    }

    #[test]
    fn test_endpoint_encodes_segments() {
        let api = client("http://localhost:3000");
        assert_eq!(
            api.endpoint(&["recipes", "a/b c", "reviews"]).unwrap(),
            "http://localhost:3000/api/v1/recipes/a%2Fb%20c/reviews"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            ApiClient::new("not a url"),
            Err(ApiError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_decode_failure_envelope_on_error_status() {
        let response = HttpResponse::new(409, r#"{"success":false,"message":"duplicate review"}"#);
        let envelope: ResponseEnvelope<Review> = ApiClient::decode("u", response).unwrap();
        assert!(!envelope.success);
        assert_eq!(envelope.message.as_deref(), Some("duplicate review"));
    }

    #[test]
    fn test_decode_error_status_without_envelope() {
        let response = HttpResponse::new(502, "<html>Bad Gateway</html>");
        let result: Result<ResponseEnvelope<Review>, _> = ApiClient::decode("u", response);
        assert!(matches!(result, Err(ApiError::ServerError(_))));
    }

    #[test]
    fn test_decode_garbage_success_body() {
        let response = HttpResponse::new(200, "not json");
        let result: Result<ResponseEnvelope<Vec<Review>>, _> = ApiClient::decode("u", response);
        assert!(matches!(result, Err(ApiError::InvalidResponse(_))));
    }
}
