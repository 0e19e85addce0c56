use serde::{Deserialize, Serialize};

/// A review left on a recipe.
///
/// The backend joins the recipe name in when listing a user's own reviews;
/// it is absent when listing reviews for a single recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct Review {
    pub id: String,
    #[serde(default)]
    pub recipe_id: Option<String>,
    #[serde(default)]
    pub user_identifier: Option<String>,
    #[serde(default)]
    pub rating: u8,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub recipe_name: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl Review {
    /// Render the rating as a five-star string, e.g. `★★★☆☆`.
    pub fn stars(&self) -> String {
        let filled = self.rating.min(5) as usize;
        format!("{}{}", "★".repeat(filled), "☆".repeat(5 - filled))
    }
}

/// Payload for `POST /api/v1/recipes/{id}/reviews`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct NewReview {
    pub rating: u8,
    pub comment: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_identifier: Option<String>,
}

impl NewReview {
    pub fn new(rating: u8, comment: impl Into<String>) -> Self {
        Self {
            rating,
            comment: comment.into(),
            user_identifier: None,
        }
    }

    pub fn with_user(mut self, user_identifier: impl Into<String>) -> Self {
        self.user_identifier = Some(user_identifier.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_review_ignores_unknown_fields() {
        let json = r#"{"id":"r1","recipe_id":"42","rating":4,"comment":"enak","likes":3}"#;
        let review: Review = serde_json::from_str(json).expect("Failed to parse review");
        assert_eq!(review.id, "r1");
        assert_eq!(review.recipe_id.as_deref(), Some("42"));
        assert_eq!(review.comment.as_deref(), Some("enak"));
        assert!(review.recipe_name.is_none());
    }

    #[test]
    fn test_stars() {
        let review: Review = serde_json::from_str(r#"{"id":"r1","rating":3}"#).unwrap();
        assert_eq!(review.stars(), "★★★☆☆");

        let review: Review = serde_json::from_str(r#"{"id":"r2","rating":9}"#).unwrap();
        assert_eq!(review.stars(), "★★★★★");
    }

    #[test]
    fn test_new_review_serialization() {
        let payload = NewReview::new(5, "great");
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            serde_json::json!({"rating": 5, "comment": "great"})
        );

        let payload = NewReview::new(5, "great").with_user("user-1");
        assert_eq!(
            serde_json::to_value(&payload).unwrap()["user_identifier"],
            "user-1"
        );
    }
}
