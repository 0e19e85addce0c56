//! Review and favorites controllers built on `ListController`, plus review creation.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::api::{ApiClient, ApiError};
use crate::models::{NewReview, Recipe, ResponseEnvelope, Review};

use super::identity::UserIdentity;
use super::list::{InFlight, ListController, ListSource};
use super::state::CreateState;

const CREATE_FAILURE_MESSAGE: &str = "Failed to create review";
const CREATE_FAULT_MESSAGE: &str = "An error occurred while creating review";
const MISSING_RECIPE_MESSAGE: &str = "A recipe is required to create a review";

/// Reviews left on one recipe.
pub struct RecipeReviews {
    api: ApiClient,
}

#[async_trait]
impl ListSource for RecipeReviews {
    type Item = Review;
    const NAME: &'static str = "recipe_reviews";
    const FAILURE_MESSAGE: &'static str = "Failed to fetch reviews";
    const FAULT_MESSAGE: &'static str = "An error occurred while fetching reviews";

    async fn load(&self, recipe_id: &str) -> Result<ResponseEnvelope<Vec<Review>>, ApiError> {
        self.api.get_reviews(recipe_id).await
    }
}

/// Reviews written by the current user, with recipe names joined in.
pub struct UserReviews {
    api: ApiClient,
}

#[async_trait]
impl ListSource for UserReviews {
    type Item = Review;
    const NAME: &'static str = "user_reviews";
    const FAILURE_MESSAGE: &'static str = "Failed to fetch user reviews";
    const FAULT_MESSAGE: &'static str = "An error occurred while fetching user reviews";

    async fn load(&self, user_identifier: &str) -> Result<ResponseEnvelope<Vec<Review>>, ApiError> {
        self.api.get_reviews_by_user(user_identifier).await
    }
}

/// Recipes the current user marked as favorite.
pub struct UserFavorites {
    api: ApiClient,
}

#[async_trait]
impl ListSource for UserFavorites {
    type Item = Recipe;
    const NAME: &'static str = "user_favorites";
    const FAILURE_MESSAGE: &'static str = "Failed to fetch favorites";
    const FAULT_MESSAGE: &'static str = "An error occurred while fetching favorites";

    async fn load(&self, user_identifier: &str) -> Result<ResponseEnvelope<Vec<Recipe>>, ApiError> {
        self.api.get_favorites(user_identifier).await
    }
}

pub type ReviewsController = ListController<RecipeReviews>;
pub type UserReviewsController = ListController<UserReviews>;
pub type FavoritesController = ListController<UserFavorites>;

/// Controller for the reviews of `recipe_id`. `None` means the recipe is not known yet.
pub fn reviews_for_recipe(api: ApiClient, recipe_id: Option<&str>) -> ReviewsController {
    ListController::new(RecipeReviews { api }, recipe_id.map(str::to_string))
}

/// Controller for the current user's reviews. The identifier is resolved once, here.
pub fn reviews_by_user(api: ApiClient, identity: &dyn UserIdentity) -> UserReviewsController {
    ListController::new(UserReviews { api }, identity.user_identifier())
}

/// Controller for the current user's favorite recipes.
pub fn favorites_by_user(api: ApiClient, identity: &dyn UserIdentity) -> FavoritesController {
    ListController::new(UserFavorites { api }, identity.user_identifier())
}

/// Posts reviews and tracks the outcome of the last attempt.
///
/// Never touches any list state; refetch the relevant list to see the new review.
/// When attempts overlap, the state follows the one started last.
pub struct CreateReviewController {
    api: ApiClient,
    state: watch::Sender<CreateState>,
    latest: AtomicU64,
}

impl CreateReviewController {
    pub fn new(api: ApiClient) -> Self {
        let (state, _) = watch::channel(CreateState::default());
        Self {
            api,
            state,
            latest: AtomicU64::new(0),
        }
    }

    pub fn state(&self) -> CreateState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<CreateState> {
        self.state.subscribe()
    }

    /// Create a review on `recipe_id`.
    ///
    /// Returns the backend envelope on success and `None` otherwise; the
    /// reason is left in `state().error`.
    pub async fn create_review(
        &self,
        recipe_id: &str,
        review: &NewReview,
    ) -> Option<ResponseEnvelope<Review>> {
        let token = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.send_replace(CreateState {
            loading: true,
            error: None,
            success: false,
        });
        let in_flight = InFlight::new(&self.state, &self.latest, token, |state: &mut CreateState| {
            std::mem::replace(&mut state.loading, false)
        });

        let recipe_id = recipe_id.trim();
        let (created, success, error) = if recipe_id.is_empty() {
            debug!("No recipe id, not creating review");
            (None, false, Some(MISSING_RECIPE_MESSAGE.to_string()))
        } else {
            match self.api.create_review(recipe_id, review).await {
                Ok(envelope) if envelope.is_success() => {
                    info!(recipe_id, "Review created");
                    (Some(envelope), true, None)
                }
                Ok(envelope) => {
                    let message = envelope.failure_message(CREATE_FAILURE_MESSAGE);
                    warn!(recipe_id, error = %message, "Review rejected by backend");
                    (None, false, Some(message))
                }
                Err(e) => {
                    let message = match e.to_string() {
                        m if m.trim().is_empty() => CREATE_FAULT_MESSAGE.to_string(),
                        m => m,
                    };
                    warn!(recipe_id, error = %message, "Review creation failed");
                    (None, false, Some(message))
                }
            }
        };

        self.state.send_if_modified(|state| {
            if self.latest.load(Ordering::SeqCst) != token {
                debug!(token, "Dropping outcome of superseded create");
                return false;
            }
            *state = CreateState {
                loading: false,
                error,
                success,
            };
            true
        });
        in_flight.finish();
        created
    }
}
