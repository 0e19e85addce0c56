//! Fetch lifecycle controllers.
//!
//! Each controller owns the state one view renders from: an item list with
//! `loading`/`error` flags for reads, or a `loading`/`error`/`success` triple
//! for creates. State lives in a `tokio::sync::watch` channel so a view can
//! `subscribe()` and redraw on every transition.
//!
//! - `ListController`: read-by-key lifecycle, shared by every list endpoint
//! - `reviews_for_recipe`, `reviews_by_user`, `favorites_by_user`: the concrete lists
//! - `CreateReviewController`: posting a new review
//! - `UserIdentity`: where the current user's identifier comes from

pub mod identity;
pub mod list;
pub mod reviews;
pub mod state;

pub use identity::{StaticIdentity, UserIdentity};
pub use list::{ListController, ListSource};
pub use reviews::{
    favorites_by_user, reviews_by_user, reviews_for_recipe, CreateReviewController, FavoritesController,
    RecipeReviews, ReviewsController, UserFavorites, UserReviews, UserReviewsController,
};
pub use state::{CreateState, ErrorItemsPolicy, FetchState};
