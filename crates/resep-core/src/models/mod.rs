//! Data models for the Resep Nusantara API.
//!
//! This module contains the structures exchanged with the backend:
//!
//! - `ResponseEnvelope`: the `{success, data, message}` wrapper every call returns
//! - `Review`, `NewReview`: recipe reviews and the payload used to create one
//! - `Recipe`: recipe summaries, as returned in a user's favorites

pub mod envelope;
pub mod recipe;
pub mod review;

pub use envelope::ResponseEnvelope;
pub use recipe::Recipe;
pub use review::{NewReview, Review};
