//! REST API client module for the Resep Nusantara backend.
//!
//! This module provides the `ApiClient` for fetching and creating recipe
//! reviews and listing a user's favorite recipes.
//!
//! Every endpoint answers with a `ResponseEnvelope`; requests go through a
//! `Transport`, which is where the runtime cache policy plugs in.

pub mod client;
pub mod error;
pub mod transport;

pub use client::ApiClient;
pub use error::ApiError;
pub use transport::{HttpRequest, HttpResponse, Method, ReqwestTransport, Transport};
