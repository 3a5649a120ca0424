//! REST API client module for the SuperMall backend.
//!
//! This module provides the `ApiClient` for communicating with the
//! marketplace API: shops, products, offers, reviews, search and the
//! auth exchange that issues bearer tokens.
//!
//! The bearer token is held by a [`crate::auth::TokenStore`] shared by all
//! clones of the client.

pub mod client;
pub mod error;
pub mod query;
pub mod resources;

pub use client::{ApiClient, RequestOptions};
pub use error::ApiError;
pub use query::Filters;
