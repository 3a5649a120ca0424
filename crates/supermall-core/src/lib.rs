//! SuperMall core library.
//!
//! Client-side plumbing for the SuperMall marketplace:
//!
//! - `api`: HTTP client for the marketplace backend (shops, products,
//!   offers, reviews, search, register/login)
//! - `auth`: bearer token storage, identity providers and the bridge that
//!   keeps an identity session and the backend token in sync
//! - `catalog`: local filtering and sorting of listings
//! - `config`: user configuration and directories
//! - `models`: marketplace records

pub mod api;
pub mod auth;
pub mod catalog;
pub mod config;
pub mod models;
pub mod utils;

pub use api::{ApiClient, ApiError, Filters, RequestOptions};
pub use auth::{IdentityBridge, TokenStore};
pub use config::Config;
