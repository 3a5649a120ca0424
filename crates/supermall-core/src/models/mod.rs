//! Data models for SuperMall entities.
//!
//! - `Shop`, `Product`, `Offer`, `Review`: marketplace records with
//!   field-name variants resolved at deserialization
//! - `User`, `Role`, `AuthResponse`: backend accounts and auth exchange
//! - `New*` payloads for create/update calls

pub mod offer;
pub mod product;
pub mod review;
pub mod shop;
pub mod user;

use serde::{Deserialize, Serialize};

pub use offer::{NewOffer, Offer, OfferType};
pub use product::{NewProduct, Product};
pub use review::{NewReview, Review};
pub use shop::{NewShop, Shop};
pub use user::{AuthResponse, LoginRequest, MessageResponse, RegisterRequest, Role, User};

/// Result of `/search`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResults {
    #[serde(default)]
    pub shops: Vec<Shop>,
    #[serde(default)]
    pub products: Vec<Product>,
}

impl SearchResults {
    pub fn is_empty(&self) -> bool {
        self.shops.is_empty() && self.products.is_empty()
    }
}
