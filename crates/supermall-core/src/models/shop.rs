//! Shop records.
//!
//! Shop payloads come in two shapes: the backend's (`image_url`,
//! `is_active`) and the older featured-shop shape (`image`, `isOpen`).
//! Both are folded into [`Shop`] when deserializing:
//!
//! - image: `image_url`, else `image`
//! - open flag: `is_active`, else `isOpen`, else open

use serde::{Deserialize, Serialize};

/// Rating shown for shops that have not been rated yet.
pub const DEFAULT_DISPLAY_RATING: f64 = 4.5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ShopRecord")]
pub struct Shop {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub location: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub image_url: Option<String>,
    pub cover_image_url: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub rating: Option<f64>,
    pub total_reviews: Option<i64>,
    pub is_active: bool,
    pub is_verified: Option<bool>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl Shop {
    /// Rating for display, falling back for unrated shops.
    pub fn display_rating(&self) -> f64 {
        match self.rating {
            Some(r) if r > 0.0 => r,
            _ => DEFAULT_DISPLAY_RATING,
        }
    }

    pub fn status_label(&self) -> &'static str {
        if self.is_active {
            "Open"
        } else {
            "Closed"
        }
    }
}

/// Wire shape of a shop, accepting every known field spelling.
#[derive(Debug, Deserialize)]
struct ShopRecord {
    id: i64,
    name: String,
    description: Option<String>,
    #[serde(default)]
    category: Option<String>,
    location: Option<String>,
    address: Option<String>,
    phone: Option<String>,
    email: Option<String>,
    website: Option<String>,
    image_url: Option<String>,
    image: Option<String>,
    cover_image_url: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    rating: Option<f64>,
    total_reviews: Option<i64>,
    is_active: Option<bool>,
    #[serde(rename = "isOpen")]
    is_open: Option<bool>,
    is_verified: Option<bool>,
    created_at: Option<String>,
    updated_at: Option<String>,
}

impl From<ShopRecord> for Shop {
    fn from(r: ShopRecord) -> Self {
        Shop {
            id: r.id,
            name: r.name,
            description: r.description,
            category: r.category.unwrap_or_default(),
            location: r.location,
            address: r.address,
            phone: r.phone,
            email: r.email,
            website: r.website,
            image_url: non_empty(r.image_url).or_else(|| non_empty(r.image)),
            cover_image_url: non_empty(r.cover_image_url),
            latitude: r.latitude,
            longitude: r.longitude,
            rating: r.rating,
            total_reviews: r.total_reviews,
            is_active: r.is_active.or(r.is_open).unwrap_or(true),
            is_verified: r.is_verified,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

/// Treat empty strings the backend stores for missing URLs as absent.
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

/// Payload for creating or updating a shop.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewShop {
    pub name: String,
    pub category: String,
    pub location: String,
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_shape() {
        let json = r#"{"id":1,"name":"TechWorld","category":"Electronics","location":"Floor 1","address":"Unit 12","image_url":"https://img/1.jpg","rating":0.0,"total_reviews":0,"is_active":false,"created_at":"2024-01-01T10:00:00"}"#;
        let shop: Shop = serde_json::from_str(json).unwrap();
        assert_eq!(shop.image_url.as_deref(), Some("https://img/1.jpg"));
        assert!(!shop.is_active);
        assert_eq!(shop.status_label(), "Closed");
        assert_eq!(shop.display_rating(), DEFAULT_DISPLAY_RATING);
    }

    #[test]
    fn test_featured_shape() {
        let json = r#"{"id":2,"name":"Fashion Hub","category":"Fashion","image":"https://img/2.jpg","rating":4.7,"isOpen":true}"#;
        let shop: Shop = serde_json::from_str(json).unwrap();
        assert_eq!(shop.image_url.as_deref(), Some("https://img/2.jpg"));
        assert!(shop.is_active);
        assert_eq!(shop.display_rating(), 4.7);
    }

    #[test]
    fn test_precedence_when_both_present() {
        let json = r#"{"id":3,"name":"Both","image_url":"primary","image":"fallback","is_active":false,"isOpen":true}"#;
        let shop: Shop = serde_json::from_str(json).unwrap();
        assert_eq!(shop.image_url.as_deref(), Some("primary"));
        assert!(!shop.is_active);
        assert_eq!(shop.category, "");
    }

    #[test]
    fn test_empty_image_url_falls_back() {
        let json = r#"{"id":4,"name":"Empty","image_url":"","image":"fallback"}"#;
        let shop: Shop = serde_json::from_str(json).unwrap();
        assert_eq!(shop.image_url.as_deref(), Some("fallback"));
        assert!(shop.is_active);
    }

    #[test]
    fn test_new_shop_skips_absent_fields() {
        let payload = NewShop {
            name: "Cafe".to_string(),
            category: "Food".to_string(),
            location: "Floor 2".to_string(),
            address: "Unit 3".to_string(),
            ..Default::default()
        };
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"name":"Cafe","category":"Food","location":"Floor 2","address":"Unit 3"})
        );
    }
}
