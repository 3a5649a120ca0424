//! Typed accessors for the marketplace resources.
//!
//! Each accessor is a fixed verb/path call through [`ApiClient::request`].
//! List endpoints answer with an envelope (`{ "shops": [...] }`) and single
//! records with `{ "shop": {...} }`; bare arrays/objects are accepted too.
//! No accessor retries or caches.

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::models::{
    MessageResponse, NewReview, Offer, Product, Review, SearchResults, Shop,
};

use super::client::{ApiClient, RequestOptions};
use super::query::Filters;
use super::ApiError;

/// Pull `key` out of an envelope object, or take the value as-is.
fn unwrap_envelope<T: DeserializeOwned>(value: Value, key: &str) -> Result<T, ApiError> {
    let inner = match value {
        Value::Object(mut map) if map.contains_key(key) => map.remove(key).unwrap_or(Value::Null),
        other => other,
    };
    serde_json::from_value(inner)
        .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse {}: {}", key, e)))
}

fn unwrap_list<T: DeserializeOwned>(value: Value, key: &str) -> Result<Vec<T>, ApiError> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Object(ref map) if map.get(key).is_some_and(Value::is_null) => Ok(Vec::new()),
        other => unwrap_envelope(other, key),
    }
}

/// Decode a write acknowledgement, keeping just the message.
fn acknowledgement(value: Value) -> MessageResponse {
    MessageResponse {
        message: value
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string),
    }
}

impl ApiClient {
    // ===== Shops =====

    pub async fn list_shops(&self) -> Result<Vec<Shop>, ApiError> {
        let value = self.request("/shops", RequestOptions::get()).await?;
        unwrap_list(value, "shops")
    }

    pub async fn get_shop(&self, id: i64) -> Result<Shop, ApiError> {
        let value = self
            .request(&format!("/shops/{}", id), RequestOptions::get())
            .await?;
        unwrap_envelope(value, "shop")
    }

    pub async fn create_shop<B: Serialize + ?Sized>(&self, data: &B) -> Result<Shop, ApiError> {
        let value = self.request("/shops", RequestOptions::post(data)?).await?;
        unwrap_envelope(value, "shop")
    }

    pub async fn update_shop<B: Serialize + ?Sized>(&self, id: i64, data: &B) -> Result<Value, ApiError> {
        self.request(&format!("/shops/{}", id), RequestOptions::put(data)?)
            .await
    }

    pub async fn delete_shop(&self, id: i64) -> Result<MessageResponse, ApiError> {
        let value = self
            .request(&format!("/shops/{}", id), RequestOptions::delete())
            .await?;
        Ok(acknowledgement(value))
    }

    // ===== Products =====

    /// List products, e.g. filtered by `shop_id` or `category`.
    pub async fn list_products(&self, filters: &Filters) -> Result<Vec<Product>, ApiError> {
        let value = self
            .request(&filters.to_path("/products"), RequestOptions::get())
            .await?;
        unwrap_list(value, "products")
    }

    pub async fn create_product<B: Serialize + ?Sized>(&self, data: &B) -> Result<Product, ApiError> {
        let value = self.request("/products", RequestOptions::post(data)?).await?;
        unwrap_envelope(value, "product")
    }

    pub async fn update_product<B: Serialize + ?Sized>(&self, id: i64, data: &B) -> Result<Value, ApiError> {
        self.request(&format!("/products/{}", id), RequestOptions::put(data)?)
            .await
    }

    pub async fn delete_product(&self, id: i64) -> Result<MessageResponse, ApiError> {
        let value = self
            .request(&format!("/products/{}", id), RequestOptions::delete())
            .await?;
        Ok(acknowledgement(value))
    }

    // ===== Offers =====

    pub async fn list_offers(&self) -> Result<Vec<Offer>, ApiError> {
        let value = self.request("/offers", RequestOptions::get()).await?;
        unwrap_list(value, "offers")
    }

    pub async fn create_offer<B: Serialize + ?Sized>(&self, data: &B) -> Result<Offer, ApiError> {
        let value = self.request("/offers", RequestOptions::post(data)?).await?;
        unwrap_envelope(value, "offer")
    }

    pub async fn update_offer<B: Serialize + ?Sized>(&self, id: i64, data: &B) -> Result<Value, ApiError> {
        self.request(&format!("/offers/{}", id), RequestOptions::put(data)?)
            .await
    }

    pub async fn delete_offer(&self, id: i64) -> Result<MessageResponse, ApiError> {
        let value = self
            .request(&format!("/offers/{}", id), RequestOptions::delete())
            .await?;
        Ok(acknowledgement(value))
    }

    // ===== Reviews =====

    pub async fn create_review(&self, data: &NewReview) -> Result<Review, ApiError> {
        let value = self.request("/reviews", RequestOptions::post(data)?).await?;
        unwrap_envelope(value, "review")
    }

    pub async fn list_reviews(&self, shop_id: i64) -> Result<Vec<Review>, ApiError> {
        let path = Filters::new().with("shop_id", shop_id).to_path("/reviews");
        let value = self.request(&path, RequestOptions::get()).await?;
        unwrap_list(value, "reviews")
    }

    // ===== Search =====

    /// Search shops and products. `q` always leads the query string.
    pub async fn search(&self, query: &str, filters: &Filters) -> Result<SearchResults, ApiError> {
        let path = filters
            .clone()
            .after(Filters::new().with("q", query))
            .to_path("/search");
        let value = self.request(&path, RequestOptions::get()).await?;
        if value.is_null() {
            return Ok(SearchResults::default());
        }
        serde_json::from_value(value)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse search results: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unwrap_list_envelope_and_bare() {
        let wrapped = json!({"shops": [{"id": 1, "name": "A"}]});
        let shops: Vec<Shop> = unwrap_list(wrapped, "shops").unwrap();
        assert_eq!(shops.len(), 1);

        let bare = json!([{"id": 1, "name": "A"}, {"id": 2, "name": "B", "isOpen": false}]);
        let shops: Vec<Shop> = unwrap_list(bare, "shops").unwrap();
        assert_eq!(shops.len(), 2);
        assert!(!shops[1].is_active);

        let empty: Vec<Shop> = unwrap_list(Value::Null, "shops").unwrap();
        assert!(empty.is_empty());

        let null_field: Vec<Shop> = unwrap_list(json!({"shops": null}), "shops").unwrap();
        assert!(null_field.is_empty());
    }

    #[test]
    fn test_unwrap_envelope_single() {
        let shop: Shop = unwrap_envelope(json!({"shop": {"id": 9, "name": "Nine"}}), "shop").unwrap();
        assert_eq!(shop.id, 9);

        let shop: Shop = unwrap_envelope(json!({"id": 10, "name": "Ten"}), "shop").unwrap();
        assert_eq!(shop.id, 10);
    }

    #[test]
    fn test_unwrap_envelope_mismatch() {
        let err = unwrap_envelope::<Shop>(json!({"shop": "nope"}), "shop").unwrap_err();
        assert!(matches!(err, ApiError::InvalidResponse(_)));
    }

    #[test]
    fn test_acknowledgement() {
        assert_eq!(
            acknowledgement(json!({"message": "Shop deleted"})).message.as_deref(),
            Some("Shop deleted")
        );
        assert!(acknowledgement(Value::Null).message.is_none());
    }
}
