use serde::{Deserialize, Serialize};

use super::shop::non_empty;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ProductRecord")]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub original_price: Option<f64>,
    pub category: String,
    pub subcategory: Option<String>,
    pub brand: Option<String>,
    pub sku: Option<String>,
    pub tags: Vec<String>,
    pub image_url: Option<String>,
    pub image_urls: Vec<String>,
    pub shop_id: Option<i64>,
    pub shop_name: Option<String>,
    pub stock_quantity: Option<i64>,
    pub is_available: bool,
    pub is_featured: bool,
    pub in_stock: bool,
    pub rating: Option<f64>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl Product {
    /// Percentage saved against the original price, if discounted.
    pub fn discount_percent(&self) -> Option<u32> {
        match self.original_price {
            Some(original) if original > self.price && original > 0.0 => {
                Some((((original - self.price) / original) * 100.0).round() as u32)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ProductRecord {
    id: i64,
    name: String,
    description: Option<String>,
    #[serde(default)]
    price: f64,
    #[serde(alias = "originalPrice")]
    original_price: Option<f64>,
    category: Option<String>,
    subcategory: Option<String>,
    brand: Option<String>,
    sku: Option<String>,
    tags: Option<Vec<String>>,
    image_url: Option<String>,
    image: Option<String>,
    image_urls: Option<Vec<String>>,
    shop_id: Option<i64>,
    #[serde(alias = "shop")]
    shop_name: Option<serde_json::Value>,
    stock_quantity: Option<i64>,
    is_available: Option<bool>,
    is_featured: Option<bool>,
    is_in_stock: Option<bool>,
    #[serde(rename = "inStock", alias = "in_stock")]
    in_stock: Option<bool>,
    rating: Option<f64>,
    created_at: Option<String>,
    updated_at: Option<String>,
}

impl From<ProductRecord> for Product {
    fn from(r: ProductRecord) -> Self {
        // `shop` is either a display name or a nested shop object.
        let shop_name = match r.shop_name {
            Some(serde_json::Value::String(s)) => Some(s),
            Some(serde_json::Value::Object(map)) => map
                .get("name")
                .and_then(|n| n.as_str())
                .map(str::to_string),
            _ => None,
        };
        let in_stock = r
            .is_in_stock
            .or(r.in_stock)
            .or(r.stock_quantity.map(|q| q > 0))
            .unwrap_or(true);

        Product {
            id: r.id,
            name: r.name,
            description: r.description,
            price: r.price,
            original_price: r.original_price,
            category: r.category.unwrap_or_default(),
            subcategory: r.subcategory,
            brand: r.brand,
            sku: r.sku,
            tags: r.tags.unwrap_or_default(),
            image_url: non_empty(r.image_url).or_else(|| non_empty(r.image)),
            image_urls: r.image_urls.unwrap_or_default(),
            shop_id: r.shop_id,
            shop_name,
            stock_quantity: r.stock_quantity,
            is_available: r.is_available.unwrap_or(true),
            is_featured: r.is_featured.unwrap_or(false),
            in_stock,
            rating: r.rating,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

/// Payload for creating or updating a product.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub price: f64,
    pub category: String,
    pub shop_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stock_quantity: Option<i64>,
}
