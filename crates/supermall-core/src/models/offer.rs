use serde::{Deserialize, Serialize};

use super::shop::non_empty;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfferType {
    Percentage,
    Amount,
    Bogo,
    FreeDelivery,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "OfferRecord")]
pub struct Offer {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub offer_type: Option<OfferType>,
    pub discount_percentage: Option<f64>,
    pub discount_amount: Option<f64>,
    pub shop_id: Option<i64>,
    pub shop_name: Option<String>,
    pub product_id: Option<i64>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub is_active: bool,
    pub image_url: Option<String>,
    pub banner_url: Option<String>,
    pub created_at: Option<String>,
}

impl Offer {
    /// Short human-readable description of the discount.
    pub fn discount_label(&self) -> String {
        match (self.offer_type, self.discount_percentage, self.discount_amount) {
            (Some(OfferType::Bogo), _, _) => "Buy one get one".to_string(),
            (Some(OfferType::FreeDelivery), _, _) => "Free delivery".to_string(),
            (_, Some(pct), _) if pct > 0.0 => format!("{}% off", pct),
            (_, _, Some(amount)) if amount > 0.0 => format!("${:.2} off", amount),
            _ => "Special offer".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct OfferRecord {
    id: i64,
    title: String,
    description: Option<String>,
    offer_type: Option<OfferType>,
    #[serde(alias = "discount")]
    discount_percentage: Option<f64>,
    discount_amount: Option<f64>,
    shop_id: Option<i64>,
    #[serde(alias = "shop")]
    shop_name: Option<String>,
    product_id: Option<i64>,
    start_date: Option<String>,
    #[serde(alias = "validUntil")]
    end_date: Option<String>,
    is_active: Option<bool>,
    image_url: Option<String>,
    image: Option<String>,
    banner_url: Option<String>,
    created_at: Option<String>,
}

impl From<OfferRecord> for Offer {
    fn from(r: OfferRecord) -> Self {
        Offer {
            id: r.id,
            title: r.title,
            description: r.description,
            offer_type: r.offer_type,
            discount_percentage: r.discount_percentage,
            discount_amount: r.discount_amount,
            shop_id: r.shop_id,
            shop_name: non_empty(r.shop_name),
            product_id: r.product_id,
            start_date: r.start_date,
            end_date: r.end_date,
            is_active: r.is_active.unwrap_or(true),
            image_url: non_empty(r.image_url).or_else(|| non_empty(r.image)),
            banner_url: non_empty(r.banner_url),
            created_at: r.created_at,
        }
    }
}

/// Payload for creating or updating an offer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOffer {
    pub title: String,
    pub offer_type: OfferType,
    pub shop_id: i64,
    /// ISO-8601 start of validity
    pub start_date: String,
    /// ISO-8601 end of validity
    pub end_date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_percentage: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_offer() {
        let json = r#"{"id":1,"title":"Summer Sale","offer_type":"percentage","discount_percentage":20.0,"shop_id":3,"shop_name":"Fashion Hub","start_date":"2024-06-01T00:00:00","end_date":"2024-06-30T00:00:00","is_active":true,"image_url":""}"#;
        let offer: Offer = serde_json::from_str(json).unwrap();
        assert_eq!(offer.offer_type, Some(OfferType::Percentage));
        assert_eq!(offer.image_url, None);
        assert_eq!(offer.discount_label(), "20% off");
    }

    #[test]
    fn test_unknown_offer_type() {
        let json = r#"{"id":2,"title":"Mystery","offer_type":"cashback","discount_amount":5.0}"#;
        let offer: Offer = serde_json::from_str(json).unwrap();
        assert_eq!(offer.offer_type, Some(OfferType::Other));
        assert_eq!(offer.discount_label(), "$5.00 off");
    }

    #[test]
    fn test_trending_shape() {
        let json = r#"{"id":3,"title":"Free Delivery Week","offer_type":"free_delivery","shop":"Food Court","image":"https://img/3.jpg"}"#;
        let offer: Offer = serde_json::from_str(json).unwrap();
        assert_eq!(offer.shop_name.as_deref(), Some("Food Court"));
        assert_eq!(offer.image_url.as_deref(), Some("https://img/3.jpg"));
        assert_eq!(offer.discount_label(), "Free delivery");
    }
}
