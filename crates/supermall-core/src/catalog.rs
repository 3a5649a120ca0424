//! Local filtering and sorting of shop and product listings.
//!
//! Queries never mutate the listing; `apply` returns references to the
//! matching records in the requested order. Sorts are stable, so `Popular`
//! keeps the backend order.

use std::cmp::Ordering;
use std::str::FromStr;

use crate::models::{Product, Shop};
use crate::utils::{cmp_ignore_case, contains_ignore_case};

/// Category value meaning "no category filter"
pub const ALL_CATEGORIES: &str = "all";

pub const DEFAULT_MIN_PRICE: f64 = 0.0;
pub const DEFAULT_MAX_PRICE: f64 = 1000.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProductSort {
    #[default]
    Popular,
    PriceLowToHigh,
    PriceHighToLow,
    Rating,
    Newest,
}

impl FromStr for ProductSort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "popular" => Ok(ProductSort::Popular),
            "price-low" => Ok(ProductSort::PriceLowToHigh),
            "price-high" => Ok(ProductSort::PriceHighToLow),
            "rating" => Ok(ProductSort::Rating),
            "newest" => Ok(ProductSort::Newest),
            other => Err(format!(
                "unknown sort '{}' (expected popular, price-low, price-high, rating, newest)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ShopSort {
    #[default]
    Popular,
    Rating,
    Name,
    Newest,
}

impl FromStr for ShopSort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "popular" => Ok(ShopSort::Popular),
            "rating" => Ok(ShopSort::Rating),
            "name" => Ok(ShopSort::Name),
            "newest" => Ok(ShopSort::Newest),
            other => Err(format!(
                "unknown sort '{}' (expected popular, rating, name, newest)",
                other
            )),
        }
    }
}

fn category_matches(selected: Option<&str>, category: &str) -> bool {
    match selected {
        None => true,
        Some(c) if c.eq_ignore_ascii_case(ALL_CATEGORIES) => true,
        Some(c) => c == category,
    }
}

/// Latest first; records without a timestamp go last.
fn newest_first(a: Option<&str>, b: Option<&str>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.cmp(a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProductQuery {
    pub search: String,
    pub category: Option<String>,
    pub min_price: f64,
    pub max_price: f64,
    pub sort: ProductSort,
}

impl Default for ProductQuery {
    fn default() -> Self {
        Self {
            search: String::new(),
            category: None,
            min_price: DEFAULT_MIN_PRICE,
            max_price: DEFAULT_MAX_PRICE,
            sort: ProductSort::default(),
        }
    }
}

impl ProductQuery {
    pub fn matches(&self, product: &Product) -> bool {
        contains_ignore_case(&product.name, &self.search)
            && category_matches(self.category.as_deref(), &product.category)
            && product.price >= self.min_price
            && product.price <= self.max_price
    }

    pub fn apply<'a>(&self, products: &'a [Product]) -> Vec<&'a Product> {
        let mut matched: Vec<&Product> = products.iter().filter(|p| self.matches(p)).collect();
        match self.sort {
            ProductSort::Popular => {}
            ProductSort::PriceLowToHigh => matched.sort_by(|a, b| a.price.total_cmp(&b.price)),
            ProductSort::PriceHighToLow => matched.sort_by(|a, b| b.price.total_cmp(&a.price)),
            ProductSort::Rating => matched.sort_by(|a, b| {
                b.rating
                    .unwrap_or(0.0)
                    .total_cmp(&a.rating.unwrap_or(0.0))
            }),
            ProductSort::Newest => matched
                .sort_by(|a, b| newest_first(a.created_at.as_deref(), b.created_at.as_deref())),
        }
        matched
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShopQuery {
    pub search: String,
    pub category: Option<String>,
    pub sort: ShopSort,
}

impl ShopQuery {
    /// Search matches the shop name or its category.
    pub fn matches(&self, shop: &Shop) -> bool {
        (contains_ignore_case(&shop.name, &self.search)
            || contains_ignore_case(&shop.category, &self.search))
            && category_matches(self.category.as_deref(), &shop.category)
    }

    pub fn apply<'a>(&self, shops: &'a [Shop]) -> Vec<&'a Shop> {
        let mut matched: Vec<&Shop> = shops.iter().filter(|s| self.matches(s)).collect();
        match self.sort {
            ShopSort::Popular => {}
            ShopSort::Rating => {
                matched.sort_by(|a, b| b.display_rating().total_cmp(&a.display_rating()))
            }
            ShopSort::Name => matched.sort_by(|a, b| cmp_ignore_case(&a.name, &b.name)),
            ShopSort::Newest => matched
                .sort_by(|a, b| newest_first(a.created_at.as_deref(), b.created_at.as_deref())),
        }
        matched
    }
}

/// Distinct categories in first-seen order.
pub fn categories<'a, I: IntoIterator<Item = &'a str>>(items: I) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for category in items {
        if !category.is_empty() && !seen.iter().any(|c| c == category) {
            seen.push(category.to_string());
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn products() -> Vec<Product> {
        serde_json::from_value(json!([
            {"id": 1, "name": "Wireless Headphones", "price": 99.99, "category": "Electronics", "rating": 4.5, "created_at": "2024-01-02T00:00:00"},
            {"id": 2, "name": "Smart Watch", "price": 59.99, "category": "Electronics", "rating": 4.8, "created_at": "2024-03-01T00:00:00"},
            {"id": 3, "name": "Denim Jacket", "price": 79.99, "category": "Fashion", "rating": 4.3},
            {"id": 4, "name": "Espresso Maker", "price": 1299.0, "category": "Home & Garden", "rating": 4.7, "created_at": "2023-12-01T00:00:00"}
        ]))
        .unwrap()
    }

    fn shops() -> Vec<Shop> {
        serde_json::from_value(json!([
            {"id": 1, "name": "TechWorld", "category": "Electronics", "rating": 4.8},
            {"id": 2, "name": "fashion hub", "category": "Fashion", "rating": 0.0},
            {"id": 3, "name": "Gadget Corner", "category": "Electronics", "rating": 4.9}
        ]))
        .unwrap()
    }

    fn ids<T>(items: &[&T], id: impl Fn(&T) -> i64) -> Vec<i64> {
        items.iter().map(|i| id(i)).collect()
    }

    #[test]
    fn test_default_query_applies_price_cap() {
        let all = products();
        let matched = ProductQuery::default().apply(&all);
        assert_eq!(ids(&matched, |p| p.id), vec![1, 2, 3]);
    }

    #[test]
    fn test_search_and_category() {
        let all = products();
        let query = ProductQuery {
            search: "WATCH".to_string(),
            category: Some("Electronics".to_string()),
            ..Default::default()
        };
        assert_eq!(ids(&query.apply(&all), |p| p.id), vec![2]);

        let all_categories = ProductQuery {
            category: Some("All".to_string()),
            max_price: 2000.0,
            ..Default::default()
        };
        assert_eq!(all_categories.apply(&all).len(), 4);
    }

    #[test]
    fn test_price_bounds_are_inclusive() {
        let all = products();
        let query = ProductQuery {
            min_price: 59.99,
            max_price: 79.99,
            ..Default::default()
        };
        assert_eq!(ids(&query.apply(&all), |p| p.id), vec![2, 3]);
    }

    #[test]
    fn test_product_sorts() {
        let all = products();
        let mut query = ProductQuery {
            max_price: 2000.0,
            sort: ProductSort::PriceLowToHigh,
            ..Default::default()
        };
        assert_eq!(ids(&query.apply(&all), |p| p.id), vec![2, 3, 1, 4]);

        query.sort = ProductSort::PriceHighToLow;
        assert_eq!(ids(&query.apply(&all), |p| p.id), vec![4, 1, 3, 2]);

        query.sort = ProductSort::Rating;
        assert_eq!(ids(&query.apply(&all), |p| p.id), vec![2, 4, 1, 3]);

        query.sort = ProductSort::Newest;
        assert_eq!(ids(&query.apply(&all), |p| p.id), vec![2, 1, 4, 3]);
    }

    #[test]
    fn test_shop_search_matches_category() {
        let all = shops();
        let query = ShopQuery {
            search: "electro".to_string(),
            ..Default::default()
        };
        assert_eq!(ids(&query.apply(&all), |s| s.id), vec![1, 3]);
    }

    #[test]
    fn test_shop_sorts() {
        let all = shops();
        let mut query = ShopQuery {
            sort: ShopSort::Rating,
            ..Default::default()
        };
        // Unrated shop displays the fallback rating
        assert_eq!(ids(&query.apply(&all), |s| s.id), vec![3, 1, 2]);

        query.sort = ShopSort::Name;
        assert_eq!(ids(&query.apply(&all), |s| s.id), vec![2, 3, 1]);
    }

    #[test]
    fn test_sort_parsing() {
        assert_eq!("price-low".parse::<ProductSort>().unwrap(), ProductSort::PriceLowToHigh);
        assert!("cheapest".parse::<ProductSort>().is_err());
        assert_eq!("name".parse::<ShopSort>().unwrap(), ShopSort::Name);
    }

    #[test]
    fn test_categories_first_seen() {
        let all = products();
        let cats = categories(all.iter().map(|p| p.category.as_str()));
        assert_eq!(cats, vec!["Electronics", "Fashion", "Home & Garden"]);
    }
}
