//! Query string construction for list and search endpoints.

use url::form_urlencoded;

/// Ordered query parameters.
///
/// Keys keep insertion order. A key whose value is `None` is skipped when
/// the query is encoded, so optional filters can be pushed unconditionally.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filters {
    pairs: Vec<(String, Option<String>)>,
}

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a key with a value.
    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.push(key, Some(value));
        self
    }

    /// Append a key whose value may be absent.
    pub fn with_opt<V: ToString>(mut self, key: impl Into<String>, value: Option<V>) -> Self {
        self.push(key, value);
        self
    }

    pub fn push<V: ToString>(&mut self, key: impl Into<String>, value: Option<V>) {
        self.pairs
            .push((key.into(), value.map(|v| v.to_string())));
    }

    /// True when encoding would produce no parameters.
    pub fn is_empty(&self) -> bool {
        self.pairs.iter().all(|(_, v)| v.is_none())
    }

    /// Form-urlencode the present pairs, in insertion order.
    pub fn encode(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (key, value) in &self.pairs {
            if let Some(value) = value {
                serializer.append_pair(key, value);
            }
        }
        serializer.finish()
    }

    /// Attach the encoded query to `path`; an empty query leaves it bare.
    pub fn to_path(&self, path: &str) -> String {
        let query = self.encode();
        if query.is_empty() {
            path.to_string()
        } else {
            format!("{}?{}", path, query)
        }
    }

    /// Prepend pairs ahead of these filters.
    pub(crate) fn after(mut self, leading: Filters) -> Self {
        let mut pairs = leading.pairs;
        pairs.append(&mut self.pairs);
        self.pairs = pairs;
        self
    }
}

impl<K: Into<String>, V: ToString> FromIterator<(K, V)> for Filters {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut filters = Filters::new();
        for (k, v) in iter {
            filters.push(k, Some(v));
        }
        filters
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insertion_order() {
        let filters = Filters::new().with("category", "Electronics").with("minPrice", 10);
        assert_eq!(filters.to_path("/products"), "/products?category=Electronics&minPrice=10");
    }

    #[test]
    fn test_empty_has_no_question_mark() {
        assert_eq!(Filters::new().to_path("/products"), "/products");
    }

    #[test]
    fn test_absent_values_are_skipped() {
        let filters = Filters::new()
            .with_opt("shop_id", None::<i64>)
            .with("category", "Books & Media")
            .with_opt("maxPrice", Some(25.5));
        assert_eq!(filters.encode(), "category=Books+%26+Media&maxPrice=25.5");

        let only_absent = Filters::new().with_opt("category", None::<&str>);
        assert!(only_absent.is_empty());
        assert_eq!(only_absent.to_path("/products"), "/products");
    }

    #[test]
    fn test_from_iterator() {
        let filters: Filters = [("a", "1"), ("b", "x y")].into_iter().collect();
        assert_eq!(filters.encode(), "a=1&b=x+y");
    }

    #[test]
    fn test_after_prepends() {
        let filters = Filters::new().with("category", "Food");
        let combined = filters.after(Filters::new().with("q", "pizza"));
        assert_eq!(combined.to_path("/search"), "/search?q=pizza&category=Food");
    }
}
