use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: i64,
    pub rating: u8,
    pub comment: Option<String>,
    pub user_id: Option<i64>,
    pub shop_id: i64,
    #[serde(default = "default_true")]
    pub is_approved: bool,
    pub created_at: Option<String>,
}

fn default_true() -> bool {
    true
}

impl Review {
    /// Rating as filled/empty stars, e.g. `★★★☆☆`.
    pub fn stars(&self) -> String {
        let filled = usize::from(self.rating.min(5));
        format!("{}{}", "★".repeat(filled), "☆".repeat(5 - filled))
    }
}

/// Payload for posting a review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewReview {
    pub shop_id: i64,
    pub rating: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_review() {
        let json = r#"{"id":1,"rating":4,"comment":"Great","user_id":2,"shop_id":3,"created_at":null}"#;
        let review: Review = serde_json::from_str(json).unwrap();
        assert!(review.is_approved);
        assert_eq!(review.stars(), "★★★★☆");
    }
}
