use std::cmp::Ordering;

/// Case-insensitive substring test. An empty needle matches everything.
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    needle.is_empty() || haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Case-insensitive ordering for names.
pub fn cmp_ignore_case(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// Format a price in dollars, e.g. `$59.99`
pub fn format_price(price: f64) -> String {
    format!("${:.2}", price)
}

/// Format a backend timestamp to a more readable date
pub fn format_date(date: &str) -> String {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(date) {
        dt.format("%b %d, %Y").to_string()
    } else if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(date, "%Y-%m-%dT%H:%M:%S%.f") {
        // Backend timestamps are naive UTC
        dt.format("%b %d, %Y").to_string()
    } else if date.len() >= 10 {
        date.chars().take(10).collect()
    } else {
        date.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_ignore_case() {
        assert!(contains_ignore_case("TechWorld Electronics", "techw"));
        assert!(contains_ignore_case("anything", ""));
        assert!(!contains_ignore_case("Fashion", "tech"));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("Hello", 10), "Hello");
        assert_eq!(truncate("Hello World", 8), "Hello...");
        assert_eq!(truncate("Hi", 2), "Hi");
        assert_eq!(truncate("Café au lait", 6), "Caf...");
    }

    #[test]
    fn test_format_price() {
        assert_eq!(format_price(59.99), "$59.99");
        assert_eq!(format_price(5.0), "$5.00");
    }

    #[test]
    fn test_format_date() {
        assert_eq!(format_date("2024-03-05T10:00:00"), "Mar 05, 2024");
        assert_eq!(format_date("2024-03-05T10:00:00.123456"), "Mar 05, 2024");
        assert_eq!(format_date("2024-03-05T10:00:00Z"), "Mar 05, 2024");
        assert_eq!(format_date("soon"), "soon");
    }
}
