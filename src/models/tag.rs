//! Tag model

use serde::{Deserialize, Serialize};

/// Tag entity; names are unique ignoring case
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
}

/// Trim tag names, drop empty ones and remove case-insensitive duplicates.
///
/// The first spelling of each name wins and input order is kept.
pub fn normalize_tag_names<S: AsRef<str>>(names: &[S]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    names
        .iter()
        .map(|n| n.as_ref().trim())
        .filter(|n| !n.is_empty())
        .filter(|n| seen.insert(n.to_lowercase()))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_tag_names() {
        let names = normalize_tag_names(&[" rust ", "Rust", "", "axum", "  ", "AXUM", "sql"]);
        assert_eq!(names, vec!["rust", "axum", "sql"]);
    }

    #[test]
    fn test_normalize_empty() {
        let names: Vec<String> = normalize_tag_names::<&str>(&[]);
        assert!(names.is_empty());
    }
}
