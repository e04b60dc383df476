//! Content catalog seam
//!
//! The catalog of content items lives outside the engine. The engine only
//! needs to know whether an item id exists and how to resolve a slug, so the
//! dependency is expressed as a trait the host implements.

use serde::{Deserialize, Serialize};

/// Immutable catalog record as seen by the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ContentRecord {
    /// Item identifier, shared with the interaction ledger
    pub id: String,

    /// URL slug
    pub slug: String,

    /// Display title
    pub title: String,

    /// Free-form category tag
    #[serde(default)]
    pub category: Option<String>,

    /// Whether the item is featured on the landing page
    #[serde(default)]
    pub featured: bool,
}

impl ContentRecord {
    pub fn new(id: impl Into<String>, slug: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            slug: slug.into(),
            title: title.into(),
            category: None,
            featured: false,
        }
    }
}

/// Read-only lookup over the content catalog
pub trait ContentCatalog: Send + Sync {
    /// Finds an item by identifier
    fn find_by_id(&self, id: &str) -> Option<ContentRecord>;

    /// Finds an item by slug
    fn find_by_slug(&self, slug: &str) -> Option<ContentRecord>;

    /// All known item identifiers
    fn ids(&self) -> Vec<String>;

    /// Whether an item with this identifier exists
    fn contains(&self, id: &str) -> bool {
        self.find_by_id(id).is_some()
    }

    /// Featured records in catalog order
    fn featured(&self) -> Vec<ContentRecord> {
        self.ids()
            .iter()
            .filter_map(|id| self.find_by_id(id))
            .filter(|r| r.featured)
            .collect()
    }
}

/// Catalog backed by a fixed list of records
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    records: Vec<ContentRecord>,
}

impl StaticCatalog {
    pub fn new(records: Vec<ContentRecord>) -> Self {
        Self { records }
    }

    /// Records matching a category, case-insensitively
    pub fn by_category(&self, category: &str) -> Vec<ContentRecord> {
        self.records
            .iter()
            .filter(|r| {
                r.category
                    .as_deref()
                    .is_some_and(|c| c.eq_ignore_ascii_case(category))
            })
            .cloned()
            .collect()
    }
}

impl ContentCatalog for StaticCatalog {
    fn find_by_id(&self, id: &str) -> Option<ContentRecord> {
        self.records.iter().find(|r| r.id == id).cloned()
    }

    fn find_by_slug(&self, slug: &str) -> Option<ContentRecord> {
        self.records.iter().find(|r| r.slug == slug).cloned()
    }

    fn ids(&self) -> Vec<String> {
        self.records.iter().map(|r| r.id.clone()).collect()
    }

    fn featured(&self) -> Vec<ContentRecord> {
        self.records.iter().filter(|r| r.featured).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> StaticCatalog {
        let mut shop = ContentRecord::new("1", "shop-platform", "Shop Platform");
        shop.featured = true;
        shop.category = Some("E-commerce".to_string());
        let dash = ContentRecord::new("2", "analytics-dashboard", "Analytics Dashboard");
        StaticCatalog::new(vec![shop, dash])
    }

    #[test]
    fn test_find_by_id_and_slug() {
        let catalog = sample();
        assert_eq!(catalog.find_by_id("2").unwrap().slug, "analytics-dashboard");
        assert_eq!(catalog.find_by_slug("shop-platform").unwrap().id, "1");
        assert!(catalog.find_by_id("99").is_none());
        assert!(catalog.contains("1"));
    }

    #[test]
    fn test_filters() {
        let catalog = sample();
        assert_eq!(catalog.featured().len(), 1);
        assert_eq!(catalog.by_category("e-commerce").len(), 1);
        assert_eq!(catalog.ids(), vec!["1".to_string(), "2".to_string()]);
    }
}
