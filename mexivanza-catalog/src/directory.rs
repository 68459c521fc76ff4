use chrono::{DateTime, Utc};
use mexivanza_shared::Localized;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A listing in the business directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Business {
    pub id: Uuid,
    pub owner_id: String,
    pub name: String,
    pub description: Localized,
    pub category: String,
    pub city: String,
    pub region: String,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BusinessFilter {
    pub category: Option<String>,
    pub city: Option<String>,
    pub search: Option<String>,
    pub verified_only: Option<bool>,
}

impl BusinessFilter {
    pub fn matches(&self, business: &Business) -> bool {
        if let Some(category) = &self.category {
            if !business.category.eq_ignore_ascii_case(category) {
                return false;
            }
        }
        if let Some(city) = &self.city {
            if !business.city.eq_ignore_ascii_case(city) {
                return false;
            }
        }
        if self.verified_only == Some(true) && !business.is_verified {
            return false;
        }
        match self.search.as_deref().map(str::trim) {
            Some(term) if !term.is_empty() => {
                business.name.to_lowercase().contains(&term.to_lowercase())
                    || business.description.contains_ignore_case(term)
            }
            _ => true,
        }
    }

    /// Applies the filter and orders newest first.
    pub fn apply(&self, businesses: Vec<Business>) -> Vec<Business> {
        let mut matched: Vec<Business> = businesses.into_iter().filter(|b| self.matches(b)).collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        matched
    }
}
