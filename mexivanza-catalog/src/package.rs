use chrono::{DateTime, Utc};
use mexivanza_shared::{Language, Localized};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_CURRENCY: &str = "MXN";

/// Named package option.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TierKind {
    Standard,
    Premium,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PricingTier {
    pub price_cents: i64,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub includes: Vec<Localized>,
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

impl PricingTier {
    pub fn new(price_cents: i64, currency: &str) -> Self {
        Self {
            price_cents,
            currency: currency.to_string(),
            includes: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PricingTiers {
    pub standard: PricingTier,
    #[serde(default)]
    pub premium: Option<PricingTier>,
}

impl PricingTiers {
    pub fn get(&self, kind: TierKind) -> Option<&PricingTier> {
        match kind {
            TierKind::Standard => Some(&self.standard),
            TierKind::Premium => self.premium.as_ref(),
        }
    }
}

/// A bookable travel package. Read-only for the duration of a booking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TravelPackage {
    pub id: Uuid,
    pub title: Localized,
    pub description: Localized,
    pub region: String,
    pub city: String,
    pub duration_days: i32,
    pub pricing_tiers: PricingTiers,
    #[serde(default)]
    pub gallery: Vec<String>,
    pub is_published: bool,
    pub is_featured: bool,
    pub is_demo: bool,
    pub created_at: DateTime<Utc>,
}

impl TravelPackage {
    pub fn new(title: Localized, region: &str, city: &str, duration_days: i32, standard: PricingTier) -> Self {
        Self {
            id: Uuid::new_v4(),
            title,
            description: Localized::default(),
            region: region.to_string(),
            city: city.to_string(),
            duration_days,
            pricing_tiers: PricingTiers { standard, premium: None },
            gallery: Vec::new(),
            is_published: false,
            is_featured: false,
            is_demo: false,
            created_at: Utc::now(),
        }
    }

    pub fn standard_price_cents(&self) -> i64 {
        self.pricing_tiers.standard.price_cents
    }

    pub fn currency(&self) -> &str {
        &self.pricing_tiers.standard.currency
    }

    pub fn title_in(&self, language: Language) -> &str {
        self.title.get(language)
    }

    /// Last day of a trip starting on `start`. A one-day package ends the day it starts.
    pub fn end_date(&self, start: chrono::NaiveDate) -> chrono::NaiveDate {
        let extra_days = (self.duration_days.max(1) - 1) as i64;
        start + chrono::Duration::days(extra_days)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.title.is_empty() {
            return Err("Package title is required".to_string());
        }
        if self.duration_days < 1 {
            return Err("Package duration must be at least one day".to_string());
        }
        if self.pricing_tiers.standard.price_cents < 0 {
            return Err("Standard price cannot be negative".to_string());
        }
        if let Some(premium) = &self.pricing_tiers.premium {
            if premium.price_cents < 0 {
                return Err("Premium price cannot be negative".to_string());
            }
        }
        Ok(())
    }
}

/// Listing filters for the public package catalog.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PackageFilter {
    pub region: Option<String>,
    pub city: Option<String>,
    pub featured: Option<bool>,
    #[serde(default)]
    pub include_unpublished: bool,
}

impl PackageFilter {
    pub fn matches(&self, package: &TravelPackage) -> bool {
        if !self.include_unpublished && !package.is_published {
            return false;
        }
        if let Some(region) = &self.region {
            if !package.region.eq_ignore_ascii_case(region) {
                return false;
            }
        }
        if let Some(city) = &self.city {
            if !package.city.eq_ignore_ascii_case(city) {
                return false;
            }
        }
        if let Some(featured) = self.featured {
            if package.is_featured != featured {
                return false;
            }
        }
        true
    }
}
