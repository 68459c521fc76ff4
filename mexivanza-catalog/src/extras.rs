use mexivanza_shared::Localized;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExtraCategory {
    Transport,
    Activity,
    Meal,
    Insurance,
    Accommodation,
    Other,
}

impl ExtraCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Transport => "transport",
            Self::Activity => "activity",
            Self::Meal => "meal",
            Self::Insurance => "insurance",
            Self::Accommodation => "accommodation",
            Self::Other => "other",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value {
            "transport" => Self::Transport,
            "activity" => Self::Activity,
            "meal" => Self::Meal,
            "insurance" => Self::Insurance,
            "accommodation" => Self::Accommodation,
            _ => Self::Other,
        }
    }
}

/// Optional add-on service. `package_id == None` means the extra is offered
/// with every package.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TravelExtra {
    pub id: Uuid,
    pub package_id: Option<Uuid>,
    pub name: Localized,
    pub description: Localized,
    pub price_cents: i64,
    pub per_person: bool,
    pub category: ExtraCategory,
}

impl TravelExtra {
    pub fn new(name: Localized, price_cents: i64, per_person: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            package_id: None,
            name,
            description: Localized::default(),
            price_cents,
            per_person,
            category: ExtraCategory::Other,
        }
    }

    pub fn applies_to(&self, package_id: Uuid) -> bool {
        self.package_id.map_or(true, |id| id == package_id)
    }

    /// Cost of `quantity` units for a party of `traveler_count`.
    pub fn cost_cents(&self, traveler_count: i64, quantity: i64) -> i64 {
        if self.per_person {
            self.price_cents * traveler_count * quantity
        } else {
            self.price_cents * quantity
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SelectedExtra {
    pub extra_id: Uuid,
    pub quantity: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cost_per_person_vs_group() {
        let mut extra = TravelExtra::new(Localized::new("Tour en lancha", "Boat tour"), 50_000, true);
        assert_eq!(extra.cost_cents(2, 1), 100_000);
        assert_eq!(extra.cost_cents(3, 2), 300_000);

        extra.per_person = false;
        assert_eq!(extra.cost_cents(3, 2), 100_000);
    }

    #[test]
    fn test_applies_to() {
        let package_id = Uuid::new_v4();
        let mut extra = TravelExtra::new(Localized::new("Seguro", "Insurance"), 20_000, true);
        assert!(extra.applies_to(package_id));

        extra.package_id = Some(Uuid::new_v4());
        assert!(!extra.applies_to(package_id));
    }
}
