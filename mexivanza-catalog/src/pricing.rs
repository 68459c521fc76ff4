use crate::availability::AvailabilitySlot;
use crate::extras::{SelectedExtra, TravelExtra};
use crate::package::{TierKind, TravelPackage};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingConfig {
    /// Maximum date multiplier honoured
    pub max_multiplier: f64,

    /// Minimum date multiplier honoured
    pub min_multiplier: f64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            max_multiplier: 3.0,
            min_multiplier: 0.5,
        }
    }
}

/// Everything needed to price a booking.
#[derive(Debug, Clone)]
pub struct PricingInput<'a> {
    pub package: &'a TravelPackage,
    pub tier: TierKind,
    pub traveler_count: u32,
    pub selected_date: NaiveDate,
    pub slots: &'a [AvailabilitySlot],
    pub extras: &'a [TravelExtra],
    pub selected_extras: &'a [SelectedExtra],
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceLine {
    pub extra_id: Uuid,
    pub quantity: u32,
    pub per_person: bool,
    pub unit_price_cents: i64,
    pub total_cents: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceQuote {
    pub availability_id: Uuid,
    pub price_multiplier: f64,
    /// Per-traveler price after the date multiplier
    pub base_price_cents: i64,
    pub traveler_count: u32,
    pub subtotal_cents: i64,
    pub extras_total_cents: i64,
    pub total_cents: i64,
    pub currency: String,
    pub line_items: Vec<PriceLine>,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum PricingError {
    #[error("No availability for {0}")]
    NoSlotForDate(NaiveDate),

    #[error("Unknown extra: {0}")]
    UnknownExtra(Uuid),

    #[error("Extra {0} is not offered with this package")]
    ExtraNotOffered(Uuid),

    #[error("Pricing tier not offered: {0:?}")]
    TierNotOffered(TierKind),
}

#[derive(Debug, Clone)]
pub struct PricingEngine {
    config: PricingConfig,
}

impl PricingEngine {
    pub fn new(config: PricingConfig) -> Self {
        Self { config }
    }

    /// Price a booking.
    ///
    /// `base = tier price * multiplier(date)`, `subtotal = base * travelers`,
    /// extras add `price * travelers * qty` when per person and
    /// `price * qty` otherwise.
    pub fn quote(&self, input: &PricingInput<'_>) -> Result<PriceQuote, PricingError> {
        let tier = input
            .package
            .pricing_tiers
            .get(input.tier)
            .ok_or(PricingError::TierNotOffered(input.tier))?;

        let slot = input
            .slots
            .iter()
            .find(|s| s.package_id == input.package.id && s.date == input.selected_date)
            .ok_or(PricingError::NoSlotForDate(input.selected_date))?;

        let multiplier = self.clamp_multiplier(slot.price_multiplier);
        let travelers = input.traveler_count as i64;

        let base_price_cents = apply_multiplier(tier.price_cents, multiplier);
        let subtotal_cents = base_price_cents * travelers;

        let mut line_items = Vec::with_capacity(input.selected_extras.len());
        for selected in input.selected_extras.iter().filter(|s| s.quantity > 0) {
            let extra = input
                .extras
                .iter()
                .find(|e| e.id == selected.extra_id)
                .ok_or(PricingError::UnknownExtra(selected.extra_id))?;

            if !extra.applies_to(input.package.id) {
                return Err(PricingError::ExtraNotOffered(extra.id));
            }

            line_items.push(PriceLine {
                extra_id: extra.id,
                quantity: selected.quantity,
                per_person: extra.per_person,
                unit_price_cents: extra.price_cents,
                total_cents: extra.cost_cents(travelers, selected.quantity as i64),
            });
        }

        let extras_total_cents: i64 = line_items.iter().map(|l| l.total_cents).sum();

        Ok(PriceQuote {
            availability_id: slot.id,
            price_multiplier: multiplier,
            base_price_cents,
            traveler_count: input.traveler_count,
            subtotal_cents,
            extras_total_cents,
            total_cents: subtotal_cents + extras_total_cents,
            currency: tier.currency.clone(),
            line_items,
        })
    }

    fn clamp_multiplier(&self, multiplier: f64) -> f64 {
        if !multiplier.is_finite() || multiplier <= 0.0 {
            return 1.0;
        }
        multiplier.max(self.config.min_multiplier).min(self.config.max_multiplier)
    }
}

impl Default for PricingEngine {
    fn default() -> Self {
        Self::new(PricingConfig::default())
    }
}

fn apply_multiplier(price_cents: i64, multiplier: f64) -> i64 {
    (price_cents as f64 * multiplier).round() as i64
}

/// `340000, "MXN"` -> `"$3,400.00 MXN"`
pub fn format_amount(cents: i64, currency: &str) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.unsigned_abs();
    let whole = (cents / 100).to_string();
    let fraction = cents % 100;

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    format!("{}${}.{:02} {}", sign, grouped, fraction, currency)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::PricingTier;
    use mexivanza_shared::Localized;

    fn setup(multiplier: f64) -> (TravelPackage, Vec<AvailabilitySlot>, NaiveDate) {
        let package = TravelPackage::new(
            Localized::new("Riviera Maya", "Riviera Maya"),
            "Sureste",
            "Tulum",
            5,
            PricingTier::new(100_000, "MXN"),
        );
        let date = NaiveDate::from_ymd_opt(2026, 11, 14).unwrap();
        let slots = vec![AvailabilitySlot::new(package.id, date, 20, multiplier)];
        (package, slots, date)
    }

    #[test]
    fn test_reference_scenario() {
        let (package, slots, date) = setup(1.2);
        let extra = TravelExtra::new(Localized::new("Cenotes", "Cenote tour"), 50_000, true);
        let selected = [SelectedExtra { extra_id: extra.id, quantity: 1 }];
        let extras = [extra];

        let quote = PricingEngine::default()
            .quote(&PricingInput {
                package: &package,
                tier: TierKind::Standard,
                traveler_count: 2,
                selected_date: date,
                slots: &slots,
                extras: &extras,
                selected_extras: &selected,
            })
            .unwrap();

        assert_eq!(quote.base_price_cents, 120_000);
        assert_eq!(quote.subtotal_cents, 240_000);
        assert_eq!(quote.extras_total_cents, 100_000);
        assert_eq!(quote.total_cents, 340_000);
        assert_eq!(quote.availability_id, slots[0].id);
    }

    #[test]
    fn test_subtotal_linear_in_travelers() {
        let (package, slots, date) = setup(1.35);
        let engine = PricingEngine::default();

        let subtotal = |n: u32| {
            engine
                .quote(&PricingInput {
                    package: &package,
                    tier: TierKind::Standard,
                    traveler_count: n,
                    selected_date: date,
                    slots: &slots,
                    extras: &[],
                    selected_extras: &[],
                })
                .unwrap()
                .subtotal_cents
        };

        let one = subtotal(1);
        for n in 0..8 {
            assert_eq!(subtotal(n), one * n as i64);
        }
    }

    #[test]
    fn test_group_extra_ignores_traveler_count() {
        let (package, slots, date) = setup(1.0);
        let extra = TravelExtra::new(Localized::new("Traslado", "Transfer"), 80_000, false);
        let selected = [SelectedExtra { extra_id: extra.id, quantity: 2 }];
        let extras = [extra];

        let quote = PricingEngine::default()
            .quote(&PricingInput {
                package: &package,
                tier: TierKind::Standard,
                traveler_count: 4,
                selected_date: date,
                slots: &slots,
                extras: &extras,
                selected_extras: &selected,
            })
            .unwrap();

        assert_eq!(quote.extras_total_cents, 160_000);
        assert_eq!(quote.total_cents, 400_000 + 160_000);
    }

    #[test]
    fn test_missing_slot_and_unknown_extra() {
        let (package, slots, date) = setup(1.0);
        let engine = PricingEngine::default();
        let other_date = date.succ_opt().unwrap();

        let err = engine
            .quote(&PricingInput {
                package: &package,
                tier: TierKind::Standard,
                traveler_count: 1,
                selected_date: other_date,
                slots: &slots,
                extras: &[],
                selected_extras: &[],
            })
            .unwrap_err();
        assert_eq!(err, PricingError::NoSlotForDate(other_date));

        let missing = Uuid::new_v4();
        let err = engine
            .quote(&PricingInput {
                package: &package,
                tier: TierKind::Standard,
                traveler_count: 1,
                selected_date: date,
                slots: &slots,
                extras: &[],
                selected_extras: &[SelectedExtra { extra_id: missing, quantity: 1 }],
            })
            .unwrap_err();
        assert_eq!(err, PricingError::UnknownExtra(missing));
    }

    #[test]
    fn test_premium_tier_required() {
        let (package, slots, date) = setup(1.0);
        let err = PricingEngine::default()
            .quote(&PricingInput {
                package: &package,
                tier: TierKind::Premium,
                traveler_count: 1,
                selected_date: date,
                slots: &slots,
                extras: &[],
                selected_extras: &[],
            })
            .unwrap_err();
        assert_eq!(err, PricingError::TierNotOffered(TierKind::Premium));
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(340_000, "MXN"), "$3,400.00 MXN");
        assert_eq!(format_amount(5, "USD"), "$0.05 USD");
        assert_eq!(format_amount(123_456_789, "MXN"), "$1,234,567.89 MXN");
        assert_eq!(format_amount(-1_050, "MXN"), "-$10.50 MXN");
    }
}
