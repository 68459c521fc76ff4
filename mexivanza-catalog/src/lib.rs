pub mod package;
pub mod extras;
pub mod availability;
pub mod pricing;
pub mod directory;

pub use package::{TravelPackage, PricingTier, PricingTiers, TierKind, PackageFilter, DEFAULT_CURRENCY};
pub use extras::{TravelExtra, SelectedExtra, ExtraCategory};
pub use availability::{AvailabilitySlot, AvailabilityCalendar, InventoryError};
pub use pricing::{PricingConfig, PricingEngine, PricingInput, PriceQuote, PriceLine, PricingError, format_amount};
pub use directory::{Business, BusinessFilter};
