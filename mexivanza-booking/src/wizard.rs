use chrono::NaiveDate;
use mexivanza_catalog::{
    AvailabilitySlot, PriceQuote, PricingEngine, PricingError, PricingInput, SelectedExtra, TierKind,
    TravelExtra, TravelPackage,
};
use mexivanza_core::{BookingData, BookingPayload, ContactInfo, Traveler};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Steps of the booking flow, in order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum WizardStep {
    Date,
    Travelers,
    Extras,
    Payment,
}

impl WizardStep {
    pub fn number(self) -> u8 {
        match self {
            Self::Date => 1,
            Self::Travelers => 2,
            Self::Extras => 3,
            Self::Payment => 4,
        }
    }

    pub fn next(self) -> Option<Self> {
        match self {
            Self::Date => Some(Self::Travelers),
            Self::Travelers => Some(Self::Extras),
            Self::Extras => Some(Self::Payment),
            Self::Payment => None,
        }
    }

    pub fn previous(self) -> Option<Self> {
        match self {
            Self::Date => None,
            Self::Travelers => Some(Self::Date),
            Self::Extras => Some(Self::Travelers),
            Self::Payment => Some(Self::Extras),
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum WizardError {
    #[error("Select a travel date")]
    DateRequired,

    #[error("No availability on {0}")]
    NoSlotForDate(NaiveDate),

    #[error("{date} is sold out or cannot fit {requested} travelers ({remaining} left)")]
    SlotFull {
        date: NaiveDate,
        requested: i32,
        remaining: i32,
    },

    #[error("Traveler {0} needs a name and an age above zero")]
    IncompleteTraveler(usize),

    #[error("At least one traveler is required")]
    NoTravelers,

    #[error("No traveler at position {0}")]
    TravelerIndex(usize),

    #[error("Contact name and email are required")]
    ContactRequired,

    #[error("Unknown extra: {0}")]
    UnknownExtra(Uuid),

    #[error("Booking can only be submitted from the payment step")]
    NotAtPaymentStep,

    #[error("Booking already submitted")]
    AlreadySubmitted,

    #[error(transparent)]
    Pricing(#[from] PricingError),
}

/// Form state accumulated across the steps.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookingFormData {
    pub selected_date: Option<NaiveDate>,
    pub availability_id: Option<Uuid>,
    pub travelers: Vec<Traveler>,
    pub selected_extras: Vec<SelectedExtra>,
    pub special_requests: Option<String>,
    pub contact: ContactInfo,
    pub total_cents: i64,
}

/// Linear four-step booking flow for one package.
///
/// The running total is recomputed after every mutation and drops to zero
/// whenever no date is selected.
pub struct BookingWizard {
    package: TravelPackage,
    slots: Vec<AvailabilitySlot>,
    extras: Vec<TravelExtra>,
    engine: PricingEngine,
    step: WizardStep,
    form: BookingFormData,
    quote: Option<PriceQuote>,
    submitted: bool,
}

impl BookingWizard {
    /// Starts at the date step with one blank traveler. Extras scoped to
    /// other packages are dropped.
    pub fn new(package: TravelPackage, slots: Vec<AvailabilitySlot>, extras: Vec<TravelExtra>) -> Self {
        let package_id = package.id;
        let slots = slots.into_iter().filter(|s| s.package_id == package_id).collect();
        let extras = extras.into_iter().filter(|e| e.applies_to(package_id)).collect();

        Self {
            package,
            slots,
            extras,
            engine: PricingEngine::default(),
            step: WizardStep::Date,
            form: BookingFormData {
                travelers: vec![Traveler::default()],
                ..Default::default()
            },
            quote: None,
            submitted: false,
        }
    }

    pub fn with_engine(mut self, engine: PricingEngine) -> Self {
        self.engine = engine;
        self.recalculate();
        self
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn form(&self) -> &BookingFormData {
        &self.form
    }

    pub fn quote(&self) -> Option<&PriceQuote> {
        self.quote.as_ref()
    }

    pub fn total_cents(&self) -> i64 {
        self.form.total_cents
    }

    pub fn package(&self) -> &TravelPackage {
        &self.package
    }

    pub fn extras(&self) -> &[TravelExtra] {
        &self.extras
    }

    /// Dates a party of the current size could still book.
    pub fn bookable_dates(&self) -> Vec<NaiveDate> {
        let party = self.form.travelers.len() as i32;
        self.slots
            .iter()
            .filter(|s| s.can_accommodate(party.max(1)))
            .map(|s| s.date)
            .collect()
    }

    // ----- step 1: date -----

    /// Selects the slot on `date`. A sold-out date is rejected and the
    /// previous selection is kept.
    pub fn select_date(&mut self, date: NaiveDate) -> Result<(), WizardError> {
        let party = self.form.travelers.len().max(1) as i32;
        let slot = self
            .slots
            .iter()
            .find(|s| s.date == date)
            .ok_or(WizardError::NoSlotForDate(date))?;

        if slot.is_full() || !slot.can_accommodate(party) {
            return Err(WizardError::SlotFull {
                date,
                requested: party,
                remaining: slot.remaining(),
            });
        }

        self.form.selected_date = Some(slot.date);
        self.form.availability_id = Some(slot.id);
        self.recalculate();
        Ok(())
    }

    pub fn clear_date(&mut self) {
        self.form.selected_date = None;
        self.form.availability_id = None;
        self.recalculate();
    }

    // ----- step 2: travelers -----

    pub fn add_traveler(&mut self, traveler: Traveler) {
        self.form.travelers.push(traveler);
        self.recalculate();
    }

    pub fn update_traveler(&mut self, index: usize, traveler: Traveler) -> Result<(), WizardError> {
        let entry = self
            .form
            .travelers
            .get_mut(index)
            .ok_or(WizardError::TravelerIndex(index))?;
        *entry = traveler;
        Ok(())
    }

    /// The last remaining traveler cannot be removed.
    pub fn remove_traveler(&mut self, index: usize) -> Result<Traveler, WizardError> {
        if index >= self.form.travelers.len() {
            return Err(WizardError::TravelerIndex(index));
        }
        if self.form.travelers.len() == 1 {
            return Err(WizardError::NoTravelers);
        }
        let removed = self.form.travelers.remove(index);
        self.recalculate();
        Ok(removed)
    }

    pub fn set_contact(&mut self, contact: ContactInfo) {
        self.form.contact = contact;
    }

    pub fn set_special_requests(&mut self, requests: Option<String>) {
        self.form.special_requests = requests.filter(|r| !r.trim().is_empty());
    }

    // ----- step 3: extras -----

    /// Sets the quantity for an extra. Zero removes it from the selection.
    pub fn set_extra_quantity(&mut self, extra_id: Uuid, quantity: u32) -> Result<(), WizardError> {
        if !self.extras.iter().any(|e| e.id == extra_id) {
            return Err(WizardError::UnknownExtra(extra_id));
        }

        let existing = self.form.selected_extras.iter().position(|s| s.extra_id == extra_id);
        match (existing, quantity) {
            (Some(i), 0) => {
                self.form.selected_extras.remove(i);
            }
            (Some(i), q) => self.form.selected_extras[i].quantity = q,
            (None, 0) => {}
            (None, q) => self.form.selected_extras.push(SelectedExtra { extra_id, quantity: q }),
        }

        self.recalculate();
        Ok(())
    }

    pub fn increment_extra(&mut self, extra_id: Uuid) -> Result<(), WizardError> {
        let current = self.extra_quantity(extra_id);
        self.set_extra_quantity(extra_id, current.saturating_add(1))
    }

    pub fn decrement_extra(&mut self, extra_id: Uuid) -> Result<(), WizardError> {
        let current = self.extra_quantity(extra_id);
        self.set_extra_quantity(extra_id, current.saturating_sub(1))
    }

    pub fn extra_quantity(&self, extra_id: Uuid) -> u32 {
        self.form
            .selected_extras
            .iter()
            .find(|s| s.extra_id == extra_id)
            .map_or(0, |s| s.quantity)
    }

    // ----- navigation -----

    pub fn validate_step(&self, step: WizardStep) -> Result<(), WizardError> {
        match step {
            WizardStep::Date => {
                if self.form.selected_date.is_none() {
                    return Err(WizardError::DateRequired);
                }
                Ok(())
            }
            WizardStep::Travelers => {
                if self.form.travelers.is_empty() {
                    return Err(WizardError::NoTravelers);
                }
                if let Some(i) = self.form.travelers.iter().position(|t| !t.is_complete()) {
                    return Err(WizardError::IncompleteTraveler(i));
                }
                if !self.form.contact.is_complete() {
                    return Err(WizardError::ContactRequired);
                }
                Ok(())
            }
            WizardStep::Extras | WizardStep::Payment => Ok(()),
        }
    }

    pub fn is_step_valid(&self, step: WizardStep) -> bool {
        self.validate_step(step).is_ok()
    }

    /// Moves forward if the current step validates. Staying on the last step is not an error.
    pub fn next(&mut self) -> Result<WizardStep, WizardError> {
        self.validate_step(self.step)?;
        if let Some(next) = self.step.next() {
            self.step = next;
        }
        Ok(self.step)
    }

    pub fn back(&mut self) -> WizardStep {
        if let Some(previous) = self.step.previous() {
            self.step = previous;
        }
        self.step
    }

    // ----- step 4: submission -----

    /// Builds the payload for the payment function and locks the wizard
    /// against a second submission.
    pub fn submit(&mut self, idempotency_key: impl Into<String>) -> Result<BookingPayload, WizardError> {
        if self.step != WizardStep::Payment {
            return Err(WizardError::NotAtPaymentStep);
        }
        if self.submitted {
            return Err(WizardError::AlreadySubmitted);
        }
        self.validate_step(WizardStep::Date)?;
        self.validate_step(WizardStep::Travelers)?;

        let date = self.form.selected_date.ok_or(WizardError::DateRequired)?;
        let party = self.form.travelers.len() as i32;
        let slot = self
            .slots
            .iter()
            .find(|s| s.date == date)
            .ok_or(WizardError::NoSlotForDate(date))?;
        if !slot.can_accommodate(party) {
            return Err(WizardError::SlotFull {
                date,
                requested: party,
                remaining: slot.remaining(),
            });
        }
        let availability_id = slot.id;

        let quote = self.compute_quote(date)?;

        self.submitted = true;
        Ok(BookingPayload {
            package_id: self.package.id,
            availability_id,
            start_date: date,
            end_date: self.package.end_date(date),
            traveler_count: party as u32,
            total_cents: quote.total_cents,
            currency: quote.currency,
            contact: self.form.contact.clone(),
            booking_data: BookingData {
                travelers: self.form.travelers.clone(),
                extras: self.form.selected_extras.clone(),
                special_requests: self.form.special_requests.clone(),
            },
            idempotency_key: idempotency_key.into(),
        })
    }

    /// Unlocks submission after the payment call failed.
    pub fn reset_submission(&mut self) {
        self.submitted = false;
    }

    pub fn is_submitted(&self) -> bool {
        self.submitted
    }

    fn compute_quote(&self, date: NaiveDate) -> Result<PriceQuote, PricingError> {
        self.engine.quote(&PricingInput {
            package: &self.package,
            tier: TierKind::Standard,
            traveler_count: self.form.travelers.len() as u32,
            selected_date: date,
            slots: &self.slots,
            extras: &self.extras,
            selected_extras: &self.form.selected_extras,
        })
    }

    fn recalculate(&mut self) {
        self.quote = match self.form.selected_date {
            Some(date) => match self.compute_quote(date) {
                Ok(quote) => Some(quote),
                Err(e) => {
                    tracing::warn!("Failed to price package {}: {}", self.package.id, e);
                    None
                }
            },
            None => None,
        };
        self.form.total_cents = self.quote.as_ref().map_or(0, |q| q.total_cents);
    }
}
