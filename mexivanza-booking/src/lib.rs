pub mod error;
pub mod wizard;
pub mod manager;
pub mod orchestrator;
pub mod service;
pub mod stats;
pub mod export;

pub use error::BookingError;
pub use wizard::{BookingFormData, BookingWizard, WizardError, WizardStep};
pub use manager::{BookingEvent, BookingManager, Transition};
pub use orchestrator::{MockPaymentAdapter, PaymentOrchestrator};
pub use service::{BookingRules, BookingService, PaymentUpdate, QuoteRequest, SubmissionOutcome};
pub use stats::BookingStats;
pub use export::export_bookings_csv;
