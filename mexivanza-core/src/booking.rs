use chrono::{DateTime, NaiveDate, Utc};
use mexivanza_catalog::SelectedExtra;
use mexivanza_shared::Masked;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
            Self::Completed => "completed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "confirmed" => Some(Self::Confirmed),
            "cancelled" => Some(Self::Cancelled),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Failed => "failed",
            Self::Refunded => "refunded",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "paid" => Some(Self::Paid),
            "failed" => Some(Self::Failed),
            "refunded" => Some(Self::Refunded),
            _ => None,
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Traveler {
    pub name: String,
    pub age: u32,
}

impl Traveler {
    pub fn new(name: &str, age: u32) -> Self {
        Self { name: name.to_string(), age }
    }

    pub fn is_complete(&self) -> bool {
        !self.name.trim().is_empty() && self.age > 0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ContactInfo {
    pub name: String,
    pub email: Masked<String>,
    #[serde(default)]
    pub phone: Option<Masked<String>>,
}

impl ContactInfo {
    pub fn new(name: &str, email: &str) -> Self {
        Self {
            name: name.to_string(),
            email: Masked::new(email.to_string()),
            phone: None,
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.name.trim().is_empty() && !self.email.expose().trim().is_empty()
    }
}

/// Free-form booking details kept alongside the row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct BookingData {
    pub travelers: Vec<Traveler>,
    #[serde(default)]
    pub extras: Vec<SelectedExtra>,
    #[serde(default)]
    pub special_requests: Option<String>,
}

/// What the booking wizard submits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookingPayload {
    pub package_id: Uuid,
    pub availability_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub traveler_count: u32,
    pub total_cents: i64,
    pub currency: String,
    pub contact: ContactInfo,
    pub booking_data: BookingData,
    pub idempotency_key: String,
}

/// Persisted booking row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub package_id: Uuid,
    pub availability_id: Uuid,
    pub customer_id: String,
    pub contact: ContactInfo,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub traveler_count: i32,
    pub total_cents: i64,
    pub currency: String,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub payment_session_id: Option<String>,
    pub payment_url: Option<String>,
    pub idempotency_key: Option<String>,
    pub booking_data: BookingData,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    /// New pending booking from a submitted payload and a server-side total.
    pub fn from_payload(customer_id: &str, payload: &BookingPayload, total_cents: i64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            package_id: payload.package_id,
            availability_id: payload.availability_id,
            customer_id: customer_id.to_string(),
            contact: payload.contact.clone(),
            start_date: payload.start_date,
            end_date: payload.end_date,
            traveler_count: payload.traveler_count as i32,
            total_cents,
            currency: payload.currency.clone(),
            status: BookingStatus::Pending,
            payment_status: PaymentStatus::Pending,
            payment_session_id: None,
            payment_url: None,
            idempotency_key: Some(payload.idempotency_key.clone()),
            booking_data: payload.booking_data.clone(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn holds_capacity(&self) -> bool {
        matches!(self.status, BookingStatus::Pending | BookingStatus::Confirmed | BookingStatus::Completed)
    }
}
