use uuid::Uuid;

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct SlotUpdatedEvent {
    pub package_id: Uuid,
    pub availability_id: Uuid,
    pub date: chrono::NaiveDate,
    pub booked_count: i32,
    pub capacity: i32,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct BookingCreatedEvent {
    pub booking_id: Uuid,
    pub package_id: Uuid,
    pub customer_id: String,
    pub traveler_count: i32,
    pub total_cents: i64,
    pub currency: String,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct PaymentStatusChangedEvent {
    pub booking_id: Uuid,
    pub payment_status: String,
    pub booking_status: String,
    pub timestamp: i64,
}
