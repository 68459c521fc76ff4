use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Capacity for one package on one calendar date.
///
/// Invariant: `0 <= booked_count <= capacity`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AvailabilitySlot {
    pub id: Uuid,
    pub package_id: Uuid,
    pub date: NaiveDate,
    pub capacity: i32,
    pub booked_count: i32,
    pub price_multiplier: f64,
}

impl AvailabilitySlot {
    pub fn new(package_id: Uuid, date: NaiveDate, capacity: i32, price_multiplier: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            package_id,
            date,
            capacity,
            booked_count: 0,
            price_multiplier,
        }
    }

    pub fn remaining(&self) -> i32 {
        (self.capacity - self.booked_count).max(0)
    }

    pub fn is_full(&self) -> bool {
        self.booked_count >= self.capacity
    }

    pub fn can_accommodate(&self, travelers: i32) -> bool {
        travelers > 0 && self.booked_count + travelers <= self.capacity
    }

    /// Take `travelers` seats out of the slot.
    pub fn reserve(&mut self, travelers: i32) -> Result<(), InventoryError> {
        if travelers <= 0 {
            return Err(InventoryError::InvalidQuantity(travelers));
        }
        if !self.can_accommodate(travelers) {
            return Err(InventoryError::InsufficientCapacity {
                requested: travelers,
                available: self.remaining(),
            });
        }
        self.booked_count += travelers;
        Ok(())
    }

    /// Return seats to the slot (payment failed, booking cancelled).
    pub fn release(&mut self, travelers: i32) {
        self.booked_count = (self.booked_count - travelers.max(0)).max(0);
    }

    pub fn utilization(&self) -> f64 {
        if self.capacity == 0 {
            0.0
        } else {
            self.booked_count as f64 / self.capacity as f64
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum InventoryError {
    #[error("Availability slot not found: {0}")]
    NotFound(String),

    #[error("Insufficient capacity: requested {requested}, available {available}")]
    InsufficientCapacity {
        requested: i32,
        available: i32,
    },

    #[error("Invalid traveler quantity: {0}")]
    InvalidQuantity(i32),
}

/// Generates the availability calendar for a package.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityCalendar {
    pub capacity: i32,
    pub weekday_multiplier: f64,
    pub weekend_multiplier: f64,
}

impl Default for AvailabilityCalendar {
    fn default() -> Self {
        Self {
            capacity: 20,
            weekday_multiplier: 1.0,
            weekend_multiplier: 1.2,
        }
    }
}

impl AvailabilityCalendar {
    /// One slot per day for `days` days starting at `from`. Saturdays and
    /// Sundays carry the weekend multiplier.
    pub fn generate(&self, package_id: Uuid, from: NaiveDate, days: u32) -> Vec<AvailabilitySlot> {
        (0..days as i64)
            .map(|offset| {
                let date = from + Duration::days(offset);
                let multiplier = match date.weekday() {
                    Weekday::Sat | Weekday::Sun => self.weekend_multiplier,
                    _ => self.weekday_multiplier,
                };
                AvailabilitySlot::new(package_id, date, self.capacity, multiplier)
            })
            .collect()
    }
}
