use mexivanza_core::Booking;

const HEADERS: [&str; 12] = [
    "booking_id",
    "package_id",
    "contact_name",
    "contact_email",
    "travelers",
    "traveler_names",
    "start_date",
    "end_date",
    "total",
    "currency",
    "status",
    "payment_status",
];

/// Renders bookings as CSV. Fields containing commas, quotes or newlines
/// are quoted.
pub fn export_bookings_csv(bookings: &[Booking]) -> Result<String, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(HEADERS)?;

    for booking in bookings {
        let names = booking
            .booking_data
            .travelers
            .iter()
            .map(|t| t.name.as_str())
            .collect::<Vec<_>>()
            .join("; ");

        writer.write_record([
            booking.id.to_string(),
            booking.package_id.to_string(),
            booking.contact.name.clone(),
            booking.contact.email.expose().clone(),
            booking.traveler_count.to_string(),
            names,
            booking.start_date.to_string(),
            booking.end_date.to_string(),
            decimal_amount(booking.total_cents),
            booking.currency.clone(),
            booking.status.to_string(),
            booking.payment_status.to_string(),
        ])?;
    }

    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// `-1050` -> `"-10.50"`
fn decimal_amount(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use mexivanza_core::{BookingData, BookingStatus, ContactInfo, PaymentStatus, Traveler};
    use uuid::Uuid;

    fn booking(contact_name: &str, travelers: Vec<Traveler>) -> Booking {
        let date = NaiveDate::from_ymd_opt(2026, 11, 14).unwrap();
        Booking {
            id: Uuid::new_v4(),
            package_id: Uuid::new_v4(),
            availability_id: Uuid::new_v4(),
            customer_id: "c".to_string(),
            contact: ContactInfo::new(contact_name, "ana@example.mx"),
            start_date: date,
            end_date: date,
            traveler_count: travelers.len() as i32,
            total_cents: 340_005,
            currency: "MXN".to_string(),
            status: BookingStatus::Confirmed,
            payment_status: PaymentStatus::Paid,
            payment_session_id: None,
            payment_url: None,
            idempotency_key: None,
            booking_data: BookingData { travelers, ..Default::default() },
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_comma_in_name_keeps_field_count() {
        let bookings = vec![
            booking("Pérez, Ana", vec![Traveler::new("Pérez, Ana", 31), Traveler::new("Luis \"Lucho\"", 33)]),
            booking("Diego", vec![Traveler::new("Diego", 40)]),
        ];
        let csv_text = export_bookings_csv(&bookings).unwrap();

        let mut reader = csv::Reader::from_reader(csv_text.as_bytes());
        assert_eq!(reader.headers().unwrap().len(), HEADERS.len());

        let records: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 2);
        for record in &records {
            assert_eq!(record.len(), HEADERS.len());
        }
        assert_eq!(&records[0][2], "Pérez, Ana");
        assert_eq!(&records[0][5], "Pérez, Ana; Luis \"Lucho\"");
        assert_eq!(&records[0][8], "3400.05");
        assert_eq!(&records[1][10], "confirmed");
    }

    #[test]
    fn test_amounts_keep_sign() {
        assert_eq!(decimal_amount(340_005), "3400.05");
        assert_eq!(decimal_amount(-50), "-0.50");
        assert_eq!(decimal_amount(-1_050), "-10.50");
        assert_eq!(decimal_amount(0), "0.00");
    }

    #[test]
    fn test_empty_export_has_header_only() {
        let csv_text = export_bookings_csv(&[]).unwrap();
        assert_eq!(csv_text.lines().count(), 1);
        assert!(csv_text.starts_with("booking_id,package_id"));
    }
}
