use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use mexivanza_core::repository::{BookingFilter, BookingRepository};
use mexivanza_core::{Booking, BookingData, BookingStatus, BoxError, ContactInfo, PaymentStatus};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

pub struct StoreBookingRepository {
    pool: PgPool,
}

impl StoreBookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    package_id: Uuid,
    availability_id: Uuid,
    customer_id: String,
    contact: Json<ContactInfo>,
    start_date: NaiveDate,
    end_date: NaiveDate,
    traveler_count: i32,
    total_cents: i64,
    currency: String,
    status: String,
    payment_status: String,
    payment_session_id: Option<String>,
    payment_url: Option<String>,
    idempotency_key: Option<String>,
    booking_data: Json<BookingData>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = BoxError;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        let status = BookingStatus::parse(&row.status)
            .ok_or_else(|| format!("Unknown booking status '{}' on {}", row.status, row.id))?;
        let payment_status = PaymentStatus::parse(&row.payment_status)
            .ok_or_else(|| format!("Unknown payment status '{}' on {}", row.payment_status, row.id))?;

        Ok(Booking {
            id: row.id,
            package_id: row.package_id,
            availability_id: row.availability_id,
            customer_id: row.customer_id,
            contact: row.contact.0,
            start_date: row.start_date,
            end_date: row.end_date,
            traveler_count: row.traveler_count,
            total_cents: row.total_cents,
            currency: row.currency,
            status,
            payment_status,
            payment_session_id: row.payment_session_id,
            payment_url: row.payment_url,
            idempotency_key: row.idempotency_key,
            booking_data: row.booking_data.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const BOOKING_COLUMNS: &str = "id, package_id, availability_id, customer_id, contact, start_date, end_date, \
     traveler_count, total_cents, currency, status, payment_status, payment_session_id, payment_url, \
     idempotency_key, booking_data, created_at, updated_at";

impl StoreBookingRepository {
    async fn fetch_one_where(&self, clause: &str, args: &[&str]) -> Result<Option<Booking>, BoxError> {
        let sql = format!("SELECT {} FROM travel_bookings WHERE {} LIMIT 1", BOOKING_COLUMNS, clause);
        let mut query = sqlx::query_as::<_, BookingRow>(&sql);
        for arg in args {
            query = query.bind(*arg);
        }
        match query.fetch_optional(&self.pool).await? {
            Some(row) => Ok(Some(Booking::try_from(row)?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl BookingRepository for StoreBookingRepository {
    async fn create_booking(&self, booking: &Booking) -> Result<Uuid, BoxError> {
        sqlx::query(
            r#"
            INSERT INTO travel_bookings (id, package_id, availability_id, customer_id, contact, start_date, end_date,
                                         traveler_count, total_cents, currency, status, payment_status,
                                         payment_session_id, payment_url, idempotency_key, booking_data,
                                         created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            "#,
        )
        .bind(booking.id)
        .bind(booking.package_id)
        .bind(booking.availability_id)
        .bind(&booking.customer_id)
        .bind(Json(&booking.contact))
        .bind(booking.start_date)
        .bind(booking.end_date)
        .bind(booking.traveler_count)
        .bind(booking.total_cents)
        .bind(&booking.currency)
        .bind(booking.status.as_str())
        .bind(booking.payment_status.as_str())
        .bind(booking.payment_session_id.as_deref())
        .bind(booking.payment_url.as_deref())
        .bind(booking.idempotency_key.as_deref())
        .bind(Json(&booking.booking_data))
        .bind(booking.created_at)
        .bind(booking.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(booking.id)
    }

    async fn get_booking(&self, id: Uuid) -> Result<Option<Booking>, BoxError> {
        let sql = format!("SELECT {} FROM travel_bookings WHERE id = $1", BOOKING_COLUMNS);
        let row = sqlx::query_as::<_, BookingRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Booking::try_from).transpose()
    }

    async fn find_by_idempotency_key(&self, customer_id: &str, key: &str) -> Result<Option<Booking>, BoxError> {
        self.fetch_one_where("customer_id = $1 AND idempotency_key = $2", &[customer_id, key]).await
    }

    async fn find_by_payment_session(&self, session_id: &str) -> Result<Option<Booking>, BoxError> {
        self.fetch_one_where("payment_session_id = $1", &[session_id]).await
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: BookingStatus,
        payment_status: PaymentStatus,
    ) -> Result<(), BoxError> {
        let result = sqlx::query(
            "UPDATE travel_bookings SET status = $2, payment_status = $3, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(status.as_str())
        .bind(payment_status.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(format!("Booking {} not found", id).into());
        }
        Ok(())
    }

    async fn set_payment_session(&self, id: Uuid, session_id: &str, url: &str) -> Result<(), BoxError> {
        sqlx::query(
            "UPDATE travel_bookings SET payment_session_id = $2, payment_url = $3, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(session_id)
        .bind(url)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn clear_idempotency_key(&self, id: Uuid) -> Result<(), BoxError> {
        sqlx::query("UPDATE travel_bookings SET idempotency_key = NULL, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_bookings(&self, filter: &BookingFilter) -> Result<Vec<Booking>, BoxError> {
        let sql = format!(
            r#"
            SELECT {} FROM travel_bookings
            WHERE ($1::text IS NULL OR customer_id = $1)
              AND ($2::uuid IS NULL OR package_id = $2)
              AND ($3::text IS NULL OR status = $3)
            ORDER BY created_at DESC
            "#,
            BOOKING_COLUMNS
        );
        let rows = sqlx::query_as::<_, BookingRow>(&sql)
            .bind(filter.customer_id.as_deref())
            .bind(filter.package_id)
            .bind(filter.status.map(|s| s.as_str()))
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Booking::try_from).collect()
    }
}
