use async_trait::async_trait;
use chrono::NaiveDate;
use mexivanza_catalog::AvailabilitySlot;
use mexivanza_core::repository::AvailabilityRepository;
use mexivanza_core::BoxError;
use sqlx::PgPool;
use uuid::Uuid;

pub struct StoreAvailabilityRepository {
    pool: PgPool,
}

impl StoreAvailabilityRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct SlotRow {
    id: Uuid,
    package_id: Uuid,
    date: NaiveDate,
    capacity: i32,
    booked_count: i32,
    price_multiplier: f64,
}

impl From<SlotRow> for AvailabilitySlot {
    fn from(row: SlotRow) -> Self {
        AvailabilitySlot {
            id: row.id,
            package_id: row.package_id,
            date: row.date,
            capacity: row.capacity,
            booked_count: row.booked_count,
            price_multiplier: row.price_multiplier,
        }
    }
}

#[async_trait]
impl AvailabilityRepository for StoreAvailabilityRepository {
    async fn list_slots(
        &self,
        package_id: Uuid,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<AvailabilitySlot>, BoxError> {
        let rows = sqlx::query_as::<_, SlotRow>(
            r#"
            SELECT id, package_id, date, capacity, booked_count, price_multiplier
            FROM availability_slots
            WHERE package_id = $1
              AND ($2::date IS NULL OR date >= $2)
              AND ($3::date IS NULL OR date <= $3)
            ORDER BY date
            "#,
        )
        .bind(package_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(AvailabilitySlot::from).collect())
    }

    async fn get_slot(&self, id: Uuid) -> Result<Option<AvailabilitySlot>, BoxError> {
        let row = sqlx::query_as::<_, SlotRow>(
            "SELECT id, package_id, date, capacity, booked_count, price_multiplier FROM availability_slots WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(AvailabilitySlot::from))
    }

    async fn upsert_slots(&self, slots: &[AvailabilitySlot]) -> Result<usize, BoxError> {
        let mut tx = self.pool.begin().await?;
        for slot in slots {
            sqlx::query(
                r#"
                INSERT INTO availability_slots (id, package_id, date, capacity, booked_count, price_multiplier)
                VALUES ($1, $2, $3, $4, $5, $6)
                ON CONFLICT (package_id, date)
                DO UPDATE SET capacity = GREATEST(EXCLUDED.capacity, availability_slots.booked_count),
                              price_multiplier = EXCLUDED.price_multiplier
                "#,
            )
            .bind(slot.id)
            .bind(slot.package_id)
            .bind(slot.date)
            .bind(slot.capacity)
            .bind(slot.booked_count)
            .bind(slot.price_multiplier)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(slots.len())
    }

    async fn reserve_capacity(&self, slot_id: Uuid, travelers: i32) -> Result<Option<AvailabilitySlot>, BoxError> {
        // Single conditional update, so concurrent reservations cannot overbook
        let row = sqlx::query_as::<_, SlotRow>(
            r#"
            UPDATE availability_slots
            SET booked_count = booked_count + $2
            WHERE id = $1 AND $2 > 0 AND booked_count + $2 <= capacity
            RETURNING id, package_id, date, capacity, booked_count, price_multiplier
            "#,
        )
        .bind(slot_id)
        .bind(travelers)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(AvailabilitySlot::from))
    }

    async fn release_capacity(&self, slot_id: Uuid, travelers: i32) -> Result<Option<AvailabilitySlot>, BoxError> {
        let row = sqlx::query_as::<_, SlotRow>(
            r#"
            UPDATE availability_slots
            SET booked_count = GREATEST(booked_count - $2, 0)
            WHERE id = $1
            RETURNING id, package_id, date, capacity, booked_count, price_multiplier
            "#,
        )
        .bind(slot_id)
        .bind(travelers)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(AvailabilitySlot::from))
    }
}
