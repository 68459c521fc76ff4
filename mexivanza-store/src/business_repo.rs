use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mexivanza_catalog::{Business, BusinessFilter};
use mexivanza_core::repository::BusinessRepository;
use mexivanza_core::BoxError;
use mexivanza_shared::Localized;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

pub struct StoreBusinessRepository {
    pool: PgPool,
}

impl StoreBusinessRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct BusinessRow {
    id: Uuid,
    owner_id: String,
    name: String,
    description: Json<Localized>,
    category: String,
    city: String,
    region: String,
    phone: Option<String>,
    website: Option<String>,
    is_verified: bool,
    created_at: DateTime<Utc>,
}

impl From<BusinessRow> for Business {
    fn from(row: BusinessRow) -> Self {
        Business {
            id: row.id,
            owner_id: row.owner_id,
            name: row.name,
            description: row.description.0,
            category: row.category,
            city: row.city,
            region: row.region,
            phone: row.phone,
            website: row.website,
            is_verified: row.is_verified,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl BusinessRepository for StoreBusinessRepository {
    async fn create_business(&self, business: &Business) -> Result<Uuid, BoxError> {
        sqlx::query(
            r#"
            INSERT INTO businesses (id, owner_id, name, description, category, city, region, phone, website,
                                    is_verified, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(business.id)
        .bind(&business.owner_id)
        .bind(&business.name)
        .bind(Json(&business.description))
        .bind(&business.category)
        .bind(&business.city)
        .bind(&business.region)
        .bind(business.phone.as_deref())
        .bind(business.website.as_deref())
        .bind(business.is_verified)
        .bind(business.created_at)
        .execute(&self.pool)
        .await?;
        Ok(business.id)
    }

    async fn get_business(&self, id: Uuid) -> Result<Option<Business>, BoxError> {
        let row = sqlx::query_as::<_, BusinessRow>(
            r#"
            SELECT id, owner_id, name, description, category, city, region, phone, website, is_verified, created_at
            FROM businesses WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Business::from))
    }

    async fn list_businesses(&self, filter: &BusinessFilter) -> Result<Vec<Business>, BoxError> {
        // Category and city narrow in SQL; free-text search runs over both languages in memory
        let rows = sqlx::query_as::<_, BusinessRow>(
            r#"
            SELECT id, owner_id, name, description, category, city, region, phone, website, is_verified, created_at
            FROM businesses
            WHERE ($1::text IS NULL OR LOWER(category) = LOWER($1))
              AND ($2::text IS NULL OR LOWER(city) = LOWER($2))
            "#,
        )
        .bind(filter.category.as_deref())
        .bind(filter.city.as_deref())
        .fetch_all(&self.pool)
        .await?;

        Ok(filter.apply(rows.into_iter().map(Business::from).collect()))
    }

    async fn set_verified(&self, id: Uuid, verified: bool) -> Result<bool, BoxError> {
        let result = sqlx::query("UPDATE businesses SET is_verified = $2 WHERE id = $1")
            .bind(id)
            .bind(verified)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
