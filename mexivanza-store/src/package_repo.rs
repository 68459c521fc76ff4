use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mexivanza_catalog::{ExtraCategory, PackageFilter, PricingTiers, TravelExtra, TravelPackage};
use mexivanza_core::repository::PackageRepository;
use mexivanza_core::BoxError;
use mexivanza_shared::Localized;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

pub struct StorePackageRepository {
    pool: PgPool,
}

impl StorePackageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct PackageRow {
    id: Uuid,
    title: Json<Localized>,
    description: Json<Localized>,
    region: String,
    city: String,
    duration_days: i32,
    pricing_tiers: Json<PricingTiers>,
    gallery: Json<Vec<String>>,
    is_published: bool,
    is_featured: bool,
    is_demo: bool,
    created_at: DateTime<Utc>,
}

impl From<PackageRow> for TravelPackage {
    fn from(row: PackageRow) -> Self {
        TravelPackage {
            id: row.id,
            title: row.title.0,
            description: row.description.0,
            region: row.region,
            city: row.city,
            duration_days: row.duration_days,
            pricing_tiers: row.pricing_tiers.0,
            gallery: row.gallery.0,
            is_published: row.is_published,
            is_featured: row.is_featured,
            is_demo: row.is_demo,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ExtraRow {
    id: Uuid,
    package_id: Option<Uuid>,
    name: Json<Localized>,
    description: Json<Localized>,
    price_cents: i64,
    per_person: bool,
    category: String,
}

impl From<ExtraRow> for TravelExtra {
    fn from(row: ExtraRow) -> Self {
        TravelExtra {
            id: row.id,
            package_id: row.package_id,
            name: row.name.0,
            description: row.description.0,
            price_cents: row.price_cents,
            per_person: row.per_person,
            category: ExtraCategory::parse(&row.category),
        }
    }
}

const PACKAGE_COLUMNS: &str = "id, title, description, region, city, duration_days, pricing_tiers, gallery, \
     is_published, is_featured, is_demo, created_at";

#[async_trait]
impl PackageRepository for StorePackageRepository {
    async fn create_package(&self, package: &TravelPackage) -> Result<Uuid, BoxError> {
        sqlx::query(
            r#"
            INSERT INTO travel_packages (id, title, description, region, city, duration_days, pricing_tiers, gallery,
                                         is_published, is_featured, is_demo, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(package.id)
        .bind(Json(&package.title))
        .bind(Json(&package.description))
        .bind(&package.region)
        .bind(&package.city)
        .bind(package.duration_days)
        .bind(Json(&package.pricing_tiers))
        .bind(Json(&package.gallery))
        .bind(package.is_published)
        .bind(package.is_featured)
        .bind(package.is_demo)
        .bind(package.created_at)
        .execute(&self.pool)
        .await?;

        Ok(package.id)
    }

    async fn get_package(&self, id: Uuid) -> Result<Option<TravelPackage>, BoxError> {
        let sql = format!("SELECT {} FROM travel_packages WHERE id = $1", PACKAGE_COLUMNS);
        let row = sqlx::query_as::<_, PackageRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(TravelPackage::from))
    }

    async fn list_packages(&self, filter: &PackageFilter) -> Result<Vec<TravelPackage>, BoxError> {
        let sql = format!(
            r#"
            SELECT {} FROM travel_packages
            WHERE ($1 OR is_published)
              AND ($2::text IS NULL OR LOWER(region) = LOWER($2))
              AND ($3::text IS NULL OR LOWER(city) = LOWER($3))
              AND ($4::bool IS NULL OR is_featured = $4)
            ORDER BY is_featured DESC, created_at DESC
            "#,
            PACKAGE_COLUMNS
        );
        let rows = sqlx::query_as::<_, PackageRow>(&sql)
            .bind(filter.include_unpublished)
            .bind(filter.region.as_deref())
            .bind(filter.city.as_deref())
            .bind(filter.featured)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(TravelPackage::from).collect())
    }

    async fn update_package(&self, package: &TravelPackage) -> Result<bool, BoxError> {
        let result = sqlx::query(
            r#"
            UPDATE travel_packages
            SET title = $2, description = $3, region = $4, city = $5, duration_days = $6,
                pricing_tiers = $7, gallery = $8, is_published = $9, is_featured = $10, is_demo = $11
            WHERE id = $1
            "#,
        )
        .bind(package.id)
        .bind(Json(&package.title))
        .bind(Json(&package.description))
        .bind(&package.region)
        .bind(&package.city)
        .bind(package.duration_days)
        .bind(Json(&package.pricing_tiers))
        .bind(Json(&package.gallery))
        .bind(package.is_published)
        .bind(package.is_featured)
        .bind(package.is_demo)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_package(&self, id: Uuid) -> Result<bool, BoxError> {
        let result = sqlx::query("DELETE FROM travel_packages WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_extras(&self, package_id: Uuid) -> Result<Vec<TravelExtra>, BoxError> {
        let rows = sqlx::query_as::<_, ExtraRow>(
            r#"
            SELECT id, package_id, name, description, price_cents, per_person, category
            FROM travel_extras
            WHERE package_id IS NULL OR package_id = $1
            ORDER BY category, price_cents
            "#,
        )
        .bind(package_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(TravelExtra::from).collect())
    }

    async fn create_extra(&self, extra: &TravelExtra) -> Result<Uuid, BoxError> {
        sqlx::query(
            r#"
            INSERT INTO travel_extras (id, package_id, name, description, price_cents, per_person, category)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(extra.id)
        .bind(extra.package_id)
        .bind(Json(&extra.name))
        .bind(Json(&extra.description))
        .bind(extra.price_cents)
        .bind(extra.per_person)
        .bind(extra.category.as_str())
        .execute(&self.pool)
        .await?;
        Ok(extra.id)
    }

    async fn delete_extra(&self, id: Uuid) -> Result<bool, BoxError> {
        let result = sqlx::query("DELETE FROM travel_extras WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
