//! Billing plan repository.

use rust_decimal::Decimal;
use sqlx::PgPool;

use ez_apps_core::{CurrencyCode, PlanId, Price};

use super::RepositoryError;
use crate::models::Plan;

#[derive(Debug, sqlx::FromRow)]
struct PlanRow {
    id: i32,
    slug: String,
    name: String,
    price_monthly: Decimal,
    currency: String,
    max_stores: i32,
    is_active: bool,
}

impl TryFrom<PlanRow> for Plan {
    type Error = RepositoryError;

    fn try_from(row: PlanRow) -> Result<Self, Self::Error> {
        let currency = CurrencyCode::parse(&row.currency)
            .map_err(|e| RepositoryError::DataCorruption(format!("plan {}: {e}", row.slug)))?;
        let price = Price::new(row.price_monthly, currency)
            .map_err(|e| RepositoryError::DataCorruption(format!("plan {}: {e}", row.slug)))?;

        Ok(Self {
            id: PlanId::new(row.id),
            slug: row.slug,
            name: row.name,
            price,
            max_stores: row.max_stores,
            is_active: row.is_active,
        })
    }
}

const PLAN_COLUMNS: &str = "id, slug, name, price_monthly, currency, max_stores, is_active";

/// Fields accepted when creating or editing a plan.
#[derive(Debug, Clone)]
pub struct PlanInput {
    pub slug: String,
    pub name: String,
    pub price: Price,
    pub max_stores: i32,
    pub is_active: bool,
}

/// Repository for billing plans.
pub struct PlanRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> PlanRepository<'a> {
    /// Create a new plan repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List plans available for purchase, cheapest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_active(&self) -> Result<Vec<Plan>, RepositoryError> {
        let rows = sqlx::query_as::<_, PlanRow>(&format!(
            "SELECT {PLAN_COLUMNS} FROM plans WHERE is_active ORDER BY price_monthly, id"
        ))
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Get a plan by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: PlanId) -> Result<Option<Plan>, RepositoryError> {
        let row = sqlx::query_as::<_, PlanRow>(&format!(
            "SELECT {PLAN_COLUMNS} FROM plans WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Get a plan by slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Plan>, RepositoryError> {
        let row = sqlx::query_as::<_, PlanRow>(&format!(
            "SELECT {PLAN_COLUMNS} FROM plans WHERE slug = $1"
        ))
        .bind(slug)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Create or update a plan by slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert(&self, input: &PlanInput) -> Result<Plan, RepositoryError> {
        let row = sqlx::query_as::<_, PlanRow>(&format!(
            r"
            INSERT INTO plans (slug, name, price_monthly, currency, max_stores, is_active)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (slug) DO UPDATE SET
                name = EXCLUDED.name,
                price_monthly = EXCLUDED.price_monthly,
                currency = EXCLUDED.currency,
                max_stores = EXCLUDED.max_stores,
                is_active = EXCLUDED.is_active
            RETURNING {PLAN_COLUMNS}
            "
        ))
        .bind(&input.slug)
        .bind(&input.name)
        .bind(input.price.amount)
        .bind(input.price.currency_code.as_str())
        .bind(input.max_stores)
        .bind(input.is_active)
        .fetch_one(self.pool)
        .await?;

        row.try_into()
    }
}
