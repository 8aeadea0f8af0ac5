//! Organization model

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use validator::Validate;

use crate::models::Employee;
use crate::scoring;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Organization {
    pub id: Uuid,
    pub name: String,
    pub domain: Option<String>,
    /// Manual override; the effective score is computed when this is
    /// absent or zero.
    pub risk_score: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateOrganization {
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    pub domain: Option<String>,
}

impl Organization {
    pub async fn create(pool: &PgPool, data: CreateOrganization) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Organization>(
            r#"
            INSERT INTO organizations (name, domain)
            VALUES ($1, $2)
            RETURNING *
            "#
        )
        .bind(&data.name)
        .bind(&data.domain)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Organization>("SELECT * FROM organizations WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Organization>("SELECT * FROM organizations ORDER BY created_at DESC")
            .fetch_all(pool)
            .await
    }

    /// Stored override when present and positive, otherwise the share of
    /// employees with a raised risk level.
    pub async fn effective_risk_score(&self, pool: &PgPool) -> Result<i64, sqlx::Error> {
        let counts = Employee::risk_counts(pool, self.id).await?;
        Ok(scoring::organization_risk_score(
            self.risk_score,
            counts.compromised,
            counts.total,
        ))
    }
}
