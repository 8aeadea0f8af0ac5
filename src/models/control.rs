//! Compliance control results
//!
//! Append-only: every audit run inserts new rows and history is kept
//! for trend reporting.

use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use chrono::{DateTime, Utc};

use crate::compliance::ControlOutcome;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ControlResult {
    pub id: i64,
    pub organization_id: Uuid,
    pub control_id: String,
    pub control_name: String,
    pub status: String,
    pub score: i32,
    pub evidence: Option<serde_json::Value>,
    pub scanned_at: DateTime<Utc>,
}

impl ControlResult {
    pub async fn append(
        pool: &PgPool,
        organization_id: Uuid,
        outcomes: &[ControlOutcome],
    ) -> Result<(), sqlx::Error> {
        for outcome in outcomes {
            sqlx::query(
                r#"
                INSERT INTO control_results (organization_id, control_id, control_name, status, score, evidence)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#
            )
            .bind(organization_id)
            .bind(outcome.control_id)
            .bind(outcome.control_name)
            .bind(outcome.status.as_str())
            .bind(outcome.score)
            .bind(&outcome.evidence)
            .execute(pool)
            .await?;
        }
        Ok(())
    }

    pub async fn list_by_org(pool: &PgPool, organization_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, ControlResult>(
            r#"
            SELECT * FROM control_results
            WHERE organization_id = $1
            ORDER BY scanned_at DESC, control_id
            "#
        )
        .bind(organization_id)
        .fetch_all(pool)
        .await
    }
}
