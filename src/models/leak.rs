//! Employee credential leak records

use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use chrono::{DateTime, NaiveDate, Utc};

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct EmployeeLeak {
    pub id: Uuid,
    pub employee_id: Uuid,
    pub source: String,
    pub data_classes: Option<serde_json::Value>,
    pub leaked_at: Option<NaiveDate>,
    pub detected_at: DateTime<Utc>,
}

impl EmployeeLeak {
    pub async fn insert(
        pool: &PgPool,
        employee_id: Uuid,
        source: &str,
        data_classes: serde_json::Value,
        leaked_at: Option<NaiveDate>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO employee_leaks (employee_id, source, data_classes, leaked_at)
            VALUES ($1, $2, $3, $4)
            "#
        )
        .bind(employee_id)
        .bind(source)
        .bind(&data_classes)
        .bind(leaked_at)
        .execute(pool)
        .await?;
        Ok(())
    }
}
