//! Quick-attack click log
//!
//! Campaign-less sends have no target rows; their clicks land in this
//! lightweight append-only log instead of the state machine.

use serde::Serialize;
use sqlx::{FromRow, PgPool};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SimulationClick {
    pub id: i64,
    pub email: String,
    pub template_slug: String,
    pub user_agent: Option<String>,
    pub clicked_at: DateTime<Utc>,
}

impl SimulationClick {
    pub async fn insert(
        pool: &PgPool,
        email: &str,
        template_slug: &str,
        user_agent: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO simulation_clicks (email, template_slug, user_agent)
            VALUES ($1, $2, $3)
            "#
        )
        .bind(email)
        .bind(template_slug)
        .bind(user_agent)
        .execute(pool)
        .await?;
        Ok(())
    }
}
