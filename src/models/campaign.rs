//! Campaign model

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;
use chrono::{DateTime, Utc};

/// Campaign lifecycle. Forward-only: a campaign is `completed` once every
/// send has been attempted, regardless of individual outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CampaignStatus {
    Sending,
    Completed,
}

impl CampaignStatus {
    pub fn from_str(s: &str) -> Self {
        match s {
            "completed" => CampaignStatus::Completed,
            _ => CampaignStatus::Sending,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CampaignStatus::Sending => "sending",
            CampaignStatus::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Campaign {
    pub id: Uuid,
    pub name: String,
    pub template_slug: String,
    /// None marks a cross-tenant campaign
    pub organization_id: Option<Uuid>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl Campaign {
    /// Insert the campaign row inside the dispatch transaction so campaign
    /// and targets commit atomically.
    pub async fn create(
        tx: &mut Transaction<'_, Postgres>,
        name: &str,
        template_slug: &str,
        organization_id: Option<Uuid>,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Campaign>(
            r#"
            INSERT INTO campaigns (name, template_slug, organization_id, status)
            VALUES ($1, $2, $3, 'sending')
            RETURNING *
            "#
        )
        .bind(name)
        .bind(template_slug)
        .bind(organization_id)
        .fetch_one(&mut **tx)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Campaign>("SELECT * FROM campaigns WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Campaign>("SELECT * FROM campaigns ORDER BY created_at DESC")
            .fetch_all(pool)
            .await
    }

    /// Forward-only close, applied after every send attempt finished.
    pub async fn mark_completed(pool: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE campaigns SET status = 'completed' WHERE id = $1 AND status = 'sending'")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_and_defaults_to_sending() {
        assert_eq!(CampaignStatus::from_str("completed"), CampaignStatus::Completed);
        assert_eq!(CampaignStatus::from_str("sending"), CampaignStatus::Sending);
        assert_eq!(CampaignStatus::from_str("garbage"), CampaignStatus::Sending);
        assert_eq!(CampaignStatus::Completed.as_str(), "completed");
    }
}
