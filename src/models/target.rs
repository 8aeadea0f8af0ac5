//! Campaign target model
//!
//! One row per (campaign, recipient). The status column is a strictly
//! ordered state machine; every mutation below is a conditioned
//! single-row update so concurrent clicks and training completions can
//! never move a target backward.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, Row, Transaction};
use uuid::Uuid;
use chrono::{DateTime, Utc};

/// Target lifecycle: pending -> sent -> clicked -> trained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TargetStatus {
    Pending,
    Sent,
    Clicked,
    Trained,
}

impl TargetStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(TargetStatus::Pending),
            "sent" => Some(TargetStatus::Sent),
            "clicked" => Some(TargetStatus::Clicked),
            "trained" => Some(TargetStatus::Trained),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TargetStatus::Pending => "pending",
            TargetStatus::Sent => "sent",
            TargetStatus::Clicked => "clicked",
            TargetStatus::Trained => "trained",
        }
    }

    /// Position in the forward-only ordering.
    pub fn rank(&self) -> u8 {
        match self {
            TargetStatus::Pending => 0,
            TargetStatus::Sent => 1,
            TargetStatus::Clicked => 2,
            TargetStatus::Trained => 3,
        }
    }

    /// True once the target counts as having fallen for the lure.
    pub fn is_vulnerable(&self) -> bool {
        matches!(self, TargetStatus::Clicked | TargetStatus::Trained)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Target {
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub email: String,
    pub status: String,
    pub sent_at: Option<DateTime<Utc>>,
    pub clicked_at: Option<DateTime<Utc>>,
}

/// Per-status tallies for one campaign.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct TargetCounts {
    pub total: i64,
    pub pending: i64,
    pub sent: i64,
    pub clicked: i64,
    pub trained: i64,
}

impl TargetCounts {
    pub fn vulnerable(&self) -> i64 {
        self.clicked + self.trained
    }
}

impl Target {
    pub fn status(&self) -> Option<TargetStatus> {
        TargetStatus::parse(&self.status)
    }

    /// Bulk-insert all recipients as pending inside the dispatch
    /// transaction, before any send is attempted.
    pub async fn bulk_insert(
        tx: &mut Transaction<'_, Postgres>,
        campaign_id: Uuid,
        emails: &[String],
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO campaign_targets (campaign_id, email)
            SELECT $1, UNNEST($2::text[])
            "#
        )
        .bind(campaign_id)
        .bind(emails)
        .execute(&mut **tx)
        .await?;

        Ok(result.rows_affected())
    }

    /// pending -> sent, after the provider accepted the message.
    /// Conditioned on pending so a re-run never rewinds a later state.
    pub async fn mark_sent(
        pool: &PgPool,
        campaign_id: Uuid,
        email: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE campaign_targets
            SET status = 'sent', sent_at = NOW()
            WHERE campaign_id = $1 AND email = $2 AND status = 'pending'
            "#
        )
        .bind(campaign_id)
        .bind(email)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Compare-and-set click attribution. The first matching request wins
    /// and gets the target id back; replays and clicks on trained targets
    /// return None and change nothing.
    pub async fn record_click(
        pool: &PgPool,
        campaign_id: Uuid,
        email: &str,
    ) -> Result<Option<Uuid>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            UPDATE campaign_targets
            SET status = 'clicked', clicked_at = NOW()
            WHERE campaign_id = $1 AND email = $2
              AND status IN ('pending', 'sent')
              AND clicked_at IS NULL
            RETURNING id
            "#
        )
        .bind(campaign_id)
        .bind(email)
        .fetch_optional(pool)
        .await?;

        Ok(row.map(|r| r.get::<Uuid, _>("id")))
    }

    /// clicked -> trained. Returns the updated row only when the
    /// transition actually happened.
    pub async fn complete_training(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Target>(
            r#"
            UPDATE campaign_targets
            SET status = 'trained'
            WHERE id = $1 AND status = 'clicked'
            RETURNING *
            "#
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Target>("SELECT * FROM campaign_targets WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_campaign_email(
        pool: &PgPool,
        campaign_id: Uuid,
        email: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Target>(
            "SELECT * FROM campaign_targets WHERE campaign_id = $1 AND email = $2"
        )
        .bind(campaign_id)
        .bind(email)
        .fetch_optional(pool)
        .await
    }

    pub async fn list_by_campaign(pool: &PgPool, campaign_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Target>(
            "SELECT * FROM campaign_targets WHERE campaign_id = $1 ORDER BY email"
        )
        .bind(campaign_id)
        .fetch_all(pool)
        .await
    }

    pub async fn counts(pool: &PgPool, campaign_id: Uuid) -> Result<TargetCounts, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE status = 'pending') AS pending,
                COUNT(*) FILTER (WHERE status = 'sent') AS sent,
                COUNT(*) FILTER (WHERE status = 'clicked') AS clicked,
                COUNT(*) FILTER (WHERE status = 'trained') AS trained
            FROM campaign_targets WHERE campaign_id = $1
            "#
        )
        .bind(campaign_id)
        .fetch_one(pool)
        .await?;

        Ok(TargetCounts {
            total: row.get("total"),
            pending: row.get("pending"),
            sent: row.get("sent"),
            clicked: row.get("clicked"),
            trained: row.get("trained"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_ordering_is_strict() {
        let order = [
            TargetStatus::Pending,
            TargetStatus::Sent,
            TargetStatus::Clicked,
            TargetStatus::Trained,
        ];
        for pair in order.windows(2) {
            assert!(pair[0].rank() < pair[1].rank());
        }
    }

    #[test]
    fn status_round_trips_through_db_strings() {
        for status in [
            TargetStatus::Pending,
            TargetStatus::Sent,
            TargetStatus::Clicked,
            TargetStatus::Trained,
        ] {
            assert_eq!(TargetStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(TargetStatus::parse("bounced"), None);
    }

    #[test]
    fn vulnerable_means_clicked_or_later() {
        assert!(!TargetStatus::Pending.is_vulnerable());
        assert!(!TargetStatus::Sent.is_vulnerable());
        assert!(TargetStatus::Clicked.is_vulnerable());
        assert!(TargetStatus::Trained.is_vulnerable());
    }

    #[test]
    fn counts_vulnerable_includes_trained() {
        let counts = TargetCounts { total: 10, pending: 3, sent: 3, clicked: 3, trained: 1 };
        assert_eq!(counts.vulnerable(), 4);
    }
}
