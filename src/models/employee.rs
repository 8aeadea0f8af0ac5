//! Employee model

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Row};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use validator::Validate;

/// Employee risk level, raised by clicks and leaks, never lowered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RiskLevel {
    /// No recorded compromise
    Unknown,
    /// Fell for at least one simulation
    Vulnerable,
    /// Has a confirmed credential leak
    Critical,
}

impl RiskLevel {
    /// Parse level string from database
    pub fn from_str(s: &str) -> Self {
        match s {
            "vulnerable" => RiskLevel::Vulnerable,
            "critical" => RiskLevel::Critical,
            _ => RiskLevel::Unknown,
        }
    }

    /// Convert to database string
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Unknown => "unknown",
            RiskLevel::Vulnerable => "vulnerable",
            RiskLevel::Critical => "critical",
        }
    }

    /// True once the employee counts toward the organization risk score.
    pub fn is_compromised(&self) -> bool {
        !matches!(self, RiskLevel::Unknown)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Employee {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
    pub position: Option<String>,
    pub risk_level: String,
    pub times_compromised: i32,
    pub total_leaks: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateEmployee {
    #[validate(email(message = "a valid email is required"))]
    pub email: String,
    pub display_name: Option<String>,
}

/// Identity fields carried by directory sync and bulk import.
/// Risk counters are deliberately absent: sync must never clobber them.
#[derive(Debug, Clone)]
pub struct EmployeeIdentity {
    pub email: String,
    pub display_name: Option<String>,
    pub position: Option<String>,
}

/// Compromised/total employee counts for one organization.
#[derive(Debug, Clone, Copy)]
pub struct RiskCounts {
    pub compromised: i64,
    pub total: i64,
}

impl Employee {
    pub fn risk_level(&self) -> RiskLevel {
        RiskLevel::from_str(&self.risk_level)
    }

    pub async fn create(
        pool: &PgPool,
        organization_id: Uuid,
        data: CreateEmployee,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Employee>(
            r#"
            INSERT INTO employees (organization_id, email, display_name)
            VALUES ($1, $2, $3)
            RETURNING *
            "#
        )
        .bind(organization_id)
        .bind(&data.email)
        .bind(&data.display_name)
        .fetch_one(pool)
        .await
    }

    pub async fn list_by_org(pool: &PgPool, organization_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Employee>(
            "SELECT * FROM employees WHERE organization_id = $1 ORDER BY email"
        )
        .bind(organization_id)
        .fetch_all(pool)
        .await
    }

    /// Bulk identity upsert keyed on (organization_id, email).
    ///
    /// Existing rows keep their risk_level and counters; only identity
    /// fields are refreshed, and only when the source provides them.
    pub async fn upsert_identities(
        pool: &PgPool,
        organization_id: Uuid,
        entries: &[EmployeeIdentity],
    ) -> Result<u64, sqlx::Error> {
        let emails: Vec<String> = entries.iter().map(|e| e.email.clone()).collect();
        let names: Vec<Option<String>> = entries.iter().map(|e| e.display_name.clone()).collect();
        let positions: Vec<Option<String>> = entries.iter().map(|e| e.position.clone()).collect();

        let result = sqlx::query(
            r#"
            INSERT INTO employees (organization_id, email, display_name, position)
            SELECT $1, e.email, e.display_name, e.position
            FROM UNNEST($2::text[], $3::text[], $4::text[]) AS e(email, display_name, position)
            ON CONFLICT (organization_id, email) DO UPDATE SET
                display_name = COALESCE(EXCLUDED.display_name, employees.display_name),
                position = COALESCE(EXCLUDED.position, employees.position),
                updated_at = NOW()
            "#
        )
        .bind(organization_id)
        .bind(&emails)
        .bind(&names)
        .bind(&positions)
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Increment the compromise counter and raise the risk level after a
    /// confirmed click. The CASE is the click row of
    /// `scoring::escalate`: critical stays critical, anything else
    /// becomes vulnerable.
    pub async fn record_compromise(
        pool: &PgPool,
        organization_id: Uuid,
        email: &str,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE employees
            SET times_compromised = times_compromised + 1,
                risk_level = CASE WHEN risk_level = $3 THEN risk_level ELSE $4 END,
                updated_at = NOW()
            WHERE organization_id = $1 AND email = $2
            "#
        )
        .bind(organization_id)
        .bind(email)
        .bind(RiskLevel::Critical.as_str())
        .bind(RiskLevel::Vulnerable.as_str())
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Record confirmed credential leaks: bump the counter and take the
    /// leak row of `scoring::escalate`, which is unconditionally critical.
    pub async fn record_leaks(
        pool: &PgPool,
        employee_id: Uuid,
        leak_count: i32,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE employees
            SET total_leaks = total_leaks + $2,
                risk_level = $3,
                updated_at = NOW()
            WHERE id = $1
            "#
        )
        .bind(employee_id)
        .bind(leak_count)
        .bind(RiskLevel::Critical.as_str())
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn risk_counts(pool: &PgPool, organization_id: Uuid) -> Result<RiskCounts, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE risk_level IN ('vulnerable', 'critical')) AS compromised
            FROM employees WHERE organization_id = $1
            "#
        )
        .bind(organization_id)
        .fetch_one(pool)
        .await?;

        Ok(RiskCounts {
            compromised: row.get::<i64, _>("compromised"),
            total: row.get::<i64, _>("total"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn risk_level_round_trips_through_db_strings() {
        for level in [RiskLevel::Unknown, RiskLevel::Vulnerable, RiskLevel::Critical] {
            assert_eq!(RiskLevel::from_str(level.as_str()), level);
        }
    }

    #[test]
    fn unrecognized_level_defaults_to_unknown() {
        assert_eq!(RiskLevel::from_str("weird"), RiskLevel::Unknown);
    }

    #[test]
    fn only_raised_levels_count_as_compromised() {
        assert!(!RiskLevel::Unknown.is_compromised());
        assert!(RiskLevel::Vulnerable.is_compromised());
        assert!(RiskLevel::Critical.is_compromised());
    }

    #[test]
    fn recorded_transitions_mirror_the_escalation_table() {
        use crate::scoring::escalate;

        // Click row, as applied by record_compromise
        assert_eq!(escalate(RiskLevel::Unknown, 1, 0), RiskLevel::Vulnerable);
        assert_eq!(escalate(RiskLevel::Vulnerable, 2, 0), RiskLevel::Vulnerable);
        assert_eq!(escalate(RiskLevel::Critical, 1, 0), RiskLevel::Critical);

        // Leak row, as applied by record_leaks
        assert_eq!(escalate(RiskLevel::Unknown, 0, 1), RiskLevel::Critical);
        assert_eq!(escalate(RiskLevel::Vulnerable, 1, 3), RiskLevel::Critical);
    }
}
