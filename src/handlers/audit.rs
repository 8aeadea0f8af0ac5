//! Compliance audit and breach scan handlers

use std::time::Duration;

use axum::{extract::{Path, State}, Json};
use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

use crate::compliance::{self, ControlOutcome, Evidence};
use crate::models::{ControlResult, Employee, EmployeeLeak, Organization};
use crate::{AppError, AppResult, AppState};

/// Pacing when serving deterministic demo data.
const DEMO_SCAN_DELAY_MS: u64 = 500;

#[derive(Debug, Serialize)]
pub struct AuditRunResponse {
    pub organization_id: Uuid,
    pub failed_controls: usize,
    pub results: Vec<ControlOutcome>,
}

/// Run a cloud-identity audit: gather evidence, evaluate the fixed rule
/// set, append the results.
pub async fn run(
    State(state): State<AppState>,
    Path(org_id): Path<Uuid>,
) -> AppResult<Json<AuditRunResponse>> {
    Organization::find_by_id(&state.pool, org_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Organization not found".to_string()))?;

    let graph = state.graph.as_ref().ok_or_else(|| {
        AppError::ExternalService("Directory integration is not configured".to_string())
    })?;

    let evidence = Evidence {
        mfa_report: graph.fetch_mfa_report().await?,
        global_admins: graph.fetch_global_admins().await?,
    };

    let results = compliance::evaluate(&evidence);
    ControlResult::append(&state.pool, org_id, &results).await?;

    let failed_controls = results.iter().filter(|r| r.failed()).count();
    tracing::info!(%org_id, failed_controls, "compliance audit completed");

    Ok(Json(AuditRunResponse {
        organization_id: org_id,
        failed_controls,
        results,
    }))
}

/// Audit history, newest first (append-only trend data)
pub async fn history(
    State(state): State<AppState>,
    Path(org_id): Path<Uuid>,
) -> AppResult<Json<Vec<ControlResult>>> {
    Organization::find_by_id(&state.pool, org_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Organization not found".to_string()))?;

    let results = ControlResult::list_by_org(&state.pool, org_id).await?;
    Ok(Json(results))
}

#[derive(Debug, Serialize)]
pub struct BreachScanSummary {
    pub scanned: usize,
    pub employees_affected: usize,
    pub demo_mode: bool,
}

/// Scan every employee against the breach feed.
///
/// Lookups run one at a time with a pacing delay between them; the
/// provider rate-limits aggressively. One employee failing is logged
/// and skipped, never aborts the scan.
pub async fn breach_scan(
    State(state): State<AppState>,
    Path(org_id): Path<Uuid>,
) -> AppResult<Json<BreachScanSummary>> {
    Organization::find_by_id(&state.pool, org_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Organization not found".to_string()))?;

    let employees = Employee::list_by_org(&state.pool, org_id).await?;
    if employees.is_empty() {
        return Err(AppError::Validation("No employees to scan".to_string()));
    }

    let demo_mode = state.breaches.demo_mode();
    let delay = Duration::from_millis(if demo_mode {
        DEMO_SCAN_DELAY_MS
    } else {
        state.config.breach_scan_delay_ms
    });

    let mut scanned = 0;
    let mut employees_affected = 0;

    for employee in &employees {
        tokio::time::sleep(delay).await;

        let breaches = match state.breaches.lookup(&employee.email).await {
            Ok(breaches) => breaches,
            Err(err) => {
                tracing::warn!(email = %employee.email, error = %err, "breach lookup failed, skipping");
                scanned += 1;
                continue;
            }
        };

        if !breaches.is_empty() {
            employees_affected += 1;
            for record in &breaches {
                let leaked_at = NaiveDate::parse_from_str(&record.breach_date, "%Y-%m-%d").ok();
                EmployeeLeak::insert(
                    &state.pool,
                    employee.id,
                    &record.name,
                    serde_json::json!(record.data_classes),
                    leaked_at,
                )
                .await?;
            }
            Employee::record_leaks(&state.pool, employee.id, breaches.len() as i32).await?;
        }
        scanned += 1;
    }

    tracing::info!(%org_id, scanned, employees_affected, demo_mode, "breach scan completed");

    Ok(Json(BreachScanSummary {
        scanned,
        employees_affected,
        demo_mode,
    }))
}
