//! Organization and employee directory handlers

use axum::{extract::{Path, State}, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::error::is_unique_violation;
use crate::models::{CreateEmployee, CreateOrganization, Employee, EmployeeIdentity, Organization};
use crate::{AppError, AppResult, AppState};

/// Create organization
pub async fn create(
    State(state): State<AppState>,
    Json(req): Json<CreateOrganization>,
) -> AppResult<Json<Organization>> {
    req.validate()?;
    let org = Organization::create(&state.pool, req).await?;
    tracing::info!(org_id = %org.id, name = %org.name, "organization created");
    Ok(Json(org))
}

/// List organizations
pub async fn list(State(state): State<AppState>) -> AppResult<Json<Vec<Organization>>> {
    let orgs = Organization::list(&state.pool).await?;
    Ok(Json(orgs))
}

#[derive(Debug, Serialize)]
pub struct OrganizationDetail {
    pub organization: Organization,
    /// Stored override or computed from employee risk levels
    pub risk_score: i64,
    pub employees: Vec<Employee>,
}

/// Get one organization with its directory and effective risk score
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<OrganizationDetail>> {
    let organization = Organization::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Organization not found".to_string()))?;

    let risk_score = organization.effective_risk_score(&state.pool).await?;
    let employees = Employee::list_by_org(&state.pool, id).await?;

    Ok(Json(OrganizationDetail {
        organization,
        risk_score,
        employees,
    }))
}

/// Add a single employee
pub async fn add_employee(
    State(state): State<AppState>,
    Path(org_id): Path<Uuid>,
    Json(req): Json<CreateEmployee>,
) -> AppResult<Json<Employee>> {
    req.validate()?;

    Organization::find_by_id(&state.pool, org_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Organization not found".to_string()))?;

    match Employee::create(&state.pool, org_id, req).await {
        Ok(employee) => Ok(Json(employee)),
        Err(err) if is_unique_violation(&err) => Err(AppError::AlreadyExists(
            "Employee already registered in this organization".to_string(),
        )),
        Err(err) => Err(err.into()),
    }
}

#[derive(Debug, Deserialize)]
pub struct ImportEmployeesRequest {
    pub emails: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ImportSummary {
    pub processed: u64,
}

/// Bulk email import. Upsert keyed on (organization_id, email): re-import
/// never duplicates rows or touches risk counters.
pub async fn import_employees(
    State(state): State<AppState>,
    Path(org_id): Path<Uuid>,
    Json(req): Json<ImportEmployeesRequest>,
) -> AppResult<Json<ImportSummary>> {
    Organization::find_by_id(&state.pool, org_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Organization not found".to_string()))?;

    let entries: Vec<EmployeeIdentity> = req
        .emails
        .iter()
        .map(|e| e.trim())
        .filter(|e| e.contains('@'))
        .map(|e| EmployeeIdentity {
            email: e.to_string(),
            display_name: None,
            position: None,
        })
        .collect();

    if entries.is_empty() {
        return Err(AppError::Validation("Import list is empty".to_string()));
    }

    let processed = Employee::upsert_identities(&state.pool, org_id, &entries).await?;
    tracing::info!(%org_id, processed, "directory import finished");

    Ok(Json(ImportSummary { processed }))
}

#[derive(Debug, Serialize)]
pub struct SyncSummary {
    pub synced: u64,
}

/// Sync the employee directory from Microsoft Entra ID.
pub async fn sync_directory(
    State(state): State<AppState>,
    Path(org_id): Path<Uuid>,
) -> AppResult<Json<SyncSummary>> {
    Organization::find_by_id(&state.pool, org_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Organization not found".to_string()))?;

    let graph = state.graph.as_ref().ok_or_else(|| {
        AppError::ExternalService("Directory integration is not configured".to_string())
    })?;

    let users = graph.fetch_users().await?;
    if users.is_empty() {
        return Err(AppError::ExternalService(
            "No users found in the directory".to_string(),
        ));
    }

    // Email sometimes lives in `mail`, sometimes only in the principal name
    let entries: Vec<EmployeeIdentity> = users
        .into_iter()
        .map(|u| EmployeeIdentity {
            email: u.email.unwrap_or(u.principal),
            display_name: u.display_name,
            position: u.job_title,
        })
        .collect();

    let synced = Employee::upsert_identities(&state.pool, org_id, &entries).await?;
    tracing::info!(%org_id, synced, "directory sync finished");

    Ok(Json(SyncSummary { synced }))
}
