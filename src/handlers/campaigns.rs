//! Campaign and quick-attack handlers

use axum::{extract::{Path, State}, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::clients::mailer::OutboundEmail;
use crate::dispatch::{self, DispatchSummary, LaunchCampaignRequest};
use crate::models::{Campaign, EmailTemplate, Target, TargetCounts};
use crate::scoring;
use crate::{AppError, AppResult, AppState};

/// Launch a bulk campaign
pub async fn launch(
    State(state): State<AppState>,
    Json(req): Json<LaunchCampaignRequest>,
) -> AppResult<Json<DispatchSummary>> {
    let summary = dispatch::launch(&state, req).await?;
    tracing::info!(
        campaign_id = %summary.campaign_id,
        sent = summary.sent,
        total = summary.total,
        "campaign dispatch finished"
    );
    Ok(Json(summary))
}

/// List campaigns
pub async fn list(State(state): State<AppState>) -> AppResult<Json<Vec<Campaign>>> {
    let campaigns = Campaign::list(&state.pool).await?;
    Ok(Json(campaigns))
}

#[derive(Debug, Serialize)]
pub struct CampaignReport {
    pub campaign: Campaign,
    pub counts: TargetCounts,
    pub fail_rate: i64,
    pub recovery_rate: i64,
    pub targets: Vec<Target>,
}

/// Per-campaign report with derived risk rates
pub async fn report(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<CampaignReport>> {
    let campaign = Campaign::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Campaign not found".to_string()))?;

    let counts = Target::counts(&state.pool, id).await?;
    let targets = Target::list_by_campaign(&state.pool, id).await?;

    Ok(Json(CampaignReport {
        fail_rate: scoring::fail_rate(counts.vulnerable(), counts.total),
        recovery_rate: scoring::recovery_rate(counts.trained, counts.vulnerable()),
        campaign,
        counts,
        targets,
    }))
}

fn default_template_slug() -> String {
    "google-security".to_string()
}

#[derive(Debug, Deserialize, Validate)]
pub struct QuickAttackRequest {
    #[validate(email(message = "a valid recipient email is required"))]
    pub email: String,
    #[serde(default = "default_template_slug")]
    pub template_slug: String,
}

#[derive(Debug, Serialize)]
pub struct QuickAttackResponse {
    pub status: String,
    pub message: String,
}

/// Single-recipient attack with no campaign rows. Clicks land in the
/// lightweight click log, keyed by the template slug in the link.
pub async fn quick_attack(
    State(state): State<AppState>,
    Json(req): Json<QuickAttackRequest>,
) -> AppResult<Json<QuickAttackResponse>> {
    req.validate()?;

    let template = EmailTemplate::find_by_slug(&state.pool, &req.template_slug)
        .await?
        .ok_or_else(|| AppError::NotFound("Template not found".to_string()))?;

    let link = dispatch::tracking_link(&state.config.base_url, &req.email, &template.slug);

    state
        .mailer
        .send(&OutboundEmail {
            from: template.from_header(),
            to: req.email.clone(),
            subject: template.subject.clone(),
            html: template.render(&link),
        })
        .await?;

    tracing::info!(email = %req.email, template = %template.slug, "quick attack sent");

    Ok(Json(QuickAttackResponse {
        status: "success".to_string(),
        message: format!("Attack '{}' launched at {}", template.name, req.email),
    }))
}
