//! Click tracking endpoint
//!
//! Unauthenticated: the victim follows this link from the lure.
//! Whatever happens to attribution, the response is always a redirect
//! to the educational page.

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap},
    response::Redirect,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::models::{Campaign, Employee, SimulationClick, Target};
use crate::AppState;

/// Lesson shown when attribution is skipped or fails.
const GENERIC_LESSON: &str = "generic";

#[derive(Debug, Deserialize)]
pub struct TrackParams {
    pub email: Option<String>,
    /// Campaign id (bulk campaign) or template slug (quick attack)
    pub c: Option<String>,
}

/// Interpretation of the inbound `c` parameter, decided once at the
/// boundary. Each variant gets its own attribution path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackingReference {
    /// Canonical campaign id: resolve (campaign, email) to a target row
    Campaign(Uuid),
    /// Free-form template slug: campaign-less quick attack, log-only
    AdHoc(String),
}

impl TrackingReference {
    pub fn parse(raw: &str) -> Self {
        match Uuid::parse_str(raw) {
            Ok(id) => TrackingReference::Campaign(id),
            Err(_) => TrackingReference::AdHoc(raw.to_string()),
        }
    }
}

struct Attribution {
    lesson: String,
    target_id: Option<Uuid>,
}

/// GET /track?email=..&c=..
pub async fn click(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<TrackParams>,
) -> Redirect {
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok());

    let mut lesson = GENERIC_LESSON.to_string();
    let mut target_id = None;

    if let (Some(email), Some(reference)) = (params.email.as_deref(), params.c.as_deref()) {
        match attribute(&state, email, reference, user_agent).await {
            Ok(attribution) => {
                lesson = attribution.lesson;
                target_id = attribution.target_id;
            }
            Err(err) => {
                // Attribution is best-effort; the victim still gets the lesson
                tracing::error!(error = %err, "click attribution failed, redirecting anyway");
            }
        }
    }

    Redirect::temporary(&education_url(&state.config.base_url, &lesson, target_id))
}

async fn attribute(
    state: &AppState,
    email: &str,
    reference: &str,
    user_agent: Option<&str>,
) -> Result<Attribution, sqlx::Error> {
    match TrackingReference::parse(reference) {
        TrackingReference::Campaign(campaign_id) => {
            // First matching click wins the CAS; replays change nothing
            let winner = Target::record_click(&state.pool, campaign_id, email).await?;
            let campaign = Campaign::find_by_id(&state.pool, campaign_id).await?;

            if winner.is_some() {
                tracing::info!(%campaign_id, email, "target clicked");
                // Counter bumps exactly once per target, on the winning click
                if let Some(org_id) = campaign.as_ref().and_then(|c| c.organization_id) {
                    Employee::record_compromise(&state.pool, org_id, email).await?;
                }
            }

            let target_id = match winner {
                Some(id) => Some(id),
                None => Target::find_by_campaign_email(&state.pool, campaign_id, email)
                    .await?
                    .map(|t| t.id),
            };

            // Unknown campaign id is a graceful miss: generic lesson, no uid
            let lesson = campaign
                .map(|c| c.template_slug)
                .unwrap_or_else(|| GENERIC_LESSON.to_string());

            Ok(Attribution { lesson, target_id })
        }
        TrackingReference::AdHoc(slug) => {
            SimulationClick::insert(&state.pool, email, &slug, user_agent).await?;
            tracing::info!(email, template = %slug, "quick-attack click logged");
            Ok(Attribution { lesson: slug, target_id: None })
        }
    }
}

/// Educational follow-up URL: `t` selects the lesson, `uid` (when
/// attribution matched a target) feeds the remediation call.
fn education_url(base_url: &str, lesson: &str, target_id: Option<Uuid>) -> String {
    let mut url = format!(
        "{}/education?t={}",
        base_url.trim_end_matches('/'),
        urlencoding::encode(lesson)
    );
    if let Some(id) = target_id {
        url.push_str(&format!("&uid={}", id));
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uuid_reference_resolves_to_a_campaign() {
        let id = Uuid::new_v4();
        assert_eq!(
            TrackingReference::parse(&id.to_string()),
            TrackingReference::Campaign(id)
        );
    }

    #[test]
    fn slug_reference_resolves_to_an_ad_hoc_attack() {
        assert_eq!(
            TrackingReference::parse("hr-payroll"),
            TrackingReference::AdHoc("hr-payroll".to_string())
        );
        // Almost-a-uuid is still a slug
        assert_eq!(
            TrackingReference::parse("1234-not-a-uuid"),
            TrackingReference::AdHoc("1234-not-a-uuid".to_string())
        );
    }

    #[test]
    fn education_url_carries_lesson_and_uid() {
        let id = Uuid::nil();
        assert_eq!(
            education_url("https://security.kinetis.org/", "hr-payroll", Some(id)),
            format!("https://security.kinetis.org/education?t=hr-payroll&uid={}", id)
        );
        assert_eq!(
            education_url("https://security.kinetis.org", "generic", None),
            "https://security.kinetis.org/education?t=generic"
        );
    }
}
