//! Campaign dispatch coordinator
//!
//! Creates the campaign and its full target set atomically, then fans
//! out sends under a bounded worker count. One recipient failing never
//! aborts the batch; the campaign closes once every send was attempted.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use uuid::Uuid;
use validator::Validate;

use crate::clients::mailer::{Mailer, OutboundEmail};
use crate::error::{AppError, AppResult};
use crate::models::{Campaign, EmailTemplate, Employee, Target};
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct LaunchCampaignRequest {
    #[validate(length(min = 1, message = "campaign name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "template slug is required"))]
    pub template_slug: String,
    /// Scope the campaign (and target resolution) to one organization
    pub organization_id: Option<Uuid>,
    /// Explicit recipient list; when absent the organization's employees
    /// are targeted
    pub emails: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DispatchSummary {
    pub campaign_id: Uuid,
    pub total: usize,
    pub sent: usize,
}

/// One prepared send: recipient plus the rendered message.
pub struct SendJob {
    pub email: String,
    pub message: OutboundEmail,
}

#[derive(Debug)]
pub struct SendOutcome {
    pub email: String,
    pub ok: bool,
}

/// Launch a bulk campaign end to end.
pub async fn launch(state: &AppState, req: LaunchCampaignRequest) -> AppResult<DispatchSummary> {
    req.validate()?;

    let emails = resolve_targets(state, &req).await?;

    let template = EmailTemplate::find_by_slug(&state.pool, &req.template_slug)
        .await?
        .ok_or_else(|| AppError::NotFound("Template not found".to_string()))?;

    // Campaign and targets commit together: a crash mid-send can leave
    // targets pending, but never an untracked recipient.
    let mut tx = state.pool.begin().await?;
    let campaign = Campaign::create(&mut tx, &req.name, &template.slug, req.organization_id).await?;
    Target::bulk_insert(&mut tx, campaign.id, &emails).await?;
    tx.commit().await?;

    tracing::info!(
        campaign_id = %campaign.id,
        targets = emails.len(),
        "campaign created, dispatching"
    );

    let jobs: Vec<SendJob> = emails
        .iter()
        .map(|email| SendJob {
            email: email.clone(),
            message: OutboundEmail {
                from: template.from_header(),
                to: email.clone(),
                subject: template.subject.clone(),
                html: template.render(&tracking_link(
                    &state.config.base_url,
                    email,
                    &campaign.id.to_string(),
                )),
            },
        })
        .collect();

    let outcomes = send_all(
        state.mailer.as_ref(),
        jobs,
        state.config.send_concurrency,
    )
    .await;

    // Each sent-update is awaited before the target enters the tally,
    // and all of them land before the campaign is closed.
    let mut sent = 0;
    for outcome in &outcomes {
        if outcome.ok {
            Target::mark_sent(&state.pool, campaign.id, &outcome.email).await?;
            sent += 1;
        }
    }

    Campaign::mark_completed(&state.pool, campaign.id).await?;

    Ok(DispatchSummary {
        campaign_id: campaign.id,
        total: emails.len(),
        sent,
    })
}

/// Resolve the recipient list: explicit emails win, otherwise every
/// employee of the scoped organization. Empty resolution is a
/// validation error raised before any row is written.
async fn resolve_targets(state: &AppState, req: &LaunchCampaignRequest) -> AppResult<Vec<String>> {
    if let Some(list) = &req.emails {
        let emails = normalize_emails(list);
        if emails.is_empty() {
            return Err(AppError::Validation("Target list is empty".to_string()));
        }
        return Ok(emails);
    }

    let org_id = req.organization_id.ok_or_else(|| {
        AppError::Validation("Provide target emails or an organization".to_string())
    })?;

    let employees = Employee::list_by_org(&state.pool, org_id).await?;
    if employees.is_empty() {
        return Err(AppError::Validation(
            "Organization has no registered employees".to_string(),
        ));
    }
    Ok(employees.into_iter().map(|e| e.email).collect())
}

/// Fan sends out with a fixed worker cap. Ordering between recipients is
/// not guaranteed; failures are logged and reported per recipient.
pub async fn send_all(
    mailer: &dyn Mailer,
    jobs: Vec<SendJob>,
    concurrency: usize,
) -> Vec<SendOutcome> {
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));

    let sends = jobs.into_iter().map(|job| {
        let semaphore = Arc::clone(&semaphore);
        async move {
            // Acquire only fails on a closed semaphore; report the send
            // as failed rather than panicking mid-batch.
            let _permit = match semaphore.acquire().await {
                Ok(permit) => permit,
                Err(_) => {
                    tracing::warn!(recipient = %job.email, "send skipped, dispatch queue closed");
                    return SendOutcome { email: job.email, ok: false };
                }
            };
            match mailer.send(&job.message).await {
                Ok(()) => SendOutcome { email: job.email, ok: true },
                Err(err) => {
                    tracing::warn!(
                        recipient = %job.email,
                        error = %err,
                        "send failed, target stays pending"
                    );
                    SendOutcome { email: job.email, ok: false }
                }
            }
        }
    });

    futures::future::join_all(sends).await
}

/// Per-recipient tracking link. `reference` is either a campaign id or
/// a template slug for quick attacks.
pub fn tracking_link(base_url: &str, email: &str, reference: &str) -> String {
    format!(
        "{}/track?email={}&c={}",
        base_url.trim_end_matches('/'),
        urlencoding::encode(email),
        urlencoding::encode(reference)
    )
}

/// Trim, drop obvious non-addresses, and dedupe while keeping order.
/// The (campaign_id, email) unique key makes duplicates a hard error at
/// insert time, so they are removed here instead.
fn normalize_emails(raw: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    raw.iter()
        .map(|e| e.trim().to_string())
        .filter(|e| e.contains('@'))
        .filter(|e| seen.insert(e.to_lowercase()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use crate::clients::mailer::MailError;

    /// Mailer double: fails one configured address and records the peak
    /// number of in-flight sends.
    struct MockMailer {
        fail_for: &'static str,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl MockMailer {
        fn new(fail_for: &'static str) -> Self {
            Self {
                fail_for,
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Mailer for MockMailer {
        async fn send(&self, email: &OutboundEmail) -> Result<(), MailError> {
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(current, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if email.to == self.fail_for {
                return Err(MailError::Provider("mock rejection".to_string()));
            }
            Ok(())
        }
    }

    fn jobs_for(emails: &[&str]) -> Vec<SendJob> {
        emails
            .iter()
            .map(|e| SendJob {
                email: e.to_string(),
                message: OutboundEmail {
                    from: "Kinetis Security <security@kinetis.org>".to_string(),
                    to: e.to_string(),
                    subject: "s".to_string(),
                    html: "<p>hi</p>".to_string(),
                },
            })
            .collect()
    }

    #[tokio::test]
    async fn one_failure_does_not_abort_the_batch() {
        let mailer = MockMailer::new("bad@corp.test");
        let emails = ["a@corp.test", "b@corp.test", "bad@corp.test", "c@corp.test", "d@corp.test"];

        let outcomes = send_all(&mailer, jobs_for(&emails), 3).await;

        assert_eq!(outcomes.len(), 5);
        assert_eq!(outcomes.iter().filter(|o| o.ok).count(), 4);
        assert!(outcomes.iter().any(|o| o.email == "bad@corp.test" && !o.ok));
    }

    #[tokio::test]
    async fn fan_out_respects_the_worker_cap() {
        let mailer = MockMailer::new("none");
        let emails: Vec<String> = (0..12).map(|i| format!("user{}@corp.test", i)).collect();
        let refs: Vec<&str> = emails.iter().map(|s| s.as_str()).collect();

        send_all(&mailer, jobs_for(&refs), 2).await;

        assert!(mailer.max_in_flight.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn zero_concurrency_is_clamped_to_one() {
        let mailer = MockMailer::new("none");
        let emails = ["a@corp.test", "b@corp.test", "c@corp.test"];

        let outcomes = send_all(&mailer, jobs_for(&emails), 0).await;

        assert!(outcomes.iter().all(|o| o.ok));
        assert_eq!(mailer.max_in_flight.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn tracking_link_encodes_query_params() {
        let link = tracking_link(
            "https://security.kinetis.org/",
            "maria+test@corp.test",
            "hr-payroll",
        );
        assert_eq!(
            link,
            "https://security.kinetis.org/track?email=maria%2Btest%40corp.test&c=hr-payroll"
        );
    }

    #[test]
    fn normalize_filters_and_dedupes() {
        let raw = vec![
            " a@corp.test ".to_string(),
            "not-an-email".to_string(),
            "A@corp.test".to_string(),
            "b@corp.test".to_string(),
        ];
        assert_eq!(normalize_emails(&raw), vec!["a@corp.test", "b@corp.test"]);
    }
}
