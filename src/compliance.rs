//! Compliance rule evaluator
//!
//! Pure transformation from directory evidence to control results.
//! The fixed CIS-derived rule set lives here; all I/O (Graph calls,
//! result persistence) stays with the callers so the rules can be
//! exercised with fixture data.

use serde::{Deserialize, Serialize};
use serde_json::json;

/// Cap on principals kept in an evidence snapshot.
const EVIDENCE_SAMPLE_LIMIT: usize = 10;

/// Ceiling on accounts holding the top administrative role.
const ADMIN_COUNT_CEILING: usize = 5;

/// One row of the MFA registration report.
#[derive(Debug, Clone, Deserialize)]
pub struct MfaRegistration {
    pub principal: String,
    pub mfa_registered: bool,
}

/// One account holding the top administrative role.
#[derive(Debug, Clone, Deserialize)]
pub struct AdminAccount {
    pub principal: String,
}

/// Raw directory evidence consumed by the evaluator.
#[derive(Debug, Clone, Default)]
pub struct Evidence {
    pub mfa_report: Vec<MfaRegistration>,
    pub global_admins: Vec<AdminAccount>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ControlStatus {
    #[serde(rename = "PASS")]
    Pass,
    #[serde(rename = "FAIL")]
    Fail,
}

impl ControlStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ControlStatus::Pass => "PASS",
            ControlStatus::Fail => "FAIL",
        }
    }
}

/// Outcome of a single control evaluation.
#[derive(Debug, Clone, Serialize)]
pub struct ControlOutcome {
    pub control_id: &'static str,
    pub control_name: &'static str,
    pub status: ControlStatus,
    pub score: i32,
    pub evidence: serde_json::Value,
}

impl ControlOutcome {
    pub fn failed(&self) -> bool {
        self.status == ControlStatus::Fail
    }
}

/// Evaluate the fixed rule set against a directory evidence snapshot.
pub fn evaluate(evidence: &Evidence) -> Vec<ControlOutcome> {
    vec![
        admin_mfa_coverage(evidence),
        user_mfa_coverage(evidence),
        admin_count_ceiling(evidence),
    ]
}

/// CIS 1.1.1: every account holding the top administrative role must have
/// an MFA registration. Admins absent from the report count as violations.
fn admin_mfa_coverage(evidence: &Evidence) -> ControlOutcome {
    let admins_without_mfa: Vec<&str> = evidence
        .global_admins
        .iter()
        .filter(|admin| {
            !evidence
                .mfa_report
                .iter()
                .any(|u| u.principal == admin.principal && u.mfa_registered)
        })
        .map(|admin| admin.principal.as_str())
        .collect();

    let compliant = admins_without_mfa.is_empty();
    ControlOutcome {
        control_id: "ADMIN-MFA-COVERAGE",
        control_name: "MFA enabled for administrators",
        status: if compliant { ControlStatus::Pass } else { ControlStatus::Fail },
        score: if compliant { 100 } else { 0 },
        evidence: if compliant {
            json!({ "message": "All administrators have MFA registered." })
        } else {
            json!({ "failed_users": admins_without_mfa })
        },
    }
}

/// CIS 1.1.2: every user should have an MFA registration. Status is
/// binary on the violation count (no violators means PASS, even for an
/// empty report) while the score is proportional, so FAIL with score 80
/// is a valid and expected combination.
fn user_mfa_coverage(evidence: &Evidence) -> ControlOutcome {
    let total_users = evidence.mfa_report.len();
    let users_without_mfa: Vec<&str> = evidence
        .mfa_report
        .iter()
        .filter(|u| !u.mfa_registered)
        .map(|u| u.principal.as_str())
        .collect();

    let score = if total_users > 0 {
        let covered = total_users - users_without_mfa.len();
        ((covered as f64 / total_users as f64) * 100.0).round() as i32
    } else {
        // Empty report is treated as zero coverage, not a crash
        0
    };

    ControlOutcome {
        control_id: "USER-MFA-COVERAGE",
        control_name: "MFA enabled for all users",
        status: if users_without_mfa.is_empty() {
            ControlStatus::Pass
        } else {
            ControlStatus::Fail
        },
        score,
        evidence: json!({
            "total_users": total_users,
            "failed_count": users_without_mfa.len(),
            "sample_failed": users_without_mfa
                .iter()
                .take(EVIDENCE_SAMPLE_LIMIT)
                .collect::<Vec<_>>(),
        }),
    }
}

/// CIS 1.5: keep the number of top administrative accounts below the ceiling.
fn admin_count_ceiling(evidence: &Evidence) -> ControlOutcome {
    let admin_count = evidence.global_admins.len();
    let compliant = admin_count < ADMIN_COUNT_CEILING;

    ControlOutcome {
        control_id: "ADMIN-COUNT-CEILING",
        control_name: "Minimize global administrator accounts (< 5)",
        status: if compliant { ControlStatus::Pass } else { ControlStatus::Fail },
        score: if compliant { 100 } else { 0 },
        evidence: json!({
            "admin_count": admin_count,
            "admins": evidence
                .global_admins
                .iter()
                .map(|a| a.principal.as_str())
                .collect::<Vec<_>>(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(principal: &str, mfa: bool) -> MfaRegistration {
        MfaRegistration {
            principal: principal.to_string(),
            mfa_registered: mfa,
        }
    }

    fn admin(principal: &str) -> AdminAccount {
        AdminAccount {
            principal: principal.to_string(),
        }
    }

    /// 10 users where 2 lack MFA, 6 admins where 1 lacks MFA.
    fn reference_evidence() -> Evidence {
        let mut mfa_report: Vec<MfaRegistration> =
            (0..8).map(|i| user(&format!("user{}@corp.test", i), true)).collect();
        mfa_report.push(user("weak1@corp.test", false));
        mfa_report.push(user("weak2@corp.test", false));

        let mut global_admins: Vec<AdminAccount> = mfa_report[0..5]
            .iter()
            .map(|u| admin(&u.principal))
            .collect();
        global_admins.push(admin("weak1@corp.test"));

        Evidence { mfa_report, global_admins }
    }

    #[test]
    fn reference_scenario_scores() {
        let results = evaluate(&reference_evidence());
        assert_eq!(results.len(), 3);

        let admin_mfa = &results[0];
        assert_eq!(admin_mfa.control_id, "ADMIN-MFA-COVERAGE");
        assert_eq!(admin_mfa.status, ControlStatus::Fail);
        assert_eq!(admin_mfa.score, 0);

        let user_mfa = &results[1];
        assert_eq!(user_mfa.control_id, "USER-MFA-COVERAGE");
        assert_eq!(user_mfa.status, ControlStatus::Fail);
        assert_eq!(user_mfa.score, 80);

        let ceiling = &results[2];
        assert_eq!(ceiling.control_id, "ADMIN-COUNT-CEILING");
        assert_eq!(ceiling.status, ControlStatus::Fail);
        assert_eq!(ceiling.score, 0);
    }

    #[test]
    fn fully_compliant_tenant_passes_everything() {
        let evidence = Evidence {
            mfa_report: vec![user("a@corp.test", true), user("b@corp.test", true)],
            global_admins: vec![admin("a@corp.test")],
        };
        let results = evaluate(&evidence);
        assert!(results.iter().all(|r| r.status == ControlStatus::Pass));
        assert!(results.iter().all(|r| r.score == 100));
    }

    #[test]
    fn admin_missing_from_report_is_a_violation() {
        let evidence = Evidence {
            mfa_report: vec![user("a@corp.test", true)],
            global_admins: vec![admin("ghost@corp.test")],
        };
        let admin_mfa = admin_mfa_coverage(&evidence);
        assert_eq!(admin_mfa.status, ControlStatus::Fail);
        assert_eq!(admin_mfa.score, 0);
        assert_eq!(
            admin_mfa.evidence["failed_users"],
            serde_json::json!(["ghost@corp.test"])
        );
    }

    #[test]
    fn empty_mfa_feed_passes_with_zero_score() {
        // Nobody lacks MFA when there is nobody, but coverage is still 0%
        let results = evaluate(&Evidence::default());
        let user_mfa = &results[1];
        assert_eq!(user_mfa.status, ControlStatus::Pass);
        assert_eq!(user_mfa.score, 0);
        // No admins at all still satisfies the ceiling
        assert_eq!(results[2].status, ControlStatus::Pass);
    }

    #[test]
    fn evidence_sample_is_capped() {
        let mfa_report = (0..25)
            .map(|i| user(&format!("user{}@corp.test", i), false))
            .collect();
        let evidence = Evidence { mfa_report, global_admins: vec![] };
        let user_mfa = user_mfa_coverage(&evidence);
        assert_eq!(user_mfa.evidence["failed_count"], 25);
        assert_eq!(user_mfa.evidence["sample_failed"].as_array().unwrap().len(), 10);
    }

    #[test]
    fn five_admins_breach_the_ceiling() {
        let evidence = Evidence {
            mfa_report: vec![],
            global_admins: (0..5).map(|i| admin(&format!("admin{}@corp.test", i))).collect(),
        };
        let ceiling = admin_count_ceiling(&evidence);
        assert_eq!(ceiling.status, ControlStatus::Fail);
    }
}
