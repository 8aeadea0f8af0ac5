//! Risk aggregation math
//!
//! Pure functions over click/leak counts. Persistence-free so every
//! formula is testable with plain integers.

use crate::models::RiskLevel;

/// Percentage of targets that fell for the lure.
///
/// Trained targets still count as vulnerable: training happens after
/// the compromise, it does not undo it.
pub fn fail_rate(vulnerable_targets: i64, total_targets: i64) -> i64 {
    if total_targets <= 0 {
        return 0;
    }
    ((vulnerable_targets as f64 / total_targets as f64) * 100.0).round() as i64
}

/// Percentage of vulnerable targets that completed remediation training.
pub fn recovery_rate(trained_targets: i64, vulnerable_targets: i64) -> i64 {
    if vulnerable_targets <= 0 {
        return 0;
    }
    ((trained_targets as f64 / vulnerable_targets as f64) * 100.0).round() as i64
}

/// Escalate an employee risk level from click/leak counters.
///
/// Monotonic: a leak makes the employee critical, a click makes them
/// vulnerable, and nothing ever demotes an already-raised level.
pub fn escalate(current: RiskLevel, times_compromised: i32, total_leaks: i32) -> RiskLevel {
    if total_leaks > 0 || current == RiskLevel::Critical {
        return RiskLevel::Critical;
    }
    if times_compromised > 0 || current == RiskLevel::Vulnerable {
        return RiskLevel::Vulnerable;
    }
    current
}

/// Effective organization risk score.
///
/// A stored manual override (> 0) wins; otherwise the score is the share
/// of employees whose risk level has been raised.
pub fn organization_risk_score(
    stored: Option<i32>,
    compromised_employees: i64,
    total_employees: i64,
) -> i64 {
    if let Some(score) = stored {
        if score > 0 {
            return score as i64;
        }
    }
    if total_employees <= 0 {
        return 0;
    }
    ((compromised_employees as f64 / total_employees as f64) * 100.0).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fail_and_recovery_rates_match_reference_scenario() {
        // 10 targets, 3 clicked + 1 trained => 4 vulnerable
        assert_eq!(fail_rate(4, 10), 40);
        assert_eq!(recovery_rate(1, 4), 25);
    }

    #[test]
    fn rates_are_zero_on_empty_denominators() {
        assert_eq!(fail_rate(0, 0), 0);
        assert_eq!(recovery_rate(3, 0), 0);
    }

    #[test]
    fn full_recovery_is_one_hundred_percent() {
        assert_eq!(recovery_rate(1, 1), 100);
    }

    #[test]
    fn leak_escalates_to_critical() {
        assert_eq!(escalate(RiskLevel::Unknown, 0, 2), RiskLevel::Critical);
        assert_eq!(escalate(RiskLevel::Vulnerable, 3, 1), RiskLevel::Critical);
    }

    #[test]
    fn click_escalates_to_vulnerable() {
        assert_eq!(escalate(RiskLevel::Unknown, 1, 0), RiskLevel::Vulnerable);
    }

    #[test]
    fn risk_level_never_demotes() {
        assert_eq!(escalate(RiskLevel::Critical, 0, 0), RiskLevel::Critical);
        assert_eq!(escalate(RiskLevel::Vulnerable, 0, 0), RiskLevel::Vulnerable);
        assert_eq!(escalate(RiskLevel::Unknown, 0, 0), RiskLevel::Unknown);
    }

    #[test]
    fn stored_override_wins_over_computed_score() {
        assert_eq!(organization_risk_score(Some(73), 1, 100), 73);
    }

    #[test]
    fn zero_override_falls_back_to_computed_score() {
        assert_eq!(organization_risk_score(Some(0), 3, 10), 30);
        assert_eq!(organization_risk_score(None, 3, 10), 30);
        assert_eq!(organization_risk_score(None, 0, 0), 0);
    }
}
