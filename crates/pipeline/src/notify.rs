//! Notification routing
//!
//! Decides which notification a finished analysis produces. High-risk
//! routing is deliberately eager: either a high/critical risk level or a
//! score at the review threshold is enough, so a verdict with an
//! inconsistent level/score pair still alerts.

use veridoc_common::db::models::NotificationKind;
use veridoc_common::verdict::RiskLevel;
use veridoc_common::REVIEW_THRESHOLD;

/// Pick the notification kind for a completed analysis
pub fn route_notification(score: i32, risk_level: RiskLevel) -> NotificationKind {
    let high_level = matches!(risk_level, RiskLevel::High | RiskLevel::Critical);
    if high_level || score >= REVIEW_THRESHOLD {
        NotificationKind::HighRisk
    } else {
        NotificationKind::AnalysisComplete
    }
}

/// Build the notification title and message for a completed analysis
pub fn notification_content(
    filename: &str,
    score: i32,
    risk_level: RiskLevel,
) -> (NotificationKind, String, String) {
    let kind = route_notification(score, risk_level);
    match kind {
        NotificationKind::HighRisk => (
            kind,
            "High Risk Document Detected".to_string(),
            format!(
                "\"{}\" has a fraud risk score of {}/100. Review recommended.",
                filename, score
            ),
        ),
        _ => (
            kind,
            "Analysis Complete".to_string(),
            format!(
                "\"{}\" has been analyzed. Fraud risk score: {}/100.",
                filename, score
            ),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_low_score_low_level_is_routine() {
        assert_eq!(
            route_notification(10, RiskLevel::Low),
            NotificationKind::AnalysisComplete
        );
    }

    #[test]
    fn test_high_level_alerts_even_with_low_score() {
        assert_eq!(
            route_notification(30, RiskLevel::High),
            NotificationKind::HighRisk
        );
        assert_eq!(
            route_notification(30, RiskLevel::Critical),
            NotificationKind::HighRisk
        );
    }

    #[test]
    fn test_threshold_score_alerts_even_with_low_level() {
        assert_eq!(
            route_notification(60, RiskLevel::Low),
            NotificationKind::HighRisk
        );
        assert_eq!(
            route_notification(59, RiskLevel::Low),
            NotificationKind::AnalysisComplete
        );
    }

    #[test]
    fn test_content_mentions_filename_and_score() {
        let (kind, title, message) = notification_content("invoice.pdf", 85, RiskLevel::High);
        assert_eq!(kind, NotificationKind::HighRisk);
        assert_eq!(title, "High Risk Document Detected");
        assert!(message.contains("invoice.pdf"));
        assert!(message.contains("85"));
    }
}
