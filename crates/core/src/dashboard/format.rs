use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::domain::approval::ApprovalRole;
use crate::routing::requires_finance_review;

pub fn approval_role_label(role: ApprovalRole) -> &'static str {
    match role {
        ApprovalRole::Manager => "Department Manager",
        ApprovalRole::Finance => "Finance Approver",
        ApprovalRole::Legal => "Legal Approver",
        ApprovalRole::Unknown => "Approver",
    }
}

/// Highlight for amounts large enough to need finance review.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Standard,
    High,
}

impl Urgency {
    pub fn for_amount(amount: Decimal) -> Self {
        if requires_finance_review(amount) {
            Self::High
        } else {
            Self::Standard
        }
    }
}

/// `$12,000.00`
pub fn format_money(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() { "-" } else { "" };
    let text = format!("{:.2}", rounded.abs());
    let (whole, cents) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (index, digit) in whole.chars().enumerate() {
        if index > 0 && (whole.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    format!("{sign}${grouped}.{cents}")
}

pub fn display_or_unknown(value: Option<&str>) -> &str {
    match value {
        Some(text) if !text.trim().is_empty() => text,
        _ => "Unknown",
    }
}

pub fn format_timestamp(value: Option<DateTime<Utc>>) -> String {
    match value {
        Some(at) => at.format("%Y-%m-%d %H:%M").to_string(),
        None => "Unknown".to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    use crate::domain::approval::ApprovalRole;

    use super::{
        approval_role_label, display_or_unknown, format_money, format_timestamp, Urgency,
    };

    #[test]
    fn money_is_grouped_with_two_decimals() {
        assert_eq!(format_money(Decimal::new(12_000, 0)), "$12,000.00");
        assert_eq!(format_money(Decimal::new(500, 0)), "$500.00");
        assert_eq!(format_money(Decimal::new(123_456_789, 2)), "$1,234,567.89");
        assert_eq!(format_money(Decimal::new(-2_500_5, 1)), "-$2,500.50");
        assert_eq!(format_money(Decimal::ZERO), "$0.00");
    }

    #[test]
    fn urgency_flags_amounts_above_the_finance_threshold() {
        assert_eq!(Urgency::for_amount(Decimal::new(10_000, 0)), Urgency::Standard);
        assert_eq!(Urgency::for_amount(Decimal::new(10_001, 0)), Urgency::High);
    }

    #[test]
    fn missing_display_values_render_as_unknown() {
        assert_eq!(display_or_unknown(Some("GitHub")), "GitHub");
        assert_eq!(display_or_unknown(Some("  ")), "Unknown");
        assert_eq!(display_or_unknown(None), "Unknown");
        assert_eq!(format_timestamp(None), "Unknown");

        let at = Utc.with_ymd_and_hms(2024, 5, 2, 10, 30, 0).single();
        assert_eq!(format_timestamp(at), "2024-05-02 10:30");
    }

    #[test]
    fn role_labels_match_dashboard_headings() {
        assert_eq!(approval_role_label(ApprovalRole::Manager), "Department Manager");
        assert_eq!(approval_role_label(ApprovalRole::Finance), "Finance Approver");
        assert_eq!(approval_role_label(ApprovalRole::Legal), "Legal Approver");
    }
}
