//! The approval routing rule.
//!
//! Given a request amount and whether the vendor is new, [`route_for`] returns the ordered
//! approval steps the request must clear. The dashboard preview and the reference workflow
//! engine both call this function, so the preview a requester sees and the approval rows
//! that get created are produced by the same code path.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::approval::ApprovalRole;

/// Amounts strictly above this value need finance sign-off.
pub const FINANCE_REVIEW_THRESHOLD: Decimal = Decimal::from_parts(10_000, 0, 0, false, 0);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteStep {
    pub step_order: u32,
    pub role: ApprovalRole,
    #[serde(default)]
    pub reason: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalRoute {
    pub steps: Vec<RouteStep>,
}

impl ApprovalRoute {
    pub fn roles(&self) -> Vec<ApprovalRole> {
        self.steps.iter().map(|step| step.role).collect()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn requires(&self, role: ApprovalRole) -> bool {
        self.steps.iter().any(|step| step.role == role)
    }

    fn push(&mut self, role: ApprovalRole, reason: &str) {
        let step_order = self.steps.len() as u32 + 1;
        self.steps.push(RouteStep { step_order, role, reason: reason.to_owned() });
    }
}

pub fn requires_finance_review(amount: Decimal) -> bool {
    amount > FINANCE_REVIEW_THRESHOLD
}

pub fn route_for(amount: Decimal, is_new_vendor: bool) -> ApprovalRoute {
    let mut route = ApprovalRoute::default();
    route.push(ApprovalRole::Manager, "always required");

    if requires_finance_review(amount) {
        route.push(ApprovalRole::Finance, "amount > $10,000");
    }
    if is_new_vendor {
        route.push(ApprovalRole::Legal, "new vendor");
    }

    route
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use crate::domain::approval::ApprovalRole::{Finance, Legal, Manager};

    use super::{route_for, FINANCE_REVIEW_THRESHOLD};

    fn dollars(value: i64) -> Decimal {
        Decimal::new(value, 0)
    }

    #[test]
    fn threshold_constant_is_ten_thousand() {
        assert_eq!(FINANCE_REVIEW_THRESHOLD, dollars(10_000));
    }

    #[test]
    fn route_vectors_match_rule_table() {
        let vectors = [
            (dollars(500), false, vec![Manager]),
            (dollars(500), true, vec![Manager, Legal]),
            (dollars(10_000), false, vec![Manager]),
            (Decimal::new(1_000_001, 2), false, vec![Manager, Finance]),
            (dollars(12_000), false, vec![Manager, Finance]),
            (dollars(12_000), true, vec![Manager, Finance, Legal]),
        ];

        for (amount, is_new_vendor, expected) in vectors {
            let route = route_for(amount, is_new_vendor);
            assert_eq!(route.roles(), expected, "amount={amount} new_vendor={is_new_vendor}");
        }
    }

    #[test]
    fn step_numbers_are_contiguous_from_one() {
        let route = route_for(dollars(500), true);
        let orders: Vec<u32> = route.steps.iter().map(|step| step.step_order).collect();
        assert_eq!(orders, vec![1, 2]);
        assert_eq!(route.steps[1].reason, "new vendor");
        assert!(!route.requires(Finance));
    }
}
