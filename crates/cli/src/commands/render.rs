//! Plain-text rendering of dashboard projections.

use procure_client::Snapshot;
use procure_core::dashboard::{
    approval_role_label, display_or_unknown, format_money, format_timestamp, AdminView,
    ApproverMode, ApproverView, PaymentView, RequestDetailView, RequesterView, Urgency,
};
use procure_core::domain::directory::{Department, User, Vendor};
use procure_core::domain::payment::Payment;
use procure_core::domain::request::PurchaseRequest;
use procure_core::routing::ApprovalRoute;
use rust_decimal::Decimal;

pub fn users(users: &[User], departments: &[Department]) -> String {
    let mut lines = vec!["Select a user:".to_string()];
    for user in users {
        let department = user
            .department_id
            .and_then(|id| departments.iter().find(|department| department.id == id))
            .map(|department| department.name.as_str());
        lines.push(format!(
            "  [{}] {} <{}> - {} ({})",
            user.id,
            display_or_unknown(Some(user.name.as_str())),
            user.email,
            user.role,
            department.unwrap_or("No department"),
        ));
    }
    lines.join("\n")
}

pub fn route_preview(amount: Decimal, vendor: &Vendor, route: &ApprovalRoute) -> String {
    let novelty = if vendor.is_new_vendor { "new vendor" } else { "existing vendor" };
    let mut lines = vec![format!(
        "Approval route for {} with {} ({novelty}):",
        format_money(amount),
        vendor.name
    )];
    for step in &route.steps {
        lines.push(format!(
            "  {}. {} - {}",
            step.step_order,
            approval_role_label(step.role),
            step.reason
        ));
    }
    lines.push(format!("  {} approval step(s) required", route.len()));
    lines.join("\n")
}

pub fn requester(view: &RequesterView, vendors: &[Vendor]) -> String {
    let counts = view.counts;
    let mut lines = vec![
        format!("My Requests ({})", view.user_name),
        format!(
            "  total {} | pending {} | approved {} | rejected {}",
            counts.all, counts.pending, counts.approved, counts.rejected
        ),
    ];

    if view.requests.is_empty() {
        lines.push("  No requests yet. Submit one with `procure submit`.".to_string());
    }
    for request in &view.requests {
        lines.push(request_line(request));
    }

    if !vendors.is_empty() {
        let names: Vec<String> = vendors
            .iter()
            .map(|vendor| {
                if vendor.is_new_vendor {
                    format!("{} [{}] (new)", vendor.name, vendor.id)
                } else {
                    format!("{} [{}]", vendor.name, vendor.id)
                }
            })
            .collect();
        lines.push(format!("Vendors: {}", names.join(", ")));
    }
    lines.join("\n")
}

pub fn approver(title: &str, view: &ApproverView) -> String {
    let mut lines = vec![format!("{title} ({})", view.user_name)];
    match view.mode {
        ApproverMode::Pending => {
            lines.push(format!("Pending approvals: {}", view.pending_count()));
            if view.is_caught_up() {
                lines.push("  All caught up! No approvals waiting on you.".to_string());
            }
            for row in &view.pending {
                let urgency = match Urgency::for_amount(row.amount) {
                    Urgency::High => " HIGH",
                    Urgency::Standard => "",
                };
                lines.push(format!(
                    "  #{} {} - {}{urgency} | {} | vendor {} | dept {} | step {} ({}) | submitted {}",
                    row.request_id,
                    row.title,
                    format_money(row.amount),
                    display_or_unknown(row.requester_name.as_deref()),
                    display_or_unknown(row.vendor_name.as_deref()),
                    display_or_unknown(row.department_name.as_deref()),
                    row.step_order,
                    approval_role_label(row.role),
                    format_timestamp(row.request_created),
                ));
            }
        }
        ApproverMode::History => {
            lines.push(format!("All requests: {}", view.history.len()));
            for request in &view.history {
                lines.push(request_line(request));
            }
        }
    }
    lines.join("\n")
}

pub fn payments(view: &PaymentView) -> String {
    let mut lines = vec![
        "Payment Processing".to_string(),
        format!(
            "Pending payments: {} totalling {}",
            view.pending.len(),
            format_money(view.pending_total)
        ),
    ];
    if view.pending.is_empty() {
        lines.push("  No payments waiting to be processed.".to_string());
    }
    for payment in &view.pending {
        lines.push(payment_line(payment));
    }

    lines.push(format!("Processed payments: {}", view.processed.len()));
    for payment in &view.processed {
        lines.push(processed_payment(payment));
    }
    lines.join("\n")
}

pub fn processed_payment(payment: &Payment) -> String {
    format!(
        "{} | {} by {} at {}",
        payment_line(payment),
        payment.payment_status,
        display_or_unknown(payment.processed_by_name.as_deref()),
        format_timestamp(payment.processed_at),
    )
}

pub fn admin(view: &AdminView) -> String {
    let counts = view.counts;
    let stats = view.payment_stats;
    let mut lines = vec![
        "Admin Dashboard".to_string(),
        format!(
            "Requests: total {} | pending {} | approved {} | rejected {}",
            counts.all, counts.pending, counts.approved, counts.rejected
        ),
        format!("Approved value: {}", format_money(view.total_approved_value)),
        format!(
            "Payments: pending {} | completed {} | failed {} | total {}",
            stats.pending,
            stats.completed,
            stats.failed,
            format_money(stats.total_amount)
        ),
        format!("Requests ({}): {}", view.filter, view.requests.len()),
    ];
    for request in &view.requests {
        lines.push(request_line(request));
    }

    lines.push("Spend by vendor:".to_string());
    for vendor in &view.vendor_spend {
        lines.push(format!(
            "  {} - {} across {} request(s) (approved {}, pending {}, rejected {})",
            vendor.name,
            format_money(vendor.total),
            vendor.count,
            format_money(vendor.approved),
            format_money(vendor.pending),
            format_money(vendor.rejected),
        ));
    }
    lines.join("\n")
}

pub fn detail(view: &RequestDetailView) -> String {
    let request = &view.detail.request;
    let mut lines = vec![
        format!("Request #{}: {}", request.id, request.title),
        format!("  status: {}", request.status),
        format!("  amount: {}", format_money(request.amount)),
        format!("  requester: {}", display_or_unknown(request.requester_name.as_deref())),
        format!("  vendor: {}", display_or_unknown(request.vendor_name.as_deref())),
        format!("  department: {}", display_or_unknown(request.department_name.as_deref())),
        format!("  submitted: {}", format_timestamp(request.created_at)),
    ];
    if !request.description.trim().is_empty() {
        lines.push(format!("  description: {}", request.description));
    }

    lines.push("Approval steps:".to_string());
    for step in &view.steps {
        let mut line = format!(
            "  {}. {} - {} ({})",
            step.step_order,
            approval_role_label(step.role),
            display_or_unknown(step.approver_name.as_deref()),
            step.status,
        );
        if let Some(at) = step.approved_at {
            line.push_str(&format!(" {}", format_timestamp(Some(at))));
        }
        if view.current_step() == Some(step.id) {
            line.push_str(" <- current step");
        }
        lines.push(line);
    }

    lines.push("Audit trail:".to_string());
    for entry in &view.detail.audit_trail {
        lines.push(format!(
            "  {} {} by {}: {}",
            format_timestamp(entry.created_at),
            entry.action,
            display_or_unknown(entry.actor_name.as_deref()),
            entry.details.as_deref().unwrap_or_default(),
        ));
    }

    if let Some(action) = view.available_action() {
        lines.push(format!(
            "Your {} step is pending: `procure approve {id} --user <you>` or `procure reject {id} --user <you>`",
            approval_role_label(action.role),
            id = action.request_id,
        ));
    }
    lines.join("\n")
}

/// A note when a feed has no data yet or its last refresh failed.
pub fn feed_notice<T>(label: &str, snapshot: &Snapshot<T>) -> Option<String> {
    match (&snapshot.value, &snapshot.last_error) {
        (None, Some(error)) => Some(format!("Unable to load {label}: {}", error.alert_message())),
        (None, None) => Some(format!("Loading {label}...")),
        (Some(_), Some(error)) => Some(format!(
            "Showing {label} from {}; last refresh failed: {}",
            format_timestamp(snapshot.fetched_at),
            error.alert_message()
        )),
        (Some(_), None) => None,
    }
}

fn request_line(request: &PurchaseRequest) -> String {
    format!(
        "  #{} {} - {} | {} | vendor {} | {}",
        request.id,
        request.title,
        format_money(request.amount),
        request.status,
        display_or_unknown(request.vendor_name.as_deref()),
        format_timestamp(request.created_at),
    )
}

fn payment_line(payment: &Payment) -> String {
    format!(
        "  payment {} for request #{} {} - {} | {} | {} | {}",
        payment.id,
        payment.request_id,
        payment.title,
        format_money(payment.amount),
        display_or_unknown(payment.vendor_name.as_deref()),
        payment.payment_method.label(),
        payment.transaction_id,
    )
}
