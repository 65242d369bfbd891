use std::sync::Arc;

use procure_client::{ActionRunner, ProcurementApi};
use procure_core::config::LoadOptions;
use procure_core::dashboard::{approval_role_label, display_or_unknown, RequesterView};
use procure_core::domain::directory::{UserId, VendorId};
use procure_core::domain::request::NewRequest;
use procure_core::routing::route_for;
use rust_decimal::Decimal;

use crate::commands::preview::find_vendor;
use crate::commands::{render, resolve_user, CommandResult, Session};

const COMMAND: &str = "submit";

#[derive(Clone, Debug)]
pub struct SubmitArgs {
    pub user: Option<UserId>,
    pub title: String,
    pub description: String,
    pub amount: Decimal,
    pub vendor: VendorId,
}

pub fn run(options: LoadOptions, args: SubmitArgs) -> CommandResult {
    let session = match Session::open(COMMAND, options) {
        Ok(session) => session,
        Err(result) => return result,
    };
    let user_id = match session.acting_user(COMMAND, args.user) {
        Ok(user_id) => user_id,
        Err(result) => return result,
    };
    session.block_on(execute(Arc::clone(&session.api), user_id, &args))
}

pub async fn execute(
    api: Arc<dyn ProcurementApi>,
    user_id: UserId,
    args: &SubmitArgs,
) -> CommandResult {
    let user = match resolve_user(api.as_ref(), COMMAND, user_id).await {
        Ok(user) => user,
        Err(result) => return result,
    };
    let Some(department_id) = user.department_id else {
        return CommandResult::invalid_input(
            COMMAND,
            format!("user {} has no department to submit under", user.id),
        );
    };
    let vendor = match find_vendor(api.as_ref(), COMMAND, args.vendor).await {
        Ok(vendor) => vendor,
        Err(result) => return result,
    };

    let submission = NewRequest {
        title: args.title.trim().to_owned(),
        description: args.description.trim().to_owned(),
        amount: args.amount,
        vendor_id: vendor.id,
        department_id,
        requester_id: user.id,
    };
    if let Err(error) = submission.validate() {
        return CommandResult::invalid_input(COMMAND, error.to_string());
    }

    let route = route_for(args.amount, vendor.is_new_vendor);
    let mut lines = vec![render::route_preview(args.amount, &vendor, &route)];

    let runner = ActionRunner::new(Arc::clone(&api));
    let receipt = match runner.submit(&submission).await {
        Ok(receipt) => receipt,
        Err(alert) => {
            return CommandResult::alert(COMMAND, &alert).with_preamble(&lines.join("\n"));
        }
    };

    lines.push(format!("Submitted request #{} ({})", receipt.request_id, receipt.status));
    for step in &receipt.approval_steps {
        lines.push(format!(
            "  {}. {} - {}",
            step.step.step_order,
            approval_role_label(step.step.role),
            display_or_unknown(step.approver_name.as_deref()),
        ));
    }

    match api.requests().await {
        Ok(requests) => {
            let view = RequesterView::project(&user, &requests);
            lines.push(format!(
                "You now have {} request(s), {} pending",
                view.counts.all, view.counts.pending
            ));
        }
        Err(error) => {
            lines.push(format!("Could not refresh your requests: {}", error.alert_message()))
        }
    }

    CommandResult::success(COMMAND, format!("request {} submitted", receipt.request_id))
        .with_preamble(&lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use procure_client::InMemoryProcurementApi;
    use procure_core::domain::directory::VendorId;
    use procure_core::fixtures::{ADMIN, NEW_VENDOR, REQUESTER};
    use rust_decimal::Decimal;
    use serde_json::Value;

    use super::{execute, SubmitArgs};

    fn args(amount: Decimal, vendor: VendorId) -> SubmitArgs {
        SubmitArgs {
            user: None,
            title: "Snyk licence".to_owned(),
            description: "Security scanning".to_owned(),
            amount,
            vendor,
        }
    }

    fn last_line(output: &str) -> Value {
        serde_json::from_str(output.lines().last().unwrap_or_default()).expect("json outcome")
    }

    #[tokio::test]
    async fn submission_prints_route_then_created_steps() {
        let api = Arc::new(InMemoryProcurementApi::demo());
        let result = execute(api, REQUESTER, &args(Decimal::new(12000, 0), NEW_VENDOR)).await;

        assert_eq!(result.exit_code, 0);
        assert!(result.output.contains("3 approval step(s) required"));
        assert!(result.output.contains("Submitted request #1 (pending)"));
        assert!(result.output.contains("3. Legal Approver - Lily Johnson"));
        assert!(result.output.contains("You now have 1 request(s), 1 pending"));
        assert_eq!(last_line(&result.output)["status"], "ok");
    }

    #[tokio::test]
    async fn zero_amounts_are_refused_before_sending() {
        let api = Arc::new(InMemoryProcurementApi::demo());
        let result = execute(api.clone(), REQUESTER, &args(Decimal::ZERO, NEW_VENDOR)).await;

        assert_eq!(result.exit_code, 2);
        assert_eq!(last_line(&result.output)["error_class"], "invalid_input");
        assert!(api.engine().read().await.requests().is_empty());
    }

    #[tokio::test]
    async fn users_without_a_department_cannot_submit() {
        let api = Arc::new(InMemoryProcurementApi::demo());
        let result = execute(api, ADMIN, &args(Decimal::new(100, 0), NEW_VENDOR)).await;
        assert_eq!(result.exit_code, 2);
        assert!(result.output.contains("has no department"));
    }
}
