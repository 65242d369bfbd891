use std::sync::Arc;

use procure_client::{ActionRunner, ProcurementApi};
use procure_core::config::LoadOptions;
use procure_core::dashboard::RequestDetailView;
use procure_core::domain::directory::UserId;
use procure_core::domain::request::RequestId;
use procure_core::flows::ApprovalDecision;

use tracing::warn;

use crate::commands::{render, CommandResult, Session};

pub fn run(
    options: LoadOptions,
    request_id: RequestId,
    user: Option<UserId>,
    decision: ApprovalDecision,
) -> CommandResult {
    let command = decision.as_str();
    let session = match Session::open(command, options) {
        Ok(session) => session,
        Err(result) => return result,
    };
    let approver_id = match session.acting_user(command, user) {
        Ok(user_id) => user_id,
        Err(result) => return result,
    };
    session.block_on(execute(Arc::clone(&session.api), request_id, approver_id, decision))
}

/// One approve or reject call; a refusal (already decided, not your step) is reported as is.
/// On success the request is fetched again so the output shows the backend's state.
pub async fn execute(
    api: Arc<dyn ProcurementApi>,
    request_id: RequestId,
    approver_id: UserId,
    decision: ApprovalDecision,
) -> CommandResult {
    let command = decision.as_str();
    let receipt = match ActionRunner::new(Arc::clone(&api))
        .decide(request_id, approver_id, decision)
        .await
    {
        Ok(receipt) => receipt,
        Err(alert) => {
            return CommandResult::alert(command, &alert).with_preamble(&alert.to_string());
        }
    };

    let mut preamble = format!("Request #{request_id} is now {}", receipt.status);
    match api.request_detail(request_id).await {
        Ok(detail) => {
            preamble.push('\n');
            preamble.push_str(&render::detail(&RequestDetailView::project(detail, None)));
        }
        Err(error) => {
            warn!(
                event_name = "cli.decide.reload_failed",
                request_id = %request_id,
                error = %error,
                "decision recorded but the request could not be reloaded"
            );
            preamble.push_str(&format!("\nUnable to reload request: {}", error.alert_message()));
        }
    }

    let message = if receipt.message.trim().is_empty() {
        format!("request {request_id} {}", decision.past_tense())
    } else {
        receipt.message
    };
    CommandResult::success(command, message).with_preamble(&preamble)
}
