use procure_client::ProcurementApi;
use procure_core::config::LoadOptions;
use procure_core::dashboard::RequestDetailView;
use procure_core::domain::directory::UserId;
use procure_core::domain::request::RequestId;

use crate::commands::{render, resolve_user, CommandResult, Session};

const COMMAND: &str = "show";

pub fn run(options: LoadOptions, request_id: RequestId, viewer: Option<UserId>) -> CommandResult {
    let session = match Session::open(COMMAND, options) {
        Ok(session) => session,
        Err(result) => return result,
    };
    let viewer = viewer.or(session.config.session.user_id);
    session.block_on(execute(session.api.as_ref(), request_id, viewer))
}

pub async fn execute(
    api: &dyn ProcurementApi,
    request_id: RequestId,
    viewer: Option<UserId>,
) -> CommandResult {
    let viewer = match viewer {
        Some(user_id) => match resolve_user(api, COMMAND, user_id).await {
            Ok(user) => Some(user),
            Err(result) => return result,
        },
        None => None,
    };

    match api.request_detail(request_id).await {
        Ok(detail) => {
            CommandResult::text(render::detail(&RequestDetailView::project(detail, viewer.as_ref())))
        }
        Err(error) => CommandResult::api_error(COMMAND, &error),
    }
}

#[cfg(test)]
mod tests {
    use procure_client::{InMemoryProcurementApi, ProcurementApi};
    use procure_core::domain::request::{NewRequest, RequestId};
    use procure_core::fixtures::{
        ENGINEERING, EXISTING_VENDOR, LEGAL, MANAGER, NEW_VENDOR, REQUESTER,
    };
    use rust_decimal::Decimal;

    use super::execute;

    async fn submitted() -> (InMemoryProcurementApi, RequestId) {
        let api = InMemoryProcurementApi::demo();
        let receipt = api
            .submit_request(&NewRequest {
                title: "GitHub seats".to_owned(),
                description: "Ten more seats".to_owned(),
                amount: Decimal::new(500, 0),
                vendor_id: EXISTING_VENDOR,
                department_id: ENGINEERING,
                requester_id: REQUESTER,
            })
            .await
            .expect("submit");
        (api, receipt.request_id)
    }

    #[tokio::test]
    async fn owning_approver_gets_the_action_hint() {
        let (api, request_id) = submitted().await;
        let result = execute(&api, request_id, Some(MANAGER)).await;

        assert_eq!(result.exit_code, 0);
        assert!(result.output.contains("1. Department Manager - Bob Smith (pending)"));
        assert!(result.output.contains("Request created: GitHub seats"));
        assert!(result.output.contains("Your Department Manager step is pending"));
    }

    #[tokio::test]
    async fn requesters_and_unrelated_approvers_get_no_hint() {
        let (api, request_id) = submitted().await;
        for viewer in [REQUESTER, LEGAL] {
            let result = execute(&api, request_id, Some(viewer)).await;
            assert!(!result.output.contains("step is pending"));
        }
    }

    #[tokio::test]
    async fn missing_requests_exit_as_rejected() {
        let (api, _) = submitted().await;
        let result = execute(&api, RequestId(404), None).await;
        assert_eq!(result.exit_code, 3);
        assert!(result.output.contains("request 404 was not found"));
    }

    #[tokio::test]
    async fn lowest_pending_step_is_marked_current() {
        let api = InMemoryProcurementApi::demo();
        let request_id = api
            .submit_request(&NewRequest {
                title: "Snyk licence".to_owned(),
                description: String::new(),
                amount: Decimal::new(12000, 0),
                vendor_id: NEW_VENDOR,
                department_id: ENGINEERING,
                requester_id: REQUESTER,
            })
            .await
            .expect("submit")
            .request_id;
        api.approve(request_id, MANAGER).await.expect("manager approves");

        let result = execute(&api, request_id, None).await;
        let marked: Vec<&str> =
            result.output.lines().filter(|line| line.ends_with("<- current step")).collect();
        assert_eq!(marked.len(), 1);
        assert!(marked[0].starts_with("  2. Finance Approver - Fiona Davis (pending)"));

        api.reject(request_id, LEGAL).await.expect("legal rejects");
        let closed = execute(&api, request_id, None).await;
        assert!(!closed.output.contains("<- current step"));
    }
}
