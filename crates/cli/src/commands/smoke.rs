use std::future::Future;
use std::time::Instant;

use anyhow::{bail, ensure, Context};
use procure_client::{InMemoryProcurementApi, ProcurementApi};
use procure_core::domain::approval::{ApprovalRole, ApprovalStatus};
use procure_core::domain::directory::VendorId;
use procure_core::domain::payment::{PaymentOutcome, PaymentStatus};
use procure_core::domain::request::{NewRequest, RequestId, RequestStatus};
use procure_core::fixtures::{
    ENGINEERING, EXISTING_VENDOR, FINANCE, LEGAL, MANAGER, NEW_VENDOR, REQUESTER,
};
use procure_core::flows::derive_request_status;
use procure_core::routing::route_for;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::commands::{runtime, CommandResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum SmokeStatus {
    Pass,
    Fail,
}

#[derive(Debug, Serialize)]
struct SmokeCheck {
    name: &'static str,
    status: SmokeStatus,
    elapsed_ms: u64,
    message: String,
}

#[derive(Debug, Serialize)]
struct SmokeReport {
    command: &'static str,
    status: SmokeStatus,
    summary: String,
    total_elapsed_ms: u64,
    checks: Vec<SmokeCheck>,
}

type CheckResult = anyhow::Result<String>;

/// Drives the approval lifecycle end to end against a fresh in-memory engine per check.
pub fn run() -> CommandResult {
    let started = Instant::now();
    let runtime = match runtime() {
        Ok(runtime) => runtime,
        Err(error) => {
            let check = SmokeCheck {
                name: "runtime",
                status: SmokeStatus::Fail,
                elapsed_ms: 0,
                message: format!("failed to initialize async runtime: {error}"),
            };
            return finalize_report(vec![check], elapsed_ms(started));
        }
    };

    let checks = runtime.block_on(async {
        vec![
            timed("route_preview_parity", route_preview_parity).await,
            timed("status_derivation", status_derivation).await,
            timed("small_request_lifecycle", small_request_lifecycle).await,
            timed("rejection_short_circuits", rejection_short_circuits).await,
            timed("duplicate_decision_refused", duplicate_decision_refused).await,
            timed("payment_terminal_once_processed", payment_terminal_once_processed).await,
        ]
    });

    finalize_report(checks, elapsed_ms(started))
}

async fn timed<F, Fut>(name: &'static str, check: F) -> SmokeCheck
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = CheckResult>,
{
    let started = Instant::now();
    let outcome = check().await;
    let elapsed_ms = elapsed_ms(started);
    match outcome {
        Ok(message) => SmokeCheck { name, status: SmokeStatus::Pass, elapsed_ms, message },
        Err(error) => SmokeCheck {
            name,
            status: SmokeStatus::Fail,
            elapsed_ms,
            message: format!("{error:#}"),
        },
    }
}

async fn route_preview_parity() -> CheckResult {
    let vectors = [
        (Decimal::new(500, 0), EXISTING_VENDOR, false),
        (Decimal::new(500, 0), NEW_VENDOR, true),
        (Decimal::new(10000, 0), EXISTING_VENDOR, false),
        (Decimal::new(1000001, 2), EXISTING_VENDOR, false),
        (Decimal::new(12000, 0), NEW_VENDOR, true),
    ];
    let api = InMemoryProcurementApi::demo();

    for (amount, vendor, is_new) in vectors {
        let preview = route_for(amount, is_new).roles();
        let receipt = api.submit_request(&submission(amount, vendor)).await?;
        let created: Vec<ApprovalRole> =
            receipt.approval_steps.iter().map(|step| step.step.role).collect();
        ensure!(
            preview == created,
            "route for {amount} (new vendor: {is_new}) previewed {preview:?}, created {created:?}"
        );
    }
    Ok(format!("{} routing vectors match the created approval rows", vectors.len()))
}

async fn status_derivation() -> CheckResult {
    use ApprovalStatus::{Approved, Pending, Rejected};

    let cases = [
        (vec![Approved, Approved, Approved], RequestStatus::Approved),
        (vec![Approved, Approved, Rejected], RequestStatus::Rejected),
        (vec![Approved, Pending, Pending], RequestStatus::Pending),
        (vec![Pending, Rejected, Pending], RequestStatus::Rejected),
    ];
    for (rows, expected) in &cases {
        let derived = derive_request_status(rows.iter().copied());
        ensure!(derived == *expected, "{rows:?} derived {derived}, expected {expected}");
    }
    Ok(format!("{} approval-row combinations derive the expected status", cases.len()))
}

async fn small_request_lifecycle() -> CheckResult {
    let api = InMemoryProcurementApi::demo();
    let amount = Decimal::new(500, 0);
    let receipt = api.submit_request(&submission(amount, EXISTING_VENDOR)).await?;
    ensure!(receipt.approval_steps.len() == 1, "expected a single manager step");
    ensure!(api.payments().await?.is_empty(), "payment created before approval");

    let decision = api.approve(receipt.request_id, MANAGER).await?;
    ensure!(decision.status == RequestStatus::Approved, "request did not reach approved");

    let payments = api.payments().await?;
    ensure!(payments.len() == 1, "expected one payment, found {}", payments.len());
    let payment = &payments[0];
    ensure!(
        payment.payment_status == PaymentStatus::Pending && payment.amount == amount,
        "payment is not pending for the requested amount"
    );
    Ok(format!("request {} approved with payment {} pending", receipt.request_id, payment.id))
}

async fn rejection_short_circuits() -> CheckResult {
    let api = InMemoryProcurementApi::demo();
    let receipt = api.submit_request(&submission(Decimal::new(12000, 0), NEW_VENDOR)).await?;
    let roles: Vec<ApprovalRole> =
        receipt.approval_steps.iter().map(|step| step.step.role).collect();
    ensure!(
        roles == [ApprovalRole::Manager, ApprovalRole::Finance, ApprovalRole::Legal],
        "unexpected route {roles:?}"
    );

    api.approve(receipt.request_id, MANAGER).await?;
    api.approve(receipt.request_id, FINANCE).await?;
    let decision = api.reject(receipt.request_id, LEGAL).await?;
    ensure!(
        decision.status == RequestStatus::Rejected,
        "legal rejection did not reject the request"
    );
    ensure!(api.payments().await?.is_empty(), "rejected request produced a payment");
    Ok(format!("request {} rejected at the legal step", receipt.request_id))
}

async fn duplicate_decision_refused() -> CheckResult {
    let api = InMemoryProcurementApi::demo();
    let request_id = submit(&api, Decimal::new(800, 0), EXISTING_VENDOR).await?;
    api.approve(request_id, MANAGER).await?;

    match api.approve(request_id, MANAGER).await {
        Ok(_) => bail!("second approval was accepted"),
        Err(error) => Ok(format!("second approval refused: {}", error.alert_message())),
    }
}

async fn payment_terminal_once_processed() -> CheckResult {
    let api = InMemoryProcurementApi::demo();
    let request_id = submit(&api, Decimal::new(2500, 0), EXISTING_VENDOR).await?;
    api.approve(request_id, MANAGER).await?;
    let payment_id = api
        .payments()
        .await?
        .into_iter()
        .find(|payment| payment.request_id == request_id)
        .map(|payment| payment.id)
        .context("approved request has no payment")?;

    api.process_payment(payment_id, FINANCE, PaymentOutcome::Completed).await?;
    match api.process_payment(payment_id, FINANCE, PaymentOutcome::Failed).await {
        Ok(_) => bail!("completed payment was processed again"),
        Err(error) => Ok(format!(
            "payment {payment_id} completed; reprocessing refused: {}",
            error.alert_message()
        )),
    }
}

async fn submit(
    api: &InMemoryProcurementApi,
    amount: Decimal,
    vendor: VendorId,
) -> anyhow::Result<RequestId> {
    let receipt = api
        .submit_request(&submission(amount, vendor))
        .await
        .with_context(|| format!("submitting a {amount} request"))?;
    Ok(receipt.request_id)
}

fn submission(amount: Decimal, vendor_id: VendorId) -> NewRequest {
    NewRequest {
        title: format!("Smoke request for {amount}"),
        description: "smoke".to_string(),
        amount,
        vendor_id,
        department_id: ENGINEERING,
        requester_id: REQUESTER,
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

fn finalize_report(checks: Vec<SmokeCheck>, total_elapsed_ms: u64) -> CommandResult {
    let passed = checks.iter().filter(|check| check.status == SmokeStatus::Pass).count();
    let total = checks.len();
    let failed = checks.iter().any(|check| check.status == SmokeStatus::Fail);

    let report = SmokeReport {
        command: "smoke",
        status: if failed { SmokeStatus::Fail } else { SmokeStatus::Pass },
        summary: format!("smoke: {passed}/{total} checks passed in {total_elapsed_ms}ms"),
        total_elapsed_ms,
        checks,
    };

    let mut lines = vec![report.summary.clone()];
    for check in &report.checks {
        let marker = if check.status == SmokeStatus::Pass { "ok" } else { "fail" };
        lines.push(format!("- [{marker}] {} ({}ms): {}", check.name, check.elapsed_ms, check.message));
    }
    let machine = serde_json::to_string(&report).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"smoke\",\"status\":\"fail\",\"summary\":\"serialization failed\",\"error\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    });
    lines.push(machine);

    CommandResult { exit_code: if failed { 6 } else { 0 }, output: lines.join("\n") }
}
