use std::sync::Arc;

use procure_client::{ActionRunner, ProcurementApi};
use procure_core::config::LoadOptions;
use procure_core::domain::directory::UserId;
use procure_core::domain::payment::{PaymentId, PaymentOutcome};

use tracing::warn;

use crate::commands::{render, CommandResult, Session};

const COMMAND: &str = "pay";

pub fn run(
    options: LoadOptions,
    payment_id: PaymentId,
    user: Option<UserId>,
    outcome: PaymentOutcome,
) -> CommandResult {
    let session = match Session::open(COMMAND, options) {
        Ok(session) => session,
        Err(result) => return result,
    };
    let processed_by = match session.acting_user(COMMAND, user) {
        Ok(user_id) => user_id,
        Err(result) => return result,
    };
    session.block_on(execute(Arc::clone(&session.api), payment_id, processed_by, outcome))
}

/// Processes one payment, then reloads the payment list to show the row as the backend
/// now reports it.
pub async fn execute(
    api: Arc<dyn ProcurementApi>,
    payment_id: PaymentId,
    processed_by: UserId,
    outcome: PaymentOutcome,
) -> CommandResult {
    let receipt = match ActionRunner::new(Arc::clone(&api))
        .process_payment(payment_id, processed_by, outcome)
        .await
    {
        Ok(receipt) => receipt,
        Err(alert) => {
            return CommandResult::alert(COMMAND, &alert).with_preamble(&alert.to_string());
        }
    };

    let mut preamble = format!("Payment {} marked {outcome}", receipt.payment_id);
    match api.payments().await {
        Ok(payments) => {
            if let Some(payment) = payments.iter().find(|payment| payment.id == payment_id) {
                preamble.push('\n');
                preamble.push_str(&render::processed_payment(payment));
            }
        }
        Err(error) => {
            warn!(
                event_name = "cli.pay.reload_failed",
                payment_id = %payment_id,
                error = %error,
                "payment processed but the payment list could not be reloaded"
            );
            preamble.push_str(&format!("\nUnable to reload payments: {}", error.alert_message()));
        }
    }
    CommandResult::success(COMMAND, receipt.message).with_preamble(&preamble)
}
