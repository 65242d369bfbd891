use procure_client::ProcurementApi;
use procure_core::config::LoadOptions;
use procure_core::domain::directory::{Vendor, VendorId};
use procure_core::routing::route_for;
use rust_decimal::Decimal;

use crate::commands::{render, CommandResult, Session};

const COMMAND: &str = "preview";

pub fn run(options: LoadOptions, amount: Decimal, vendor_id: VendorId) -> CommandResult {
    match Session::open(COMMAND, options) {
        Ok(session) => session.block_on(execute(session.api.as_ref(), amount, vendor_id)),
        Err(result) => result,
    }
}

pub async fn execute(
    api: &dyn ProcurementApi,
    amount: Decimal,
    vendor_id: VendorId,
) -> CommandResult {
    if amount <= Decimal::ZERO {
        return CommandResult::invalid_input(COMMAND, "amount must be greater than zero");
    }
    match find_vendor(api, COMMAND, vendor_id).await {
        Ok(vendor) => CommandResult::text(render::route_preview(
            amount,
            &vendor,
            &route_for(amount, vendor.is_new_vendor),
        )),
        Err(result) => result,
    }
}

pub(crate) async fn find_vendor(
    api: &dyn ProcurementApi,
    command: &str,
    vendor_id: VendorId,
) -> Result<Vendor, CommandResult> {
    let vendors = api.vendors().await.map_err(|error| CommandResult::api_error(command, &error))?;
    vendors.into_iter().find(|vendor| vendor.id == vendor_id).ok_or_else(|| {
        CommandResult::invalid_input(command, format!("vendor {vendor_id} was not found"))
    })
}
