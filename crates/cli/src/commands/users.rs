use procure_client::ProcurementApi;
use procure_core::config::LoadOptions;

use crate::commands::{render, CommandResult, Session};

const COMMAND: &str = "users";

pub fn run(options: LoadOptions) -> CommandResult {
    match Session::open(COMMAND, options) {
        Ok(session) => session.block_on(execute(session.api.as_ref())),
        Err(result) => result,
    }
}

pub async fn execute(api: &dyn ProcurementApi) -> CommandResult {
    let (users, departments) = match tokio::try_join!(api.users(), api.departments()) {
        Ok(loaded) => loaded,
        Err(error) => return CommandResult::api_error(COMMAND, &error),
    };
    if users.is_empty() {
        return CommandResult::text("No users are registered with the procurement service.");
    }
    CommandResult::text(render::users(&users, &departments))
}

#[cfg(test)]
mod tests {
    use procure_client::InMemoryProcurementApi;

    use super::execute;

    #[tokio::test]
    async fn lists_every_user_with_role_and_department() {
        let result = execute(&InMemoryProcurementApi::demo()).await;

        assert_eq!(result.exit_code, 0);
        assert!(result.output.contains("[1] Alice Chen <alice@company.com> - requester (Engineering)"));
        assert!(result.output.contains("[5] Admin User <admin@company.com> - admin (No department)"));
    }
}
