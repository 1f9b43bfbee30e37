use santa_core::deploy::DeploymentTrigger;

use super::CommandResult;

const COMMAND: &str = "deploy-target";

pub fn run(branch: Option<&str>, pr: Option<u64>, base_domain: &str) -> CommandResult {
    let trigger = match (branch, pr) {
        (_, Some(number)) => DeploymentTrigger::PullRequest { number },
        (Some(branch), None) => DeploymentTrigger::push(branch),
        (None, None) => {
            return CommandResult::failure(
                COMMAND,
                "invalid_input",
                "either --branch or --pr is required",
                2,
            );
        }
    };

    match trigger.resolve(base_domain) {
        Ok(Some(target)) => CommandResult::json(COMMAND, &target),
        Ok(None) => CommandResult::failure(
            COMMAND,
            "no_target",
            format!("branch `{}` is not deployed", branch.unwrap_or_default()),
            1,
        ),
        Err(error) => CommandResult::failure(COMMAND, "invalid_input", error.to_string(), 2),
    }
}
