use std::str::FromStr;

use qrdine_application::AccessGuard;
use qrdine_core::{AppError, UserId};

pub const USAGE: &str = "usage: qrdine-authz <user-id> [--permission NAME] [--role NAME] \
[--any-role NAME[,NAME...]] [--resource RESOURCE:ACTION] [--require-all] [--hide-denied]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliCommand {
    pub user_id: UserId,
    pub guard: Option<AccessGuard>,
}

impl CliCommand {
    pub fn parse<I>(args: I) -> Result<Self, AppError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut args = args.into_iter();
        let user_id = args
            .next()
            .ok_or_else(|| AppError::Validation(USAGE.to_owned()))
            .and_then(|value| UserId::from_str(value.as_str()))?;

        let mut guard = AccessGuard::new();
        let mut guard_requested = false;

        while let Some(flag) = args.next() {
            guard_requested = true;
            guard = match flag.as_str() {
                "--permission" => guard.permission(flag_value(&mut args, "--permission")?),
                "--role" => guard.role(flag_value(&mut args, "--role")?),
                "--any-role" => {
                    let names = flag_value(&mut args, "--any-role")?;
                    guard.any_role(
                        names
                            .split(',')
                            .map(str::trim)
                            .filter(|name| !name.is_empty())
                            .map(str::to_owned)
                            .collect::<Vec<_>>(),
                    )
                }
                "--resource" => {
                    let value = flag_value(&mut args, "--resource")?;
                    let Some((resource, action)) = value.split_once(':') else {
                        return Err(AppError::Validation(format!(
                            "--resource expects RESOURCE:ACTION, got '{value}'"
                        )));
                    };
                    guard.resource_action(resource.trim(), action.trim())
                }
                "--require-all" => guard.require_all(true),
                "--hide-denied" => guard.show_error(false),
                other => {
                    return Err(AppError::Validation(format!(
                        "unknown argument '{other}'\n{USAGE}"
                    )));
                }
            };
        }

        Ok(Self {
            user_id,
            guard: guard_requested.then_some(guard),
        })
    }
}

fn flag_value<I>(args: &mut I, flag: &str) -> Result<String, AppError>
where
    I: Iterator<Item = String>,
{
    args.next()
        .filter(|value| !value.starts_with("--") && !value.trim().is_empty())
        .ok_or_else(|| AppError::Validation(format!("{flag} requires a value")))
}

#[cfg(test)]
mod tests {
    use qrdine_application::AccessGuard;
    use qrdine_core::UserId;

    use super::CliCommand;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| (*value).to_owned()).collect()
    }

    #[test]
    fn user_id_alone_requests_no_guard() {
        let user_id = UserId::random();
        let command = CliCommand::parse(args(&[user_id.to_string().as_str()]));

        assert!(command.is_ok_and(|command| command.user_id == user_id && command.guard.is_none()));
    }

    #[test]
    fn guard_flags_build_the_guard() {
        let user_id = UserId::random();
        let command = CliCommand::parse(args(&[
            user_id.to_string().as_str(),
            "--permission",
            "manage_users",
            "--any-role",
            "admin, super_admin",
            "--resource",
            "users:write",
            "--require-all",
        ]));
        let Ok(command) = command else {
            panic!("arguments should parse");
        };

        let expected = AccessGuard::new()
            .permission("manage_users")
            .any_role(["admin", "super_admin"])
            .resource_action("users", "write")
            .require_all(true);
        assert_eq!(command.guard, Some(expected));
    }

    #[test]
    fn malformed_arguments_are_rejected() {
        let user_id = UserId::random().to_string();

        assert!(CliCommand::parse(Vec::new()).is_err());
        assert!(CliCommand::parse(args(&["nope"])).is_err());
        assert!(CliCommand::parse(args(&[user_id.as_str(), "--role"])).is_err());
        assert!(CliCommand::parse(args(&[user_id.as_str(), "--resource", "users"])).is_err());
        assert!(CliCommand::parse(args(&[user_id.as_str(), "--verbose"])).is_err());
    }
}
