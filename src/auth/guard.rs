use tracing::debug;

use super::{AccessReport, UserContext};
use crate::{
    command::{Command, SimpleResult},
    role::Role,
};

/// Gates commands behind role and resource checks for one caller.
#[derive(Debug, Clone, Copy)]
pub struct Guard<'a> {
    caller: Option<&'a UserContext>,
}

impl<'a> Guard<'a> {
    pub fn new(caller: Option<&'a UserContext>) -> Self {
        Self { caller }
    }

    /// Runs the command built by `command` once the caller holds one of
    /// `required_roles` and `resource_check` accepts them.
    ///
    /// Returns the refusal, or `None` when the command ran; its own outcome
    /// goes to `on_result`. The command is never built for a refused caller.
    pub fn secure_action<R, C, K, B, F>(
        &self,
        action: &'static str,
        required_roles: &[Role],
        resource_check: K,
        command: B,
        on_result: F,
    ) -> anyhow::Result<Option<AccessReport>>
    where
        C: Command,
        K: FnOnce(&UserContext) -> anyhow::Result<Result<R, AccessReport>>,
        B: FnOnce(&UserContext, R) -> C,
        F: FnOnce(SimpleResult<C::Success, C::Tag>),
    {
        debug_assert!(!required_roles.is_empty());

        let caller = match self.caller {
            Some(caller) if caller.has_any(required_roles) => caller,
            Some(caller) => {
                debug!(
                    action,
                    user_id = caller.user_id(),
                    roles = ?caller.roles(),
                    "caller lacks required roles"
                );
                return Ok(Some(AccessReport::missing(required_roles.iter().copied())));
            }
            None => {
                debug!(action, "anonymous caller");
                return Ok(Some(AccessReport::missing(required_roles.iter().copied())));
            }
        };

        let resource = match resource_check(caller)? {
            Ok(resource) => resource,
            Err(report) => {
                debug!(action, user_id = caller.user_id(), "resource check refused");
                return Ok(Some(report));
            }
        };

        let result = command(caller, resource).execute()?;
        on_result(result);
        Ok(None)
    }
}

/// Resource check for operations that touch no existing record.
pub fn no_resource(_: &UserContext) -> anyhow::Result<Result<(), AccessReport>> {
    Ok(Ok(()))
}
