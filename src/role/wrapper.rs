use super::{
    commands::{ApproveRole, ListPendingRoles, ListUserRoles, RequestRole, RoleTag},
    Role, UserRole, UserRoleId,
};
use crate::{
    appointment::UserId,
    auth::{no_resource, AccessReport, AccessTag, Guard, UserContext},
    command::SimpleResult,
    database::RoleStore,
};

pub struct RoleWrapper<'a, S> {
    store: &'a S,
    guard: Guard<'a>,
}

impl<'a, S: RoleStore> RoleWrapper<'a, S> {
    pub fn new(store: &'a S, caller: Option<&'a UserContext>) -> Self {
        Self {
            store,
            guard: Guard::new(caller),
        }
    }

    pub fn request<F>(
        &self,
        role: Option<String>,
        on_result: F,
    ) -> anyhow::Result<Option<AccessReport>>
    where
        F: FnOnce(SimpleResult<UserRoleId, RoleTag>),
    {
        let store = self.store;
        self.guard.secure_action(
            "request role",
            &Role::ALL,
            no_resource,
            |caller, ()| RequestRole::new(store, caller.user_id(), role),
            on_result,
        )
    }

    pub fn approve<F>(&self, id: UserRoleId, on_result: F) -> anyhow::Result<Option<AccessReport>>
    where
        F: FnOnce(SimpleResult<UserRole, RoleTag>),
    {
        let store = self.store;
        self.guard.secure_action(
            "approve role",
            &[Role::Admin],
            |_| {
                Ok(match store.find_user_role(id)? {
                    Some(_) => Ok(()),
                    None => Err(AccessReport::invalid(
                        AccessTag::UserRoleId,
                        "No such role request",
                    )),
                })
            },
            |_, ()| ApproveRole::new(store, id),
            on_result,
        )
    }

    pub fn list_pending<F>(&self, on_result: F) -> anyhow::Result<Option<AccessReport>>
    where
        F: FnOnce(SimpleResult<Vec<UserRole>, RoleTag>),
    {
        let store = self.store;
        self.guard.secure_action(
            "list pending roles",
            &[Role::Admin],
            no_resource,
            |_, ()| ListPendingRoles::new(store),
            on_result,
        )
    }

    pub fn list_for_user<F>(
        &self,
        user_id: UserId,
        on_result: F,
    ) -> anyhow::Result<Option<AccessReport>>
    where
        F: FnOnce(SimpleResult<Vec<UserRole>, RoleTag>),
    {
        let store = self.store;
        self.guard.secure_action(
            "list user roles",
            &Role::ALL,
            |caller| {
                Ok(if caller.owns_or_admin(user_id) {
                    Ok(())
                } else {
                    Err(AccessReport::invalid(AccessTag::UserId, "No such user"))
                })
            },
            |_, ()| ListUserRoles::new(store, user_id),
            on_result,
        )
    }
}
