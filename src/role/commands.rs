use anyhow::Context;
use serde::Serialize;
use tracing::info;

use super::{Role, UserRole, UserRoleId};
use crate::{
    appointment::UserId,
    command::{Command, ErrorMap, SimpleResult},
    database::RoleStore,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoleTag {
    Id,
    UserId,
    Role,
    Approved,
}

/// Files a pending request for `role`; an admin has to approve it.
pub struct RequestRole<'a, S> {
    store: &'a S,
    user_id: UserId,
    role: Option<String>,
}

impl<'a, S: RoleStore> RequestRole<'a, S> {
    pub fn new(store: &'a S, user_id: UserId, role: Option<String>) -> Self {
        Self {
            store,
            user_id,
            role,
        }
    }
}

impl<S: RoleStore> Command for RequestRole<'_, S> {
    type Success = UserRoleId;
    type Tag = RoleTag;

    fn execute(&self) -> anyhow::Result<SimpleResult<UserRoleId, RoleTag>> {
        let role = match self.role.as_deref().map(str::parse::<Role>) {
            Some(Ok(role)) => role,
            Some(Err(err)) => return Ok(Err(ErrorMap::single(RoleTag::Role, err))),
            None => return Ok(Err(ErrorMap::single(RoleTag::Role, "role is required"))),
        };

        let held = self
            .store
            .find_user_roles(self.user_id)
            .context("user roles")?
            .into_iter()
            .find(|user_role| user_role.role == role);
        if let Some(held) = held {
            let message = if held.approved {
                format!("{} is already held", role)
            } else {
                format!("{} is already requested", role)
            };
            return Ok(Err(ErrorMap::single(RoleTag::Role, message)));
        }

        let id = self
            .store
            .insert_user_role(self.user_id, role, false)
            .context("insert user role")?;
        info!(user_role_id = id, user_id = self.user_id, role = %role, "role requested");
        Ok(Ok(id))
    }
}

pub struct ApproveRole<'a, S> {
    store: &'a S,
    id: UserRoleId,
}

impl<'a, S: RoleStore> ApproveRole<'a, S> {
    pub fn new(store: &'a S, id: UserRoleId) -> Self {
        Self { store, id }
    }
}

impl<S: RoleStore> Command for ApproveRole<'_, S> {
    type Success = UserRole;
    type Tag = RoleTag;

    fn execute(&self) -> anyhow::Result<SimpleResult<UserRole, RoleTag>> {
        let mut user_role = match self.store.find_user_role(self.id)? {
            Some(user_role) => user_role,
            None => return Ok(Err(ErrorMap::single(RoleTag::Id, "No such role request"))),
        };
        if user_role.approved {
            return Ok(Err(ErrorMap::single(
                RoleTag::Approved,
                "role is already approved",
            )));
        }

        self.store
            .approve_user_role(self.id)
            .context("approve user role")?;
        user_role.approved = true;
        info!(
            user_role_id = self.id,
            user_id = user_role.user_id,
            role = %user_role.role,
            "role approved"
        );
        Ok(Ok(user_role))
    }
}

pub struct ListPendingRoles<'a, S> {
    store: &'a S,
}

impl<'a, S: RoleStore> ListPendingRoles<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }
}

impl<S: RoleStore> Command for ListPendingRoles<'_, S> {
    type Success = Vec<UserRole>;
    type Tag = RoleTag;

    fn execute(&self) -> anyhow::Result<SimpleResult<Vec<UserRole>, RoleTag>> {
        Ok(Ok(self.store.find_pending_roles().context("pending roles")?))
    }
}

pub struct ListUserRoles<'a, S> {
    store: &'a S,
    user_id: UserId,
}

impl<'a, S: RoleStore> ListUserRoles<'a, S> {
    pub fn new(store: &'a S, user_id: UserId) -> Self {
        Self { store, user_id }
    }
}

impl<S: RoleStore> Command for ListUserRoles<'_, S> {
    type Success = Vec<UserRole>;
    type Tag = RoleTag;

    fn execute(&self) -> anyhow::Result<SimpleResult<Vec<UserRole>, RoleTag>> {
        if !self.store.user_exists(self.user_id)? {
            return Ok(Err(ErrorMap::single(RoleTag::UserId, "No such user")));
        }
        Ok(Ok(self.store.find_user_roles(self.user_id)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::memory::MemoryStore;

    #[test]
    fn requested_role_waits_for_approval() {
        let store = MemoryStore::new();
        let user = store.add_user("sam", &[Role::Guest]);

        let id = RequestRole::new(&store, user, Some("STUDENT".to_string()))
            .execute()
            .unwrap()
            .unwrap();
        assert_eq!(
            store.find_approved_roles(user).unwrap().into_iter().collect::<Vec<_>>(),
            vec![Role::Guest]
        );
        assert_eq!(
            ListPendingRoles::new(&store).execute().unwrap().unwrap()[0].id,
            id
        );

        let approved = ApproveRole::new(&store, id).execute().unwrap().unwrap();
        assert!(approved.approved);
        assert!(store.find_approved_roles(user).unwrap().contains(&Role::Student));
        assert!(ListPendingRoles::new(&store).execute().unwrap().unwrap().is_empty());
    }

    #[test]
    fn duplicate_and_unknown_roles_are_rejected() {
        let store = MemoryStore::new();
        let user = store.add_user("sam", &[Role::Guest]);
        RequestRole::new(&store, user, Some("MEMBER".to_string()))
            .execute()
            .unwrap()
            .unwrap();

        for role in [Some("MEMBER"), Some("GUEST"), Some("ASTRONAUT"), None].iter() {
            let errors = RequestRole::new(&store, user, role.map(str::to_string))
                .execute()
                .unwrap()
                .unwrap_err();
            assert!(errors.contains(RoleTag::Role), "{:?} accepted", role);
        }
    }

    #[test]
    fn approving_twice_is_an_error() {
        let store = MemoryStore::new();
        let user = store.add_user("sam", &[Role::Guest]);
        let id = store.add_pending_role(user, Role::Researcher);

        ApproveRole::new(&store, id).execute().unwrap().unwrap();
        let errors = ApproveRole::new(&store, id).execute().unwrap().unwrap_err();
        assert!(errors.contains(RoleTag::Approved));

        let missing = ApproveRole::new(&store, 999).execute().unwrap().unwrap_err();
        assert!(missing.contains(RoleTag::Id));
    }

    #[test]
    fn list_for_unknown_user_fails() {
        let store = MemoryStore::new();
        let errors = ListUserRoles::new(&store, 7).execute().unwrap().unwrap_err();
        assert!(errors.contains(RoleTag::UserId));
    }
}
