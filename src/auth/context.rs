use anyhow::Context;
use chrono::{Duration, NaiveDateTime};
use std::collections::BTreeSet;

use crate::{
    appointment::UserId,
    database::{RoleStore, SessionStore},
    role::Role,
};

/// The caller of one request and the roles approved for them.
///
/// Built once at the request boundary and handed to every wrapper call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserContext {
    user_id: UserId,
    roles: BTreeSet<Role>,
}

impl UserContext {
    pub fn new<I: IntoIterator<Item = Role>>(user_id: UserId, roles: I) -> Self {
        Self {
            user_id,
            roles: roles.into_iter().collect(),
        }
    }

    /// Looks the login token up and loads the approved roles of its user.
    ///
    /// Unknown or expired tokens resolve to `None`, i.e. an anonymous caller.
    pub fn resolve<S>(
        store: &S,
        token: &str,
        ttl: Duration,
        now: NaiveDateTime,
    ) -> anyhow::Result<Option<Self>>
    where
        S: SessionStore + RoleStore,
    {
        let session = match store.find_session(token).context("session lookup")? {
            Some(session) => session,
            None => return Ok(None),
        };
        if now.signed_duration_since(session.login_time) > ttl {
            tracing::debug!(user_id = session.user_id, "login token expired");
            return Ok(None);
        }

        let roles = store
            .find_approved_roles(session.user_id)
            .context("role lookup")?;
        Ok(Some(Self::new(session.user_id, roles)))
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn roles(&self) -> &BTreeSet<Role> {
        &self.roles
    }

    pub fn has_any(&self, roles: &[Role]) -> bool {
        roles.iter().any(|role| self.roles.contains(role))
    }

    pub fn is_admin(&self) -> bool {
        self.roles.contains(&Role::Admin)
    }

    pub fn owns_or_admin(&self, owner: UserId) -> bool {
        self.user_id == owner || self.is_admin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{database::memory::MemoryStore, utils::test_time};

    #[test]
    fn resolves_only_approved_roles() {
        let store = MemoryStore::new();
        let user = store.add_user("vera", &[Role::Guest, Role::Researcher]);
        store.add_pending_role(user, Role::Admin);
        store.add_session("token", user, test_time(9, 0));

        let ctx = UserContext::resolve(&store, "token", Duration::hours(1), test_time(9, 30))
            .unwrap()
            .unwrap();
        assert_eq!(ctx.user_id(), user);
        assert!(ctx.has_any(&[Role::Researcher]));
        assert!(!ctx.is_admin());
    }

    #[test]
    fn expired_or_unknown_tokens_are_anonymous() {
        let store = MemoryStore::new();
        let user = store.add_user("vera", &[Role::Guest]);
        store.add_session("token", user, test_time(9, 0));

        let expired =
            UserContext::resolve(&store, "token", Duration::hours(1), test_time(10, 1)).unwrap();
        assert!(expired.is_none());
        let unknown =
            UserContext::resolve(&store, "other", Duration::hours(1), test_time(9, 1)).unwrap();
        assert!(unknown.is_none());
    }

    #[test]
    fn admins_pass_ownership() {
        let admin = UserContext::new(1, vec![Role::Admin]);
        let member = UserContext::new(2, vec![Role::Member]);
        assert!(admin.owns_or_admin(2));
        assert!(member.owns_or_admin(2));
        assert!(!member.owns_or_admin(1));
    }
}
