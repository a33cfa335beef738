use super::{AllottedTime, AllottedTimeTag, RetrieveAllottedTime, UpdateAllottedTime};
use crate::{
    appointment::UserId,
    auth::{AccessReport, AccessTag, Guard, UserContext},
    command::SimpleResult,
    database::{AllottedTimeStore, AppointmentStore, RoleStore},
    role::Role,
};

pub struct AllottedTimeWrapper<'a, S> {
    store: &'a S,
    guard: Guard<'a>,
}

impl<'a, S> AllottedTimeWrapper<'a, S>
where
    S: AppointmentStore + AllottedTimeStore + RoleStore,
{
    pub fn new(store: &'a S, caller: Option<&'a UserContext>) -> Self {
        Self {
            store,
            guard: Guard::new(caller),
        }
    }

    /// Users may read their own cap; admins may read anyone's.
    pub fn retrieve<F>(
        &self,
        user_id: UserId,
        on_result: F,
    ) -> anyhow::Result<Option<AccessReport>>
    where
        F: FnOnce(SimpleResult<AllottedTime, AllottedTimeTag>),
    {
        let store = self.store;
        self.guard.secure_action(
            "retrieve allotted time",
            &Role::ALL,
            |caller| {
                Ok(if caller.owns_or_admin(user_id) && store.user_exists(user_id)? {
                    Ok(())
                } else {
                    Err(AccessReport::invalid(AccessTag::UserId, "No such user"))
                })
            },
            |_, ()| RetrieveAllottedTime::new(store, user_id),
            on_result,
        )
    }

    pub fn update<F>(
        &self,
        user_id: UserId,
        minutes: Option<i64>,
        on_result: F,
    ) -> anyhow::Result<Option<AccessReport>>
    where
        F: FnOnce(SimpleResult<i64, AllottedTimeTag>),
    {
        let store = self.store;
        self.guard.secure_action(
            "update allotted time",
            &[Role::Admin],
            |_| {
                Ok(if store.user_exists(user_id)? {
                    Ok(())
                } else {
                    Err(AccessReport::invalid(AccessTag::UserId, "No such user"))
                })
            },
            |_, ()| UpdateAllottedTime::new(store, user_id, minutes),
            on_result,
        )
    }
}
