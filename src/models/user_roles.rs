use crate::{role::UserRole, schema::user_roles};
use anyhow::Context;

#[derive(Queryable)]
pub struct UserRoleData {
    pub id: u64,
    pub user_id: u64,
    pub role: String,
    pub approved: bool,
}

impl UserRoleData {
    pub fn into_user_role(self) -> anyhow::Result<UserRole> {
        Ok(UserRole {
            id: self.id,
            user_id: self.user_id,
            role: self.role.parse().context("stored user role")?,
            approved: self.approved,
        })
    }
}

#[derive(Insertable)]
#[table_name = "user_roles"]
pub struct NewUserRole {
    pub user_id: u64,
    pub role: String,
    pub approved: bool,
}
