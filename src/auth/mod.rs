mod context;
mod guard;

use serde::{ser::SerializeStruct, Serialize, Serializer};
use std::collections::BTreeSet;

use crate::{command::ErrorMap, role::Role};

pub use self::{
    context::UserContext,
    guard::{no_resource, Guard},
};

/// Which identifier in a request failed the resource check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccessTag {
    AppointmentId,
    UserId,
    UserRoleId,
}

/// Why an authorization-gated operation was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessReport {
    MissingRoles(BTreeSet<Role>),
    InvalidResourceId(ErrorMap<AccessTag>),
}

impl AccessReport {
    pub fn missing<I: IntoIterator<Item = Role>>(roles: I) -> Self {
        AccessReport::MissingRoles(roles.into_iter().collect())
    }

    pub fn invalid<S: ToString>(tag: AccessTag, message: S) -> Self {
        AccessReport::InvalidResourceId(ErrorMap::single(tag, message))
    }

    pub fn missing_roles(&self) -> Option<&BTreeSet<Role>> {
        match self {
            AccessReport::MissingRoles(roles) => Some(roles),
            AccessReport::InvalidResourceId(_) => None,
        }
    }

    pub fn invalid_resource_id(&self) -> Option<&ErrorMap<AccessTag>> {
        match self {
            AccessReport::InvalidResourceId(errors) => Some(errors),
            AccessReport::MissingRoles(_) => None,
        }
    }
}

impl Serialize for AccessReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("AccessReport", 2)?;
        state.serialize_field("missing_roles", &self.missing_roles())?;
        state.serialize_field("invalid_resource_id", &self.invalid_resource_id())?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exactly_one_branch_is_populated() {
        let report = AccessReport::missing(vec![Role::Admin]);
        assert!(report.missing_roles().is_some());
        assert!(report.invalid_resource_id().is_none());

        let report = AccessReport::invalid(AccessTag::AppointmentId, "no such appointment");
        assert!(report.missing_roles().is_none());
        assert!(report.invalid_resource_id().is_some());
    }

    #[test]
    fn serializes_with_null_branch() {
        let report = AccessReport::missing(vec![Role::Admin]);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "missing_roles": ["ADMIN"], "invalid_resource_id": null })
        );
    }
}
