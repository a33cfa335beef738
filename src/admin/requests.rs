use serde::Deserialize;

use crate::{
    appointment::{AppointmentId, UserId},
    role::UserRoleId,
};

#[derive(Deserialize)]
pub struct ApproveAppointmentRequest {
    pub login_token: String,
    pub id: AppointmentId,
}

#[derive(Deserialize)]
pub struct ApproveRoleRequest {
    pub login_token: String,
    pub id: UserRoleId,
}

#[derive(Deserialize)]
pub struct ListPendingRolesRequest {
    pub login_token: String,
}

#[derive(Deserialize)]
pub struct UpdateAllottedTimeRequest {
    pub login_token: String,
    pub user_id: UserId,
    pub minutes: Option<i64>,
}
