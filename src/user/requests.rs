use serde::Deserialize;

use crate::appointment::{requests::AppointmentForm, AppointmentId, TelescopeId, UserId};

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct LogoutRequest {
    pub login_token: String,
}

#[derive(Deserialize)]
pub struct CreateAppointmentRequest {
    pub login_token: String,
    #[serde(flatten)]
    pub appointment: AppointmentForm,
}

#[derive(Deserialize)]
pub struct UpdateAppointmentRequest {
    pub login_token: String,
    pub id: AppointmentId,
    #[serde(flatten)]
    pub appointment: AppointmentForm,
}

/// Body of every operation that names one appointment and nothing else.
#[derive(Deserialize)]
pub struct AppointmentIdRequest {
    pub login_token: String,
    pub id: AppointmentId,
}

#[derive(Deserialize)]
pub struct AddReadingRequest {
    pub login_token: String,
    pub id: AppointmentId,
    pub power: Option<f64>,
}

#[derive(Deserialize)]
pub struct ShareAppointmentRequest {
    pub login_token: String,
    pub id: AppointmentId,
    pub viewer_id: Option<UserId>,
}

/// Without `user_id` the caller's own records are meant.
#[derive(Deserialize)]
pub struct UserQueryRequest {
    pub login_token: String,
    pub user_id: Option<UserId>,
}

#[derive(Deserialize)]
pub struct TelescopeAppointmentsRequest {
    pub login_token: String,
    pub telescope_id: TelescopeId,
}

#[derive(Deserialize)]
pub struct RequestRoleRequest {
    pub login_token: String,
    pub role: Option<String>,
}
