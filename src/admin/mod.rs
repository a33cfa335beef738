mod requests;

use crate::{
    allotted_time::{wrapper::AllottedTimeWrapper, AllottedTimeTag},
    appointment::{requests::LifecycleTag, wrapper::AppointmentWrapper, AppointmentStatus},
    config::AppConfig,
    protocol::ApiResponse,
    role::{commands::RoleTag, wrapper::RoleWrapper, UserRole},
    session::with_caller,
    DbPool,
};
use actix_web::{post, web, HttpResponse, Responder};

use self::requests::*;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(approve_appointment)
        .service(approve_role)
        .service(list_pending_roles)
        .service(update_allotted_time);
}

crate::post_funcs! {
    (approve_appointment, "/approve_appointment", ApproveAppointmentRequest, ApiResponse<AppointmentStatus, LifecycleTag>),
    (approve_role, "/approve_role", ApproveRoleRequest, ApiResponse<UserRole, RoleTag>),
    (list_pending_roles, "/list_pending_roles", ListPendingRolesRequest, ApiResponse<Vec<UserRole>, RoleTag>),
    (update_allotted_time, "/update_allotted_time", UpdateAllottedTimeRequest, ApiResponse<i64, AllottedTimeTag>),
}

async fn approve_appointment_impl(
    pool: web::Data<DbPool>,
    config: web::Data<AppConfig>,
    info: web::Json<ApproveAppointmentRequest>,
) -> anyhow::Result<ApiResponse<AppointmentStatus, LifecycleTag>> {
    let info = info.into_inner();
    let token = info.login_token.clone();
    with_caller(&pool, &config, token, move |store, caller| {
        let mut outcome = None;
        let access = AppointmentWrapper::new(store, caller.as_ref())
            .approve(info.id, |result| outcome = Some(result))?;
        Ok(ApiResponse::from_outcome(access, outcome))
    })
    .await
}

async fn approve_role_impl(
    pool: web::Data<DbPool>,
    config: web::Data<AppConfig>,
    info: web::Json<ApproveRoleRequest>,
) -> anyhow::Result<ApiResponse<UserRole, RoleTag>> {
    let info = info.into_inner();
    let token = info.login_token.clone();
    with_caller(&pool, &config, token, move |store, caller| {
        let mut outcome = None;
        let access = RoleWrapper::new(store, caller.as_ref())
            .approve(info.id, |result| outcome = Some(result))?;
        Ok(ApiResponse::from_outcome(access, outcome))
    })
    .await
}

async fn list_pending_roles_impl(
    pool: web::Data<DbPool>,
    config: web::Data<AppConfig>,
    info: web::Json<ListPendingRolesRequest>,
) -> anyhow::Result<ApiResponse<Vec<UserRole>, RoleTag>> {
    let info = info.into_inner();
    with_caller(&pool, &config, info.login_token, |store, caller| {
        let mut outcome = None;
        let access = RoleWrapper::new(store, caller.as_ref())
            .list_pending(|result| outcome = Some(result))?;
        Ok(ApiResponse::from_outcome(access, outcome))
    })
    .await
}

async fn update_allotted_time_impl(
    pool: web::Data<DbPool>,
    config: web::Data<AppConfig>,
    info: web::Json<UpdateAllottedTimeRequest>,
) -> anyhow::Result<ApiResponse<i64, AllottedTimeTag>> {
    let info = info.into_inner();
    let token = info.login_token.clone();
    with_caller(&pool, &config, token, move |store, caller| {
        let mut outcome = None;
        let access = AllottedTimeWrapper::new(store, caller.as_ref())
            .update(info.user_id, info.minutes, |result| outcome = Some(result))?;
        Ok(ApiResponse::from_outcome(access, outcome))
    })
    .await
}
