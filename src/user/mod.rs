mod requests;
mod responses;

use crate::{
    allotted_time::{wrapper::AllottedTimeWrapper, AllottedTime, AllottedTimeTag},
    appointment::{
        requests::{AppointmentTag, LifecycleTag},
        wrapper::AppointmentWrapper,
        Appointment, AppointmentDetail, AppointmentId, AppointmentStatus, Orientation, Reading,
        UserId,
    },
    auth::UserContext,
    config::AppConfig,
    database::get_db_conn,
    models::{
        user_logins::UserLoginData,
        user_roles::NewUserRole,
        users::{NewUser, UserData},
    },
    protocol::{ApiResponse, SimpleResponse},
    role::{commands::RoleTag, wrapper::RoleWrapper, Role, UserRole, UserRoleId},
    session::with_caller,
    utils::{generate_login_token, hash_password},
    DbPool,
};
use actix_web::{post, web, HttpResponse, Responder};
use anyhow::{bail, Context};
use chrono::Utc;
use diesel::prelude::*;
use tracing::{info, warn};

use self::{requests::*, responses::*};

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(register)
        .service(login)
        .service(logout)
        .service(create_appointment)
        .service(update_appointment)
        .service(start_appointment)
        .service(stop_appointment)
        .service(calibrate)
        .service(add_reading)
        .service(cancel_appointment)
        .service(view_appointment)
        .service(search_user_appointment)
        .service(search_telescope_appointment)
        .service(share_appointment)
        .service(request_role)
        .service(view_roles)
        .service(view_allotted_time);
}

type StatusResponse = ApiResponse<AppointmentStatus, LifecycleTag>;
type AppointmentsResponse = ApiResponse<Vec<Appointment>, AppointmentTag>;

crate::post_funcs! {
    (register, "/register", RegisterRequest, SimpleResponse),
    (login, "/login", LoginRequest, LoginResponse),
    (logout, "/logout", LogoutRequest, SimpleResponse),
    (create_appointment, "/create_appointment", CreateAppointmentRequest, ApiResponse<AppointmentId, AppointmentTag>),
    (update_appointment, "/update_appointment", UpdateAppointmentRequest, ApiResponse<AppointmentId, AppointmentTag>),
    (start_appointment, "/start_appointment", AppointmentIdRequest, StatusResponse),
    (stop_appointment, "/stop_appointment", AppointmentIdRequest, StatusResponse),
    (calibrate, "/calibrate", AppointmentIdRequest, ApiResponse<Orientation, LifecycleTag>),
    (add_reading, "/add_reading", AddReadingRequest, ApiResponse<Reading, LifecycleTag>),
    (cancel_appointment, "/cancel_appointment", AppointmentIdRequest, StatusResponse),
    (view_appointment, "/view_appointment", AppointmentIdRequest, ApiResponse<AppointmentDetail, LifecycleTag>),
    (search_user_appointment, "/search_user_appointment", UserQueryRequest, AppointmentsResponse),
    (search_telescope_appointment, "/search_telescope_appointment", TelescopeAppointmentsRequest, AppointmentsResponse),
    (share_appointment, "/share_appointment", ShareAppointmentRequest, ApiResponse<(), AppointmentTag>),
    (request_role, "/request_role", RequestRoleRequest, ApiResponse<UserRoleId, RoleTag>),
    (view_roles, "/view_roles", UserQueryRequest, ApiResponse<Vec<UserRole>, RoleTag>),
    (view_allotted_time, "/view_allotted_time", UserQueryRequest, ApiResponse<AllottedTime, AllottedTimeTag>),
}

async fn register_impl(
    pool: web::Data<DbPool>,
    _config: web::Data<AppConfig>,
    info: web::Json<RegisterRequest>,
) -> anyhow::Result<SimpleResponse> {
    use crate::{
        database::mysql::last_insert_id,
        schema::{user_roles, users},
    };

    let info = info.into_inner();
    if info.username.is_empty() || info.password.is_empty() {
        bail!("username and password are required");
    }
    let conn = get_db_conn(&pool)?;

    web::block(move || {
        conn.transaction(|| {
            let res = users::table
                .filter(users::username.eq(&info.username))
                .count()
                .get_result::<i64>(&conn)
                .context("DB error")?;
            if res > 0 {
                bail!("username is taken");
            }

            diesel::insert_into(users::table)
                .values(NewUser {
                    username: info.username.clone(),
                    password: hash_password(&info.password),
                })
                .execute(&conn)
                .context("DB error")?;
            let user_id = diesel::select(last_insert_id)
                .first::<u64>(&conn)
                .context("DB error")?;

            // every account starts out as an approved guest
            diesel::insert_into(user_roles::table)
                .values(NewUserRole {
                    user_id,
                    role: Role::Guest.to_string(),
                    approved: true,
                })
                .execute(&conn)
                .context("DB error")?;

            info!(user_id, username = %info.username, "user registered");
            Ok(())
        })
    })
    .await?;

    Ok(SimpleResponse::ok())
}

async fn login_impl(
    pool: web::Data<DbPool>,
    _config: web::Data<AppConfig>,
    info: web::Json<LoginRequest>,
) -> anyhow::Result<LoginResponse> {
    use crate::schema::{user_logins, users};

    let info = info.into_inner();
    let conn = get_db_conn(&pool)?;
    let login_token = web::block(move || {
        conn.transaction(|| {
            let user = users::table
                .filter(users::username.eq(&info.username))
                .filter(users::password.eq(hash_password(&info.password)))
                .get_result::<UserData>(&conn)
                .optional()
                .context("DB error")?;
            let user = match user {
                Some(user) => user,
                None => {
                    warn!(username = %info.username, "login rejected");
                    bail!("wrong username or password")
                }
            };

            let login_token = generate_login_token(&user.username);
            diesel::insert_into(user_logins::table)
                .values(UserLoginData {
                    token: login_token.clone(),
                    user_id: user.id,
                    login_time: Utc::now().naive_utc(),
                })
                .execute(&conn)
                .context("DB error")?;

            Ok(login_token)
        })
    })
    .await?;

    Ok(LoginResponse {
        success: true,
        err: "".to_string(),
        login_token,
    })
}

async fn logout_impl(
    pool: web::Data<DbPool>,
    _config: web::Data<AppConfig>,
    info: web::Json<LogoutRequest>,
) -> anyhow::Result<SimpleResponse> {
    use crate::schema::user_logins;

    let info = info.into_inner();
    let conn = get_db_conn(&pool)?;
    web::block(move || {
        diesel::delete(user_logins::table.filter(user_logins::token.eq(info.login_token)))
            .execute(&conn)
    })
    .await
    .context("DB error")?;

    Ok(SimpleResponse::ok())
}

async fn create_appointment_impl(
    pool: web::Data<DbPool>,
    config: web::Data<AppConfig>,
    info: web::Json<CreateAppointmentRequest>,
) -> anyhow::Result<ApiResponse<AppointmentId, AppointmentTag>> {
    let info = info.into_inner();
    let token = info.login_token.clone();
    with_caller(&pool, &config, token, move |store, caller| {
        let mut outcome = None;
        let access = AppointmentWrapper::new(store, caller.as_ref())
            .create(info.appointment, |result| outcome = Some(result))?;
        Ok(ApiResponse::from_outcome(access, outcome))
    })
    .await
}

async fn update_appointment_impl(
    pool: web::Data<DbPool>,
    config: web::Data<AppConfig>,
    info: web::Json<UpdateAppointmentRequest>,
) -> anyhow::Result<ApiResponse<AppointmentId, AppointmentTag>> {
    let info = info.into_inner();
    let token = info.login_token.clone();
    with_caller(&pool, &config, token, move |store, caller| {
        let mut outcome = None;
        let access = AppointmentWrapper::new(store, caller.as_ref())
            .update(info.id, info.appointment, |result| outcome = Some(result))?;
        Ok(ApiResponse::from_outcome(access, outcome))
    })
    .await
}

async fn start_appointment_impl(
    pool: web::Data<DbPool>,
    config: web::Data<AppConfig>,
    info: web::Json<AppointmentIdRequest>,
) -> anyhow::Result<StatusResponse> {
    let info = info.into_inner();
    let token = info.login_token.clone();
    with_caller(&pool, &config, token, move |store, caller| {
        let mut outcome = None;
        let access = AppointmentWrapper::new(store, caller.as_ref())
            .start(info.id, |result| outcome = Some(result))?;
        Ok(ApiResponse::from_outcome(access, outcome))
    })
    .await
}

async fn stop_appointment_impl(
    pool: web::Data<DbPool>,
    config: web::Data<AppConfig>,
    info: web::Json<AppointmentIdRequest>,
) -> anyhow::Result<StatusResponse> {
    let info = info.into_inner();
    let token = info.login_token.clone();
    with_caller(&pool, &config, token, move |store, caller| {
        let mut outcome = None;
        let access = AppointmentWrapper::new(store, caller.as_ref())
            .stop(info.id, |result| outcome = Some(result))?;
        Ok(ApiResponse::from_outcome(access, outcome))
    })
    .await
}

async fn calibrate_impl(
    pool: web::Data<DbPool>,
    config: web::Data<AppConfig>,
    info: web::Json<AppointmentIdRequest>,
) -> anyhow::Result<ApiResponse<Orientation, LifecycleTag>> {
    let info = info.into_inner();
    let token = info.login_token.clone();
    with_caller(&pool, &config, token, move |store, caller| {
        let mut outcome = None;
        let access = AppointmentWrapper::new(store, caller.as_ref())
            .calibrate(info.id, |result| outcome = Some(result))?;
        Ok(ApiResponse::from_outcome(access, outcome))
    })
    .await
}

async fn add_reading_impl(
    pool: web::Data<DbPool>,
    config: web::Data<AppConfig>,
    info: web::Json<AddReadingRequest>,
) -> anyhow::Result<ApiResponse<Reading, LifecycleTag>> {
    let info = info.into_inner();
    let token = info.login_token.clone();
    with_caller(&pool, &config, token, move |store, caller| {
        let mut outcome = None;
        let access = AppointmentWrapper::new(store, caller.as_ref())
            .add_reading(info.id, info.power, |result| outcome = Some(result))?;
        Ok(ApiResponse::from_outcome(access, outcome))
    })
    .await
}

async fn cancel_appointment_impl(
    pool: web::Data<DbPool>,
    config: web::Data<AppConfig>,
    info: web::Json<AppointmentIdRequest>,
) -> anyhow::Result<StatusResponse> {
    let info = info.into_inner();
    let token = info.login_token.clone();
    with_caller(&pool, &config, token, move |store, caller| {
        let mut outcome = None;
        let access = AppointmentWrapper::new(store, caller.as_ref())
            .cancel(info.id, |result| outcome = Some(result))?;
        Ok(ApiResponse::from_outcome(access, outcome))
    })
    .await
}

async fn view_appointment_impl(
    pool: web::Data<DbPool>,
    config: web::Data<AppConfig>,
    info: web::Json<AppointmentIdRequest>,
) -> anyhow::Result<ApiResponse<AppointmentDetail, LifecycleTag>> {
    let info = info.into_inner();
    let token = info.login_token.clone();
    with_caller(&pool, &config, token, move |store, caller| {
        let mut outcome = None;
        let access = AppointmentWrapper::new(store, caller.as_ref())
            .retrieve(info.id, |result| outcome = Some(result))?;
        Ok(ApiResponse::from_outcome(access, outcome))
    })
    .await
}

/// `user_id` if given, otherwise the caller; anonymous callers are refused by
/// the wrappers before the id matters.
fn target_user(user_id: Option<UserId>, caller: Option<&UserContext>) -> UserId {
    user_id
        .or_else(|| caller.map(UserContext::user_id))
        .unwrap_or_default()
}

async fn search_user_appointment_impl(
    pool: web::Data<DbPool>,
    config: web::Data<AppConfig>,
    info: web::Json<UserQueryRequest>,
) -> anyhow::Result<AppointmentsResponse> {
    let info = info.into_inner();
    let token = info.login_token.clone();
    with_caller(&pool, &config, token, move |store, caller| {
        let user_id = target_user(info.user_id, caller.as_ref());
        let mut outcome = None;
        let access = AppointmentWrapper::new(store, caller.as_ref())
            .list_for_user(user_id, |result| outcome = Some(result))?;
        Ok(ApiResponse::from_outcome(access, outcome))
    })
    .await
}

async fn search_telescope_appointment_impl(
    pool: web::Data<DbPool>,
    config: web::Data<AppConfig>,
    info: web::Json<TelescopeAppointmentsRequest>,
) -> anyhow::Result<AppointmentsResponse> {
    let info = info.into_inner();
    let token = info.login_token.clone();
    with_caller(&pool, &config, token, move |store, caller| {
        let mut outcome = None;
        let access = AppointmentWrapper::new(store, caller.as_ref())
            .list_for_telescope(info.telescope_id, |result| outcome = Some(result))?;
        Ok(ApiResponse::from_outcome(access, outcome))
    })
    .await
}

async fn share_appointment_impl(
    pool: web::Data<DbPool>,
    config: web::Data<AppConfig>,
    info: web::Json<ShareAppointmentRequest>,
) -> anyhow::Result<ApiResponse<(), AppointmentTag>> {
    let info = info.into_inner();
    let token = info.login_token.clone();
    with_caller(&pool, &config, token, move |store, caller| {
        let mut outcome = None;
        let access = AppointmentWrapper::new(store, caller.as_ref())
            .share(info.id, info.viewer_id, |result| outcome = Some(result))?;
        Ok(ApiResponse::from_outcome(access, outcome))
    })
    .await
}

async fn request_role_impl(
    pool: web::Data<DbPool>,
    config: web::Data<AppConfig>,
    info: web::Json<RequestRoleRequest>,
) -> anyhow::Result<ApiResponse<UserRoleId, RoleTag>> {
    let info = info.into_inner();
    let token = info.login_token.clone();
    with_caller(&pool, &config, token, move |store, caller| {
        let mut outcome = None;
        let access = RoleWrapper::new(store, caller.as_ref())
            .request(info.role, |result| outcome = Some(result))?;
        Ok(ApiResponse::from_outcome(access, outcome))
    })
    .await
}

async fn view_roles_impl(
    pool: web::Data<DbPool>,
    config: web::Data<AppConfig>,
    info: web::Json<UserQueryRequest>,
) -> anyhow::Result<ApiResponse<Vec<UserRole>, RoleTag>> {
    let info = info.into_inner();
    let token = info.login_token.clone();
    with_caller(&pool, &config, token, move |store, caller| {
        let user_id = target_user(info.user_id, caller.as_ref());
        let mut outcome = None;
        let access = RoleWrapper::new(store, caller.as_ref())
            .list_for_user(user_id, |result| outcome = Some(result))?;
        Ok(ApiResponse::from_outcome(access, outcome))
    })
    .await
}

async fn view_allotted_time_impl(
    pool: web::Data<DbPool>,
    config: web::Data<AppConfig>,
    info: web::Json<UserQueryRequest>,
) -> anyhow::Result<ApiResponse<AllottedTime, AllottedTimeTag>> {
    let info = info.into_inner();
    let token = info.login_token.clone();
    with_caller(&pool, &config, token, move |store, caller| {
        let user_id = target_user(info.user_id, caller.as_ref());
        let mut outcome = None;
        let access = AllottedTimeWrapper::new(store, caller.as_ref())
            .retrieve(user_id, |result| outcome = Some(result))?;
        Ok(ApiResponse::from_outcome(access, outcome))
    })
    .await
}
