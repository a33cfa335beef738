#[cfg(test)]
pub mod memory;
pub mod mysql;

use crate::{
    appointment::{
        Appointment, AppointmentChanges, AppointmentId, AppointmentStatus, NewAppointment,
        ObservationTarget, Orientation, Reading, ReceiverConfig, TelescopeId, UserId,
    },
    role::{Role, UserRole, UserRoleId},
    DbPool,
};
use actix_web::web;
use anyhow::Context;
use chrono::NaiveDateTime;
use diesel::{r2d2::ConnectionManager, MysqlConnection};
use r2d2::PooledConnection;
use std::collections::BTreeSet;

pub use self::mysql::MysqlStore;

pub fn get_db_conn(
    pool: &web::Data<DbPool>,
) -> anyhow::Result<PooledConnection<ConnectionManager<MysqlConnection>>> {
    pool.get().context("DB connection")
}

/// Appointments and the records they own.
pub trait AppointmentStore {
    /// Runs `f` while no other caller can book time on `telescope_id`.
    ///
    /// Everything `f` writes commits together or not at all.
    fn with_telescope_lock<T, F>(&self, telescope_id: TelescopeId, f: F) -> anyhow::Result<T>
    where
        F: FnOnce() -> anyhow::Result<T>;

    fn telescope_exists(&self, telescope_id: TelescopeId) -> anyhow::Result<bool>;

    /// `None` when there is no such telescope.
    fn telescope_online(&self, telescope_id: TelescopeId) -> anyhow::Result<Option<bool>>;

    fn find_appointment(&self, id: AppointmentId) -> anyhow::Result<Option<Appointment>>;

    /// Requested, scheduled and in-progress appointments on the telescope
    /// whose window intersects `[start, end)`.
    fn find_overlapping(
        &self,
        telescope_id: TelescopeId,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> anyhow::Result<Vec<Appointment>>;

    /// Requested, scheduled and in-progress appointments owned by the user.
    fn find_active_for_user(&self, user_id: UserId) -> anyhow::Result<Vec<Appointment>>;

    fn list_for_user(&self, user_id: UserId) -> anyhow::Result<Vec<Appointment>>;

    fn list_for_telescope(&self, telescope_id: TelescopeId) -> anyhow::Result<Vec<Appointment>>;

    fn insert_appointment(&self, data: &NewAppointment) -> anyhow::Result<AppointmentId>;

    fn update_appointment(
        &self,
        id: AppointmentId,
        changes: &AppointmentChanges,
    ) -> anyhow::Result<()>;

    fn set_status(&self, id: AppointmentId, status: AppointmentStatus) -> anyhow::Result<()>;

    fn set_ended_at(&self, id: AppointmentId, ended_at: NaiveDateTime) -> anyhow::Result<()>;

    fn find_target(&self, id: AppointmentId) -> anyhow::Result<Option<ObservationTarget>>;

    fn find_receiver(&self, id: AppointmentId) -> anyhow::Result<Option<ReceiverConfig>>;

    fn find_readings(&self, id: AppointmentId) -> anyhow::Result<Vec<Reading>>;

    fn insert_reading(&self, id: AppointmentId, reading: &Reading) -> anyhow::Result<()>;

    fn find_orientation(&self, telescope_id: TelescopeId) -> anyhow::Result<Option<Orientation>>;

    fn update_orientation(
        &self,
        telescope_id: TelescopeId,
        orientation: &Orientation,
        calibrated_at: NaiveDateTime,
    ) -> anyhow::Result<()>;

    fn is_viewer(&self, id: AppointmentId, user_id: UserId) -> anyhow::Result<bool>;

    fn add_viewer(&self, id: AppointmentId, user_id: UserId) -> anyhow::Result<()>;
}

pub trait RoleStore {
    fn user_exists(&self, user_id: UserId) -> anyhow::Result<bool>;

    fn find_approved_roles(&self, user_id: UserId) -> anyhow::Result<BTreeSet<Role>>;

    fn find_user_roles(&self, user_id: UserId) -> anyhow::Result<Vec<UserRole>>;

    fn find_user_role(&self, id: UserRoleId) -> anyhow::Result<Option<UserRole>>;

    fn find_pending_roles(&self) -> anyhow::Result<Vec<UserRole>>;

    fn insert_user_role(
        &self,
        user_id: UserId,
        role: Role,
        approved: bool,
    ) -> anyhow::Result<UserRoleId>;

    fn approve_user_role(&self, id: UserRoleId) -> anyhow::Result<()>;
}

pub trait AllottedTimeStore {
    /// Minutes the user may keep booked; `None` means no cap.
    fn find_allotted_time(&self, user_id: UserId) -> anyhow::Result<Option<i64>>;

    fn set_allotted_time(&self, user_id: UserId, minutes: i64) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: UserId,
    pub login_time: NaiveDateTime,
}

pub trait SessionStore {
    fn find_session(&self, token: &str) -> anyhow::Result<Option<Session>>;
}
