use anyhow::{bail, Context};
use chrono::NaiveDateTime;
use diesel::{prelude::*, MysqlConnection};
use std::collections::BTreeSet;

use super::{AllottedTimeStore, AppointmentStore, RoleStore, Session, SessionStore};
use crate::{
    appointment::{
        status::ACTIVE_STATUSES, Appointment, AppointmentChanges, AppointmentId,
        AppointmentStatus, NewAppointment, ObservationMode, ObservationTarget, Orientation,
        Reading, ReceiverConfig, TelescopeId, UserId,
    },
    models::{
        allotted_time_caps::AllottedTimeCapData,
        appointment_viewers::ViewerData,
        appointments::{AppointmentChangeset, AppointmentData, NewAppointmentData},
        coordinates::CoordinateData,
        orientations::{AppointmentOrientationData, TelescopeOrientationData, UpdateOrientation},
        readings::{NewReading, ReadingData},
        receiver_configs::ReceiverConfigData,
        user_logins::UserLoginData,
        user_roles::{NewUserRole, UserRoleData},
    },
    role::{Role, UserRole, UserRoleId},
};

no_arg_sql_function!(
    last_insert_id,
    diesel::sql_types::Unsigned<diesel::sql_types::Bigint>
);

/// Store backed by one pooled MySQL connection.
pub struct MysqlStore<'a> {
    conn: &'a MysqlConnection,
}

impl<'a> MysqlStore<'a> {
    pub fn new(conn: &'a MysqlConnection) -> Self {
        Self { conn }
    }

    fn active_statuses() -> Vec<&'static str> {
        ACTIVE_STATUSES.iter().map(|status| status.as_str()).collect()
    }

    fn last_insert_id(&self) -> anyhow::Result<u64> {
        diesel::select(last_insert_id)
            .first::<u64>(self.conn)
            .context("DB error")
    }

    fn load_appointments(rows: Vec<AppointmentData>) -> anyhow::Result<Vec<Appointment>> {
        rows.into_iter().map(AppointmentData::into_appointment).collect()
    }

    fn insert_target(&self, id: AppointmentId, target: &ObservationTarget) -> anyhow::Result<()> {
        use crate::schema::{appointment_orientations, coordinates};

        if let Some(orientation) = target.orientation() {
            diesel::insert_into(appointment_orientations::table)
                .values(AppointmentOrientationData::new(id, &orientation))
                .execute(self.conn)
                .context("DB error")?;
        }
        let rows = target
            .coordinates()
            .iter()
            .enumerate()
            .map(|(position, coordinate)| CoordinateData::new(id, position as i32, coordinate))
            .collect::<Vec<_>>();
        if !rows.is_empty() {
            diesel::insert_into(coordinates::table)
                .values(rows)
                .execute(self.conn)
                .context("DB error")?;
        }
        Ok(())
    }

    fn delete_target(&self, id: AppointmentId) -> anyhow::Result<()> {
        use crate::schema::{appointment_orientations, coordinates};

        diesel::delete(appointment_orientations::table.find(id))
            .execute(self.conn)
            .context("DB error")?;
        diesel::delete(coordinates::table.filter(coordinates::appointment_id.eq(id)))
            .execute(self.conn)
            .context("DB error")?;
        Ok(())
    }

    fn insert_receiver(&self, id: AppointmentId, config: &ReceiverConfig) -> anyhow::Result<()> {
        use crate::schema::receiver_configs;

        diesel::insert_into(receiver_configs::table)
            .values(ReceiverConfigData::new(id, config))
            .execute(self.conn)
            .context("DB error")?;
        Ok(())
    }
}

impl AppointmentStore for MysqlStore<'_> {
    fn with_telescope_lock<T, F>(&self, telescope_id: TelescopeId, f: F) -> anyhow::Result<T>
    where
        F: FnOnce() -> anyhow::Result<T>,
    {
        use crate::schema::telescopes;

        self.conn.transaction::<T, anyhow::Error, _>(|| {
            // Row lock on the telescope serializes every booking against it.
            telescopes::table
                .find(telescope_id)
                .select(telescopes::id)
                .for_update()
                .first::<u64>(self.conn)
                .optional()
                .context("DB error")?;
            f()
        })
    }

    fn telescope_exists(&self, telescope_id: TelescopeId) -> anyhow::Result<bool> {
        use crate::schema::telescopes;

        let res = telescopes::table
            .filter(telescopes::id.eq(telescope_id))
            .count()
            .get_result::<i64>(self.conn)
            .context("DB error")?;
        Ok(res > 0)
    }

    fn telescope_online(&self, telescope_id: TelescopeId) -> anyhow::Result<Option<bool>> {
        use crate::schema::telescopes;

        telescopes::table
            .find(telescope_id)
            .select(telescopes::online)
            .first::<bool>(self.conn)
            .optional()
            .context("DB error")
    }

    fn find_appointment(&self, id: AppointmentId) -> anyhow::Result<Option<Appointment>> {
        use crate::schema::appointments;

        appointments::table
            .find(id)
            .get_result::<AppointmentData>(self.conn)
            .optional()
            .context("DB error")?
            .map(AppointmentData::into_appointment)
            .transpose()
    }

    fn find_overlapping(
        &self,
        telescope_id: TelescopeId,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> anyhow::Result<Vec<Appointment>> {
        use crate::schema::appointments;

        let rows = appointments::table
            .filter(appointments::telescope_id.eq(telescope_id))
            .filter(appointments::status.eq_any(Self::active_statuses()))
            .filter(appointments::start_time.lt(end))
            .filter(appointments::end_time.gt(start))
            .order(appointments::start_time.asc())
            .get_results::<AppointmentData>(self.conn)
            .context("DB error")?;
        Self::load_appointments(rows)
    }

    fn find_active_for_user(&self, user_id: UserId) -> anyhow::Result<Vec<Appointment>> {
        use crate::schema::appointments;

        let rows = appointments::table
            .filter(appointments::user_id.eq(user_id))
            .filter(appointments::status.eq_any(Self::active_statuses()))
            .get_results::<AppointmentData>(self.conn)
            .context("DB error")?;
        Self::load_appointments(rows)
    }

    fn list_for_user(&self, user_id: UserId) -> anyhow::Result<Vec<Appointment>> {
        use crate::schema::appointments;

        let rows = appointments::table
            .filter(appointments::user_id.eq(user_id))
            .order(appointments::start_time.desc())
            .get_results::<AppointmentData>(self.conn)
            .context("DB error")?;
        Self::load_appointments(rows)
    }

    fn list_for_telescope(&self, telescope_id: TelescopeId) -> anyhow::Result<Vec<Appointment>> {
        use crate::schema::appointments;

        let rows = appointments::table
            .filter(appointments::telescope_id.eq(telescope_id))
            .order(appointments::start_time.asc())
            .get_results::<AppointmentData>(self.conn)
            .context("DB error")?;
        Self::load_appointments(rows)
    }

    fn insert_appointment(&self, data: &NewAppointment) -> anyhow::Result<AppointmentId> {
        use crate::schema::appointments;

        self.conn.transaction::<_, anyhow::Error, _>(|| {
            diesel::insert_into(appointments::table)
                .values(NewAppointmentData::from(data))
                .execute(self.conn)
                .context("DB error")?;
            let id = self.last_insert_id()?;

            self.insert_target(id, &data.target)?;
            self.insert_receiver(id, &data.receiver)?;
            Ok(id)
        })
    }

    fn update_appointment(
        &self,
        id: AppointmentId,
        changes: &AppointmentChanges,
    ) -> anyhow::Result<()> {
        use crate::schema::{appointments, receiver_configs};

        self.conn.transaction::<_, anyhow::Error, _>(|| {
            diesel::update(appointments::table.find(id))
                .set(&AppointmentChangeset::from(changes))
                .execute(self.conn)
                .context("DB error")?;

            self.delete_target(id)?;
            self.insert_target(id, &changes.target)?;

            diesel::delete(receiver_configs::table.find(id))
                .execute(self.conn)
                .context("DB error")?;
            self.insert_receiver(id, &changes.receiver)?;
            Ok(())
        })
    }

    fn set_status(&self, id: AppointmentId, status: AppointmentStatus) -> anyhow::Result<()> {
        use crate::schema::appointments;

        let res = diesel::update(appointments::table.find(id))
            .set(appointments::status.eq(status.as_str()))
            .execute(self.conn)
            .context("DB error")?;
        if res == 0 {
            bail!("No such appointment");
        }
        Ok(())
    }

    fn set_ended_at(&self, id: AppointmentId, ended_at: NaiveDateTime) -> anyhow::Result<()> {
        use crate::schema::appointments;

        let res = diesel::update(appointments::table.find(id))
            .set(appointments::ended_at.eq(Some(ended_at)))
            .execute(self.conn)
            .context("DB error")?;
        if res == 0 {
            bail!("No such appointment");
        }
        Ok(())
    }

    fn find_target(&self, id: AppointmentId) -> anyhow::Result<Option<ObservationTarget>> {
        use crate::schema::{appointment_orientations, coordinates};

        let mode = match self.find_appointment(id)? {
            Some(appointment) => appointment.mode,
            None => return Ok(None),
        };

        match mode {
            ObservationMode::FreeControl | ObservationMode::DriftScan => {
                let orientation = appointment_orientations::table
                    .find(id)
                    .get_result::<AppointmentOrientationData>(self.conn)
                    .optional()
                    .context("DB error")?
                    .map(Orientation::from);
                Ok(orientation.map(|orientation| {
                    if mode == ObservationMode::FreeControl {
                        ObservationTarget::FreeControl { orientation }
                    } else {
                        ObservationTarget::DriftScan { orientation }
                    }
                }))
            }
            ObservationMode::RasterScan => {
                let rows = coordinates::table
                    .filter(coordinates::appointment_id.eq(id))
                    .order(coordinates::position.asc())
                    .get_results::<CoordinateData>(self.conn)
                    .context("DB error")?;
                match rows.as_slice() {
                    [first, second] => Ok(Some(ObservationTarget::RasterScan {
                        corners: [first.coordinate(), second.coordinate()],
                    })),
                    _ => Ok(None),
                }
            }
        }
    }

    fn find_receiver(&self, id: AppointmentId) -> anyhow::Result<Option<ReceiverConfig>> {
        use crate::schema::receiver_configs;

        let data = receiver_configs::table
            .find(id)
            .get_result::<ReceiverConfigData>(self.conn)
            .optional()
            .context("DB error")?;
        Ok(data.map(ReceiverConfig::from))
    }

    fn find_readings(&self, id: AppointmentId) -> anyhow::Result<Vec<Reading>> {
        use crate::schema::readings;

        let rows = readings::table
            .filter(readings::appointment_id.eq(id))
            .order(readings::time.asc())
            .get_results::<ReadingData>(self.conn)
            .context("DB error")?;
        Ok(rows.into_iter().map(Reading::from).collect())
    }

    fn insert_reading(&self, id: AppointmentId, reading: &Reading) -> anyhow::Result<()> {
        use crate::schema::readings;

        let data = NewReading {
            appointment_id: id,
            time: reading.time,
            power: reading.power,
        };
        diesel::insert_into(readings::table)
            .values(data)
            .execute(self.conn)
            .context("DB error")?;
        Ok(())
    }

    fn find_orientation(&self, telescope_id: TelescopeId) -> anyhow::Result<Option<Orientation>> {
        use crate::schema::orientations;

        let data = orientations::table
            .find(telescope_id)
            .get_result::<TelescopeOrientationData>(self.conn)
            .optional()
            .context("DB error")?;
        Ok(data.map(Orientation::from))
    }

    fn update_orientation(
        &self,
        telescope_id: TelescopeId,
        orientation: &Orientation,
        calibrated_at: NaiveDateTime,
    ) -> anyhow::Result<()> {
        use crate::schema::orientations;

        let data = UpdateOrientation {
            azimuth: orientation.azimuth,
            elevation: orientation.elevation,
            calibrated_at: Some(calibrated_at),
        };
        let res = diesel::update(orientations::table.find(telescope_id))
            .set(&data)
            .execute(self.conn)
            .context("DB error")?;
        if res == 0 {
            bail!("No orientation for telescope {}", telescope_id);
        }
        Ok(())
    }

    fn is_viewer(&self, id: AppointmentId, user_id: UserId) -> anyhow::Result<bool> {
        use crate::schema::appointment_viewers;

        let res = appointment_viewers::table
            .filter(appointment_viewers::appointment_id.eq(id))
            .filter(appointment_viewers::user_id.eq(user_id))
            .count()
            .get_result::<i64>(self.conn)
            .context("DB error")?;
        Ok(res > 0)
    }

    fn add_viewer(&self, id: AppointmentId, user_id: UserId) -> anyhow::Result<()> {
        use crate::schema::appointment_viewers;

        diesel::replace_into(appointment_viewers::table)
            .values(ViewerData {
                appointment_id: id,
                user_id,
            })
            .execute(self.conn)
            .context("DB error")?;
        Ok(())
    }
}

impl RoleStore for MysqlStore<'_> {
    fn user_exists(&self, user_id: UserId) -> anyhow::Result<bool> {
        use crate::schema::users;

        let res = users::table
            .filter(users::id.eq(user_id))
            .count()
            .get_result::<i64>(self.conn)
            .context("DB error")?;
        Ok(res > 0)
    }

    fn find_approved_roles(&self, user_id: UserId) -> anyhow::Result<BTreeSet<Role>> {
        use crate::schema::user_roles;

        let roles = user_roles::table
            .filter(user_roles::user_id.eq(user_id))
            .filter(user_roles::approved.eq(true))
            .select(user_roles::role)
            .get_results::<String>(self.conn)
            .context("DB error")?;
        roles
            .iter()
            .map(|role| role.parse::<Role>().context("stored user role"))
            .collect()
    }

    fn find_user_roles(&self, user_id: UserId) -> anyhow::Result<Vec<UserRole>> {
        use crate::schema::user_roles;

        user_roles::table
            .filter(user_roles::user_id.eq(user_id))
            .order(user_roles::id.asc())
            .get_results::<UserRoleData>(self.conn)
            .context("DB error")?
            .into_iter()
            .map(UserRoleData::into_user_role)
            .collect()
    }

    fn find_user_role(&self, id: UserRoleId) -> anyhow::Result<Option<UserRole>> {
        use crate::schema::user_roles;

        user_roles::table
            .find(id)
            .get_result::<UserRoleData>(self.conn)
            .optional()
            .context("DB error")?
            .map(UserRoleData::into_user_role)
            .transpose()
    }

    fn find_pending_roles(&self) -> anyhow::Result<Vec<UserRole>> {
        use crate::schema::user_roles;

        user_roles::table
            .filter(user_roles::approved.eq(false))
            .order(user_roles::id.asc())
            .get_results::<UserRoleData>(self.conn)
            .context("DB error")?
            .into_iter()
            .map(UserRoleData::into_user_role)
            .collect()
    }

    fn insert_user_role(
        &self,
        user_id: UserId,
        role: Role,
        approved: bool,
    ) -> anyhow::Result<UserRoleId> {
        use crate::schema::user_roles;

        self.conn.transaction::<_, anyhow::Error, _>(|| {
            diesel::insert_into(user_roles::table)
                .values(NewUserRole {
                    user_id,
                    role: role.as_str().to_string(),
                    approved,
                })
                .execute(self.conn)
                .context("DB error")?;
            self.last_insert_id()
        })
    }

    fn approve_user_role(&self, id: UserRoleId) -> anyhow::Result<()> {
        use crate::schema::user_roles;

        diesel::update(user_roles::table.find(id))
            .set(user_roles::approved.eq(true))
            .execute(self.conn)
            .context("DB error")?;
        Ok(())
    }
}

impl AllottedTimeStore for MysqlStore<'_> {
    fn find_allotted_time(&self, user_id: UserId) -> anyhow::Result<Option<i64>> {
        use crate::schema::allotted_time_caps;

        allotted_time_caps::table
            .find(user_id)
            .select(allotted_time_caps::minutes)
            .get_result::<i64>(self.conn)
            .optional()
            .context("DB error")
    }

    fn set_allotted_time(&self, user_id: UserId, minutes: i64) -> anyhow::Result<()> {
        use crate::schema::allotted_time_caps;

        diesel::replace_into(allotted_time_caps::table)
            .values(AllottedTimeCapData { user_id, minutes })
            .execute(self.conn)
            .context("DB error")?;
        Ok(())
    }
}

impl SessionStore for MysqlStore<'_> {
    fn find_session(&self, token: &str) -> anyhow::Result<Option<Session>> {
        use crate::schema::user_logins;

        let data = user_logins::table
            .filter(user_logins::token.eq(token))
            .order(user_logins::login_time.desc())
            .limit(1)
            .get_result::<UserLoginData>(self.conn)
            .optional()
            .context("DB error")?;
        Ok(data.map(|data| Session {
            user_id: data.user_id,
            login_time: data.login_time,
        }))
    }
}
