use crate::{
    appointment::{Appointment, AppointmentChanges, NewAppointment, TimeWindow},
    schema::appointments,
};
use anyhow::{anyhow, Context};
use chrono::NaiveDateTime;

#[derive(Queryable)]
pub struct AppointmentData {
    pub id: u64,
    pub user_id: u64,
    pub telescope_id: u64,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub status: String,
    pub observation_mode: String,
    pub is_public: bool,
    pub ended_at: Option<NaiveDateTime>,
}

impl AppointmentData {
    pub fn into_appointment(self) -> anyhow::Result<Appointment> {
        let window = TimeWindow::new(self.start_time, self.end_time)
            .ok_or_else(|| anyhow!("appointment {} has an empty time window", self.id))?;
        Ok(Appointment {
            id: self.id,
            user_id: self.user_id,
            telescope_id: self.telescope_id,
            window,
            status: self.status.parse().context("stored appointment")?,
            mode: self.observation_mode.parse().context("stored appointment")?,
            is_public: self.is_public,
            ended_at: self.ended_at,
        })
    }
}

#[derive(Insertable)]
#[table_name = "appointments"]
pub struct NewAppointmentData {
    pub user_id: u64,
    pub telescope_id: u64,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub status: String,
    pub observation_mode: String,
    pub is_public: bool,
}

impl From<&NewAppointment> for NewAppointmentData {
    fn from(data: &NewAppointment) -> Self {
        Self {
            user_id: data.user_id,
            telescope_id: data.telescope_id,
            start_time: data.window.start(),
            end_time: data.window.end(),
            status: data.status.as_str().to_string(),
            observation_mode: data.target.mode().as_str().to_string(),
            is_public: data.is_public,
        }
    }
}

#[derive(AsChangeset)]
#[table_name = "appointments"]
pub struct AppointmentChangeset {
    pub telescope_id: u64,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub is_public: bool,
}

impl From<&AppointmentChanges> for AppointmentChangeset {
    fn from(changes: &AppointmentChanges) -> Self {
        Self {
            telescope_id: changes.telescope_id,
            start_time: changes.window.start(),
            end_time: changes.window.end(),
            is_public: changes.is_public,
        }
    }
}
