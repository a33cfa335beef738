//! Per-user caps on booked observation minutes.

pub mod wrapper;

use anyhow::Context;
use serde::Serialize;
use tracing::info;

use crate::{
    appointment::{minutes_from_seconds, AppointmentId, TimeWindow, UserId},
    command::{Command, ErrorMap, SimpleResult},
    database::{AllottedTimeStore, AppointmentStore},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AllottedTimeTag {
    UserId,
    AllottedTime,
}

/// Seconds `user_id` holds in requested, scheduled or running bookings,
/// leaving out `excluding`.
fn booked_seconds<S: AppointmentStore>(
    store: &S,
    user_id: UserId,
    excluding: Option<AppointmentId>,
) -> anyhow::Result<i64> {
    Ok(store
        .find_active_for_user(user_id)
        .context("active appointments")?
        .iter()
        .filter(|appointment| Some(appointment.id) != excluding)
        .map(|appointment| appointment.window.seconds())
        .sum())
}

/// The refusal message when booking `window` would push `user_id` past their
/// cap. Users without a cap are never refused.
pub fn check_allotted_time<S>(
    store: &S,
    user_id: UserId,
    window: &TimeWindow,
    updating: Option<AppointmentId>,
) -> anyhow::Result<Option<String>>
where
    S: AppointmentStore + AllottedTimeStore,
{
    let cap = match store.find_allotted_time(user_id).context("allotted time")? {
        Some(cap) => cap,
        None => return Ok(None),
    };
    let booked = booked_seconds(store, user_id, updating)?;
    if booked + window.seconds() > cap.saturating_mul(60) {
        Ok(Some(format!(
            "{} more minutes exceed the allotted {} minutes, {} already booked",
            window.minutes(),
            cap,
            minutes_from_seconds(booked)
        )))
    } else {
        Ok(None)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AllottedTime {
    pub user_id: UserId,
    /// `None` means unlimited.
    pub allotted_minutes: Option<i64>,
    pub booked_minutes: i64,
}

pub struct RetrieveAllottedTime<'a, S> {
    store: &'a S,
    user_id: UserId,
}

impl<'a, S> RetrieveAllottedTime<'a, S>
where
    S: AppointmentStore + AllottedTimeStore,
{
    pub fn new(store: &'a S, user_id: UserId) -> Self {
        Self { store, user_id }
    }
}

impl<S> Command for RetrieveAllottedTime<'_, S>
where
    S: AppointmentStore + AllottedTimeStore,
{
    type Success = AllottedTime;
    type Tag = AllottedTimeTag;

    fn execute(&self) -> anyhow::Result<SimpleResult<AllottedTime, AllottedTimeTag>> {
        Ok(Ok(AllottedTime {
            user_id: self.user_id,
            allotted_minutes: self.store.find_allotted_time(self.user_id)?,
            booked_minutes: minutes_from_seconds(booked_seconds(self.store, self.user_id, None)?),
        }))
    }
}

pub struct UpdateAllottedTime<'a, S> {
    store: &'a S,
    user_id: UserId,
    minutes: Option<i64>,
}

impl<'a, S: AllottedTimeStore> UpdateAllottedTime<'a, S> {
    pub fn new(store: &'a S, user_id: UserId, minutes: Option<i64>) -> Self {
        Self {
            store,
            user_id,
            minutes,
        }
    }
}

impl<S: AllottedTimeStore> Command for UpdateAllottedTime<'_, S> {
    type Success = i64;
    type Tag = AllottedTimeTag;

    /// Lowering a cap below what is already booked is allowed; it only
    /// affects future bookings.
    fn execute(&self) -> anyhow::Result<SimpleResult<i64, AllottedTimeTag>> {
        let minutes = match self.minutes {
            Some(minutes) if minutes >= 0 => minutes,
            Some(_) => {
                return Ok(Err(ErrorMap::single(
                    AllottedTimeTag::AllottedTime,
                    "allotted time cannot be negative",
                )))
            }
            None => {
                return Ok(Err(ErrorMap::single(
                    AllottedTimeTag::AllottedTime,
                    "allotted time is required",
                )))
            }
        };

        self.store
            .set_allotted_time(self.user_id, minutes)
            .context("set allotted time")?;
        info!(user_id = self.user_id, minutes, "allotted time updated");
        Ok(Ok(minutes))
    }
}
