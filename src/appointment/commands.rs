use anyhow::Context;
use chrono::Utc;
use tracing::{debug, info};

use super::{
    factory::{AppointmentFactory, Capability},
    overlap::find_conflicts,
    requests::{AppointmentForm, AppointmentRequest, AppointmentTag, LifecycleTag},
    status::Transition,
    Appointment, AppointmentChanges, AppointmentDetail, AppointmentId, AppointmentStatus,
    NewAppointment, Orientation, Reading, TelescopeId, UserId,
};
use crate::{
    allotted_time::check_allotted_time,
    auth::UserContext,
    command::{Command, ErrorMap, SimpleResult},
    database::{AllottedTimeStore, AppointmentStore, RoleStore},
    utils::format_time_str,
};

/// Why `telescope_id` cannot take bookings right now, if it cannot.
fn telescope_problem<S: AppointmentStore>(
    store: &S,
    telescope_id: TelescopeId,
) -> anyhow::Result<Option<&'static str>> {
    Ok(match store.telescope_online(telescope_id)? {
        None => Some("No such telescope"),
        Some(false) => Some("telescope is offline"),
        Some(true) => None,
    })
}

/// Whether `caller` may see `appointment` at all.
pub fn visible_to<S: AppointmentStore>(
    store: &S,
    appointment: &Appointment,
    caller: &UserContext,
) -> anyhow::Result<bool> {
    if appointment.is_public || caller.owns_or_admin(appointment.user_id) {
        return Ok(true);
    }
    store.is_viewer(appointment.id, caller.user_id())
}

/// Overlap and allotted-time checks shared by create and update. Must run
/// under the telescope lock so the write that follows sees the same state.
fn check_booking<S>(
    store: &S,
    owner: UserId,
    request: &AppointmentRequest,
    updating: Option<AppointmentId>,
) -> anyhow::Result<ErrorMap<AppointmentTag>>
where
    S: AppointmentStore + AllottedTimeStore,
{
    let mut errors = ErrorMap::new();

    for conflict in find_conflicts(store, request.telescope_id, &request.window, updating)? {
        errors.add(
            AppointmentTag::Overlap,
            format!(
                "overlaps appointment {} from {} to {}",
                conflict.id,
                format_time_str(&conflict.window.start()),
                format_time_str(&conflict.window.end()),
            ),
        );
    }
    if let Some(message) = check_allotted_time(store, owner, &request.window, updating)? {
        errors.add(AppointmentTag::AllottedTime, message);
    }

    Ok(errors)
}

pub struct CreateAppointment<'a, S> {
    store: &'a S,
    factory: Option<&'a dyn AppointmentFactory>,
    owner: UserId,
    needs_approval: bool,
    form: AppointmentForm,
}

impl<'a, S> CreateAppointment<'a, S>
where
    S: AppointmentStore + AllottedTimeStore,
{
    /// `factory` is `None` when the form names no known observation mode.
    pub fn new(
        store: &'a S,
        factory: Option<&'a dyn AppointmentFactory>,
        owner: &UserContext,
        form: AppointmentForm,
    ) -> Self {
        Self {
            store,
            factory,
            owner: owner.user_id(),
            needs_approval: super::factory::needs_approval(owner),
            form,
        }
    }
}

impl<S> Command for CreateAppointment<'_, S>
where
    S: AppointmentStore + AllottedTimeStore,
{
    type Success = AppointmentId;
    type Tag = AppointmentTag;

    fn execute(&self) -> anyhow::Result<SimpleResult<AppointmentId, AppointmentTag>> {
        let factory = match self.factory {
            Some(factory) => factory,
            None => {
                return Ok(Err(ErrorMap::single(
                    AppointmentTag::ObservationMode,
                    "observation mode is missing or unknown",
                )))
            }
        };
        let request = match AppointmentRequest::validate(factory, &self.form) {
            Ok(request) => request,
            Err(errors) => return Ok(Err(errors)),
        };
        if let Some(problem) = telescope_problem(self.store, request.telescope_id)? {
            return Ok(Err(ErrorMap::single(AppointmentTag::TelescopeId, problem)));
        }

        self.store.with_telescope_lock(request.telescope_id, || {
            let errors = check_booking(self.store, self.owner, &request, None)?;
            if !errors.is_empty() {
                debug!(
                    user_id = self.owner,
                    telescope_id = request.telescope_id,
                    tags = ?errors.tags().collect::<Vec<_>>(),
                    "booking rejected"
                );
                return Ok(Err(errors));
            }

            let status = factory.initial_status(self.needs_approval);
            let data = NewAppointment {
                user_id: self.owner,
                telescope_id: request.telescope_id,
                window: request.window,
                status,
                is_public: request.is_public,
                target: request.target.clone(),
                receiver: request.receiver,
            };
            let id = self
                .store
                .insert_appointment(&data)
                .context("insert appointment")?;
            info!(
                appointment_id = id,
                user_id = self.owner,
                telescope_id = request.telescope_id,
                mode = %factory.mode(),
                status = %status,
                "appointment created"
            );
            Ok(Ok(id))
        })
    }
}

pub struct UpdateAppointment<'a, S> {
    store: &'a S,
    factory: &'a dyn AppointmentFactory,
    appointment: Appointment,
    form: AppointmentForm,
}

impl<'a, S> UpdateAppointment<'a, S>
where
    S: AppointmentStore + AllottedTimeStore,
{
    pub fn new(
        store: &'a S,
        factory: &'a dyn AppointmentFactory,
        appointment: Appointment,
        form: AppointmentForm,
    ) -> Self {
        Self {
            store,
            factory,
            appointment,
            form,
        }
    }

    fn editable(status: AppointmentStatus) -> SimpleResult<(), AppointmentTag> {
        match status {
            AppointmentStatus::Requested | AppointmentStatus::Scheduled => Ok(()),
            status => Err(ErrorMap::single(
                AppointmentTag::Status,
                format!("a {} appointment can no longer be changed", status),
            )),
        }
    }
}

impl<S> Command for UpdateAppointment<'_, S>
where
    S: AppointmentStore + AllottedTimeStore,
{
    type Success = AppointmentId;
    type Tag = AppointmentTag;

    fn execute(&self) -> anyhow::Result<SimpleResult<AppointmentId, AppointmentTag>> {
        let id = self.appointment.id;
        if let Err(errors) = Self::editable(self.appointment.status) {
            return Ok(Err(errors));
        }
        if self.factory.mode() != self.appointment.mode {
            return Ok(Err(ErrorMap::single(
                AppointmentTag::ObservationMode,
                "the observation mode of an appointment cannot change",
            )));
        }
        let request = match AppointmentRequest::validate(self.factory, &self.form) {
            Ok(request) => request,
            Err(errors) => return Ok(Err(errors)),
        };
        if let Some(problem) = telescope_problem(self.store, request.telescope_id)? {
            return Ok(Err(ErrorMap::single(AppointmentTag::TelescopeId, problem)));
        }

        self.store.with_telescope_lock(request.telescope_id, || {
            let current = match self.store.find_appointment(id)? {
                Some(current) => current,
                None => anyhow::bail!("appointment {} vanished during update", id),
            };
            if let Err(errors) = Self::editable(current.status) {
                return Ok(Err(errors));
            }

            let errors = check_booking(self.store, current.user_id, &request, Some(id))?;
            if !errors.is_empty() {
                return Ok(Err(errors));
            }

            let changes = AppointmentChanges {
                telescope_id: request.telescope_id,
                window: request.window,
                is_public: request.is_public,
                target: request.target.clone(),
                receiver: request.receiver,
            };
            self.store
                .update_appointment(id, &changes)
                .context("update appointment")?;
            info!(appointment_id = id, telescope_id = request.telescope_id, "appointment updated");
            Ok(Ok(id))
        })
    }
}

fn load<S: AppointmentStore>(
    store: &S,
    id: AppointmentId,
) -> anyhow::Result<SimpleResult<Appointment, LifecycleTag>> {
    Ok(store
        .find_appointment(id)?
        .ok_or_else(|| ErrorMap::single(LifecycleTag::Id, "No such appointment")))
}

fn require_capability(
    factory: &dyn AppointmentFactory,
    appointment: &Appointment,
    capability: Capability,
) -> SimpleResult<(), LifecycleTag> {
    if factory.mode() != appointment.mode {
        return Err(ErrorMap::single(
            LifecycleTag::ObservationMode,
            format!("appointment is a {} appointment", appointment.mode),
        ));
    }
    if !factory.supports(capability) {
        return Err(ErrorMap::single(
            LifecycleTag::ObservationMode,
            format!("{} appointments do not support {:?}", appointment.mode, capability),
        ));
    }
    Ok(())
}

/// Start, stop, cancel and approve: one state machine step.
pub struct ChangeStatus<'a, S> {
    store: &'a S,
    factory: Option<&'a dyn AppointmentFactory>,
    id: AppointmentId,
    transition: Transition,
}

impl<'a, S: AppointmentStore> ChangeStatus<'a, S> {
    pub fn new(
        store: &'a S,
        factory: &'a dyn AppointmentFactory,
        id: AppointmentId,
        transition: Transition,
    ) -> Self {
        Self {
            store,
            factory: Some(factory),
            id,
            transition,
        }
    }

    pub fn cancel(store: &'a S, id: AppointmentId) -> Self {
        Self {
            store,
            factory: None,
            id,
            transition: Transition::Cancel,
        }
    }

    pub fn approve(store: &'a S, id: AppointmentId) -> Self {
        Self {
            store,
            factory: None,
            id,
            transition: Transition::Schedule,
        }
    }

    fn refuse_start(
        &self,
        current: &Appointment,
    ) -> anyhow::Result<Option<ErrorMap<LifecycleTag>>> {
        let awaiting = self
            .factory
            .map_or(false, |factory| factory.awaits_approval(current.status));
        if awaiting {
            return Ok(Some(ErrorMap::single(
                LifecycleTag::Status,
                "appointment has not been approved yet",
            )));
        }
        if self.store.telescope_online(current.telescope_id)? != Some(true) {
            return Ok(Some(ErrorMap::single(
                LifecycleTag::Telescope,
                "telescope is offline",
            )));
        }
        Ok(None)
    }

    fn capability(&self) -> Option<Capability> {
        match self.transition {
            Transition::Start => Some(Capability::Start),
            Transition::Stop => Some(Capability::Stop),
            Transition::Cancel | Transition::Schedule => None,
        }
    }
}

impl<S: AppointmentStore> Command for ChangeStatus<'_, S> {
    type Success = AppointmentStatus;
    type Tag = LifecycleTag;

    fn execute(&self) -> anyhow::Result<SimpleResult<AppointmentStatus, LifecycleTag>> {
        let appointment = match load(self.store, self.id)? {
            Ok(appointment) => appointment,
            Err(errors) => return Ok(Err(errors)),
        };
        if let (Some(capability), Some(factory)) = (self.capability(), self.factory) {
            if let Err(errors) = require_capability(factory, &appointment, capability) {
                return Ok(Err(errors));
            }
        }

        self.store.with_telescope_lock(appointment.telescope_id, || {
            let current = match load(self.store, self.id)? {
                Ok(current) => current,
                Err(errors) => return Ok(Err(errors)),
            };
            let next = match current.status.transition(self.transition) {
                Ok(next) => next,
                Err(err) => return Ok(Err(ErrorMap::single(LifecycleTag::Status, err))),
            };
            if self.transition == Transition::Start {
                if let Some(errors) = self.refuse_start(&current)? {
                    return Ok(Err(errors));
                }
            }

            if next != current.status {
                self.store
                    .set_status(self.id, next)
                    .context("set appointment status")?;
                if next == AppointmentStatus::Completed {
                    self.store
                        .set_ended_at(self.id, Utc::now().naive_utc())
                        .context("record observation end")?;
                }
                info!(
                    appointment_id = self.id,
                    from = %current.status,
                    to = %next,
                    "appointment status changed"
                );
            }
            Ok(Ok(next))
        })
    }
}

pub struct CalibrateAppointment<'a, S> {
    store: &'a S,
    factory: &'a dyn AppointmentFactory,
    id: AppointmentId,
}

impl<'a, S: AppointmentStore> CalibrateAppointment<'a, S> {
    pub fn new(store: &'a S, factory: &'a dyn AppointmentFactory, id: AppointmentId) -> Self {
        Self { store, factory, id }
    }
}

impl<S: AppointmentStore> Command for CalibrateAppointment<'_, S> {
    type Success = Orientation;
    type Tag = LifecycleTag;

    /// Points the telescope at the appointment's orientation target and
    /// records the calibration time; the status stays `InProgress`.
    fn execute(&self) -> anyhow::Result<SimpleResult<Orientation, LifecycleTag>> {
        let appointment = match load(self.store, self.id)? {
            Ok(appointment) => appointment,
            Err(errors) => return Ok(Err(errors)),
        };
        let capability = require_capability(self.factory, &appointment, Capability::Calibrate);
        if let Err(errors) = capability {
            return Ok(Err(errors));
        }

        let telescope_id = appointment.telescope_id;
        self.store.with_telescope_lock(telescope_id, || {
            let mut errors = ErrorMap::new();
            let status = self
                .store
                .find_appointment(self.id)?
                .map_or(appointment.status, |current| current.status);
            if !status.can_calibrate() {
                errors.add(
                    LifecycleTag::Status,
                    format!("cannot calibrate an appointment that is {}", status),
                );
            }
            let target = self
                .store
                .find_target(self.id)?
                .and_then(|target| target.orientation());
            if target.is_none() {
                errors.add(LifecycleTag::Orientation, "appointment has no orientation target");
            }
            if self.store.find_orientation(telescope_id)?.is_none() {
                errors.add(LifecycleTag::Telescope, "telescope has no orientation record");
            }

            let target = match target {
                Some(target) if errors.is_empty() => target,
                _ => return Ok(Err(errors)),
            };
            self.store
                .update_orientation(telescope_id, &target, Utc::now().naive_utc())
                .context("update telescope orientation")?;
            info!(appointment_id = self.id, telescope_id, "telescope calibrated");
            Ok(Ok(target))
        })
    }
}

pub struct AddReading<'a, S> {
    store: &'a S,
    factory: &'a dyn AppointmentFactory,
    id: AppointmentId,
    power: Option<f64>,
}

impl<'a, S: AppointmentStore> AddReading<'a, S> {
    pub fn new(
        store: &'a S,
        factory: &'a dyn AppointmentFactory,
        id: AppointmentId,
        power: Option<f64>,
    ) -> Self {
        Self {
            store,
            factory,
            id,
            power,
        }
    }
}

impl<S: AppointmentStore> Command for AddReading<'_, S> {
    type Success = Reading;
    type Tag = LifecycleTag;

    fn execute(&self) -> anyhow::Result<SimpleResult<Reading, LifecycleTag>> {
        let power = match self.power {
            Some(power) if power.is_finite() => power,
            Some(_) => {
                return Ok(Err(ErrorMap::single(
                    LifecycleTag::Reading,
                    "power must be finite",
                )))
            }
            None => {
                return Ok(Err(ErrorMap::single(
                    LifecycleTag::Reading,
                    "power is required",
                )))
            }
        };
        let appointment = match load(self.store, self.id)? {
            Ok(appointment) => appointment,
            Err(errors) => return Ok(Err(errors)),
        };
        let capability = require_capability(self.factory, &appointment, Capability::AddReading);
        if let Err(errors) = capability {
            return Ok(Err(errors));
        }

        self.store.with_telescope_lock(appointment.telescope_id, || {
            let current = match load(self.store, self.id)? {
                Ok(current) => current,
                Err(errors) => return Ok(Err(errors)),
            };
            if current.status != AppointmentStatus::InProgress {
                return Ok(Err(ErrorMap::single(
                    LifecycleTag::Status,
                    format!("readings need an appointment in progress, not {}", current.status),
                )));
            }

            let reading = Reading {
                time: Utc::now().naive_utc(),
                power,
            };
            self.store
                .insert_reading(self.id, &reading)
                .context("insert reading")?;
            Ok(Ok(reading))
        })
    }
}

pub struct RetrieveAppointment<'a, S> {
    store: &'a S,
    id: AppointmentId,
}

impl<'a, S: AppointmentStore> RetrieveAppointment<'a, S> {
    pub fn new(store: &'a S, id: AppointmentId) -> Self {
        Self { store, id }
    }
}

impl<S: AppointmentStore> Command for RetrieveAppointment<'_, S> {
    type Success = AppointmentDetail;
    type Tag = LifecycleTag;

    fn execute(&self) -> anyhow::Result<SimpleResult<AppointmentDetail, LifecycleTag>> {
        let appointment = match load(self.store, self.id)? {
            Ok(appointment) => appointment,
            Err(errors) => return Ok(Err(errors)),
        };
        Ok(Ok(AppointmentDetail {
            target: self.store.find_target(self.id)?,
            receiver: self.store.find_receiver(self.id)?,
            readings: self.store.find_readings(self.id)?,
            appointment,
        }))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListScope {
    User(UserId),
    Telescope(TelescopeId),
}

/// Appointments in `scope` that the caller is allowed to see.
pub struct ListAppointments<'a, S> {
    store: &'a S,
    caller: UserContext,
    scope: ListScope,
}

impl<'a, S> ListAppointments<'a, S>
where
    S: AppointmentStore + RoleStore,
{
    pub fn new(store: &'a S, caller: &UserContext, scope: ListScope) -> Self {
        Self {
            store,
            caller: caller.clone(),
            scope,
        }
    }
}

impl<S> Command for ListAppointments<'_, S>
where
    S: AppointmentStore + RoleStore,
{
    type Success = Vec<Appointment>;
    type Tag = AppointmentTag;

    fn execute(&self) -> anyhow::Result<SimpleResult<Vec<Appointment>, AppointmentTag>> {
        let appointments = match self.scope {
            ListScope::User(user_id) => {
                if !self.store.user_exists(user_id)? {
                    return Ok(Err(ErrorMap::single(AppointmentTag::UserId, "No such user")));
                }
                self.store.list_for_user(user_id)?
            }
            ListScope::Telescope(telescope_id) => {
                if !self.store.telescope_exists(telescope_id)? {
                    return Ok(Err(ErrorMap::single(
                        AppointmentTag::TelescopeId,
                        "No such telescope",
                    )));
                }
                self.store.list_for_telescope(telescope_id)?
            }
        };

        let mut visible = Vec::with_capacity(appointments.len());
        for appointment in appointments {
            if visible_to(self.store, &appointment, &self.caller)? {
                visible.push(appointment);
            }
        }
        Ok(Ok(visible))
    }
}

/// Grants another user read access to a private appointment.
pub struct ShareAppointment<'a, S> {
    store: &'a S,
    id: AppointmentId,
    viewer: Option<UserId>,
}

impl<'a, S> ShareAppointment<'a, S>
where
    S: AppointmentStore + RoleStore,
{
    pub fn new(store: &'a S, id: AppointmentId, viewer: Option<UserId>) -> Self {
        Self { store, id, viewer }
    }
}

impl<S> Command for ShareAppointment<'_, S>
where
    S: AppointmentStore + RoleStore,
{
    type Success = ();
    type Tag = AppointmentTag;

    fn execute(&self) -> anyhow::Result<SimpleResult<(), AppointmentTag>> {
        let viewer = match self.viewer {
            Some(viewer) => viewer,
            None => return Ok(Err(ErrorMap::single(AppointmentTag::UserId, "viewer is required"))),
        };
        if !self.store.user_exists(viewer)? {
            return Ok(Err(ErrorMap::single(AppointmentTag::UserId, "No such user")));
        }
        self.store
            .add_viewer(self.id, viewer)
            .context("add appointment viewer")?;
        Ok(Ok(()))
    }
}
