use super::{
    commands::{
        AddReading, CalibrateAppointment, ChangeStatus, CreateAppointment, UpdateAppointment,
    },
    requests::{AppointmentForm, AppointmentTag},
    status::Transition,
    Appointment, AppointmentId, AppointmentStatus, ObservationMode, ObservationTarget,
};
use crate::{
    auth::UserContext,
    command::{ErrorMap, SimpleResult},
    database::{AllottedTimeStore, AppointmentStore},
    role::Role,
};

/// Operations an observation mode may offer once an appointment is booked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Start,
    AddReading,
    Stop,
    Calibrate,
}

/// Mode-specific behavior behind the shared appointment commands.
pub trait AppointmentFactory: Sync {
    fn mode(&self) -> ObservationMode;

    fn capabilities(&self) -> &'static [Capability];

    /// Whether an accepted booking is scheduled without anyone starting it.
    fn auto_schedules(&self) -> bool;

    /// Validates and builds the pointing data this mode attaches.
    fn target(&self, form: &AppointmentForm) -> SimpleResult<ObservationTarget, AppointmentTag>;

    fn supports(&self, capability: Capability) -> bool {
        self.capabilities().contains(&capability)
    }

    /// A `Requested` booking of an auto-scheduling mode is waiting for an
    /// Admin and cannot be started yet.
    fn awaits_approval(&self, status: AppointmentStatus) -> bool {
        self.auto_schedules() && status == AppointmentStatus::Requested
    }

    fn initial_status(&self, needs_approval: bool) -> AppointmentStatus {
        if self.auto_schedules() && !needs_approval {
            AppointmentStatus::Scheduled
        } else {
            AppointmentStatus::Requested
        }
    }
}

pub struct FreeControlFactory;

pub struct RasterScanFactory;

pub struct DriftScanFactory;

fn orientation_target(form: &AppointmentForm) -> SimpleResult<super::Orientation, AppointmentTag> {
    let mut errors = ErrorMap::new();
    match form.orientation {
        Some(orientation) => {
            for problem in orientation.problems() {
                errors.add(AppointmentTag::Orientation, problem);
            }
            errors.into_result(orientation)
        }
        None => Err(ErrorMap::single(
            AppointmentTag::Orientation,
            "orientation is required",
        )),
    }
}

impl AppointmentFactory for FreeControlFactory {
    fn mode(&self) -> ObservationMode {
        ObservationMode::FreeControl
    }

    fn capabilities(&self) -> &'static [Capability] {
        &[
            Capability::Start,
            Capability::AddReading,
            Capability::Stop,
            Capability::Calibrate,
        ]
    }

    fn auto_schedules(&self) -> bool {
        false
    }

    fn target(&self, form: &AppointmentForm) -> SimpleResult<ObservationTarget, AppointmentTag> {
        orientation_target(form).map(|orientation| ObservationTarget::FreeControl { orientation })
    }
}

impl AppointmentFactory for RasterScanFactory {
    fn mode(&self) -> ObservationMode {
        ObservationMode::RasterScan
    }

    fn capabilities(&self) -> &'static [Capability] {
        &[Capability::Start, Capability::AddReading, Capability::Stop]
    }

    fn auto_schedules(&self) -> bool {
        true
    }

    fn target(&self, form: &AppointmentForm) -> SimpleResult<ObservationTarget, AppointmentTag> {
        let coordinates = match form.coordinates.as_deref() {
            Some([first, second]) => [*first, *second],
            Some(_) => {
                return Err(ErrorMap::single(
                    AppointmentTag::Coordinates,
                    "a raster scan needs exactly two corner coordinates",
                ))
            }
            None => {
                return Err(ErrorMap::single(
                    AppointmentTag::Coordinates,
                    "coordinates are required",
                ))
            }
        };

        let mut errors = ErrorMap::new();
        for problem in coordinates.iter().flat_map(|c| c.problems()) {
            errors.add(AppointmentTag::Coordinates, problem);
        }
        if coordinates[0] == coordinates[1] {
            errors.add(AppointmentTag::Coordinates, "raster corners must differ");
        }
        errors.into_result(ObservationTarget::RasterScan {
            corners: coordinates,
        })
    }
}

impl AppointmentFactory for DriftScanFactory {
    fn mode(&self) -> ObservationMode {
        ObservationMode::DriftScan
    }

    fn capabilities(&self) -> &'static [Capability] {
        &[
            Capability::Start,
            Capability::AddReading,
            Capability::Stop,
            Capability::Calibrate,
        ]
    }

    fn auto_schedules(&self) -> bool {
        true
    }

    fn target(&self, form: &AppointmentForm) -> SimpleResult<ObservationTarget, AppointmentTag> {
        orientation_target(form).map(|orientation| ObservationTarget::DriftScan { orientation })
    }
}

pub fn factory_for(mode: ObservationMode) -> &'static dyn AppointmentFactory {
    match mode {
        ObservationMode::FreeControl => &FreeControlFactory,
        ObservationMode::RasterScan => &RasterScanFactory,
        ObservationMode::DriftScan => &DriftScanFactory,
    }
}

/// Whether bookings made by `owner` wait for an admin before being scheduled.
pub fn needs_approval(owner: &UserContext) -> bool {
    !owner.has_any(&Role::TRUSTED)
}

impl dyn AppointmentFactory {
    pub fn create<'a, S>(
        &'a self,
        store: &'a S,
        owner: &UserContext,
        form: AppointmentForm,
    ) -> CreateAppointment<'a, S>
    where
        S: AppointmentStore + AllottedTimeStore,
    {
        CreateAppointment::new(store, Some(self), owner, form)
    }

    pub fn update<'a, S>(
        &'a self,
        store: &'a S,
        appointment: Appointment,
        form: AppointmentForm,
    ) -> UpdateAppointment<'a, S>
    where
        S: AppointmentStore + AllottedTimeStore,
    {
        UpdateAppointment::new(store, self, appointment, form)
    }

    pub fn start<'a, S: AppointmentStore>(
        &'a self,
        store: &'a S,
        id: AppointmentId,
    ) -> ChangeStatus<'a, S> {
        ChangeStatus::new(store, self, id, Transition::Start)
    }

    pub fn stop<'a, S: AppointmentStore>(
        &'a self,
        store: &'a S,
        id: AppointmentId,
    ) -> ChangeStatus<'a, S> {
        ChangeStatus::new(store, self, id, Transition::Stop)
    }

    pub fn calibrate<'a, S: AppointmentStore>(
        &'a self,
        store: &'a S,
        id: AppointmentId,
    ) -> CalibrateAppointment<'a, S> {
        CalibrateAppointment::new(store, self, id)
    }

    pub fn add_reading<'a, S: AppointmentStore>(
        &'a self,
        store: &'a S,
        id: AppointmentId,
        power: Option<f64>,
    ) -> AddReading<'a, S> {
        AddReading::new(store, self, id, power)
    }
}
