use super::{
    commands::{
        visible_to, ChangeStatus, CreateAppointment, ListAppointments, ListScope,
        RetrieveAppointment, ShareAppointment,
    },
    factory::factory_for,
    requests::{AppointmentForm, AppointmentTag, LifecycleTag},
    Appointment, AppointmentDetail, AppointmentId, AppointmentStatus, Orientation, Reading,
    TelescopeId, UserId,
};
use crate::{
    auth::{no_resource, AccessReport, AccessTag, Guard, UserContext},
    command::SimpleResult,
    database::{AllottedTimeStore, AppointmentStore, RoleStore},
    role::Role,
};

type Access = anyhow::Result<Option<AccessReport>>;

fn no_such_appointment() -> AccessReport {
    AccessReport::invalid(AccessTag::AppointmentId, "No such appointment")
}

/// The appointment, provided `caller` owns it or is an admin. Appointments of
/// other users are reported exactly like missing ones.
fn owned<S: AppointmentStore>(
    store: &S,
    caller: &UserContext,
    id: AppointmentId,
) -> anyhow::Result<Result<Appointment, AccessReport>> {
    Ok(match store.find_appointment(id)? {
        Some(appointment) if caller.owns_or_admin(appointment.user_id) => Ok(appointment),
        _ => Err(no_such_appointment()),
    })
}

fn visible<S: AppointmentStore>(
    store: &S,
    caller: &UserContext,
    id: AppointmentId,
) -> anyhow::Result<Result<Appointment, AccessReport>> {
    match store.find_appointment(id)? {
        Some(appointment) if visible_to(store, &appointment, caller)? => Ok(Ok(appointment)),
        _ => Ok(Err(no_such_appointment())),
    }
}

/// Role and ownership gate in front of every appointment command.
pub struct AppointmentWrapper<'a, S> {
    store: &'a S,
    guard: Guard<'a>,
}

impl<'a, S> AppointmentWrapper<'a, S>
where
    S: AppointmentStore + AllottedTimeStore + RoleStore,
{
    pub fn new(store: &'a S, caller: Option<&'a UserContext>) -> Self {
        Self {
            store,
            guard: Guard::new(caller),
        }
    }

    pub fn create<F>(&self, form: AppointmentForm, on_result: F) -> Access
    where
        F: FnOnce(SimpleResult<AppointmentId, AppointmentTag>),
    {
        let store = self.store;
        self.guard.secure_action(
            "create appointment",
            &Role::OBSERVERS,
            no_resource,
            |caller, ()| match form.mode() {
                Some(mode) => factory_for(mode).create(store, caller, form),
                None => CreateAppointment::new(store, None, caller, form),
            },
            on_result,
        )
    }

    /// The observation mode of a booked appointment is fixed; `form` is
    /// validated against it.
    pub fn update<F>(&self, id: AppointmentId, form: AppointmentForm, on_result: F) -> Access
    where
        F: FnOnce(SimpleResult<AppointmentId, AppointmentTag>),
    {
        let store = self.store;
        self.guard.secure_action(
            "update appointment",
            &Role::OBSERVERS,
            |caller| owned(store, caller, id),
            |_, appointment| factory_for(appointment.mode).update(store, appointment, form),
            on_result,
        )
    }

    pub fn start<F>(&self, id: AppointmentId, on_result: F) -> Access
    where
        F: FnOnce(SimpleResult<AppointmentStatus, LifecycleTag>),
    {
        let store = self.store;
        self.guard.secure_action(
            "start appointment",
            &Role::OBSERVERS,
            |caller| owned(store, caller, id),
            |_, appointment| factory_for(appointment.mode).start(store, appointment.id),
            on_result,
        )
    }

    pub fn stop<F>(&self, id: AppointmentId, on_result: F) -> Access
    where
        F: FnOnce(SimpleResult<AppointmentStatus, LifecycleTag>),
    {
        let store = self.store;
        self.guard.secure_action(
            "stop appointment",
            &Role::OBSERVERS,
            |caller| owned(store, caller, id),
            |_, appointment| factory_for(appointment.mode).stop(store, appointment.id),
            on_result,
        )
    }

    pub fn calibrate<F>(&self, id: AppointmentId, on_result: F) -> Access
    where
        F: FnOnce(SimpleResult<Orientation, LifecycleTag>),
    {
        let store = self.store;
        self.guard.secure_action(
            "calibrate telescope",
            &Role::OBSERVERS,
            |caller| owned(store, caller, id),
            |_, appointment| factory_for(appointment.mode).calibrate(store, appointment.id),
            on_result,
        )
    }

    pub fn add_reading<F>(&self, id: AppointmentId, power: Option<f64>, on_result: F) -> Access
    where
        F: FnOnce(SimpleResult<Reading, LifecycleTag>),
    {
        let store = self.store;
        self.guard.secure_action(
            "add reading",
            &Role::OBSERVERS,
            |caller| owned(store, caller, id),
            |_, appointment| {
                factory_for(appointment.mode).add_reading(store, appointment.id, power)
            },
            on_result,
        )
    }

    pub fn cancel<F>(&self, id: AppointmentId, on_result: F) -> Access
    where
        F: FnOnce(SimpleResult<AppointmentStatus, LifecycleTag>),
    {
        let store = self.store;
        self.guard.secure_action(
            "cancel appointment",
            &Role::OBSERVERS,
            |caller| owned(store, caller, id),
            |_, appointment| ChangeStatus::cancel(store, appointment.id),
            on_result,
        )
    }

    pub fn approve<F>(&self, id: AppointmentId, on_result: F) -> Access
    where
        F: FnOnce(SimpleResult<AppointmentStatus, LifecycleTag>),
    {
        let store = self.store;
        self.guard.secure_action(
            "approve appointment",
            &[Role::Admin],
            |caller| owned(store, caller, id),
            |_, appointment| ChangeStatus::approve(store, appointment.id),
            on_result,
        )
    }

    pub fn retrieve<F>(&self, id: AppointmentId, on_result: F) -> Access
    where
        F: FnOnce(SimpleResult<AppointmentDetail, LifecycleTag>),
    {
        let store = self.store;
        self.guard.secure_action(
            "retrieve appointment",
            &Role::ALL,
            |caller| visible(store, caller, id),
            |_, appointment| RetrieveAppointment::new(store, appointment.id),
            on_result,
        )
    }

    pub fn list_for_user<F>(&self, user_id: UserId, on_result: F) -> Access
    where
        F: FnOnce(SimpleResult<Vec<Appointment>, AppointmentTag>),
    {
        let store = self.store;
        self.guard.secure_action(
            "list user appointments",
            &Role::ALL,
            no_resource,
            |caller, ()| ListAppointments::new(store, caller, ListScope::User(user_id)),
            on_result,
        )
    }

    pub fn list_for_telescope<F>(&self, telescope_id: TelescopeId, on_result: F) -> Access
    where
        F: FnOnce(SimpleResult<Vec<Appointment>, AppointmentTag>),
    {
        let store = self.store;
        self.guard.secure_action(
            "list telescope appointments",
            &Role::ALL,
            no_resource,
            |caller, ()| ListAppointments::new(store, caller, ListScope::Telescope(telescope_id)),
            on_result,
        )
    }

    pub fn share<F>(&self, id: AppointmentId, viewer: Option<UserId>, on_result: F) -> Access
    where
        F: FnOnce(SimpleResult<(), AppointmentTag>),
    {
        let store = self.store;
        self.guard.secure_action(
            "share appointment",
            &Role::OBSERVERS,
            |caller| owned(store, caller, id),
            |_, appointment| ShareAppointment::new(store, appointment.id, viewer),
            on_result,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{appointment::ObservationMode, database::memory::MemoryStore};

    fn drift_form(telescope_id: TelescopeId) -> AppointmentForm {
        AppointmentForm {
            telescope_id: Some(telescope_id),
            start_time: Some("2021-06-01T10:00:00Z".to_string()),
            end_time: Some("2021-06-01T11:00:00Z".to_string()),
            observation_mode: Some(ObservationMode::DriftScan.to_string()),
            orientation: Some(Orientation {
                azimuth: 200.0,
                elevation: 60.0,
            }),
            ..Default::default()
        }
    }

    fn user(store: &MemoryStore, name: &str, roles: &[Role]) -> UserContext {
        let id = store.add_user(name, roles);
        UserContext::new(id, roles.iter().copied())
    }

    fn book(store: &MemoryStore, owner: &UserContext, form: AppointmentForm) -> AppointmentId {
        let mut booked = None;
        let report = AppointmentWrapper::new(store, Some(owner))
            .create(form, |result| booked = Some(result))
            .unwrap();
        assert!(report.is_none());
        booked.unwrap().unwrap()
    }

    #[test]
    fn guest_calling_admin_operation_changes_nothing() {
        let store = MemoryStore::new();
        let telescope = store.add_telescope(None);
        let owner = user(&store, "ada", &[Role::Guest, Role::Student]);
        let id = book(&store, &owner, drift_form(telescope));
        let writes = store.writes();

        let guest = user(&store, "eve", &[Role::Guest]);
        let report = AppointmentWrapper::new(&store, Some(&guest))
            .approve(id, |_| panic!("must not run"))
            .unwrap()
            .unwrap();

        assert_eq!(
            report.missing_roles().unwrap().iter().copied().collect::<Vec<_>>(),
            vec![Role::Admin]
        );
        assert_eq!(store.writes(), writes);
        assert_eq!(
            store.find_appointment(id).unwrap().unwrap().status,
            AppointmentStatus::Requested
        );
    }

    #[test]
    fn guests_cannot_book() {
        let store = MemoryStore::new();
        let telescope = store.add_telescope(None);
        let guest = user(&store, "eve", &[Role::Guest]);

        let report = AppointmentWrapper::new(&store, Some(&guest))
            .create(drift_form(telescope), |_| panic!("must not run"))
            .unwrap()
            .unwrap();
        assert!(report.missing_roles().unwrap().contains(&Role::Student));
        assert_eq!(store.writes(), 0);
    }

    #[test]
    fn strangers_cannot_touch_appointments() {
        let store = MemoryStore::new();
        let telescope = store.add_telescope(None);
        let owner = user(&store, "ada", &[Role::Researcher]);
        let id = book(&store, &owner, drift_form(telescope));
        let stranger = user(&store, "mallory", &[Role::Member]);
        let wrapper = AppointmentWrapper::new(&store, Some(&stranger));

        let report = wrapper.cancel(id, |_| panic!("must not run")).unwrap().unwrap();
        assert!(report.invalid_resource_id().unwrap().contains(AccessTag::AppointmentId));
        let report = wrapper.retrieve(id, |_| panic!("must not run")).unwrap().unwrap();
        assert!(report.invalid_resource_id().is_some());

        // unknown ids look the same as foreign ones
        let report = wrapper.cancel(id + 100, |_| panic!("must not run")).unwrap().unwrap();
        assert_eq!(report, no_such_appointment());
    }

    #[test]
    fn admin_approves_student_booking() {
        let store = MemoryStore::new();
        let telescope = store.add_telescope(None);
        let student = user(&store, "sam", &[Role::Guest, Role::Student]);
        let admin = user(&store, "root", &[Role::Admin]);
        let id = book(&store, &student, drift_form(telescope));

        let mut status = None;
        let report = AppointmentWrapper::new(&store, Some(&admin))
            .approve(id, |result| status = Some(result))
            .unwrap();
        assert!(report.is_none());
        assert_eq!(status.unwrap(), Ok(AppointmentStatus::Scheduled));
    }

    #[test]
    fn owner_drives_lifecycle_through_wrapper() {
        let store = MemoryStore::new();
        let telescope = store.add_telescope(None);
        let owner = user(&store, "ada", &[Role::Researcher]);
        let id = book(&store, &owner, drift_form(telescope));
        let wrapper = AppointmentWrapper::new(&store, Some(&owner));

        let mut outcome = None;
        wrapper.start(id, |result| outcome = Some(result)).unwrap();
        assert_eq!(outcome.take().unwrap(), Ok(AppointmentStatus::InProgress));

        let mut reading = None;
        wrapper.add_reading(id, Some(3.25), |result| reading = Some(result)).unwrap();
        assert!(reading.unwrap().is_ok());

        wrapper.stop(id, |result| outcome = Some(result)).unwrap();
        assert_eq!(outcome.take().unwrap(), Ok(AppointmentStatus::Completed));

        let mut detail = None;
        wrapper.retrieve(id, |result| detail = Some(result)).unwrap();
        let detail = detail.unwrap().unwrap();
        assert_eq!(detail.appointment.status, AppointmentStatus::Completed);
        assert_eq!(detail.readings.len(), 1);
    }

    #[test]
    fn missing_mode_is_a_validation_error() {
        let store = MemoryStore::new();
        let telescope = store.add_telescope(None);
        let owner = user(&store, "ada", &[Role::Researcher]);
        let form = AppointmentForm {
            observation_mode: Some("SOLAR".to_string()),
            ..drift_form(telescope)
        };

        let mut outcome = None;
        let report = AppointmentWrapper::new(&store, Some(&owner))
            .create(form, |result| outcome = Some(result))
            .unwrap();
        assert!(report.is_none());
        assert!(outcome.unwrap().unwrap_err().contains(AppointmentTag::ObservationMode));
    }

    #[test]
    fn shared_appointment_becomes_retrievable() {
        let store = MemoryStore::new();
        let telescope = store.add_telescope(None);
        let owner = user(&store, "ada", &[Role::Researcher]);
        let friend = user(&store, "bob", &[Role::Guest]);
        let id = book(&store, &owner, drift_form(telescope));

        let mut shared = None;
        AppointmentWrapper::new(&store, Some(&owner))
            .share(id, Some(friend.user_id()), |result| shared = Some(result))
            .unwrap();
        assert_eq!(shared.unwrap(), Ok(()));

        let mut detail = None;
        let report = AppointmentWrapper::new(&store, Some(&friend))
            .retrieve(id, |result| detail = Some(result))
            .unwrap();
        assert!(report.is_none());
        assert_eq!(detail.unwrap().unwrap().appointment.id, id);
    }
}
