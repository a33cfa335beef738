//! In-process store for unit tests.

use chrono::NaiveDateTime;
use std::{
    collections::{BTreeMap, BTreeSet, HashMap, HashSet},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex, MutexGuard,
    },
};

use super::{AllottedTimeStore, AppointmentStore, RoleStore, Session, SessionStore};
use crate::{
    appointment::{
        Appointment, AppointmentChanges, AppointmentId, AppointmentStatus, NewAppointment,
        ObservationTarget, Orientation, Reading, ReceiverConfig, TelescopeId, UserId,
    },
    role::{Role, UserRole, UserRoleId},
};

#[derive(Default)]
struct Tables {
    next_id: u64,
    users: BTreeMap<UserId, String>,
    sessions: HashMap<String, Session>,
    user_roles: BTreeMap<UserRoleId, UserRole>,
    telescopes: BTreeSet<TelescopeId>,
    offline: HashSet<TelescopeId>,
    orientations: HashMap<TelescopeId, (Orientation, Option<NaiveDateTime>)>,
    appointments: BTreeMap<AppointmentId, Appointment>,
    targets: HashMap<AppointmentId, ObservationTarget>,
    receivers: HashMap<AppointmentId, ReceiverConfig>,
    readings: HashMap<AppointmentId, Vec<Reading>>,
    viewers: HashSet<(AppointmentId, UserId)>,
    caps: HashMap<UserId, i64>,
}

impl Tables {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    telescope_locks: Mutex<HashMap<TelescopeId, Arc<Mutex<()>>>>,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().expect("memory store poisoned")
    }

    fn write(&self) -> MutexGuard<'_, Tables> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.tables()
    }

    /// Number of mutating calls made through the store traits.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn add_user(&self, username: &str, approved: &[Role]) -> UserId {
        let mut tables = self.tables();
        let user_id = tables.next_id();
        tables.users.insert(user_id, username.to_string());
        for role in approved {
            let id = tables.next_id();
            tables.user_roles.insert(
                id,
                UserRole {
                    id,
                    user_id,
                    role: *role,
                    approved: true,
                },
            );
        }
        user_id
    }

    pub fn add_pending_role(&self, user_id: UserId, role: Role) -> UserRoleId {
        let mut tables = self.tables();
        let id = tables.next_id();
        tables.user_roles.insert(
            id,
            UserRole {
                id,
                user_id,
                role,
                approved: false,
            },
        );
        id
    }

    pub fn add_session(&self, token: &str, user_id: UserId, login_time: NaiveDateTime) {
        self.tables()
            .sessions
            .insert(token.to_string(), Session { user_id, login_time });
    }

    pub fn add_telescope(&self, orientation: Option<Orientation>) -> TelescopeId {
        let mut tables = self.tables();
        let id = tables.next_id();
        tables.telescopes.insert(id);
        if let Some(orientation) = orientation {
            tables.orientations.insert(id, (orientation, None));
        }
        id
    }

    pub fn take_offline(&self, telescope_id: TelescopeId) {
        self.tables().offline.insert(telescope_id);
    }

    pub fn calibrated_at(&self, telescope_id: TelescopeId) -> Option<NaiveDateTime> {
        self.tables()
            .orientations
            .get(&telescope_id)
            .and_then(|(_, calibrated_at)| *calibrated_at)
    }
}

impl AppointmentStore for MemoryStore {
    fn with_telescope_lock<T, F>(&self, telescope_id: TelescopeId, f: F) -> anyhow::Result<T>
    where
        F: FnOnce() -> anyhow::Result<T>,
    {
        let lock = self
            .telescope_locks
            .lock()
            .expect("memory store poisoned")
            .entry(telescope_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().expect("memory store poisoned");
        f()
    }

    fn telescope_exists(&self, telescope_id: TelescopeId) -> anyhow::Result<bool> {
        Ok(self.tables().telescopes.contains(&telescope_id))
    }

    fn telescope_online(&self, telescope_id: TelescopeId) -> anyhow::Result<Option<bool>> {
        let tables = self.tables();
        Ok(tables
            .telescopes
            .contains(&telescope_id)
            .then(|| !tables.offline.contains(&telescope_id)))
    }

    fn find_appointment(&self, id: AppointmentId) -> anyhow::Result<Option<Appointment>> {
        Ok(self.tables().appointments.get(&id).cloned())
    }

    fn find_overlapping(
        &self,
        telescope_id: TelescopeId,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> anyhow::Result<Vec<Appointment>> {
        let mut found = self
            .tables()
            .appointments
            .values()
            .filter(|a| a.telescope_id == telescope_id)
            .filter(|a| !a.status.is_terminal())
            .filter(|a| a.window.start() < end && a.window.end() > start)
            .cloned()
            .collect::<Vec<_>>();
        found.sort_by_key(|a| a.window.start());
        Ok(found)
    }

    fn find_active_for_user(&self, user_id: UserId) -> anyhow::Result<Vec<Appointment>> {
        Ok(self
            .tables()
            .appointments
            .values()
            .filter(|a| a.user_id == user_id && !a.status.is_terminal())
            .cloned()
            .collect())
    }

    fn list_for_user(&self, user_id: UserId) -> anyhow::Result<Vec<Appointment>> {
        let mut found = self
            .tables()
            .appointments
            .values()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect::<Vec<_>>();
        found.sort_by_key(|a| std::cmp::Reverse(a.window.start()));
        Ok(found)
    }

    fn list_for_telescope(&self, telescope_id: TelescopeId) -> anyhow::Result<Vec<Appointment>> {
        let mut found = self
            .tables()
            .appointments
            .values()
            .filter(|a| a.telescope_id == telescope_id)
            .cloned()
            .collect::<Vec<_>>();
        found.sort_by_key(|a| a.window.start());
        Ok(found)
    }

    fn insert_appointment(&self, data: &NewAppointment) -> anyhow::Result<AppointmentId> {
        let mut tables = self.write();
        let id = tables.next_id();
        tables.appointments.insert(
            id,
            Appointment {
                id,
                user_id: data.user_id,
                telescope_id: data.telescope_id,
                window: data.window,
                status: data.status,
                mode: data.target.mode(),
                is_public: data.is_public,
                ended_at: None,
            },
        );
        tables.targets.insert(id, data.target.clone());
        tables.receivers.insert(id, data.receiver);
        Ok(id)
    }

    fn update_appointment(
        &self,
        id: AppointmentId,
        changes: &AppointmentChanges,
    ) -> anyhow::Result<()> {
        let mut tables = self.write();
        if let Some(appointment) = tables.appointments.get_mut(&id) {
            appointment.telescope_id = changes.telescope_id;
            appointment.window = changes.window;
            appointment.is_public = changes.is_public;
        }
        tables.targets.insert(id, changes.target.clone());
        tables.receivers.insert(id, changes.receiver);
        Ok(())
    }

    fn set_status(&self, id: AppointmentId, status: AppointmentStatus) -> anyhow::Result<()> {
        let mut tables = self.write();
        match tables.appointments.get_mut(&id) {
            Some(appointment) => {
                appointment.status = status;
                Ok(())
            }
            None => anyhow::bail!("No such appointment"),
        }
    }

    fn set_ended_at(&self, id: AppointmentId, ended_at: NaiveDateTime) -> anyhow::Result<()> {
        let mut tables = self.write();
        match tables.appointments.get_mut(&id) {
            Some(appointment) => {
                appointment.ended_at = Some(ended_at);
                Ok(())
            }
            None => anyhow::bail!("No such appointment"),
        }
    }

    fn find_target(&self, id: AppointmentId) -> anyhow::Result<Option<ObservationTarget>> {
        Ok(self.tables().targets.get(&id).cloned())
    }

    fn find_receiver(&self, id: AppointmentId) -> anyhow::Result<Option<ReceiverConfig>> {
        Ok(self.tables().receivers.get(&id).copied())
    }

    fn find_readings(&self, id: AppointmentId) -> anyhow::Result<Vec<Reading>> {
        Ok(self.tables().readings.get(&id).cloned().unwrap_or_default())
    }

    fn insert_reading(&self, id: AppointmentId, reading: &Reading) -> anyhow::Result<()> {
        self.write().readings.entry(id).or_default().push(*reading);
        Ok(())
    }

    fn find_orientation(&self, telescope_id: TelescopeId) -> anyhow::Result<Option<Orientation>> {
        Ok(self
            .tables()
            .orientations
            .get(&telescope_id)
            .map(|(orientation, _)| *orientation))
    }

    fn update_orientation(
        &self,
        telescope_id: TelescopeId,
        orientation: &Orientation,
        calibrated_at: NaiveDateTime,
    ) -> anyhow::Result<()> {
        let mut tables = self.write();
        match tables.orientations.get_mut(&telescope_id) {
            Some(entry) => {
                *entry = (*orientation, Some(calibrated_at));
                Ok(())
            }
            None => anyhow::bail!("No orientation for telescope {}", telescope_id),
        }
    }

    fn is_viewer(&self, id: AppointmentId, user_id: UserId) -> anyhow::Result<bool> {
        Ok(self.tables().viewers.contains(&(id, user_id)))
    }

    fn add_viewer(&self, id: AppointmentId, user_id: UserId) -> anyhow::Result<()> {
        self.write().viewers.insert((id, user_id));
        Ok(())
    }
}

impl RoleStore for MemoryStore {
    fn user_exists(&self, user_id: UserId) -> anyhow::Result<bool> {
        Ok(self.tables().users.contains_key(&user_id))
    }

    fn find_approved_roles(&self, user_id: UserId) -> anyhow::Result<BTreeSet<Role>> {
        Ok(self
            .tables()
            .user_roles
            .values()
            .filter(|r| r.user_id == user_id && r.approved)
            .map(|r| r.role)
            .collect())
    }

    fn find_user_roles(&self, user_id: UserId) -> anyhow::Result<Vec<UserRole>> {
        Ok(self
            .tables()
            .user_roles
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect())
    }

    fn find_user_role(&self, id: UserRoleId) -> anyhow::Result<Option<UserRole>> {
        Ok(self.tables().user_roles.get(&id).cloned())
    }

    fn find_pending_roles(&self) -> anyhow::Result<Vec<UserRole>> {
        Ok(self
            .tables()
            .user_roles
            .values()
            .filter(|r| !r.approved)
            .cloned()
            .collect())
    }

    fn insert_user_role(
        &self,
        user_id: UserId,
        role: Role,
        approved: bool,
    ) -> anyhow::Result<UserRoleId> {
        let mut tables = self.write();
        let id = tables.next_id();
        tables.user_roles.insert(
            id,
            UserRole {
                id,
                user_id,
                role,
                approved,
            },
        );
        Ok(id)
    }

    fn approve_user_role(&self, id: UserRoleId) -> anyhow::Result<()> {
        if let Some(role) = self.write().user_roles.get_mut(&id) {
            role.approved = true;
        }
        Ok(())
    }
}

impl AllottedTimeStore for MemoryStore {
    fn find_allotted_time(&self, user_id: UserId) -> anyhow::Result<Option<i64>> {
        Ok(self.tables().caps.get(&user_id).copied())
    }

    fn set_allotted_time(&self, user_id: UserId, minutes: i64) -> anyhow::Result<()> {
        self.write().caps.insert(user_id, minutes);
        Ok(())
    }
}

impl SessionStore for MemoryStore {
    fn find_session(&self, token: &str) -> anyhow::Result<Option<Session>> {
        Ok(self.tables().sessions.get(token).cloned())
    }
}
