use anyhow::Context;

use super::{Appointment, AppointmentId, TelescopeId, TimeWindow};
use crate::database::AppointmentStore;

/// Appointments that would collide with `window` on `telescope_id`.
///
/// Only requested, scheduled and in-progress bookings count. `updating`
/// names the appointment being moved, which never conflicts with itself.
pub fn find_conflicts<S: AppointmentStore>(
    store: &S,
    telescope_id: TelescopeId,
    window: &TimeWindow,
    updating: Option<AppointmentId>,
) -> anyhow::Result<Vec<Appointment>> {
    let candidates = store
        .find_overlapping(telescope_id, window.start(), window.end())
        .context("overlap query")?;

    Ok(candidates
        .into_iter()
        .filter(|existing| Some(existing.id) != updating)
        .filter(|existing| !existing.status.is_terminal() && existing.window.overlaps(window))
        .collect())
}
