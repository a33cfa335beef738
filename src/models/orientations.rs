use crate::{
    appointment::Orientation,
    schema::{appointment_orientations, orientations},
};
use chrono::NaiveDateTime;

/// Where a telescope currently points.
#[derive(Queryable)]
pub struct TelescopeOrientationData {
    pub telescope_id: u64,
    pub azimuth: f64,
    pub elevation: f64,
    pub calibrated_at: Option<NaiveDateTime>,
}

#[derive(AsChangeset)]
#[table_name = "orientations"]
pub struct UpdateOrientation {
    pub azimuth: f64,
    pub elevation: f64,
    pub calibrated_at: Option<NaiveDateTime>,
}

/// Orientation target owned by a free-control or drift-scan appointment.
#[derive(Queryable, Insertable)]
#[table_name = "appointment_orientations"]
pub struct AppointmentOrientationData {
    pub appointment_id: u64,
    pub azimuth: f64,
    pub elevation: f64,
}

impl AppointmentOrientationData {
    pub fn new(appointment_id: u64, orientation: &Orientation) -> Self {
        Self {
            appointment_id,
            azimuth: orientation.azimuth,
            elevation: orientation.elevation,
        }
    }
}

impl From<TelescopeOrientationData> for Orientation {
    fn from(data: TelescopeOrientationData) -> Self {
        Orientation {
            azimuth: data.azimuth,
            elevation: data.elevation,
        }
    }
}

impl From<AppointmentOrientationData> for Orientation {
    fn from(data: AppointmentOrientationData) -> Self {
        Orientation {
            azimuth: data.azimuth,
            elevation: data.elevation,
        }
    }
}
