pub mod commands;
pub mod factory;
pub mod overlap;
pub mod requests;
pub mod status;
pub mod wrapper;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::utils::ParseTagError;

pub use self::status::AppointmentStatus;

pub type AppointmentId = u64;
pub type TelescopeId = u64;
pub type UserId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ObservationMode {
    FreeControl,
    RasterScan,
    DriftScan,
}

impl ObservationMode {
    pub const ALL: [ObservationMode; 3] = [
        ObservationMode::FreeControl,
        ObservationMode::RasterScan,
        ObservationMode::DriftScan,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ObservationMode::FreeControl => "FREE_CONTROL",
            ObservationMode::RasterScan => "RASTER_SCAN",
            ObservationMode::DriftScan => "DRIFT_SCAN",
        }
    }
}

impl fmt::Display for ObservationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObservationMode {
    type Err = ParseTagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ObservationMode::ALL
            .iter()
            .copied()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| ParseTagError::new("observation mode", s))
    }
}

/// Half-open `[start, end)` span of telescope time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeWindow {
    start: NaiveDateTime,
    end: NaiveDateTime,
}

impl TimeWindow {
    /// `None` unless `start < end`.
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Option<Self> {
        if start < end {
            Some(Self { start, end })
        } else {
            None
        }
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    pub fn end(&self) -> NaiveDateTime {
        self.end
    }

    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        self.start < other.end && self.end > other.start
    }

    pub fn seconds(&self) -> i64 {
        self.end.signed_duration_since(self.start).num_seconds()
    }

    /// Length in minutes, a started minute counting as a whole one.
    pub fn minutes(&self) -> i64 {
        minutes_from_seconds(self.seconds())
    }
}

pub fn minutes_from_seconds(seconds: i64) -> i64 {
    (seconds + 59) / 60
}

/// Horizontal pointing of a dish, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Orientation {
    pub azimuth: f64,
    pub elevation: f64,
}

impl Orientation {
    pub fn problems(&self) -> Vec<&'static str> {
        let mut problems = Vec::new();
        if !(0.0..360.0).contains(&self.azimuth) {
            problems.push("azimuth must be within [0, 360)");
        }
        if !(0.0..=90.0).contains(&self.elevation) {
            problems.push("elevation must be within [0, 90]");
        }
        problems
    }
}

/// Equatorial position: right ascension in hours, declination in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub right_ascension: f64,
    pub declination: f64,
}

impl Coordinate {
    pub fn problems(&self) -> Vec<&'static str> {
        let mut problems = Vec::new();
        if !(0.0..24.0).contains(&self.right_ascension) {
            problems.push("right ascension must be within [0, 24)");
        }
        if !(-90.0..=90.0).contains(&self.declination) {
            problems.push("declination must be within [-90, 90]");
        }
        problems
    }
}

/// Mode-specific pointing data owned by one appointment.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ObservationTarget {
    FreeControl { orientation: Orientation },
    RasterScan { corners: [Coordinate; 2] },
    DriftScan { orientation: Orientation },
}

impl ObservationTarget {
    pub fn mode(&self) -> ObservationMode {
        match self {
            ObservationTarget::FreeControl { .. } => ObservationMode::FreeControl,
            ObservationTarget::RasterScan { .. } => ObservationMode::RasterScan,
            ObservationTarget::DriftScan { .. } => ObservationMode::DriftScan,
        }
    }

    pub fn orientation(&self) -> Option<Orientation> {
        match self {
            ObservationTarget::FreeControl { orientation }
            | ObservationTarget::DriftScan { orientation } => Some(*orientation),
            ObservationTarget::RasterScan { .. } => None,
        }
    }

    pub fn coordinates(&self) -> &[Coordinate] {
        match self {
            ObservationTarget::RasterScan { corners } => corners,
            _ => &[],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReceiverConfig {
    /// MHz
    pub center_frequency: f64,
    /// MHz
    pub bandwidth: f64,
    /// seconds
    pub integration_time: f64,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            center_frequency: 1420.4,
            bandwidth: 10.0,
            integration_time: 1.0,
        }
    }
}

impl ReceiverConfig {
    pub fn problems(&self) -> Vec<&'static str> {
        let mut problems = Vec::new();
        if !(self.center_frequency > 0.0) {
            problems.push("center frequency must be positive");
        }
        if !(self.bandwidth > 0.0) {
            problems.push("bandwidth must be positive");
        }
        if !(self.integration_time > 0.0) {
            problems.push("integration time must be positive");
        }
        problems
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Reading {
    pub time: NaiveDateTime,
    pub power: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Appointment {
    pub id: AppointmentId,
    pub user_id: UserId,
    pub telescope_id: TelescopeId,
    pub window: TimeWindow,
    pub status: AppointmentStatus,
    pub mode: ObservationMode,
    pub is_public: bool,
    /// When the observation was stopped.
    pub ended_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewAppointment {
    pub user_id: UserId,
    pub telescope_id: TelescopeId,
    pub window: TimeWindow,
    pub status: AppointmentStatus,
    pub is_public: bool,
    pub target: ObservationTarget,
    pub receiver: ReceiverConfig,
}

/// Replacement values for an update; the mode never changes.
#[derive(Debug, Clone, PartialEq)]
pub struct AppointmentChanges {
    pub telescope_id: TelescopeId,
    pub window: TimeWindow,
    pub is_public: bool,
    pub target: ObservationTarget,
    pub receiver: ReceiverConfig,
}

/// An appointment together with everything it owns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppointmentDetail {
    #[serde(flatten)]
    pub appointment: Appointment,
    pub target: Option<ObservationTarget>,
    pub receiver: Option<ReceiverConfig>,
    pub readings: Vec<Reading>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_time;

    fn window(start: (u32, u32), end: (u32, u32)) -> TimeWindow {
        TimeWindow::new(test_time(start.0, start.1), test_time(end.0, end.1)).unwrap()
    }

    #[test]
    fn rejects_empty_and_inverted_windows() {
        assert!(TimeWindow::new(test_time(10, 0), test_time(10, 0)).is_none());
        assert!(TimeWindow::new(test_time(11, 0), test_time(10, 0)).is_none());
    }

    #[test]
    fn overlap_is_symmetric() {
        let windows = [
            window((10, 0), (11, 0)),
            window((10, 30), (10, 45)),
            window((11, 0), (11, 30)),
            window((9, 0), (9, 30)),
            window((9, 30), (10, 1)),
            window((8, 0), (12, 0)),
        ];
        for a in windows.iter() {
            for b in windows.iter() {
                assert_eq!(a.overlaps(b), b.overlaps(a), "{:?} vs {:?}", a, b);
            }
        }
    }

    #[test]
    fn adjacent_windows_do_not_overlap() {
        let first = window((10, 0), (11, 0));
        let second = window((11, 0), (12, 0));
        assert!(!first.overlaps(&second));
        assert!(!second.overlaps(&first));
        assert!(first.overlaps(&window((10, 59), (11, 1))));
    }

    #[test]
    fn mode_round_trips_through_text() {
        for mode in ObservationMode::ALL.iter().copied() {
            assert_eq!(mode.as_str().parse::<ObservationMode>(), Ok(mode));
        }
        assert!("MANUAL".parse::<ObservationMode>().is_err());
    }

    #[test]
    fn pointing_limits() {
        assert!(Orientation { azimuth: 359.9, elevation: 90.0 }.problems().is_empty());
        assert_eq!(Orientation { azimuth: 360.0, elevation: -1.0 }.problems().len(), 2);
        assert!(Coordinate { right_ascension: 23.5, declination: -90.0 }.problems().is_empty());
        assert_eq!(Coordinate { right_ascension: 24.0, declination: 0.0 }.problems().len(), 1);
    }
}
