use serde::{Deserialize, Serialize};

use super::{
    factory::AppointmentFactory, Coordinate, ObservationMode, ObservationTarget, Orientation,
    ReceiverConfig, TelescopeId, TimeWindow,
};
use crate::{
    command::{ErrorMap, SimpleResult},
    utils::parse_time_str,
};

/// Error tags of create, update and the read operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppointmentTag {
    UserId,
    TelescopeId,
    StartTime,
    EndTime,
    Overlap,
    AllottedTime,
    ObservationMode,
    Orientation,
    Coordinates,
    Receiver,
    Status,
}

/// Error tags of the operations that drive a booked appointment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleTag {
    Id,
    Status,
    ObservationMode,
    Orientation,
    Telescope,
    Reading,
}

/// Appointment fields as they arrive from a client; nothing is trusted yet.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppointmentForm {
    pub telescope_id: Option<TelescopeId>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub is_public: Option<bool>,
    pub observation_mode: Option<String>,
    pub orientation: Option<Orientation>,
    pub coordinates: Option<Vec<Coordinate>>,
    pub receiver: Option<ReceiverConfig>,
}

impl AppointmentForm {
    pub fn mode(&self) -> Option<ObservationMode> {
        self.observation_mode.as_deref().and_then(|mode| mode.parse().ok())
    }
}

/// A form that passed validation for one observation mode.
#[derive(Debug, Clone, PartialEq)]
pub struct AppointmentRequest {
    pub telescope_id: TelescopeId,
    pub window: TimeWindow,
    pub is_public: bool,
    pub target: ObservationTarget,
    pub receiver: ReceiverConfig,
}

impl AppointmentRequest {
    /// The only way to obtain a request: every problem with `form` is
    /// collected rather than stopping at the first.
    pub fn validate(
        factory: &dyn AppointmentFactory,
        form: &AppointmentForm,
    ) -> SimpleResult<Self, AppointmentTag> {
        let mut errors = ErrorMap::new();

        if let Some(mode) = &form.observation_mode {
            if mode.parse::<ObservationMode>().ok() != Some(factory.mode()) {
                errors.add(
                    AppointmentTag::ObservationMode,
                    format!("expected {}, got {}", factory.mode(), mode),
                );
            }
        }

        let telescope_id = form.telescope_id;
        if telescope_id.is_none() {
            errors.add(AppointmentTag::TelescopeId, "telescope id is required");
        }

        let start = match &form.start_time {
            Some(time) => match parse_time_str(time) {
                Ok(time) => Some(time),
                Err(_) => {
                    errors.add(AppointmentTag::StartTime, "start time is malformed");
                    None
                }
            },
            None => {
                errors.add(AppointmentTag::StartTime, "start time is required");
                None
            }
        };
        let end = match &form.end_time {
            Some(time) => match parse_time_str(time) {
                Ok(time) => Some(time),
                Err(_) => {
                    errors.add(AppointmentTag::EndTime, "end time is malformed");
                    None
                }
            },
            None => {
                errors.add(AppointmentTag::EndTime, "end time is required");
                None
            }
        };
        let window = match (start, end) {
            (Some(start), Some(end)) => {
                let window = TimeWindow::new(start, end);
                if window.is_none() {
                    errors.add(AppointmentTag::EndTime, "end time must be after start time");
                }
                window
            }
            _ => None,
        };

        let target = match factory.target(form) {
            Ok(target) => Some(target),
            Err(target_errors) => {
                errors.merge(target_errors);
                None
            }
        };

        let receiver = form.receiver.unwrap_or_default();
        for problem in receiver.problems() {
            errors.add(AppointmentTag::Receiver, problem);
        }

        match (telescope_id, window, target) {
            (Some(telescope_id), Some(window), Some(target)) if errors.is_empty() => Ok(Self {
                telescope_id,
                window,
                is_public: form.is_public.unwrap_or(false),
                target,
                receiver,
            }),
            _ => Err(errors),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::appointment::factory::factory_for;

    fn drift_form() -> AppointmentForm {
        AppointmentForm {
            telescope_id: Some(1),
            start_time: Some("2021-06-01T10:00:00Z".to_string()),
            end_time: Some("2021-06-01T11:00:00Z".to_string()),
            orientation: Some(Orientation {
                azimuth: 90.0,
                elevation: 30.0,
            }),
            ..Default::default()
        }
    }

    #[test]
    fn accepts_complete_form() {
        let factory = factory_for(ObservationMode::DriftScan);
        let request = AppointmentRequest::validate(factory, &drift_form()).unwrap();
        assert_eq!(request.window.minutes(), 60);
        assert!(!request.is_public);
        assert_eq!(request.receiver, ReceiverConfig::default());
        assert_eq!(request.target.mode(), ObservationMode::DriftScan);
    }

    #[test]
    fn collects_every_problem() {
        let factory = factory_for(ObservationMode::DriftScan);
        let form = AppointmentForm {
            start_time: Some("noon".to_string()),
            receiver: Some(ReceiverConfig {
                center_frequency: 0.0,
                bandwidth: 1.0,
                integration_time: 1.0,
            }),
            ..Default::default()
        };
        let errors = AppointmentRequest::validate(factory, &form).unwrap_err();
        for tag in [
            AppointmentTag::TelescopeId,
            AppointmentTag::StartTime,
            AppointmentTag::EndTime,
            AppointmentTag::Orientation,
            AppointmentTag::Receiver,
        ]
        .iter()
        {
            assert!(errors.contains(*tag), "missing {:?}", tag);
        }
    }

    #[test]
    fn zero_length_window_is_a_validation_error() {
        let factory = factory_for(ObservationMode::DriftScan);
        let form = AppointmentForm {
            end_time: Some("2021-06-01T10:00:00Z".to_string()),
            ..drift_form()
        };
        let errors = AppointmentRequest::validate(factory, &form).unwrap_err();
        assert_eq!(errors.get(AppointmentTag::EndTime), ["end time must be after start time"]);
        assert!(!errors.contains(AppointmentTag::Overlap));
    }

    #[test]
    fn mode_must_match_factory() {
        let factory = factory_for(ObservationMode::DriftScan);
        let form = AppointmentForm {
            observation_mode: Some("RASTER_SCAN".to_string()),
            ..drift_form()
        };
        let errors = AppointmentRequest::validate(factory, &form).unwrap_err();
        assert!(errors.contains(AppointmentTag::ObservationMode));
    }
}
