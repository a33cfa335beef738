use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error;

use crate::utils::ParseTagError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppointmentStatus {
    Requested,
    Scheduled,
    InProgress,
    Completed,
    Canceled,
}

/// Statuses that hold on to their telescope time.
pub const ACTIVE_STATUSES: [AppointmentStatus; 3] = [
    AppointmentStatus::Requested,
    AppointmentStatus::Scheduled,
    AppointmentStatus::InProgress,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Schedule,
    Start,
    Stop,
    Cancel,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("appointment is already {0}")]
    Terminal(AppointmentStatus),
    #[error("cannot {transition:?} an appointment that is {from}")]
    Illegal {
        from: AppointmentStatus,
        transition: Transition,
    },
}

impl AppointmentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AppointmentStatus::Requested => "REQUESTED",
            AppointmentStatus::Scheduled => "SCHEDULED",
            AppointmentStatus::InProgress => "IN_PROGRESS",
            AppointmentStatus::Completed => "COMPLETED",
            AppointmentStatus::Canceled => "CANCELED",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            AppointmentStatus::Completed | AppointmentStatus::Canceled
        )
    }

    pub fn can_calibrate(self) -> bool {
        self == AppointmentStatus::InProgress
    }

    /// Next status after `transition`.
    ///
    /// Canceling an already canceled appointment yields `Canceled` again so
    /// repeated cancel requests stay harmless; nothing ever leaves a terminal
    /// status.
    pub fn transition(self, transition: Transition) -> Result<Self, TransitionError> {
        use AppointmentStatus::*;

        match (self, transition) {
            (Canceled, Transition::Cancel) => Ok(Canceled),
            (from, _) if from.is_terminal() => Err(TransitionError::Terminal(from)),
            (Requested, Transition::Schedule) => Ok(Scheduled),
            (Requested, Transition::Start) | (Scheduled, Transition::Start) => Ok(InProgress),
            (InProgress, Transition::Stop) => Ok(Completed),
            (_, Transition::Cancel) => Ok(Canceled),
            (from, transition) => Err(TransitionError::Illegal { from, transition }),
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = ParseTagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "REQUESTED" => Ok(AppointmentStatus::Requested),
            "SCHEDULED" => Ok(AppointmentStatus::Scheduled),
            "IN_PROGRESS" => Ok(AppointmentStatus::InProgress),
            "COMPLETED" => Ok(AppointmentStatus::Completed),
            "CANCELED" => Ok(AppointmentStatus::Canceled),
            _ => Err(ParseTagError::new("appointment status", s)),
        }
    }
}
