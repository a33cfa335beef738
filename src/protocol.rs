use serde::Serialize;

use crate::{
    auth::AccessReport,
    command::{ErrorMap, ErrorTag, SimpleResult},
};

#[derive(Default, Serialize)]
pub struct SimpleResponse {
    pub success: bool,
    pub err: String,
}

impl SimpleResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            err: "".to_string(),
        }
    }
}

#[macro_export]
macro_rules! impl_err_response {
    ( $( $type:ty),+ $(,)? ) => {
        $(
            impl $type {
                pub fn err<S: ToString>(err: S) -> Self {
                    Self {
                        success: false,
                        err: err.to_string(),
                        ..Default::default()
                    }
                }
            }
        )+
    };
}

impl_err_response! {
    SimpleResponse,
}

/// Response of an authorization-gated operation.
///
/// At most one of `access`, `errors` and `data` is set.
#[derive(Serialize)]
pub struct ApiResponse<T, K: ErrorTag> {
    pub success: bool,
    pub err: String,
    pub access: Option<AccessReport>,
    pub errors: Option<ErrorMap<K>>,
    pub data: Option<T>,
}

impl<T, K: ErrorTag> ApiResponse<T, K> {
    pub fn err<S: ToString>(err: S) -> Self {
        Self {
            success: false,
            err: err.to_string(),
            access: None,
            errors: None,
            data: None,
        }
    }

    /// Folds a wrapper call into a response: the refusal if there was one,
    /// otherwise the command's result.
    pub fn from_outcome(
        access: Option<AccessReport>,
        outcome: Option<SimpleResult<T, K>>,
    ) -> Self {
        match (access, outcome) {
            (Some(report), _) => Self {
                access: Some(report),
                ..Self::err("access denied")
            },
            (None, Some(Ok(data))) => Self {
                success: true,
                data: Some(data),
                ..Self::err("")
            },
            (None, Some(Err(errors))) => Self {
                errors: Some(errors),
                ..Self::err("invalid request")
            },
            (None, None) => Self::err("operation produced no result"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{auth::AccessTag, role::Role};
    use serde_json::json;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
    #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
    enum Tag {
        StartTime,
    }

    #[test]
    fn success_carries_data() {
        let response = ApiResponse::<u64, Tag>::from_outcome(None, Some(Ok(7)));
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({"success": true, "err": "", "access": null, "errors": null, "data": 7})
        );
    }

    #[test]
    fn validation_errors_are_keyed_by_tag() {
        let errors = ErrorMap::single(Tag::StartTime, "start time is required");
        let response = ApiResponse::<u64, Tag>::from_outcome(None, Some(Err(errors)));
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["success"], json!(false));
        assert_eq!(value["errors"], json!({"START_TIME": ["start time is required"]}));
        assert_eq!(value["access"], json!(null));
    }

    #[test]
    fn refusal_wins_over_result() {
        let report = AccessReport::missing(vec![Role::Admin]);
        let response = ApiResponse::<u64, Tag>::from_outcome(Some(report), None);
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["access"]["missing_roles"], json!(["ADMIN"]));
        assert_eq!(value["access"]["invalid_resource_id"], json!(null));
        assert_eq!(value["data"], json!(null));

        let report = AccessReport::invalid(AccessTag::AppointmentId, "No such appointment");
        let response = ApiResponse::<u64, Tag>::from_outcome(Some(report), None);
        assert!(!response.success);
    }
}
