#[macro_export]
macro_rules! post_funcs {
    ( $( ( $func_name:ident, $url:expr, $request:ty, $response:ty ) ),+ $(,)? ) => {
        $(
            paste::paste! {
                #[post($url)]
                async fn $func_name(
                    pool: web::Data<DbPool>,
                    config: web::Data<AppConfig>,
                    info: web::Json<$request>
                ) -> impl Responder {
                    let response = match [<$func_name _impl>](pool, config, info).await {
                        Ok(response) => response,
                        Err(err) => {
                            tracing::error!(error = %err, endpoint = $url, "request failed");
                            <$response>::err(err.to_string())
                        }
                    };
                    HttpResponse::Ok().json(response)
                }
            }
        )+
    };
}

use anyhow::Context;
use blake2::{Blake2b, Digest};
use chrono::{DateTime, NaiveDateTime, Utc};
use thiserror::Error;

/// Stored text that does not name any known variant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} `{value}`")]
pub struct ParseTagError {
    kind: &'static str,
    value: String,
}

impl ParseTagError {
    pub fn new<S: ToString>(kind: &'static str, value: S) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

pub fn parse_time_str<S: AsRef<str>>(s: S) -> anyhow::Result<NaiveDateTime> {
    const TIME_FMT: &str = "%Y-%m-%dT%H:%M:%S%.f%:z";
    const TIME_FMT_SPECIAL: &str = "%Y-%m-%dT%H:%M:%S%.fZ";

    let s = s.as_ref();
    if let Some('Z') = s.chars().last() {
        NaiveDateTime::parse_from_str(s, TIME_FMT_SPECIAL).context("malformed UTC time")
    } else {
        DateTime::parse_from_str(s, TIME_FMT)
            .context("malformed time")
            .map(|t| t.naive_utc())
    }
}

pub fn format_time_str(time: &NaiveDateTime) -> String {
    const TIME_FMT: &str = "%Y-%m-%dT%H:%M:%S%.f";

    format!("{}+00:00", time.format(TIME_FMT))
}

pub fn hash_password(password: &str) -> String {
    format!("{:x}", Blake2b::digest(password.as_bytes()))
}

pub fn generate_login_token(username: &str) -> String {
    let now = Utc::now();
    let seed = format!(
        "{}@{}.{}",
        username,
        now.timestamp(),
        now.timestamp_subsec_nanos()
    );
    format!("{:x}", Blake2b::digest(seed.as_bytes()))
}

#[cfg(test)]
pub fn test_time(hour: u32, minute: u32) -> NaiveDateTime {
    chrono::NaiveDate::from_ymd_opt(2021, 6, 1)
        .and_then(|date| date.and_hms_opt(hour, minute, 0))
        .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_both_time_styles() {
        let zulu = parse_time_str("2021-06-01T10:00:00.000Z").unwrap();
        let offset = parse_time_str("2021-06-01T12:00:00+02:00").unwrap();
        assert_eq!(zulu, test_time(10, 0));
        assert_eq!(offset, test_time(10, 0));
        assert!(parse_time_str("yesterday").is_err());
    }

    #[test]
    fn formats_as_utc() {
        assert_eq!(format_time_str(&test_time(9, 30)), "2021-06-01T09:30:00+00:00");
    }

    #[test]
    fn tokens_differ_from_password_hashes() {
        assert_eq!(hash_password("pw"), hash_password("pw"));
        assert_ne!(generate_login_token("pw"), hash_password("pw"));
    }
}
