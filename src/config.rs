use anyhow::Context;
use chrono::Duration;

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";
const DEFAULT_LOGIN_TTL_SECS: i64 = 3600;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: String,
    pub login_ttl: Duration,
}

impl AppConfig {
    /// Reads the process environment, after `.env` has been loaded.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").context("DATABASE_URL not found")?;
        let bind_addr = lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let login_ttl_secs = match lookup("LOGIN_TTL_SECS") {
            Some(secs) => secs
                .parse::<i64>()
                .with_context(|| format!("LOGIN_TTL_SECS `{}` is not a number", secs))?,
            None => DEFAULT_LOGIN_TTL_SECS,
        };

        Ok(Self {
            database_url,
            bind_addr,
            login_ttl: Duration::seconds(login_ttl_secs),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> anyhow::Result<AppConfig> {
        let vars = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<HashMap<_, _>>();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply() {
        let config = config(&[("DATABASE_URL", "mysql://localhost/telescope")]).unwrap();
        assert_eq!(config.bind_addr, DEFAULT_BIND_ADDR);
        assert_eq!(config.login_ttl, Duration::hours(1));
    }

    #[test]
    fn database_url_is_required() {
        assert!(config(&[("BIND_ADDR", "0.0.0.0:80")]).is_err());
    }

    #[test]
    fn ttl_must_be_numeric() {
        let vars = [("DATABASE_URL", "mysql://x"), ("LOGIN_TTL_SECS", "soon")];
        assert!(config(&vars).is_err());
        let vars = [("DATABASE_URL", "mysql://x"), ("LOGIN_TTL_SECS", "60")];
        assert_eq!(config(&vars).unwrap().login_ttl, Duration::minutes(1));
    }
}
