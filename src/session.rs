use actix_web::{error::BlockingError, web};
use anyhow::anyhow;
use chrono::Utc;

use crate::{
    auth::UserContext,
    config::AppConfig,
    database::{get_db_conn, MysqlStore},
    DbPool,
};

/// Runs `f` on the blocking pool with a store and the caller behind `token`.
///
/// An unknown or expired token is not an error here: `f` sees an anonymous
/// caller and the wrappers refuse it.
pub async fn with_caller<T, F>(
    pool: &web::Data<DbPool>,
    config: &web::Data<AppConfig>,
    token: String,
    f: F,
) -> anyhow::Result<T>
where
    F: FnOnce(&MysqlStore<'_>, Option<UserContext>) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let conn = get_db_conn(pool)?;
    let ttl = config.login_ttl;

    web::block(move || {
        let store = MysqlStore::new(&conn);
        let caller = UserContext::resolve(&store, &token, ttl, Utc::now().naive_utc())?;
        f(&store, caller)
    })
    .await
    .map_err(|err| match err {
        BlockingError::Error(err) => err,
        BlockingError::Canceled => anyhow!("worker thread is gone"),
    })
}
