#[macro_use]
extern crate diesel;

mod admin;
mod allotted_time;
mod appointment;
mod auth;
mod command;
mod config;
mod database;
mod models;
mod protocol;
mod role;
mod schema;
mod session;
mod user;
mod utils;

use actix_web::{web, App, HttpServer};
use anyhow::Context;
use diesel::{r2d2::ConnectionManager, MysqlConnection};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;

type DbPool = r2d2::Pool<ConnectionManager<MysqlConnection>>;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env()?;
    let manager = ConnectionManager::<MysqlConnection>::new(config.database_url.as_str());
    let pool = r2d2::Pool::builder()
        .build(manager)
        .context("Failed to create pool")?;

    let bind = config.bind_addr.clone();
    info!(bind = %bind, "starting telescope server");

    HttpServer::new(move || {
        App::new()
            .data(pool.clone())
            .data(config.clone())
            // user
            .service(web::scope("/user").configure(user::config))
            // administrator
            .service(web::scope("/admin").configure(admin::config))
    })
    .bind(&bind)?
    .run()
    .await?;

    Ok(())
}
