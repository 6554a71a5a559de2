#[macro_use]
extern crate rocket;

#[cfg(test)]
#[macro_use]
extern crate backend_test;

use std::path::PathBuf;

use rocket::{fs::FileServer, Build, Rocket};

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;

use config::{ConfigFairing, DatabaseFairing, MetricsFairing};
use logging::LoggerFairing;

/// Build the server, connecting to the database configured in `Rocket.toml`.
pub fn build() -> Rocket<Build> {
    with_static_files(base_rocket().attach(DatabaseFairing))
}

/// Everything but the database connection.
fn base_rocket() -> Rocket<Build> {
    rocket::build()
        .mount("/", api::routes())
        .attach(LoggerFairing)
        .attach(ConfigFairing)
        .attach(MetricsFairing)
}

/// Serve `static_root`, if configured, under `/static`.
fn with_static_files(rocket: Rocket<Build>) -> Rocket<Build> {
    match rocket.figment().extract_inner::<PathBuf>("static_root") {
        Ok(root) if root.is_dir() => rocket.mount("/static", FileServer::from(root)),
        Ok(root) => {
            log::warn!("Static root {} is not a directory, not serving it", root.display());
            rocket
        }
        Err(_) => rocket,
    }
}

/// Connect to the configured MongoDB server.
#[cfg(test)]
pub(crate) async fn db_client() -> mongodb::Client {
    let db_uri = rocket::Config::figment()
        .extract_inner::<String>("db_uri")
        .expect("`db_uri` not set");
    mongodb::Client::with_uri_str(&db_uri)
        .await
        .expect("Could not connect to database")
}

/// A random database name, so tests don't collide.
#[cfg(test)]
pub(crate) fn database() -> String {
    let random: u32 = rand::random();
    format!("test{random}")
}

/// Build a server against the given database, with indexes in place but no
/// default superuser.
#[cfg(test)]
pub(crate) async fn rocket_for_db(client: mongodb::Client, db_name: &str) -> Rocket<Build> {
    let db = client.database(db_name);
    model::mongodb::ensure_indexes_exist(&db)
        .await
        .expect("Could not create indexes");
    base_rocket().manage(client).manage(db)
}
