use std::path::PathBuf;

use chrono::Duration;
use log::{error, info};
use mongodb::Client as MongoClient;
use rocket::{
    fairing::{Fairing, Info, Kind},
    Build, Rocket,
};
use serde::Deserialize;

use crate::model::{
    db::user::ensure_superuser_exists,
    metrics::{dashboard::DashboardRegistry, Metrics, ValueAliases},
    mongodb::{ensure_indexes_exist, Coll},
};

/// Application configuration, derived from `Rocket.toml` and `ROCKET_*`
/// environment variables. This struct becomes managed state and can be
/// inspected by any endpoint.
#[derive(Deserialize)]
pub struct Config {
    // non-secrets
    auth_ttl: u32,
    reset_ttl: u32,
    #[serde(default)]
    feature_flags: Vec<String>,
    value_aliases: Option<PathBuf>,
    // secrets
    jwt_secret: String,
    reset_secret: String,
}

impl Config {
    /// Valid lifetime of auth token cookies in seconds.
    pub fn auth_ttl(&self) -> Duration {
        Duration::seconds(self.auth_ttl.into())
    }

    /// Valid lifetime of password reset links in seconds.
    pub fn reset_ttl(&self) -> Duration {
        Duration::seconds(self.reset_ttl.into())
    }

    /// Feature flags exposed to the front end.
    pub fn feature_flags(&self) -> &[String] {
        &self.feature_flags
    }

    /// CSV file of display aliases for stored option values.
    pub fn value_aliases(&self) -> Option<&PathBuf> {
        self.value_aliases.as_ref()
    }

    /// Secret key used to encrypt JWTs.
    pub fn jwt_secret(&self) -> &[u8] {
        self.jwt_secret.as_bytes()
    }

    /// Secret key used to sign password reset tokens.
    pub fn reset_secret(&self) -> &[u8] {
        self.reset_secret.as_bytes()
    }
}

#[cfg(test)]
impl Config {
    pub fn example() -> Self {
        Self {
            auth_ttl: 3600,
            reset_ttl: 3600,
            feature_flags: vec!["dashboard".to_string()],
            value_aliases: None,
            jwt_secret: "test-jwt-secret".to_string(),
            reset_secret: "test-reset-secret".to_string(),
        }
    }
}

/// A fairing that loads the application config and puts it in managed state.
pub struct ConfigFairing;

#[rocket::async_trait]
impl Fairing for ConfigFairing {
    fn info(&self) -> Info {
        Info {
            name: "Config",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        let config = match rocket.figment().extract::<Config>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load application config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };
        Ok(rocket.manage(config))
    }
}

/// Configuration for the database.
#[derive(Deserialize)]
struct DbConfig {
    // secrets
    db_uri: String,
}

/// A fairing that loads the MongoDB config, connects to the database,
/// performs any setup necessary, and places both a `Client` and a `Database`
/// into managed state.
pub struct DatabaseFairing;

#[rocket::async_trait]
impl Fairing for DatabaseFairing {
    fn info(&self) -> Info {
        Info {
            name: "MongoDB",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        let config = match rocket.figment().extract::<DbConfig>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load database config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };
        info!("Loaded database config, connecting...");
        let client = match MongoClient::with_uri_str(config.db_uri).await {
            Ok(client) => client,
            Err(e) => {
                error!("Failed to connect to database: {e}");
                return Err(rocket);
            }
        };
        let db = client.database(DATABASE);

        if let Err(e) = ensure_indexes_exist(&db).await {
            error!("Failed to create database indexes: {e}");
            return Err(rocket);
        }
        if let Err(e) = ensure_superuser_exists(&Coll::from_db(&db)).await {
            error!("Failed to create default superuser: {e}");
            return Err(rocket);
        }
        info!("...database connection online!");

        Ok(rocket.manage(client).manage(db))
    }
}

/// Name of the production database.
const DATABASE: &str = "tmd";

/// A fairing that loads the value aliases and places the metrics groups and
/// dashboard registry into managed state. Must be attached after
/// [`ConfigFairing`].
pub struct MetricsFairing;

#[rocket::async_trait]
impl Fairing for MetricsFairing {
    fn info(&self) -> Info {
        Info {
            name: "Metrics",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        let path = match rocket.state::<Config>() {
            Some(config) => config.value_aliases().cloned(),
            None => {
                error!("Metrics require the application config to be loaded first");
                return Err(rocket);
            }
        };
        let aliases = match path {
            Some(path) => match ValueAliases::from_path(&path) {
                Ok(aliases) => aliases,
                Err(e) => {
                    error!("Failed to load value aliases from {}: {e}", path.display());
                    return Err(rocket);
                }
            },
            None => ValueAliases::default(),
        };
        info!("Loaded {} value aliases", aliases.len());

        Ok(rocket
            .manage(Metrics::new(aliases))
            .manage(DashboardRegistry::new()))
    }
}
