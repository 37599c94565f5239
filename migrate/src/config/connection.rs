//! Connection parameters for the Odoo instance being migrated
//!
//! Each key is resolved from the environment first and falls back to
//! `~/.odoo_config/{instance}.conf`. The resolved value is built once at
//! startup and handed to every stage by reference.

use std::path::{Path, PathBuf};

use config::{Config, File, FileFormat};
use error_stack::{Report, ResultExt};
use tracing::debug;

use crate::error::{Error, Result};

const ENV_URL: &str = "ODOO_URL";
const ENV_DATABASE: &str = "ODOO_DB";
const ENV_USERNAME: &str = "ODOO_USER";
const ENV_PASSWORD: &str = "ODOO_PASSWORD";
const ENV_PG_URL: &str = "ODOO_PG_URL";

const CONFIG_DIR: &str = ".odoo_config";
const CONFIG_SECTION: &str = "odoo";

/// Resolved connection parameters
#[derive(Clone)]
pub struct ConnectionConfig {
    pub instance: String,
    pub url:      String,
    pub database: String,
    pub username: String,
    pub password: String,
    /// Direct PostgreSQL URL used by the verification probe when present
    pub pg_url:   Option<String>,
}

impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("instance", &self.instance)
            .field("url", &self.url)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("pg_url", &self.pg_url.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Values read from the instance config file, before environment overrides
#[derive(Debug, Default)]
struct FileValues {
    url:      Option<String>,
    database: Option<String>,
    username: Option<String>,
    password: Option<String>,
    pg_url:   Option<String>,
}

impl ConnectionConfig {
    /// Load configuration for `instance` from the process environment and the
    /// standard config file location
    pub fn load(instance: &str) -> Result<Self> {
        let path = config_file_path(instance);
        Self::resolve(instance, |key| std::env::var(key).ok(), path.as_deref())
    }

    /// Resolve configuration with an injectable environment lookup
    pub fn resolve<F>(instance: &str, env: F, file: Option<&Path>) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file_values = match file {
            Some(path) if path.exists() => read_config_file(path)?,
            _ => FileValues::default(),
        };

        let pick = |key: &str, fallback: Option<String>| {
            env(key)
                .filter(|value| !value.trim().is_empty())
                .or_else(|| fallback.filter(|value| !value.trim().is_empty()))
        };

        let url = pick(ENV_URL, file_values.url);
        let database = pick(ENV_DATABASE, file_values.database);
        let username = pick(ENV_USERNAME, file_values.username);
        let password = pick(ENV_PASSWORD, file_values.password);
        let pg_url = pick(ENV_PG_URL, file_values.pg_url);

        let missing: Vec<String> = [
            ("url", url.is_none()),
            ("database", database.is_none()),
            ("username", username.is_none()),
            ("password", password.is_none()),
        ]
        .into_iter()
        .filter(|(_, absent)| *absent)
        .map(|(name, _)| name.to_string())
        .collect();

        match (url, database, username, password) {
            (Some(url), Some(database), Some(username), Some(password)) => {
                debug!("Resolved connection config for instance '{instance}'");
                Ok(Self {
                    instance: instance.to_string(),
                    url: url.trim_end_matches('/').to_string(),
                    database,
                    username,
                    password,
                    pg_url,
                })
            },
            _ => Err(Report::new(Error::Configuration { missing }).attach(format!(
                "Set {ENV_URL}, {ENV_DATABASE}, {ENV_USERNAME} and {ENV_PASSWORD} or create {} \
                 with:\n[odoo]\nurl = https://your-odoo-instance.com\ndatabase = \
                 your_database\nusername = your_username\npassword = your_password",
                file.map_or_else(
                    || format!("~/{CONFIG_DIR}/{instance}.conf"),
                    |path| path.display().to_string()
                )
            ))),
        }
    }
}

/// Standard location of the per-instance config file
fn config_file_path(instance: &str) -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(CONFIG_DIR).join(format!("{instance}.conf")))
}

fn read_config_file(path: &Path) -> Result<FileValues> {
    let settings = Config::builder()
        .add_source(File::from(path).format(FileFormat::Ini))
        .build()
        .change_context(Error::io_failed("read config file", path, "invalid INI"))?;

    let get = |key: &str| settings.get_string(&format!("{CONFIG_SECTION}.{key}")).ok();

    Ok(FileValues {
        url:      get("url"),
        database: get("database").or_else(|| get("db_name")),
        username: get("username"),
        password: get("password"),
        pg_url:   get("pg_url"),
    })
}
