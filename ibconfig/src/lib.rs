//! # InfoBerry Configuration Module
//!
//! This module provides configuration management for InfoBerry, including:
//! - Loading configuration from YAML files
//! - Merging with embedded default configuration
//! - Environment variable overrides
//! - Typed getters for every InfoBerry setting
//!
//! ## Usage
//!
//! ```no_run
//! let config = ibconfig::init_config("")?;
//!
//! let server = config.get_server_url();
//! let poll = config.get_poll_interval()?;
//! config.set_http_port(9000)?;
//! # Ok::<(), anyhow::Error>(())
//! ```

use anyhow::{Result, anyhow};
use dirs::home_dir;
use once_cell::sync::OnceCell;
use serde_yaml::{Mapping, Number, Value};
use std::{
    env, fs,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};
use tracing::{info, warn};
use uuid::Uuid;

// Configuration par défaut intégrée
const DEFAULT_CONFIG: &str = include_str!("infoberry.yaml");

static CONFIG: OnceCell<Arc<Config>> = OnceCell::new();

const ENV_CONFIG_DIR: &str = "INFOBERRY_CONFIG";
const ENV_PREFIX: &str = "INFOBERRY_CONFIG__";
const CONFIG_DIR_NAME: &str = ".infoberry";
const CONFIG_FILE: &str = "config.yaml";
const DATABASE_FILE: &str = "infoberry.db";

// Default values for configuration
const DEFAULT_HTTP_PORT: u16 = 5000;
const DEFAULT_SERVER_URL: &str = "http://localhost:5000";
const DEFAULT_DATABASE_DIR: &str = "data";
const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;
const DEFAULT_REGISTRATION_RETRY_SECS: u64 = 30;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
const DEFAULT_PLAYER_NAME: &str = "infoberry";
const DEFAULT_PLAYER_DESCRIPTION: &str = "InfoBerry display";
const DEFAULT_LOG_MIN_LEVEL: &str = "INFO";
const DEFAULT_LOG_ENABLE_CONSOLE: bool = true;

/// Macro to generate a getter for durations stored as whole seconds
macro_rules! impl_secs_config {
    ($getter:ident, $path:expr, $default:expr) => {
        pub fn $getter(&self) -> Result<Duration> {
            let secs = match self.value($path) {
                Some(Value::Number(n)) if n.is_u64() => n.as_u64().unwrap_or($default),
                Some(Value::String(s)) => s.trim().parse::<u64>().unwrap_or_else(|_| {
                    warn!(
                        "Invalid duration '{}' at {}, using default {}s",
                        s,
                        $path.join("."),
                        $default
                    );
                    $default
                }),
                _ => $default,
            };
            Ok(Duration::from_secs(secs.max(1)))
        }
    };
}

/// Macro to generate a getter for bool values with default
macro_rules! impl_bool_config {
    ($getter:ident, $path:expr, $default:expr) => {
        pub fn $getter(&self) -> Result<bool> {
            match self.value($path) {
                Some(Value::Bool(b)) => Ok(b),
                _ => Ok($default),
            }
        }
    };
}

/// Macro to generate a getter for string values with default
macro_rules! impl_string_config {
    ($getter:ident, $path:expr, $default:expr) => {
        pub fn $getter(&self) -> String {
            match self.value($path) {
                Some(Value::String(s)) if !s.trim().is_empty() => s,
                _ => $default.to_string(),
            }
        }
    };
}

/// Macro to generate getter/setter for optional shell commands
macro_rules! impl_command_config {
    ($getter:ident, $setter:ident, $path:expr) => {
        pub fn $getter(&self) -> Option<String> {
            match self.value($path) {
                Some(Value::String(s)) if !s.trim().is_empty() => Some(s),
                _ => None,
            }
        }

        pub fn $setter(&self, command: Option<String>) -> Result<()> {
            let value = command.map(Value::String).unwrap_or(Value::Null);
            self.store($path, value)
        }
    };
}

/// Configuration of an InfoBerry server or player
///
/// The YAML tree is kept in memory behind a mutex and written back to
/// `config.yaml` after every change, so that generated values such as the
/// player serial survive restarts.
#[derive(Debug)]
pub struct Config {
    dir: PathBuf,
    path: PathBuf,
    data: Mutex<Value>,
}

impl Config {
    /// Loads the configuration from `directory`, or from the default lookup
    /// when `directory` is empty
    ///
    /// The directory is searched in the following order:
    /// 1. The provided `directory` parameter if not empty
    /// 2. The `INFOBERRY_CONFIG` environment variable
    /// 3. `.infoberry` in the current directory
    /// 4. `.infoberry` in the user's home directory
    ///
    /// The embedded defaults are merged with `config.yaml` when present,
    /// then `INFOBERRY_CONFIG__SECTION__KEY` variables override single
    /// values. The merged tree is saved back.
    pub fn load_config(directory: &str) -> Result<Self> {
        let dir = resolve_config_dir(directory)?;
        info!(config_dir=%dir.display(), "Using config directory");
        let path = dir.join(CONFIG_FILE);

        let mut data = lowercase_keys(serde_yaml::from_str(DEFAULT_CONFIG)?);
        match fs::read(&path) {
            Ok(bytes) => {
                info!(config_file=%path.display(), "Loaded config file");
                // Un fichier vide se désérialise en Null : on garde les défauts
                let user: Value = serde_yaml::from_slice(&bytes)?;
                if !user.is_null() {
                    merge_yaml(&mut data, &lowercase_keys(user));
                }
            }
            Err(_) => {
                info!(config_file=%path.display(), "Config file not found, using defaults")
            }
        }

        apply_env_overrides(&mut data);

        let config = Config {
            dir,
            path,
            data: Mutex::new(data),
        };
        config.save()?;
        Ok(config)
    }

    fn lock_data(&self) -> MutexGuard<'_, Value> {
        // Une valeur YAML ne peut pas être laissée à moitié écrite : on
        // récupère la donnée même si un thread a paniqué en la tenant.
        self.data.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Returns the directory holding `config.yaml`
    pub fn directory(&self) -> &Path {
        &self.dir
    }

    /// Saves the current configuration to the config.yaml file
    pub fn save(&self) -> Result<()> {
        let yaml = serde_yaml::to_string(&*self.lock_data())?;
        fs::write(&self.path, yaml)?;
        Ok(())
    }

    fn value(&self, path: &[&str]) -> Option<Value> {
        let data = self.lock_data();
        path.iter()
            .try_fold(&*data, |node, key| node.get(key.to_lowercase()))
            .cloned()
    }

    fn store(&self, path: &[&str], value: Value) -> Result<()> {
        insert_at(&mut self.lock_data(), path, value)?;
        self.save()
    }

    /// Chemin de la base SQLite du serveur
    ///
    /// `host.database.directory` peut être absolu ou relatif au répertoire
    /// de configuration ; il est créé au besoin.
    pub fn get_database_path(&self) -> Result<PathBuf> {
        let configured = match self.value(&["host", "database", "directory"]) {
            Some(Value::String(s)) if !s.trim().is_empty() => s,
            _ => DEFAULT_DATABASE_DIR.to_string(),
        };
        let dir = self.dir.join(configured);
        if !dir.exists() {
            fs::create_dir_all(&dir)?;
            info!(directory=%dir.display(), "Created database directory");
        }
        Ok(dir.join(DATABASE_FILE))
    }

    /// Gets the HTTP port from configuration
    ///
    /// Returns the configured HTTP port, or the default port (5000) if not configured or invalid.
    pub fn get_http_port(&self) -> u16 {
        let port = match self.value(&["host", "http_port"]) {
            Some(Value::Number(n)) => n.as_u64().and_then(|p| u16::try_from(p).ok()),
            Some(Value::String(s)) => s.trim().parse::<u16>().ok(),
            _ => None,
        };
        port.unwrap_or_else(|| {
            warn!("Invalid or missing HTTP port, using default {}", DEFAULT_HTTP_PORT);
            DEFAULT_HTTP_PORT
        })
    }

    /// Sets the HTTP port in configuration
    pub fn set_http_port(&self, port: u16) -> Result<()> {
        self.store(&["host", "http_port"], Value::Number(Number::from(port)))
    }

    /// Gets the base URL of the InfoBerry server polled by the client
    ///
    /// Trailing slashes are removed so that routes can be appended directly.
    pub fn get_server_url(&self) -> String {
        match self.value(&["client", "server_url"]) {
            Some(Value::String(s)) if !s.trim().is_empty() => {
                s.trim().trim_end_matches('/').to_string()
            }
            _ => {
                warn!("Server URL missing or empty, using default {}", DEFAULT_SERVER_URL);
                DEFAULT_SERVER_URL.to_string()
            }
        }
    }

    impl_secs_config!(
        get_poll_interval,
        &["client", "poll_interval"],
        DEFAULT_POLL_INTERVAL_SECS
    );

    impl_secs_config!(
        get_registration_retry_interval,
        &["client", "registration_retry_interval"],
        DEFAULT_REGISTRATION_RETRY_SECS
    );

    impl_secs_config!(
        get_request_timeout,
        &["client", "request_timeout"],
        DEFAULT_REQUEST_TIMEOUT_SECS
    );

    /// Période de rechargement de la page affichée
    ///
    /// `None` si absente, nulle ou invalide : la page n'est rechargée qu'au
    /// changement de média.
    pub fn get_refresh_interval(&self) -> Option<Duration> {
        let secs = match self.value(&["client", "refresh_interval"]) {
            Some(Value::Number(n)) => n.as_u64(),
            Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
            _ => None,
        };
        secs.filter(|secs| *secs > 0).map(Duration::from_secs)
    }

    impl_string_config!(get_player_name, &["player", "name"], DEFAULT_PLAYER_NAME);

    impl_string_config!(
        get_player_description,
        &["player", "description"],
        DEFAULT_PLAYER_DESCRIPTION
    );

    /// Serial forcé dans la configuration (None si non défini)
    pub fn get_player_serial(&self) -> Option<String> {
        match self.value(&["player", "serial"]) {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Retourne le serial configuré ou en génère un nouveau (UUID v4)
    ///
    /// Utilisé sur les machines qui ne sont pas des Raspberry Pi : le serial
    /// généré est sauvegardé pour rester stable entre deux redémarrages.
    pub fn get_or_create_player_serial(&self) -> Result<String> {
        if let Some(serial) = self.get_player_serial() {
            return Ok(serial);
        }
        let serial = Uuid::new_v4().simple().to_string();
        self.store(&["player", "serial"], Value::String(serial.clone()))?;
        info!(serial=%serial, "Generated player serial");
        Ok(serial)
    }

    impl_command_config!(
        get_browser_command,
        set_browser_command,
        &["display", "browser_command"]
    );

    impl_command_config!(
        get_setup_command,
        set_setup_command,
        &["display", "setup_command"]
    );

    impl_command_config!(
        get_power_on_command,
        set_power_on_command,
        &["display", "power_on_command"]
    );

    impl_command_config!(
        get_power_off_command,
        set_power_off_command,
        &["display", "power_off_command"]
    );

    impl_bool_config!(
        get_log_enable_console,
        &["host", "logger", "enable_console"],
        DEFAULT_LOG_ENABLE_CONSOLE
    );

    /// Récupère le niveau de log minimum depuis la configuration
    pub fn get_log_min_level(&self) -> String {
        match self.value(&["host", "logger", "min_level"]) {
            Some(Value::String(s)) => s,
            _ => DEFAULT_LOG_MIN_LEVEL.to_string(),
        }
    }
}

/// Loads the global configuration from `directory` (empty for the default lookup)
///
/// Returns the already loaded instance if the configuration was initialised
/// before.
pub fn init_config(directory: &str) -> Result<Arc<Config>> {
    CONFIG
        .get_or_try_init(|| Config::load_config(directory).map(Arc::new))
        .cloned()
}

// Premier candidat défini : argument, variable d'environnement, ./.infoberry,
// ~/.infoberry, puis ./.infoberry créé à la volée.
fn resolve_config_dir(directory: &str) -> Result<PathBuf> {
    let dir = if !directory.is_empty() {
        PathBuf::from(directory)
    } else if let Ok(from_env) = env::var(ENV_CONFIG_DIR) {
        info!(env_var = ENV_CONFIG_DIR, path = %from_env, "Config directory from env");
        PathBuf::from(from_env)
    } else {
        let local = PathBuf::from(CONFIG_DIR_NAME);
        let in_home = home_dir()
            .map(|home| home.join(CONFIG_DIR_NAME))
            .filter(|path| path.is_dir());
        match in_home {
            Some(home) if !local.exists() => home,
            _ => local,
        }
    };

    fs::create_dir_all(&dir)?;
    if !dir.is_dir() {
        return Err(anyhow!("Config path {} is not a directory", dir.display()));
    }
    let write_test = dir.join(".write_test");
    fs::write(&write_test, b"test")?;
    fs::remove_file(&write_test)?;
    Ok(dir)
}

fn insert_at(node: &mut Value, path: &[&str], value: Value) -> Result<()> {
    let Some((first, rest)) = path.split_first() else {
        *node = value;
        return Ok(());
    };
    if node.is_null() {
        *node = Value::Mapping(Mapping::new());
    }
    let Value::Mapping(map) = node else {
        return Err(anyhow!("Cannot set '{}' inside a scalar value", first));
    };
    let child = map
        .entry(Value::String(first.to_lowercase()))
        .or_insert(Value::Null);
    insert_at(child, rest, value)
}

fn apply_env_overrides(data: &mut Value) {
    for (key, raw) in env::vars() {
        let Some(stripped) = key.strip_prefix(ENV_PREFIX) else {
            continue;
        };
        let path: Vec<&str> = stripped.split("__").collect();
        let value = serde_yaml::from_str(&raw).unwrap_or(Value::String(raw));
        match insert_at(data, &path, value) {
            Ok(()) => info!(variable = %key, "Applied config override from env"),
            Err(e) => warn!("Ignoring env override {}: {}", key, e),
        }
    }
}

fn lowercase_keys(value: Value) -> Value {
    match value {
        Value::Mapping(map) => Value::Mapping(
            map.into_iter()
                .map(|(k, v)| {
                    let k = match k {
                        Value::String(s) => Value::String(s.to_lowercase()),
                        other => other,
                    };
                    (k, lowercase_keys(v))
                })
                .collect(),
        ),
        Value::Sequence(seq) => Value::Sequence(seq.into_iter().map(lowercase_keys).collect()),
        other => other,
    }
}

/// Merges external YAML configuration into default configuration
///
/// This function recursively merges two YAML value trees:
/// - For mappings (objects), it merges keys from external into default
/// - For scalars and sequences, external values replace default values
fn merge_yaml(default: &mut Value, external: &Value) {
    match (default, external) {
        (Value::Mapping(dmap), Value::Mapping(emap)) => {
            for (k, v) in emap {
                match dmap.get_mut(k) {
                    Some(dv) => merge_yaml(dv, v),
                    None => {
                        dmap.insert(k.clone(), v.clone());
                    }
                }
            }
        }
        (d, e) => *d = e.clone(), // pour les scalaires ou séquences, on remplace
    }
}
