//! Client configuration, loadable from JSON or the environment.

use std::{collections::HashMap, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{
    context::Context,
    error::{FacadeError, FacadeResult},
};

pub const ENV_URI: &str = "DOCFACADE_URI";
pub const ENV_DATABASE: &str = "DOCFACADE_DATABASE";
pub const ENV_COLLECTIONS: &str = "DOCFACADE_COLLECTIONS";
pub const ENV_OPERATION_TIMEOUT_MS: &str = "DOCFACADE_OPERATION_TIMEOUT_MS";

/// Driver connection settings. Drivers without a connection pool ignore the
/// pool fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionSettings {
    pub min_pool_size: Option<u32>,
    pub max_pool_size: Option<u32>,
    pub connect_timeout_ms: Option<u64>,
    pub server_selection_timeout_ms: Option<u64>,
    /// Reported to the server for its logs.
    pub app_name: Option<String>,
    /// Ping the backend while connecting, so an unreachable host fails at
    /// construction instead of on the first operation.
    pub verify_connection: bool,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            min_pool_size: None,
            max_pool_size: Some(10),
            connect_timeout_ms: Some(10_000),
            server_selection_timeout_ms: Some(30_000),
            app_name: Some("docfacade".to_string()),
            verify_connection: true,
        }
    }
}

impl ConnectionSettings {
    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_ms.map(Duration::from_millis)
    }

    pub fn server_selection_timeout(&self) -> Option<Duration> {
        self.server_selection_timeout_ms.map(Duration::from_millis)
    }
}

/// Everything needed to build a connection manager.
///
/// ```ignore
/// let config = ClientConfig::from_json_str(r#"{
///     "uri": "memory://local",
///     "database": "drag",
///     "collections": ["batches", "tasks"],
///     "operation_timeout_ms": 5000
/// }"#)?;
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub uri: String,
    pub database: String,
    #[serde(default)]
    pub collections: Vec<String>,
    /// Upper bound applied by [`ClientConfig::context`]. `None` means no deadline.
    #[serde(default)]
    pub operation_timeout_ms: Option<u64>,
    #[serde(default, flatten)]
    pub connection: ConnectionSettings,
}

impl ClientConfig {
    pub fn new<I, S>(uri: impl Into<String>, database: impl Into<String>, collections: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            uri: uri.into(),
            database: database.into(),
            collections: collections.into_iter().map(Into::into).collect(),
            operation_timeout_ms: None,
            connection: ConnectionSettings::default(),
        }
    }

    pub fn from_json_str(json: &str) -> FacadeResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads `DOCFACADE_URI`, `DOCFACADE_DATABASE`, `DOCFACADE_COLLECTIONS`
    /// (comma separated) and `DOCFACADE_OPERATION_TIMEOUT_MS`.
    pub fn from_env() -> FacadeResult<Self> {
        Self::from_vars(&std::env::vars().collect())
    }

    /// Like [`ClientConfig::from_env`], reading from the given map.
    pub fn from_vars(vars: &HashMap<String, String>) -> FacadeResult<Self> {
        let required = |key: &str| {
            vars.get(key)
                .filter(|value| !value.trim().is_empty())
                .map(|value| value.trim().to_string())
                .ok_or_else(|| FacadeError::Configuration(format!("{key} is not set")))
        };

        let collections = vars
            .get(ENV_COLLECTIONS)
            .map(|list| {
                list.split(',')
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let operation_timeout_ms = vars
            .get(ENV_OPERATION_TIMEOUT_MS)
            .map(|value| {
                value.trim().parse::<u64>().map_err(|err| {
                    FacadeError::Configuration(format!("invalid {ENV_OPERATION_TIMEOUT_MS} {value:?}: {err}"))
                })
            })
            .transpose()?;

        let config = Self {
            uri: required(ENV_URI)?,
            database: required(ENV_DATABASE)?,
            collections,
            operation_timeout_ms,
            connection: ConnectionSettings::default(),
        };
        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> FacadeResult<()> {
        if self.uri.is_empty() {
            return Err(FacadeError::Configuration("uri must not be empty".into()));
        }
        if self.database.is_empty() {
            return Err(FacadeError::Configuration("database name must not be empty".into()));
        }
        if self.collections.iter().any(String::is_empty) {
            return Err(FacadeError::Configuration("collection names must not be empty".into()));
        }
        if let (Some(min), Some(max)) = (self.connection.min_pool_size, self.connection.max_pool_size) {
            if min > max {
                return Err(FacadeError::Configuration(format!(
                    "min_pool_size ({min}) exceeds max_pool_size ({max})"
                )));
            }
        }

        Ok(())
    }

    pub fn operation_timeout(&self) -> Option<Duration> {
        self.operation_timeout_ms.map(Duration::from_millis)
    }

    /// A fresh [`Context`] bounded by the configured operation timeout.
    pub fn context(&self) -> Context {
        match self.operation_timeout() {
            Some(timeout) => Context::with_timeout(timeout),
            None => Context::background(),
        }
    }
}
