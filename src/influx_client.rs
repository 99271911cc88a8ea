use crate::config_client::{env_lookup, optional, parsed, Lookup};
use crate::error::{ConfigError, WriteError};
use crate::model::{FieldValue, MetricPoint};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use influxdb::{Client, Timestamp, WriteQuery};
use tracing::debug;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 8086;
pub const DEFAULT_DATABASE: &str = "vrm";

#[async_trait]
pub trait PointWriter: Send + Sync {
    /// Submits all points in one write. An empty slice is a no-op.
    async fn write_points(&self, points: &[MetricPoint]) -> Result<(), WriteError>;

    fn database(&self) -> &str;
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum InfluxAuth {
    None,
    Token(String),
    Basic { username: String, password: String },
}

pub struct InfluxClientConfig {
    url: String,
    database: String,
    auth: InfluxAuth,
}

impl InfluxClientConfig {
    pub fn new(url: String, database: String, auth: InfluxAuth) -> Result<Self, ConfigError> {
        debug!(
            "InfluxClientConfig::new(url: {}, database: {})",
            url, database
        );

        Ok(Self {
            url,
            database,
            auth,
        })
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&env_lookup)
    }

    pub fn from_lookup(lookup: Lookup) -> Result<Self, ConfigError> {
        let url = match optional(lookup, "INFLUX_URL") {
            Some(url) => url,
            None => {
                let host =
                    optional(lookup, "INFLUX_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
                let port = parsed(lookup, "INFLUX_PORT", DEFAULT_PORT)?;
                format!("http://{}:{}", host, port)
            }
        };

        // an explicitly emptied INFLUX_DB is a missing database, not the default
        let database = match lookup("INFLUX_DB") {
            Some(value) if value.trim().is_empty() => {
                return Err(ConfigError::Missing(vec!["INFLUX_DB".to_string()]))
            }
            Some(value) => value.trim().to_string(),
            None => DEFAULT_DATABASE.to_string(),
        };

        let auth = match (
            optional(lookup, "INFLUX_TOKEN"),
            optional(lookup, "INFLUX_USER"),
            optional(lookup, "INFLUX_PASSWORD"),
        ) {
            (Some(token), _, _) => InfluxAuth::Token(token),
            (None, Some(username), Some(password)) => InfluxAuth::Basic { username, password },
            (None, Some(_), None) => {
                return Err(ConfigError::Missing(vec!["INFLUX_PASSWORD".to_string()]))
            }
            (None, None, Some(_)) => {
                return Err(ConfigError::Missing(vec!["INFLUX_USER".to_string()]))
            }
            (None, None, None) => InfluxAuth::None,
        };

        Self::new(url, database, auth)
    }
}

pub struct InfluxClient {
    config: InfluxClientConfig,
    client: Client,
}

impl InfluxClient {
    pub fn new(config: InfluxClientConfig) -> Self {
        let client = Client::new(config.url.as_str(), config.database.as_str());
        let client = match &config.auth {
            InfluxAuth::None => client,
            InfluxAuth::Token(token) => client.with_token(token.as_str()),
            InfluxAuth::Basic { username, password } => {
                client.with_auth(username.as_str(), password.as_str())
            }
        };

        Self { config, client }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self::new(InfluxClientConfig::from_env()?))
    }
}

#[async_trait]
impl PointWriter for InfluxClient {
    async fn write_points(&self, points: &[MetricPoint]) -> Result<(), WriteError> {
        if points.is_empty() {
            return Ok(());
        }

        let queries = to_write_queries(points, Utc::now());

        self.client
            .query(queries)
            .await
            .map_err(|source| WriteError {
                database: self.config.database.clone(),
                count: points.len(),
                source,
            })?;

        Ok(())
    }

    fn database(&self) -> &str {
        &self.config.database
    }
}

/// Stamps every point with the same write time. Tags with an empty value are
/// left out of the line.
pub fn to_write_queries(points: &[MetricPoint], written_at: DateTime<Utc>) -> Vec<WriteQuery> {
    let millis = written_at.timestamp_millis().max(0) as u128;

    points
        .iter()
        .map(|point| {
            let query = WriteQuery::new(Timestamp::Milliseconds(millis), point.measurement.as_str());
            let query = point
                .tags
                .iter()
                // line protocol has no empty tag values
                .filter(|(_, value)| !value.is_empty())
                .fold(query, |query, (key, value)| {
                    query.add_tag(key.as_str(), value.clone())
                });
            point
                .fields
                .iter()
                .fold(query, |query, (key, value)| match value {
                    FieldValue::Float(f) => query.add_field(key.as_str(), *f),
                    FieldValue::Text(s) => query.add_field(key.as_str(), s.clone()),
                })
        })
        .collect()
}
