use crate::error::ConfigError;
use crate::model::{SeriesPolicy, Target};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::str::FromStr;
use tracing::{debug, info};

/// Source of configuration values; `from_env` constructors pass `env_lookup`,
/// tests pass a closure over a map.
pub type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

pub fn env_lookup(name: &str) -> Option<String> {
    env::var(name).ok()
}

/// Returns the trimmed value, treating an empty one as unset.
pub fn optional(lookup: Lookup, name: &str) -> Option<String> {
    lookup(name)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub fn required(lookup: Lookup, name: &str) -> Result<String, ConfigError> {
    optional(lookup, name).ok_or_else(|| ConfigError::Missing(vec![name.to_string()]))
}

pub fn parsed<T>(lookup: Lookup, name: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match optional(lookup, name) {
        Some(value) => value.parse().map_err(|e: T::Err| ConfigError::Invalid {
            name: name.to_string(),
            value,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

/// Combines independently resolved settings so that every missing value is
/// reported in one error. Other errors are only returned when nothing is missing.
pub fn require_all<A, B, C>(
    a: Result<A, ConfigError>,
    b: Result<B, ConfigError>,
    c: Result<C, ConfigError>,
) -> Result<(A, B, C), ConfigError> {
    match (a, b, c) {
        (Ok(a), Ok(b), Ok(c)) => Ok((a, b, c)),
        (a, b, c) => {
            let mut missing = Vec::new();
            let mut first_other = None;
            for error in [a.err(), b.err(), c.err()].into_iter().flatten() {
                match error {
                    ConfigError::Missing(names) => missing.extend(names),
                    other => {
                        first_other.get_or_insert(other);
                    }
                }
            }

            match first_other {
                Some(other) if missing.is_empty() => Err(other),
                _ => Err(ConfigError::Missing(missing)),
            }
        }
    }
}

pub trait SetDefaults {
    fn set_defaults(&mut self);
}

#[derive(Copy, Clone, PartialEq, Eq, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub enum PolicyKind {
    Installations,
    Series,
}

/// Which extraction policy the collector runs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CollectorConfig {
    pub policy: PolicyKind,
    #[serde(default)]
    pub series: Option<SeriesPolicy>,
}

impl SetDefaults for CollectorConfig {
    fn set_defaults(&mut self) {
        if self.policy == PolicyKind::Series {
            self.series
                .get_or_insert_with(SeriesPolicy::default)
                .set_defaults();
        }
    }
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            policy: PolicyKind::Installations,
            series: None,
        }
    }
}

impl CollectorConfig {
    /// Resolves the polled resource; the site or user id it needs is required.
    pub fn target(&self, lookup: Lookup) -> Result<Target, ConfigError> {
        match self.policy {
            PolicyKind::Installations => Ok(Target::Installations {
                user_id: required(lookup, "VRM_USER_ID")?,
            }),
            PolicyKind::Series => Ok(Target::Series {
                site_id: required(lookup, "VRM_SITE_ID")?,
                policy: self.series.clone().unwrap_or_default(),
            }),
        }
    }
}

#[derive(Debug)]
pub struct ConfigClientConfig {
    config_path: Option<String>,
}

impl ConfigClientConfig {
    pub fn new(config_path: Option<String>) -> Result<Self, ConfigError> {
        debug!("ConfigClientConfig::new(config_path: {:?})", config_path);
        Ok(Self { config_path })
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&env_lookup)
    }

    pub fn from_lookup(lookup: Lookup) -> Result<Self, ConfigError> {
        Self::new(optional(lookup, "CONFIG_PATH"))
    }
}

pub struct ConfigClient {
    config: ConfigClientConfig,
}

impl ConfigClient {
    pub fn new(config: ConfigClientConfig) -> Self {
        Self { config }
    }

    pub fn read_config(&self) -> Result<CollectorConfig, ConfigError> {
        let config_path = match &self.config.config_path {
            Some(path) => path,
            None => {
                info!("No CONFIG_PATH set; collecting installation list");
                return Ok(CollectorConfig::default());
            }
        };

        let config_file_contents =
            fs::read_to_string(config_path).map_err(|source| ConfigError::File {
                path: config_path.clone(),
                source,
            })?;
        let mut config: CollectorConfig =
            serde_yaml::from_str(&config_file_contents).map_err(|source| ConfigError::Parse {
                path: config_path.clone(),
                source,
            })?;

        config.set_defaults();

        info!("Loaded config from {}", config_path);

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::{check, let_assert};
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn read_config_returns_deserialized_test_file() {
        let_assert!(Ok(config) = ConfigClientConfig::new(Some("test-config.yaml".to_string())));
        let config_client = ConfigClient::new(config);

        let_assert!(Ok(CollectorConfig { policy, series }) = config_client.read_config());

        check!(policy == PolicyKind::Series);
        let_assert!(Some(series) = series);
        check!(series.series_name == "bs");
        check!(series.measurement == "battery");
        check!(series.field_name == "state_of_charge");
    }

    #[test]
    fn read_config_without_path_collects_installations() {
        let_assert!(Ok(config) = ConfigClientConfig::from_lookup(&lookup_from(&[])));
        let config_client = ConfigClient::new(config);

        let_assert!(Ok(config) = config_client.read_config());

        check!(config == CollectorConfig::default());
    }

    #[test]
    fn read_config_fails_for_missing_file() {
        let lookup = lookup_from(&[("CONFIG_PATH", "does-not-exist.yaml")]);
        let_assert!(Ok(config) = ConfigClientConfig::from_lookup(&lookup));
        let config_client = ConfigClient::new(config);

        let_assert!(Err(ConfigError::File { path, .. }) = config_client.read_config());
        check!(path == "does-not-exist.yaml");
    }

    #[test]
    fn series_policy_without_section_gets_defaults() {
        let mut config: CollectorConfig = serde_yaml::from_str("policy: series\n").unwrap();

        config.set_defaults();

        check!(config.series == Some(SeriesPolicy::default()));
    }

    #[test]
    fn target_requires_user_id_for_installations() {
        let lookup = lookup_from(&[("VRM_USER_ID", "  ")]);

        let_assert!(Err(ConfigError::Missing(names)) = CollectorConfig::default().target(&lookup));
        check!(names == vec!["VRM_USER_ID".to_string()]);
    }

    #[test]
    fn target_uses_site_id_for_series() {
        let lookup = lookup_from(&[("VRM_SITE_ID", "4242")]);
        let mut config = CollectorConfig {
            policy: PolicyKind::Series,
            series: None,
        };
        config.set_defaults();

        let_assert!(Ok(Target::Series { site_id, policy }) = config.target(&lookup));
        check!(site_id == "4242");
        check!(policy.measurement == "battery");
        check!(policy.field_name == "soc");
    }

    #[test]
    fn require_all_reports_every_missing_value() {
        let token: Result<String, ConfigError> = Err(ConfigError::Missing(vec!["VRM_TOKEN".into()]));
        let user: Result<String, ConfigError> = Err(ConfigError::Missing(vec!["VRM_USER_ID".into()]));

        let_assert!(Err(error) = require_all(token, user, Ok(1)));

        check!(error.to_string() == "Missing required config: VRM_TOKEN, VRM_USER_ID");
    }

    #[test]
    fn require_all_prefers_missing_over_invalid_values() {
        let invalid: Result<u64, ConfigError> = Err(ConfigError::Invalid {
            name: "VRM_TIMEOUT_SECONDS".into(),
            value: "soon".into(),
            reason: "invalid digit found in string".into(),
        });
        let influx: Result<u64, ConfigError> = Err(ConfigError::Missing(vec!["INFLUX_DB".into()]));

        let_assert!(Err(ConfigError::Missing(names)) = require_all(invalid, Ok(()), influx));
        check!(names == vec!["INFLUX_DB".to_string()]);
    }

    #[test]
    fn require_all_passes_values_through() {
        let_assert!(Ok((one, two, three)) = require_all(Ok(1), Ok("two"), Ok(3u8)));

        check!(one == 1);
        check!(two == "two");
        check!(three == 3);
    }

    #[test]
    fn parsed_rejects_garbage() {
        let lookup = lookup_from(&[("POLL_INTERVAL_SECONDS", "soon")]);

        let_assert!(
            Err(ConfigError::Invalid { name, value, .. }) =
                parsed::<u64>(&lookup, "POLL_INTERVAL_SECONDS", 60)
        );
        check!(name == "POLL_INTERVAL_SECONDS");
        check!(value == "soon");
    }
}
