use std::time::Duration;

use crate::config_client::{env_lookup, parsed, Lookup};
use crate::error::ConfigError;
use crate::extractor::{describe_shape, extract};
use crate::influx_client::PointWriter;
use crate::model::Target;
use crate::vrm_client::VrmApi;
use tracing::{error, info, warn};

pub const DEFAULT_POLL_INTERVAL_SECONDS: u64 = 60;

pub struct CollectorServiceConfig {
    api: Box<dyn VrmApi>,
    writer: Box<dyn PointWriter>,
    target: Target,
    poll_interval: Duration,
}

impl CollectorServiceConfig {
    pub fn new(
        api: Box<dyn VrmApi>,
        writer: Box<dyn PointWriter>,
        target: Target,
        poll_interval: Duration,
    ) -> Result<Self, ConfigError> {
        if poll_interval.is_zero() {
            return Err(ConfigError::Invalid {
                name: "POLL_INTERVAL_SECONDS".to_string(),
                value: "0".to_string(),
                reason: "must be at least one second".to_string(),
            });
        }

        Ok(Self {
            api,
            writer,
            target,
            poll_interval,
        })
    }

    pub fn from_env(
        api: Box<dyn VrmApi>,
        writer: Box<dyn PointWriter>,
        target: Target,
    ) -> Result<Self, ConfigError> {
        Self::from_lookup(&env_lookup, api, writer, target)
    }

    pub fn from_lookup(
        lookup: Lookup,
        api: Box<dyn VrmApi>,
        writer: Box<dyn PointWriter>,
        target: Target,
    ) -> Result<Self, ConfigError> {
        let seconds = parsed(lookup, "POLL_INTERVAL_SECONDS", DEFAULT_POLL_INTERVAL_SECONDS)?;

        Self::new(api, writer, target, Duration::from_secs(seconds))
    }
}

/// How a single poll cycle ended.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum CycleOutcome {
    FetchFailed,
    NothingExtracted,
    Written(usize),
    WriteFailed(usize),
}

pub struct CollectorService {
    config: CollectorServiceConfig,
}

impl CollectorService {
    pub fn new(config: CollectorServiceConfig) -> Self {
        Self { config }
    }

    pub fn poll_interval(&self) -> Duration {
        self.config.poll_interval
    }

    /// Polls forever, sleeping the configured interval after every cycle
    /// whatever its outcome.
    pub async fn run(&self) {
        info!(
            "Starting VRM -> InfluxDB collector; polling every {}s",
            self.config.poll_interval.as_secs()
        );

        loop {
            self.run_once().await;
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }

    /// One fetch, extract and write. Failures end the cycle early and are only logged.
    pub async fn run_once(&self) -> CycleOutcome {
        let target = &self.config.target;

        let document = match self.config.api.fetch(target).await {
            Ok(document) => document,
            Err(e) => {
                warn!("Error fetching VRM {}: {}", target.path(), e);
                info!(
                    "Fetch failed, retrying after {} seconds",
                    self.config.poll_interval.as_secs()
                );
                return CycleOutcome::FetchFailed;
            }
        };

        let points = match extract(target, &document) {
            Some(points) => points,
            None => {
                info!(
                    "No {} data found in VRM response; {}",
                    target.describe(),
                    describe_shape(&document)
                );
                return CycleOutcome::NothingExtracted;
            }
        };

        let count = points.len();
        match self.config.writer.write_points(&points).await {
            Ok(()) => {
                info!(
                    "Wrote {} {} points to InfluxDB database={}",
                    count,
                    target.describe(),
                    self.config.writer.database()
                );
                CycleOutcome::Written(count)
            }
            Err(e) => {
                error!("Failed to write {} points to InfluxDB: {}", target.describe(), e);
                CycleOutcome::WriteFailed(count)
            }
        }
    }
}
