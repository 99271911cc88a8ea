use thiserror::Error;

/// Startup failures. The binary exits with status 2 on any of these.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required config: {}", .0.join(", "))]
    Missing(Vec<String>),
    #[error("Invalid value {value:?} for {name}: {reason}")]
    Invalid {
        name: String,
        value: String,
        reason: String,
    },
    #[error("Failed to read config file {path}: {source}")]
    File {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        source: serde_yaml::Error,
    },
    #[error("Failed to create HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
}

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        source: reqwest::Error,
    },
    #[error("request to {url} returned status {status}")]
    Status { url: String, status: u16 },
    #[error("response from {url} is not valid json: {source}")]
    Decode {
        url: String,
        source: reqwest::Error,
    },
}

#[derive(Error, Debug)]
#[error("write of {count} points to database {database} failed: {source}")]
pub struct WriteError {
    pub database: String,
    pub count: usize,
    pub source: influxdb::Error,
}
