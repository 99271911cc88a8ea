use crate::config_client::{env_lookup, optional, parsed, required, Lookup};
use crate::error::{ConfigError, FetchError};
use crate::model::Target;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_API_URL: &str = "https://vrmapi.victronenergy.com/v2";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 10;

#[async_trait]
pub trait VrmApi: Send + Sync {
    /// Performs one request for the target; no retries.
    async fn fetch(&self, target: &Target) -> Result<Value, FetchError>;
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum AuthScheme {
    Token,
    Bearer,
}

impl std::str::FromStr for AuthScheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "token" => Ok(AuthScheme::Token),
            "bearer" => Ok(AuthScheme::Bearer),
            _ => Err("expected Token or Bearer".to_string()),
        }
    }
}

impl AuthScheme {
    fn header_value(&self, token: &str) -> String {
        match self {
            AuthScheme::Token => format!("Token {}", token),
            AuthScheme::Bearer => format!("Bearer {}", token),
        }
    }
}

pub struct VrmClientConfig {
    api_url: String,
    token: String,
    auth_scheme: AuthScheme,
    timeout: Duration,
}

impl VrmClientConfig {
    pub fn new(
        api_url: String,
        token: String,
        auth_scheme: AuthScheme,
        timeout: Duration,
    ) -> Result<Self, ConfigError> {
        debug!(
            "VrmClientConfig::new(api_url: {}, auth_scheme: {:?}, timeout: {:?})",
            api_url, auth_scheme, timeout
        );

        Ok(Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            token,
            auth_scheme,
            timeout,
        })
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&env_lookup)
    }

    pub fn from_lookup(lookup: Lookup) -> Result<Self, ConfigError> {
        let token = required(lookup, "VRM_TOKEN")?;
        let api_url =
            optional(lookup, "VRM_API").unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let auth_scheme = parsed(lookup, "VRM_AUTH_SCHEME", AuthScheme::Token)?;
        let timeout_seconds = parsed(lookup, "VRM_TIMEOUT_SECONDS", DEFAULT_TIMEOUT_SECONDS)?;

        Self::new(
            api_url,
            token,
            auth_scheme,
            Duration::from_secs(timeout_seconds),
        )
    }

    pub fn url_for(&self, target: &Target) -> String {
        format!("{}/{}", self.api_url, target.path())
    }
}

pub struct VrmClient {
    config: VrmClientConfig,
    http: reqwest::Client,
}

impl VrmClient {
    pub fn new(config: VrmClientConfig) -> Result<Self, ConfigError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(ConfigError::HttpClient)?;

        Ok(Self { config, http })
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::new(VrmClientConfig::from_env()?)
    }
}

#[async_trait]
impl VrmApi for VrmClient {
    async fn fetch(&self, target: &Target) -> Result<Value, FetchError> {
        let url = self.config.url_for(target);
        debug!("Fetching {}", url);

        let response = self
            .http
            .get(&url)
            .header(
                "X-Authorization",
                self.config.auth_scheme.header_value(&self.config.token),
            )
            .send()
            .await
            .map_err(|source| FetchError::Transport {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url,
                status: status.as_u16(),
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|source| FetchError::Decode { url, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SeriesPolicy;
    use assert2::{check, let_assert};
    use std::collections::HashMap;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    /// Accepts one connection, answers it with the given status and body and
    /// hands back the raw request.
    async fn serve_once(status_line: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.ends_with(b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            let response = format!(
                "{}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&request).to_string()
        });

        (format!("http://{}", addr), handle)
    }

    fn client_for(api_url: String, auth_scheme: AuthScheme) -> VrmClient {
        let config = VrmClientConfig::new(
            api_url,
            "s3cr3t".into(),
            auth_scheme,
            Duration::from_secs(5),
        )
        .unwrap();
        VrmClient::new(config).unwrap()
    }

    fn stats_target() -> Target {
        Target::Series {
            site_id: "4242".into(),
            policy: SeriesPolicy::default(),
        }
    }

    #[test]
    fn from_lookup_requires_token() {
        let_assert!(Err(ConfigError::Missing(names)) = VrmClientConfig::from_lookup(&lookup_from(&[])));
        check!(names == vec!["VRM_TOKEN".to_string()]);
    }

    #[test]
    fn from_lookup_applies_defaults() {
        let lookup = lookup_from(&[("VRM_TOKEN", "abc")]);

        let_assert!(Ok(config) = VrmClientConfig::from_lookup(&lookup));

        check!(config.api_url == DEFAULT_API_URL);
        check!(config.auth_scheme == AuthScheme::Token);
        check!(config.timeout == Duration::from_secs(10));
        check!(
            config.url_for(&Target::Installations { user_id: "77".into() })
                == "https://vrmapi.victronenergy.com/v2/users/77/installations"
        );
    }

    #[test]
    fn from_lookup_rejects_unknown_auth_scheme() {
        let lookup = lookup_from(&[("VRM_TOKEN", "abc"), ("VRM_AUTH_SCHEME", "Basic")]);

        let_assert!(Err(ConfigError::Invalid { name, .. }) = VrmClientConfig::from_lookup(&lookup));
        check!(name == "VRM_AUTH_SCHEME");
    }

    #[tokio::test]
    async fn fetch_returns_parsed_document_and_sends_auth_header() {
        let (api_url, server) = serve_once("HTTP/1.1 200 OK", r#"{"records":{"soc":{"y":[1,2]}}}"#).await;
        let client = client_for(format!("{}/", api_url), AuthScheme::Bearer);

        let_assert!(Ok(document) = client.fetch(&stats_target()).await);
        let request = server.await.unwrap();

        check!(document["records"]["soc"]["y"][1] == 2);
        check!(request.starts_with("GET /installations/4242/stats HTTP/1.1"));
        check!(request.to_ascii_lowercase().contains("x-authorization: bearer s3cr3t"));
    }

    #[tokio::test]
    async fn fetch_reports_non_success_status() {
        let (api_url, server) = serve_once("HTTP/1.1 401 Unauthorized", r#"{"success":false}"#).await;
        let client = client_for(api_url, AuthScheme::Token);

        let_assert!(Err(FetchError::Status { status, url }) = client.fetch(&stats_target()).await);
        server.await.unwrap();

        check!(status == 401);
        check!(url.ends_with("/installations/4242/stats"));
    }

    #[tokio::test]
    async fn fetch_reports_unparseable_body() {
        let (api_url, server) = serve_once("HTTP/1.1 200 OK", "<html>maintenance</html>").await;
        let client = client_for(api_url, AuthScheme::Token);

        let_assert!(Err(FetchError::Decode { .. }) = client.fetch(&stats_target()).await);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn fetch_reports_refused_connection() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let client = client_for(format!("http://{}", addr), AuthScheme::Token);

        let_assert!(Err(FetchError::Transport { .. }) = client.fetch(&stats_target()).await);
    }
}
