/// Driver configuration: region, endpoint, credentials and request timeout
use crate::error::{Error, Result};
use std::collections::HashMap;
use std::time::Duration;

/// Default per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(10_000);

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"***")
            .finish()
    }
}

/// Configuration used to build a store client and its connections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverConfig {
    /// Region name, e.g. "us-east-1"
    pub region: Option<String>,

    /// Custom endpoint URL (local emulators, proxies)
    pub endpoint: Option<String>,

    /// Static credentials; the client falls back to its default chain when unset
    pub credentials: Option<Credentials>,

    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            region: None,
            endpoint: None,
            credentials: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl DriverConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_credentials(
        mut self,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
    ) -> Self {
        self.credentials = Some(Credentials {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
        });
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// True when the endpoint is plain HTTP.
    pub fn is_insecure_endpoint(&self) -> bool {
        self.endpoint
            .as_deref()
            .map(|e| e.to_ascii_lowercase().starts_with("http://"))
            .unwrap_or(false)
    }

    /// Parses `Region=..;AkId=..;Secret_Key=..;Endpoint=..;TimeoutMs=..`.
    ///
    /// Keys are case-insensitive. Values missing from the string are taken
    /// from the process environment.
    pub fn from_conn_string(conn: &str) -> Result<Self> {
        Self::from_conn_string_with_env(conn, |key| std::env::var(key).ok())
    }

    /// Same as [`DriverConfig::from_conn_string`] with an explicit environment lookup.
    pub fn from_conn_string_with_env(
        conn: &str,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let params = parse_conn_params(conn);
        let lookup = |keys: &[&str], env_keys: &[&str]| -> Option<String> {
            keys.iter()
                .find_map(|k| params.get(*k).cloned())
                .or_else(|| env_keys.iter().find_map(|k| env(k)))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut config = DriverConfig::new();
        config.region = lookup(&["REGION"], &["AWS_REGION"]);
        config.endpoint = lookup(&["ENDPOINT"], &["AWS_DYNAMODB_ENDPOINT"]);

        let akid = lookup(&["AKID"], &["AWS_ACCESS_KEY_ID", "AWS_AKID"]);
        let secret = lookup(
            &["SECRET_KEY", "SECRETKEY"],
            &["AWS_SECRET_KEY", "AWS_SECRET_ACCESS_KEY"],
        );
        match (akid, secret) {
            (Some(access_key_id), Some(secret_access_key)) => {
                config.credentials = Some(Credentials {
                    access_key_id,
                    secret_access_key,
                });
            }
            (None, None) => {}
            _ => {
                return Err(Error::Config(
                    "access key id and secret key must be supplied together".to_string(),
                ))
            }
        }

        // An unparseable or non-positive timeout falls back to the default.
        if let Some(ms) = params.get("TIMEOUTMS") {
            config.timeout = ms
                .trim()
                .parse::<i64>()
                .ok()
                .filter(|ms| *ms > 0)
                .map(|ms| Duration::from_millis(ms as u64))
                .unwrap_or(DEFAULT_TIMEOUT);
        }

        config.validate().map_err(Error::Config)?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.timeout.is_zero() {
            return Err("timeout must be greater than 0".to_string());
        }

        if let Some(endpoint) = &self.endpoint {
            let lower = endpoint.to_ascii_lowercase();
            if !lower.starts_with("http://") && !lower.starts_with("https://") {
                return Err(format!("endpoint <{}> must start with http:// or https://", endpoint));
            }
        }

        if let Some(creds) = &self.credentials {
            if creds.access_key_id.is_empty() || creds.secret_access_key.is_empty() {
                return Err("credentials must not be empty".to_string());
            }
        }

        Ok(())
    }
}

fn parse_conn_params(conn: &str) -> HashMap<String, String> {
    conn.split(';')
        .filter_map(|part| {
            let (k, v) = part.split_once('=')?;
            let k = k.trim().to_uppercase();
            if k.is_empty() {
                return None;
            }
            Some((k, v.trim().to_string()))
        })
        .collect()
}
