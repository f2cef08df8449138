//! API target resolution from the page location.

use reqwest::Url;

pub const DEFAULT_LOOPBACK_HOST: &str = "localhost";
pub const DEFAULT_DEV_PORT: u16 = 5000;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TargetError {
    #[error("location must not be empty")]
    EmptyLocation,
    #[error("location must be an absolute http:// or https:// url: {0}")]
    InvalidLocation(String),
    #[error("location has no host: {0}")]
    MissingHost(String),
    #[error("dev port must be a number between 1 and 65535: {0}")]
    InvalidDevPort(String),
}

/// The location the admin page was loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLocation {
    pub protocol: String,
    pub host: String,
    pub port: u16,
    pub query: Vec<(String, String)>,
}

impl PageLocation {
    pub fn parse(raw: &str) -> Result<Self, TargetError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(TargetError::EmptyLocation);
        }
        let url =
            Url::parse(trimmed).map_err(|_| TargetError::InvalidLocation(trimmed.to_string()))?;
        let protocol = url.scheme().to_string();
        if protocol != "http" && protocol != "https" {
            return Err(TargetError::InvalidLocation(trimmed.to_string()));
        }
        let host = url
            .host_str()
            .filter(|host| !host.is_empty())
            .ok_or_else(|| TargetError::MissingHost(trimmed.to_string()))?
            .to_string();
        let port = url
            .port_or_known_default()
            .ok_or_else(|| TargetError::InvalidLocation(trimmed.to_string()))?;
        let query = url
            .query_pairs()
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();

        Ok(Self {
            protocol,
            host,
            port,
            query,
        })
    }

    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Which host counts as local development, and the port the API listens on there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetPolicy {
    pub loopback_host: String,
    pub dev_port: u16,
}

impl Default for TargetPolicy {
    fn default() -> Self {
        Self {
            loopback_host: DEFAULT_LOOPBACK_HOST.to_string(),
            dev_port: DEFAULT_DEV_PORT,
        }
    }
}

pub fn parse_dev_port(raw: &str) -> Result<u16, TargetError> {
    let trimmed = raw.trim();
    match trimmed.parse::<u16>() {
        Ok(port) if port > 0 => Ok(port),
        _ => Err(TargetError::InvalidDevPort(trimmed.to_string())),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiTarget {
    pub protocol: String,
    pub host: String,
    pub port: u16,
}

impl ApiTarget {
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}://{}:{}{}", self.protocol, self.host, self.port, path)
    }
}

pub trait ApiTargetResolver: Send + Sync {
    fn resolve(&self) -> ApiTarget;
}

impl ApiTargetResolver for ApiTarget {
    fn resolve(&self) -> ApiTarget {
        self.clone()
    }
}

/// Derives the API target from the page location: pages served from the
/// loopback host talk to the API on the dev port, everything else uses the
/// page's own port.
#[derive(Debug, Clone)]
pub struct LocationTargetResolver {
    location: PageLocation,
    policy: TargetPolicy,
}

impl LocationTargetResolver {
    #[must_use]
    pub fn new(location: PageLocation, policy: TargetPolicy) -> Self {
        Self { location, policy }
    }
}

impl ApiTargetResolver for LocationTargetResolver {
    fn resolve(&self) -> ApiTarget {
        let port = if self.location.host == self.policy.loopback_host {
            self.policy.dev_port
        } else {
            self.location.port
        };
        ApiTarget {
            protocol: self.location.protocol.clone(),
            host: self.location.host.clone(),
            port,
        }
    }
}
