use crate::target::{
    DEFAULT_DEV_PORT, DEFAULT_LOOPBACK_HOST, LocationTargetResolver, PageLocation, TargetError,
    TargetPolicy, parse_dev_port,
};

pub const DEFAULT_LOCATION: &str = "http://localhost/";
pub const ENV_LOCATION: &str = "ADDRESSIMO_ADMIN_LOCATION";
pub const ENV_LOOPBACK_HOST: &str = "ADDRESSIMO_ADMIN_LOOPBACK_HOST";
pub const ENV_DEV_PORT: &str = "ADDRESSIMO_ADMIN_DEV_PORT";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminConfig {
    pub location: PageLocation,
    pub policy: TargetPolicy,
}

impl AdminConfig {
    pub fn new(location: &str, policy: TargetPolicy) -> Result<Self, TargetError> {
        Ok(Self {
            location: PageLocation::parse(location)?,
            policy,
        })
    }

    /// Reads the page location and target policy from the environment,
    /// falling back to a loopback page on the default dev port.
    pub fn from_env() -> Result<Self, TargetError> {
        let location = env_non_empty(ENV_LOCATION).unwrap_or_else(|| DEFAULT_LOCATION.to_string());
        let loopback_host =
            env_non_empty(ENV_LOOPBACK_HOST).unwrap_or_else(|| DEFAULT_LOOPBACK_HOST.to_string());
        let dev_port = match env_non_empty(ENV_DEV_PORT) {
            Some(raw) => parse_dev_port(&raw)?,
            None => DEFAULT_DEV_PORT,
        };

        Self::new(
            &location,
            TargetPolicy {
                loopback_host,
                dev_port,
            },
        )
    }

    #[must_use]
    pub fn resolver(&self) -> LocationTargetResolver {
        LocationTargetResolver::new(self.location.clone(), self.policy.clone())
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
