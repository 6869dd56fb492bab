use std::time::Duration;

use tracing::warn;

use crate::error::GatewayError;
use crate::gateway::{HttpGateway, TimeoutGateway};

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:3000";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    /// Upper bound on every gateway call.
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl ClientConfig {
    /// Reads `CAMPUS_API_URL` and `CAMPUS_API_TIMEOUT_SECS`, falling back to
    /// defaults.
    pub fn from_env() -> Self {
        let base_url = std::env::var("CAMPUS_API_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let timeout_secs = match std::env::var("CAMPUS_API_TIMEOUT_SECS") {
            Ok(raw) => raw.parse().unwrap_or_else(|_| {
                warn!("Ignoring invalid CAMPUS_API_TIMEOUT_SECS '{}'", raw);
                DEFAULT_TIMEOUT_SECS
            }),
            Err(_) => DEFAULT_TIMEOUT_SECS,
        };
        Self {
            base_url,
            timeout: Duration::from_secs(timeout_secs.max(1)),
        }
    }

    /// HTTP gateway with every call bounded by `timeout`.
    pub fn connect(&self) -> Result<TimeoutGateway<HttpGateway>, GatewayError> {
        Ok(TimeoutGateway::new(HttpGateway::new(self)?, self.timeout))
    }
}
