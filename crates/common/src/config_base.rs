use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Base timeout presets shared by outbound HTTP integrations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutConfigBase {
    pub operation_timeout_ms: u64,
    pub connection_timeout_ms: u64,
    pub health_check_timeout_ms: u64,
}

impl Default for TimeoutConfigBase {
    fn default() -> Self {
        Self {
            operation_timeout_ms: 30_000,
            connection_timeout_ms: 5_000,
            health_check_timeout_ms: 5_000,
        }
    }
}

impl TimeoutConfigBase {
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }

    pub fn connection_timeout(&self) -> Duration {
        Duration::from_millis(self.connection_timeout_ms)
    }

    pub fn health_check_timeout(&self) -> Duration {
        Duration::from_millis(self.health_check_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timeouts() {
        let timeouts = TimeoutConfigBase::default();
        assert_eq!(timeouts.operation_timeout(), Duration::from_secs(30));
        assert_eq!(timeouts.connection_timeout(), Duration::from_secs(5));
        assert_eq!(timeouts.health_check_timeout(), Duration::from_secs(5));
    }
}
