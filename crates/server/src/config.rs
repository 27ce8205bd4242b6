use engine::EngineConfig;
use serde::Deserialize;
use std::time::Duration;

/// Service-level settings, with the engine tuning nested under `engine`.
///
/// ```json
/// { "default_top_n": 20, "engine": { "similarity_threshold": 0.6 } }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub engine: EngineConfig,
    /// `top_n` when a user-based request doesn't give one
    pub default_top_n: usize,
    /// `num_recommendations` when a preference request doesn't give one
    pub default_num_recommendations: usize,
    pub request_timeout_ms: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            default_top_n: 10,
            default_num_recommendations: 5,
            request_timeout_ms: 2_000,
        }
    }
}

impl ServiceConfig {
    pub fn with_engine(mut self, engine: EngineConfig) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}
