/// Configuration for node execution
#[derive(Debug, Clone, PartialEq)]
pub struct NodeConfig {
    /// Total attempts for a failing model call; 1 means no retry
    pub max_retries: usize,
    /// Timeout for one model call in seconds
    pub timeout: u64,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            max_retries: 1,
            timeout: 60,
        }
    }
}

/// Builder for node configuration
#[derive(Debug, Default)]
pub struct NodeConfigBuilder {
    config: NodeConfig,
}

impl NodeConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_retries(mut self, retries: usize) -> Self {
        self.config.max_retries = retries;
        self
    }

    pub fn timeout(mut self, seconds: u64) -> Self {
        self.config.timeout = seconds;
        self
    }

    pub fn build(self) -> NodeConfig {
        self.config
    }
}
