use serde::{Deserialize, Serialize};

use crate::error::{QueueError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Name attached to log events and metric labels.
    pub label: String,
    /// Emit `metrics` counters in addition to the local stats.
    pub metrics: bool,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            label: "default".to_string(),
            metrics: false,
        }
    }
}

impl QueueConfig {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Self::default()
        }
    }

    pub fn with_metrics(mut self, enabled: bool) -> Self {
        self.metrics = enabled;
        self
    }

    pub fn from_toml_str(input: &str) -> Result<Self> {
        let config: Self = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.label.trim().is_empty() {
            return Err(QueueError::InvalidConfig(
                "label must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
