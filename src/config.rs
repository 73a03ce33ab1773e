use crate::error::{LeadError, Result};

/// Runtime configuration, sourced from the environment with sensible
/// development defaults.
#[derive(Debug, Clone)]
pub struct LeadflowConfig {
    pub database_url: String,
    pub bind_address: String,
    pub notify_channel_capacity: usize,
    pub max_db_connections: u32,
}

impl Default for LeadflowConfig {
    fn default() -> Self {
        Self {
            database_url: "postgresql://localhost/leadflow_development".to_string(),
            bind_address: "0.0.0.0:8080".to_string(),
            notify_channel_capacity: 1000,
            max_db_connections: 10,
        }
    }
}

impl LeadflowConfig {
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(db_url) = std::env::var("DATABASE_URL") {
            config.database_url = db_url;
        }

        if let Ok(bind) = std::env::var("LEADFLOW_BIND_ADDRESS") {
            config.bind_address = bind;
        }

        if let Ok(capacity) = std::env::var("LEADFLOW_NOTIFY_CAPACITY") {
            config.notify_channel_capacity = capacity.parse().map_err(|e| {
                LeadError::internal(format!("Invalid LEADFLOW_NOTIFY_CAPACITY: {e}"))
            })?;
        }

        if let Ok(max_conns) = std::env::var("LEADFLOW_MAX_DB_CONNECTIONS") {
            config.max_db_connections = max_conns.parse().map_err(|e| {
                LeadError::internal(format!("Invalid LEADFLOW_MAX_DB_CONNECTIONS: {e}"))
            })?;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LeadflowConfig::default();
        assert_eq!(config.notify_channel_capacity, 1000);
        assert!(config.database_url.contains("leadflow"));
    }
}
