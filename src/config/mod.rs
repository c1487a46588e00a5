use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub dispatch: DispatchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub env: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Pending-queue cap per subscriber; the oldest record is evicted beyond it
    pub max_pending_per_subscriber: usize,
    /// Default page size for the notification history endpoint
    pub history_limit: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Config {
            app: AppConfig {
                env: std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
                port: std::env::var("APP_PORT")
                    .unwrap_or_else(|_| "8000".to_string())
                    .parse()?,
            },
            dispatch: DispatchConfig {
                max_pending_per_subscriber: std::env::var("MAX_PENDING_PER_SUBSCRIBER")
                    .unwrap_or_else(|_| "256".to_string())
                    .parse()?,
                history_limit: std::env::var("NOTIFICATION_HISTORY_LIMIT")
                    .unwrap_or_else(|_| "50".to_string())
                    .parse()?,
            },
        })
    }
}
