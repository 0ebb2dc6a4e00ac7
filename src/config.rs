use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    pub audit_database_path: String,
    /// Comma-separated webhook credentials accepted on the update endpoint.
    pub webhook_keys: Vec<String>,
    pub throttle_max_updates: usize,
    pub throttle_window_secs: u64,
    pub activation_webhook_url: Option<String>,
    pub audit_enabled: bool,
    /// Audit records older than this are purged at startup. 0 keeps everything.
    pub audit_retention_days: i64,
    pub dev_mode: bool,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let dev_mode = env::var("ORDERGATE_ENV")
            .map(|v| v == "dev" || v == "development")
            .unwrap_or(false);

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port: u16 = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        let webhook_keys = env::var("WEBHOOK_KEYS")
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();

        Self {
            host,
            port,
            database_path: env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "ordergate.db".to_string()),
            audit_database_path: env::var("AUDIT_DATABASE_PATH")
                .unwrap_or_else(|_| "ordergate_audit.db".to_string()),
            webhook_keys,
            throttle_max_updates: env::var("THROTTLE_MAX_UPDATES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
            throttle_window_secs: env::var("THROTTLE_WINDOW_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60),
            activation_webhook_url: env::var("ACTIVATION_WEBHOOK_URL").ok(),
            audit_enabled: env::var("AUDIT_ENABLED")
                .map(|v| v != "false" && v != "0")
                .unwrap_or(true),
            audit_retention_days: env::var("AUDIT_RETENTION_DAYS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
            dev_mode,
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
