use serde::Deserialize;
use config::{Config, ConfigError, Environment, File};

pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:8000";

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub backend_url: String,
    pub web_port: u16,
    pub log_level: String,
    pub body_limit_mb: usize,
    pub request_timeout_secs: u64,
}

impl AppConfig {
    pub fn new() -> Result<Self, ConfigError> {
        let env = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            .set_default("backend_url", DEFAULT_BACKEND_URL)?
            .set_default("web_port", 3000)?
            .set_default("log_level", "info")?
            .set_default("body_limit_mb", 10)?
            .set_default("request_timeout_secs", 120)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(File::with_name("config/local").required(false))
            // BACKEND_URL, WEB_PORT, LOG_LEVEL, ...
            .add_source(Environment::default().try_parsing(true))
            .build()?;

        s.try_deserialize()
    }

    pub fn body_limit_bytes(&self) -> usize {
        self.body_limit_mb * 1024 * 1024
    }
}

#[cfg(test)]
impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            web_port: 3000,
            log_level: "info".to_string(),
            body_limit_mb: 10,
            request_timeout_secs: 5,
        }
    }
}
