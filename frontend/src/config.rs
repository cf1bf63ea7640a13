//! 编译期配置
//!
//! 所有值通过 `option_env!` 在编译时读取（`build.rs` 会把 `.env` 中的变量转发过来），
//! 缺失或无法解析时使用默认值。

use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub api_base_url: String,
    /// 开发环境下图片服务所在端口
    pub media_port: u16,
    /// 这些端口上的页面视为本地开发环境
    pub dev_ports: Vec<u16>,
    pub inactivity_timeout_ms: u64,
    pub scanner_start_delay_ms: u32,
    pub form_reset_delay_ms: u32,
    pub default_retention_days: u32,
    pub environment: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: "/api".to_string(),
            media_port: 8000,
            dev_ports: vec![3000, 5173, 8080],
            inactivity_timeout_ms: 180_000,
            scanner_start_delay_ms: 300,
            form_reset_delay_ms: 1500,
            default_retention_days: bobinas_shared::DEFAULT_RETENTION_DAYS,
            environment: "development".to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| match key {
            "API_BASE_URL" => option_env!("API_BASE_URL"),
            "MEDIA_PORT" => option_env!("MEDIA_PORT"),
            "DEV_PORTS" => option_env!("DEV_PORTS"),
            "INACTIVITY_TIMEOUT_MS" => option_env!("INACTIVITY_TIMEOUT_MS"),
            "SCANNER_START_DELAY_MS" => option_env!("SCANNER_START_DELAY_MS"),
            "FORM_RESET_DELAY_MS" => option_env!("FORM_RESET_DELAY_MS"),
            "DEFAULT_RETENTION_DAYS" => option_env!("DEFAULT_RETENTION_DAYS"),
            "ENVIRONMENT" => option_env!("ENVIRONMENT"),
            _ => None,
        })
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<&'static str>) -> Self {
        let defaults = Self::default();
        let parsed = |key: &str| lookup(key).map(str::trim).filter(|v| !v.is_empty());

        Self {
            api_base_url: parsed("API_BASE_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_base_url),
            media_port: parsed("MEDIA_PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.media_port),
            dev_ports: parsed("DEV_PORTS")
                .map(|v| v.split(',').filter_map(|p| p.trim().parse().ok()).collect())
                .unwrap_or(defaults.dev_ports),
            inactivity_timeout_ms: parsed("INACTIVITY_TIMEOUT_MS")
                .and_then(|v| v.parse().ok())
                .filter(|ms| *ms > 0)
                .unwrap_or(defaults.inactivity_timeout_ms),
            scanner_start_delay_ms: parsed("SCANNER_START_DELAY_MS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.scanner_start_delay_ms),
            form_reset_delay_ms: parsed("FORM_RESET_DELAY_MS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.form_reset_delay_ms),
            default_retention_days: parsed("DEFAULT_RETENTION_DAYS")
                .and_then(|v| v.parse().ok())
                .filter(|d| *d > 0)
                .unwrap_or(defaults.default_retention_days),
            environment: parsed("ENVIRONMENT")
                .map(str::to_string)
                .unwrap_or(defaults.environment),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn inactivity_window(&self) -> Duration {
        Duration::from_millis(self.inactivity_timeout_ms)
    }

    pub fn log_level(&self) -> log::Level {
        if self.is_production() {
            log::Level::Info
        } else {
            log::Level::Debug
        }
    }
}

// 全局配置
lazy_static::lazy_static! {
    pub static ref CONFIG: AppConfig = AppConfig::from_env();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_values_fall_back_to_defaults() {
        let config = AppConfig::from_lookup(|_| None);
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.inactivity_window(), Duration::from_millis(180_000));
        assert_eq!(config.log_level(), log::Level::Debug);
    }

    #[test]
    fn values_are_parsed_and_invalid_ones_ignored() {
        let config = AppConfig::from_lookup(|key| match key {
            "API_BASE_URL" => Some("https://bobinas.example.com/api/"),
            "DEV_PORTS" => Some("3000, 4200,abc"),
            "MEDIA_PORT" => Some("not-a-port"),
            "INACTIVITY_TIMEOUT_MS" => Some("0"),
            "ENVIRONMENT" => Some("production"),
            _ => None,
        });
        assert_eq!(config.api_base_url, "https://bobinas.example.com/api");
        assert_eq!(config.dev_ports, vec![3000, 4200]);
        assert_eq!(config.media_port, 8000);
        assert_eq!(config.inactivity_timeout_ms, 180_000);
        assert!(config.is_production());
    }
}
