use super::*;

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            ip: "127.0.0.1".to_string(),
            port: 80,
            username: "operator".to_string(),
            password: "password".to_string(),
            request_timeout_seconds: 10,
        }
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 9877,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
            json_format: false,
            file: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            device: DeviceConfig::default(),
            poll_interval_seconds: 60,
            web: WebConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}
