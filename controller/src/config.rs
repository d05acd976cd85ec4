use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use thermostat_core::{ControllerConfig, Settings};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub pass: String,
    pub client_id: String,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 1883,
            user: String::new(),
            pass: String::new(),
            client_id: "thermostat-controller-rust".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub controller: ControllerConfig,
    pub settings: Settings,
    pub mqtt: MqttConfig,
    pub http_port: u16,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            controller: ControllerConfig::default(),
            settings: Settings::default(),
            mqtt: MqttConfig::default(),
            http_port: 8080,
        }
    }
}

impl RuntimeConfig {
    pub fn path_from_env() -> PathBuf {
        std::env::var("THERMOSTAT_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./thermostat.json"))
    }

    /// Reads the config file; a missing file yields the defaults.
    pub async fn load(path: &Path) -> anyhow::Result<Self> {
        match tokio::fs::read(path).await {
            Ok(raw) => serde_json::from_slice(&raw)
                .with_context(|| format!("failed to parse config {}", path.display())),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => {
                Err(err).with_context(|| format!("failed to read config {}", path.display()))
            }
        }
    }

    pub fn apply_env_overrides<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = var("MQTT_HOST") {
            self.mqtt.host = host;
        }
        if let Some(port) = var("MQTT_PORT").and_then(|value| value.parse::<u16>().ok()) {
            self.mqtt.port = port;
        }
        if let Some(user) = var("MQTT_USER") {
            self.mqtt.user = user;
        }
        if let Some(pass) = var("MQTT_PASS") {
            self.mqtt.pass = pass;
        }
        if let Some(port) = var("CONTROLLER_HTTP_PORT").and_then(|value| value.parse::<u16>().ok())
        {
            self.http_port = port;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;
    use thermostat_core::ThermostatMode;

    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let raw = r#"{
            "controller": { "queue_len": 20 },
            "settings": { "heat_setpoint": 19, "cool_setpoint": 24, "mode": "dual" }
        }"#;
        let config: RuntimeConfig = serde_json::from_str(raw).unwrap();

        assert_eq!(config.controller.queue_len, 20);
        assert_eq!(config.controller.window_len_secs, 3600);
        assert_eq!(config.settings.mode, ThermostatMode::Dual);
        assert_eq!(config.settings.differential, 1);
        assert_eq!(config.mqtt, MqttConfig::default());
        assert_eq!(config.http_port, 8080);
    }

    #[test]
    fn env_overrides_win_and_bad_ports_are_ignored() {
        let env: HashMap<&str, &str> = [
            ("MQTT_HOST", "broker.local"),
            ("MQTT_PORT", "not-a-port"),
            ("MQTT_USER", "thermostat"),
            ("CONTROLLER_HTTP_PORT", "9090"),
        ]
        .into_iter()
        .collect();

        let mut config = RuntimeConfig::default();
        config.apply_env_overrides(|key| env.get(key).map(|value| value.to_string()));

        assert_eq!(config.mqtt.host, "broker.local");
        assert_eq!(config.mqtt.port, 1883);
        assert_eq!(config.mqtt.user, "thermostat");
        assert_eq!(config.mqtt.pass, "");
        assert_eq!(config.http_port, 9090);
    }

    #[tokio::test]
    async fn missing_file_loads_defaults() {
        let path = Path::new("./does-not-exist/thermostat.json");
        let config = RuntimeConfig::load(path).await.unwrap();
        assert_eq!(config, RuntimeConfig::default());
    }
}
