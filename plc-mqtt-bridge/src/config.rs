// Copyright 2025 The Drasi Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Configuration types for the MQTT client adapters.

use std::env;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use rumqttc::{MqttOptions, QoS};
use serde::Deserialize;

/// Connection settings shared by [`MqttClient`](crate::MqttClient) and
/// [`ManagedMqttClient`](crate::ManagedMqttClient).
#[derive(Debug, Clone, Deserialize)]
pub struct MqttClientConfig {
    /// MQTT broker hostname or IP.
    pub broker_host: String,
    /// MQTT broker port (default: 1883).
    #[serde(default = "default_port")]
    pub port: u16,
    /// MQTT client ID. Defaults to `"plc-mqtt-bridge-{uuid}"`.
    #[serde(default = "default_client_id")]
    pub client_id: String,
    /// Optional MQTT username for authentication.
    #[serde(default)]
    pub username: Option<String>,
    /// Optional MQTT password for authentication.
    #[serde(default)]
    pub password: Option<String>,
    /// Keep-alive interval in seconds (default: 30).
    #[serde(default = "default_keep_alive_secs")]
    pub keep_alive_secs: u64,
    /// Capacity of the client's outgoing request queue (default: 100).
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    /// QoS level used for every publish, 0 to 2 (default: 1).
    #[serde(default = "default_qos")]
    pub qos: u8,
    /// Retain flag used for every publish (default: false).
    #[serde(default)]
    pub retain: bool,
    /// Pause before the managed client reconnects, in milliseconds (default: 1000).
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
}

fn default_port() -> u16 {
    1883
}

fn default_client_id() -> String {
    format!("plc-mqtt-bridge-{}", uuid::Uuid::new_v4())
}

fn default_keep_alive_secs() -> u64 {
    30
}

fn default_capacity() -> usize {
    100
}

fn default_qos() -> u8 {
    1
}

fn default_reconnect_delay_ms() -> u64 {
    1000
}

impl MqttClientConfig {
    /// Start building a new config with the required fields.
    pub fn builder(broker_host: impl Into<String>) -> MqttClientConfigBuilder {
        MqttClientConfigBuilder {
            broker_host: broker_host.into(),
            port: default_port(),
            client_id: default_client_id(),
            username: None,
            password: None,
            keep_alive_secs: default_keep_alive_secs(),
            capacity: default_capacity(),
            qos: default_qos(),
            retain: false,
            reconnect_delay_ms: default_reconnect_delay_ms(),
        }
    }

    /// Read the config from `MQTT_*` environment variables.
    ///
    /// `MQTT_BROKER_HOST` is required; `MQTT_PORT`, `MQTT_CLIENT_ID`,
    /// `MQTT_USERNAME`, `MQTT_PASSWORD`, `MQTT_QOS` and `MQTT_RETAIN` are optional.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let broker_host =
            lookup("MQTT_BROKER_HOST").ok_or_else(|| anyhow!("MQTT_BROKER_HOST not set"))?;
        let mut builder = Self::builder(broker_host);

        if let Some(port) = lookup("MQTT_PORT") {
            builder = builder.port(port.parse().context("Invalid MQTT_PORT")?);
        }
        if let Some(client_id) = lookup("MQTT_CLIENT_ID") {
            builder = builder.client_id(client_id);
        }
        if let Some(username) = lookup("MQTT_USERNAME") {
            builder = builder.username(username);
        }
        if let Some(password) = lookup("MQTT_PASSWORD") {
            builder = builder.password(password);
        }
        if let Some(qos) = lookup("MQTT_QOS") {
            builder = builder.qos(qos.parse().context("Invalid MQTT_QOS")?);
        }
        if let Some(retain) = lookup("MQTT_RETAIN") {
            builder = builder.retain(retain.parse().context("Invalid MQTT_RETAIN")?);
        }

        let config = builder.build();
        config.qos()?;
        Ok(config)
    }

    /// The publish QoS as a rumqttc level.
    pub fn qos(&self) -> Result<QoS> {
        match self.qos {
            0 => Ok(QoS::AtMostOnce),
            1 => Ok(QoS::AtLeastOnce),
            2 => Ok(QoS::ExactlyOnce),
            other => Err(anyhow!("Invalid MQTT QoS level: {other}")),
        }
    }

    /// Build rumqttc connection options from this config.
    pub fn mqtt_options(&self) -> MqttOptions {
        let mut mqtt_opts = MqttOptions::new(&self.client_id, &self.broker_host, self.port);
        mqtt_opts.set_keep_alive(Duration::from_secs(self.keep_alive_secs));

        if let (Some(user), Some(pass)) = (&self.username, &self.password) {
            mqtt_opts.set_credentials(user, pass);
        }
        mqtt_opts
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}

/// Builder for [`MqttClientConfig`].
pub struct MqttClientConfigBuilder {
    broker_host: String,
    port: u16,
    client_id: String,
    username: Option<String>,
    password: Option<String>,
    keep_alive_secs: u64,
    capacity: usize,
    qos: u8,
    retain: bool,
    reconnect_delay_ms: u64,
}

impl MqttClientConfigBuilder {
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = client_id.into();
        self
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn keep_alive_secs(mut self, secs: u64) -> Self {
        self.keep_alive_secs = secs;
        self
    }

    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn qos(mut self, qos: u8) -> Self {
        self.qos = qos;
        self
    }

    pub fn retain(mut self, retain: bool) -> Self {
        self.retain = retain;
        self
    }

    pub fn reconnect_delay_ms(mut self, millis: u64) -> Self {
        self.reconnect_delay_ms = millis;
        self
    }

    /// Build the config.
    pub fn build(self) -> MqttClientConfig {
        MqttClientConfig {
            broker_host: self.broker_host,
            port: self.port,
            client_id: self.client_id,
            username: self.username,
            password: self.password,
            keep_alive_secs: self.keep_alive_secs,
            capacity: self.capacity,
            qos: self.qos,
            retain: self.retain,
            reconnect_delay_ms: self.reconnect_delay_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_builder_defaults() {
        let config = MqttClientConfig::builder("broker.local").build();

        assert_eq!(config.broker_host, "broker.local");
        assert_eq!(config.port, 1883);
        assert!(config.client_id.starts_with("plc-mqtt-bridge-"));
        assert_eq!(config.capacity, 100);
        assert_eq!(config.qos().unwrap(), QoS::AtLeastOnce);
        assert!(!config.retain);
    }

    #[test]
    fn test_deserialize_applies_defaults() {
        let config: MqttClientConfig = serde_json::from_value(serde_json::json!({
            "broker_host": "10.0.0.5",
            "qos": 2,
            "retain": true
        }))
        .unwrap();

        assert_eq!(config.port, 1883);
        assert_eq!(config.keep_alive_secs, 30);
        assert_eq!(config.reconnect_delay(), Duration::from_secs(1));
        assert_eq!(config.qos().unwrap(), QoS::ExactlyOnce);
        assert!(config.retain);
    }

    #[test]
    fn test_from_lookup_reads_all_fields() {
        let config = MqttClientConfig::from_lookup(lookup_from(&[
            ("MQTT_BROKER_HOST", "plc-gw"),
            ("MQTT_PORT", "8883"),
            ("MQTT_CLIENT_ID", "line-3"),
            ("MQTT_USERNAME", "user"),
            ("MQTT_PASSWORD", "secret"),
            ("MQTT_QOS", "0"),
            ("MQTT_RETAIN", "true"),
        ]))
        .unwrap();

        assert_eq!(config.broker_host, "plc-gw");
        assert_eq!(config.port, 8883);
        assert_eq!(config.client_id, "line-3");
        assert_eq!(config.username.as_deref(), Some("user"));
        assert_eq!(config.password.as_deref(), Some("secret"));
        assert_eq!(config.qos().unwrap(), QoS::AtMostOnce);
        assert!(config.retain);
    }

    #[test]
    fn test_from_lookup_requires_broker_host() {
        assert!(MqttClientConfig::from_lookup(lookup_from(&[])).is_err());
    }

    #[test]
    fn test_from_lookup_rejects_invalid_values() {
        let bad_port = lookup_from(&[("MQTT_BROKER_HOST", "h"), ("MQTT_PORT", "abc")]);
        assert!(MqttClientConfig::from_lookup(bad_port).is_err());

        let bad_qos = lookup_from(&[("MQTT_BROKER_HOST", "h"), ("MQTT_QOS", "3")]);
        assert!(MqttClientConfig::from_lookup(bad_qos).is_err());
    }
}
