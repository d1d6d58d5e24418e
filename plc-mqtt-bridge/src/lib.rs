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

//! Republishes PLC tag values as MQTT messages.
//!
//! Observes a named PLC tag, stringifies every value it produces and publishes
//! it on a fixed MQTT topic through each client emitted by a client stream.
//! The returned stream yields one publish result per tag value.
//!
//! # Example
//!
//! ```ignore
//! use futures::StreamExt;
//! use plc_mqtt_bridge::{managed_client_stream, MemoryPlc, MqttClientConfig, PublishPlcTagExt};
//!
//! let config = MqttClientConfig::builder("broker.local").port(1883).build();
//! let plc = MemoryPlc::new();
//!
//! let mut results = managed_client_stream(&config)?
//!     .publish_plc_tag::<u16, _, _>("plc/tag1", "DB1.DBW0", move || Some(plc))?;
//!
//! while let Some(result) = results.next().await {
//!     log::info!("published: {:?}", result?);
//! }
//! ```

pub mod bridge;
pub mod client;
pub mod config;
pub mod error;
pub mod memory;
pub mod plc;
pub mod publisher;

pub use bridge::{
    publish_plc_tag, publish_plc_tag_managed, publish_tag, PublishPlcTagExt, PublishStream,
};
pub use client::{
    client_stream, managed_client_stream, ManagedMqttClient, MqttClient, MqttPublish,
    ProcessedMessage, PublishResult,
};
pub use config::{MqttClientConfig, MqttClientConfigBuilder};
pub use error::{BridgeError, PlcError};
pub use memory::MemoryPlc;
pub use plc::{PlcTags, PlcValue, TagStream, TagValue};
pub use publisher::PublishMessage;
