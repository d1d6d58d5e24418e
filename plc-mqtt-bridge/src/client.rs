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

//! MQTT client adapters implementing the [`MqttPublish`] capability.
//!
//! Two variants are provided. [`MqttClient`] is a thin wrapper around a
//! rumqttc [`AsyncClient`]: publish failures are returned as errors and its
//! event loop stops at the first connection error. [`ManagedMqttClient`]
//! keeps its session alive by reconnecting, queues messages while offline
//! and reports every message as a [`ProcessedMessage`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use futures::future::ready;
use futures::stream::{self, Stream};
use log::{error, info, warn};
use rumqttc::{AsyncClient, Event, EventLoop, Incoming, Outgoing, QoS};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::config::MqttClientConfig;
use crate::publisher::PublishMessage;

/// The publish operation of an MQTT client.
///
/// `Output` is the result event the client reports for each message.
#[async_trait]
pub trait MqttPublish: Send + Sync {
    type Output: Send + 'static;

    async fn publish(&self, message: PublishMessage) -> Result<Self::Output>;
}

/// Result of a publish accepted by an [`MqttClient`].
#[derive(Debug, Clone, PartialEq)]
pub struct PublishResult {
    pub topic: String,
    pub payload: String,
    pub qos: QoS,
}

/// Unmanaged MQTT client.
#[derive(Clone)]
pub struct MqttClient {
    client: AsyncClient,
    qos: QoS,
    retain: bool,
}

impl MqttClient {
    pub fn new(client: AsyncClient, qos: QoS, retain: bool) -> Self {
        Self {
            client,
            qos,
            retain,
        }
    }

    /// Create a client and the event loop the caller must poll to drive it.
    pub fn connect(config: &MqttClientConfig) -> Result<(Self, EventLoop)> {
        let qos = config.qos()?;
        let (client, eventloop) = AsyncClient::new(config.mqtt_options(), config.capacity);
        Ok((Self::new(client, qos, config.retain), eventloop))
    }

    pub async fn disconnect(&self) -> Result<()> {
        self.client.disconnect().await?;
        Ok(())
    }
}

#[async_trait]
impl MqttPublish for MqttClient {
    type Output = PublishResult;

    async fn publish(&self, message: PublishMessage) -> Result<PublishResult> {
        self.client
            .publish(
                message.topic.clone(),
                self.qos,
                self.retain,
                message.payload.clone().into_bytes(),
            )
            .await?;

        Ok(PublishResult {
            topic: message.topic,
            payload: message.payload,
            qos: self.qos,
        })
    }
}

/// Report for one message handed to a [`ManagedMqttClient`].
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedMessage {
    /// Identifier assigned when the message was queued.
    pub id: Uuid,
    pub message: PublishMessage,
    /// Why the message could not be queued, if it could not.
    ///
    /// Queuing never waits: once `capacity` messages are pending, for
    /// instance while the broker is unreachable, further messages are
    /// reported here as rejected instead of blocking the publisher.
    pub error: Option<String>,
}

impl ProcessedMessage {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Session-managed MQTT client.
///
/// Owns a background task that drives the event loop and reconnects after
/// `reconnect_delay_ms` whenever the connection drops. The task is aborted
/// when the last clone is dropped.
#[derive(Clone)]
pub struct ManagedMqttClient {
    inner: Arc<ManagedInner>,
}

struct ManagedInner {
    client: AsyncClient,
    client_id: String,
    qos: QoS,
    retain: bool,
    connected: Arc<AtomicBool>,
    driver: JoinHandle<()>,
}

impl Drop for ManagedInner {
    fn drop(&mut self) {
        self.driver.abort();
    }
}

impl ManagedMqttClient {
    /// Create the client and spawn its event loop driver.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(config: &MqttClientConfig) -> Result<Self> {
        let qos = config.qos()?;
        let (client, eventloop) = AsyncClient::new(config.mqtt_options(), config.capacity);
        let connected = Arc::new(AtomicBool::new(false));

        info!(
            "[{}] Starting managed MQTT client (broker={}:{})",
            config.client_id, config.broker_host, config.port
        );
        let driver = tokio::spawn(drive_event_loop(
            eventloop,
            config.client_id.clone(),
            Some(connected.clone()),
            Some(config.reconnect_delay()),
        ));

        Ok(Self {
            inner: Arc::new(ManagedInner {
                client,
                client_id: config.client_id.clone(),
                qos,
                retain: config.retain,
                connected,
                driver,
            }),
        })
    }

    pub fn client_id(&self) -> &str {
        &self.inner.client_id
    }

    /// Whether the broker has acknowledged the current connection.
    pub fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::SeqCst)
    }

    /// Request a clean disconnect; the driver stops once it is sent.
    pub async fn stop(&self) -> Result<()> {
        info!("[{}] Stopping managed MQTT client", self.inner.client_id);
        self.inner.client.disconnect().await?;
        Ok(())
    }
}

#[async_trait]
impl MqttPublish for ManagedMqttClient {
    type Output = ProcessedMessage;

    async fn publish(&self, message: PublishMessage) -> Result<ProcessedMessage> {
        let id = Uuid::new_v4();
        let queued = self.inner.client.try_publish(
            message.topic.clone(),
            self.inner.qos,
            self.inner.retain,
            message.payload.clone().into_bytes(),
        );

        let error = match queued {
            Ok(()) => None,
            Err(e) => {
                warn!(
                    "[{}] Failed to queue message {id} for '{}': {e}",
                    self.inner.client_id, message.topic
                );
                Some(e.to_string())
            }
        };

        Ok(ProcessedMessage { id, message, error })
    }
}

/// A stream yielding one unmanaged client whose event loop runs in the background.
///
/// The event loop stops at the first connection error; later publishes then fail.
/// Must be called from within a tokio runtime.
pub fn client_stream(
    config: &MqttClientConfig,
) -> Result<impl Stream<Item = MqttClient> + Send + 'static> {
    let (client, eventloop) = MqttClient::connect(config)?;
    tokio::spawn(drive_event_loop(
        eventloop,
        config.client_id.clone(),
        None,
        None,
    ));
    Ok(stream::once(ready(client)))
}

/// A stream yielding one started [`ManagedMqttClient`].
pub fn managed_client_stream(
    config: &MqttClientConfig,
) -> Result<impl Stream<Item = ManagedMqttClient> + Send + 'static> {
    let client = ManagedMqttClient::start(config)?;
    Ok(stream::once(ready(client)))
}

async fn drive_event_loop(
    mut eventloop: EventLoop,
    client_id: String,
    connected: Option<Arc<AtomicBool>>,
    reconnect_delay: Option<Duration>,
) {
    let set_connected = |state: bool| {
        if let Some(flag) = &connected {
            flag.store(state, Ordering::SeqCst);
        }
    };

    info!("[{client_id}] MQTT event loop started");
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Incoming::ConnAck(_))) => {
                info!("[{client_id}] Connected to MQTT broker");
                set_connected(true);
            }
            Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                info!("[{client_id}] Disconnected from MQTT broker");
                set_connected(false);
                break;
            }
            Ok(_) => {}
            Err(e) => {
                set_connected(false);
                match reconnect_delay {
                    Some(delay) => {
                        warn!("[{client_id}] MQTT eventloop error (will reconnect): {e}");
                        tokio::time::sleep(delay).await;
                    }
                    None => {
                        error!("[{client_id}] MQTT connection error: {e}");
                        break;
                    }
                }
            }
        }
    }
    info!("[{client_id}] MQTT event loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    fn unreachable_broker() -> MqttClientConfig {
        MqttClientConfig::builder("127.0.0.1")
            .port(1)
            .client_id("test-client")
            .capacity(10)
            .reconnect_delay_ms(50)
            .build()
    }

    #[tokio::test]
    async fn test_unmanaged_publish_reports_message() {
        let (client, _eventloop) = MqttClient::connect(&unreachable_broker()).unwrap();

        let result = client
            .publish(PublishMessage::new("plc/tag1", "7"))
            .await
            .unwrap();

        assert_eq!(result.topic, "plc/tag1");
        assert_eq!(result.payload, "7");
        assert_eq!(result.qos, QoS::AtLeastOnce);
    }

    #[tokio::test]
    async fn test_unmanaged_publish_fails_without_event_loop() {
        let (client, eventloop) = MqttClient::connect(&unreachable_broker()).unwrap();
        drop(eventloop);

        assert!(client
            .publish(PublishMessage::new("plc/tag1", "7"))
            .await
            .is_err());
    }

    #[test]
    fn test_connect_rejects_invalid_qos() {
        let config = MqttClientConfig::builder("127.0.0.1").qos(3).build();
        assert!(MqttClient::connect(&config).is_err());
    }

    #[tokio::test]
    async fn test_managed_publish_queues_while_offline() {
        let client = ManagedMqttClient::start(&unreachable_broker()).unwrap();
        let message = PublishMessage::new("plc/tag1", "42");

        let processed = client.publish(message.clone()).await.unwrap();

        assert!(processed.is_success());
        assert_eq!(processed.message, message);
        assert!(!client.is_connected());
        assert_eq!(client.client_id(), "test-client");
    }

    #[tokio::test]
    async fn test_managed_full_queue_reports_error_without_blocking() {
        let config = MqttClientConfig::builder("127.0.0.1")
            .port(1)
            .capacity(2)
            .reconnect_delay_ms(60_000)
            .build();
        let client = ManagedMqttClient::start(&config).unwrap();

        let mut reports = Vec::new();
        for n in 0..5 {
            let processed = tokio::time::timeout(
                Duration::from_secs(2),
                client.publish(PublishMessage::new("plc/tag1", n.to_string())),
            )
            .await
            .expect("publish must not block on a full queue")
            .unwrap();
            reports.push(processed);
        }

        assert!(reports[0].is_success());
        assert!(reports[1].is_success());
        for rejected in &reports[2..] {
            assert!(!rejected.is_success());
            assert!(rejected.error.is_some());
        }
        assert_eq!(reports[4].message.payload, "4");
    }

    #[tokio::test]
    async fn test_unmanaged_client_stream_fails_after_connection_error() {
        let mut clients = Box::pin(client_stream(&unreachable_broker()).unwrap());
        let client = clients.next().await.unwrap();
        assert!(clients.next().await.is_none());

        // The driver exits on the refused connection and drops the event loop.
        let failed = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if client
                    .publish(PublishMessage::new("plc/tag1", "1"))
                    .await
                    .is_err()
                {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        })
        .await;

        assert!(failed.is_ok());
    }

    #[tokio::test]
    async fn test_managed_messages_get_distinct_ids() {
        let client = ManagedMqttClient::start(&unreachable_broker()).unwrap();

        let first = client.publish(PublishMessage::new("t", "1")).await.unwrap();
        let second = client.publish(PublishMessage::new("t", "2")).await.unwrap();

        assert_ne!(first.id, second.id);
    }

    #[tokio::test]
    async fn test_managed_client_stream_yields_one_client() {
        let clients: Vec<ManagedMqttClient> = managed_client_stream(&unreachable_broker())
            .unwrap()
            .collect()
            .await;
        assert_eq!(clients.len(), 1);
    }
}
