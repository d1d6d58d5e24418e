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

//! Composes a PLC tag stream with an MQTT client stream.
//!
//! The bridge runs nothing on its own. It returns a lazy stream: polling it
//! pulls clients from the client stream, opens one tag subscription per
//! client and publishes every tag value through that client. Dropping the
//! stream drops the tag subscriptions with it.

use std::sync::Arc;

use anyhow::Result;
use futures::stream::{BoxStream, Stream, StreamExt};
use log::{debug, trace};

use crate::client::{ManagedMqttClient, MqttClient, MqttPublish, ProcessedMessage, PublishResult};
use crate::error::BridgeError;
use crate::plc::{PlcTags, TagStream, TagValue};
use crate::publisher;

/// Stream of per-value publish results.
///
/// PLC read errors and publish errors arrive as `Err` items carrying the
/// original error; the stream keeps going after them.
pub type PublishStream<R> = BoxStream<'static, Result<R>>;

/// Publish every value of `plc_variable` on `topic` through each client of `client`.
///
/// `configure_plc` is called once, before anything is subscribed, and must
/// return the PLC handle to observe. Fails with [`BridgeError::ArgumentMissing`]
/// if `client` or `configure_plc` is absent, or if the callback returns `None`.
/// `topic` and `plc_variable` are passed through unchecked.
pub fn publish_tag<T, C, S, P, F>(
    client: Option<S>,
    topic: &str,
    plc_variable: &str,
    configure_plc: Option<F>,
) -> Result<PublishStream<C::Output>, BridgeError>
where
    T: TagValue,
    C: MqttPublish + 'static,
    S: Stream<Item = C> + Send + 'static,
    P: PlcTags + 'static,
    F: FnOnce() -> Option<P>,
{
    let clients = client.ok_or(BridgeError::ArgumentMissing("client"))?;
    let configure_plc = configure_plc.ok_or(BridgeError::ArgumentMissing("configure_plc"))?;
    let plc = configure_plc().ok_or(BridgeError::ArgumentMissing("plc"))?;

    debug!("Bridging PLC tag '{plc_variable}' to MQTT topic '{topic}'");

    let topic: Arc<str> = Arc::from(topic);
    let variable: Arc<str> = Arc::from(plc_variable);

    let results = clients
        .map(move |client| {
            debug!("Subscribing PLC tag '{variable}' for a new MQTT client");
            publish_values(Arc::new(client), plc.observe::<T>(&variable), topic.clone())
        })
        .flatten_unordered(None);

    Ok(results.boxed())
}

fn publish_values<T, C>(client: Arc<C>, values: TagStream<T>, topic: Arc<str>) -> PublishStream<C::Output>
where
    T: TagValue,
    C: MqttPublish + 'static,
{
    values
        .then(move |value| {
            let client = client.clone();
            let topic = topic.clone();
            async move {
                let message = publisher::tag_message(&topic, &value?);
                trace!("Publishing '{}' to '{}'", message.payload, message.topic);
                client.publish(message).await
            }
        })
        .boxed()
}

/// [`publish_tag`] for unmanaged clients.
pub fn publish_plc_tag<T, S, P, F>(
    client: Option<S>,
    topic: &str,
    plc_variable: &str,
    configure_plc: Option<F>,
) -> Result<PublishStream<PublishResult>, BridgeError>
where
    T: TagValue,
    S: Stream<Item = MqttClient> + Send + 'static,
    P: PlcTags + 'static,
    F: FnOnce() -> Option<P>,
{
    publish_tag::<T, MqttClient, S, P, F>(client, topic, plc_variable, configure_plc)
}

/// [`publish_tag`] for session-managed clients.
pub fn publish_plc_tag_managed<T, S, P, F>(
    client: Option<S>,
    topic: &str,
    plc_variable: &str,
    configure_plc: Option<F>,
) -> Result<PublishStream<ProcessedMessage>, BridgeError>
where
    T: TagValue,
    S: Stream<Item = ManagedMqttClient> + Send + 'static,
    P: PlcTags + 'static,
    F: FnOnce() -> Option<P>,
{
    publish_tag::<T, ManagedMqttClient, S, P, F>(client, topic, plc_variable, configure_plc)
}

/// Method form of [`publish_tag`] on any client stream.
pub trait PublishPlcTagExt: Stream + Sized {
    fn publish_plc_tag<T, P, F>(
        self,
        topic: &str,
        plc_variable: &str,
        configure_plc: F,
    ) -> Result<PublishStream<<Self::Item as MqttPublish>::Output>, BridgeError>
    where
        Self: Send + 'static,
        Self::Item: MqttPublish + 'static,
        T: TagValue,
        P: PlcTags + 'static,
        F: FnOnce() -> Option<P>,
    {
        publish_tag::<T, Self::Item, Self, P, F>(Some(self), topic, plc_variable, Some(configure_plc))
    }
}

impl<S: Stream> PublishPlcTagExt for S {}
